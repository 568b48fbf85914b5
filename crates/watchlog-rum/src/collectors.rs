// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Capabilities injected by the host: route resolution and page timings.
//!
//! The engine has no knowledge of any router or rendering layer. Hosts plug
//! in a [`RouteResolver`] that reports the current navigation and, when they
//! can measure it, a [`PerformanceSource`]. Closures implement both traits:
//!
//! ```
//! use watchlog_rum::{normalize_path, Route, RouteResolver};
//!
//! let resolver = || {
//!     let path = "/users/42";
//!     Some(Route::new(path, normalize_path(path, Some("/users/:id"), &[("id", "42")])))
//! };
//! assert_eq!(resolver.resolve().unwrap().normalized_path, "/users/:id");
//! ```

use watchlog_rum_core::{PerformanceMetrics, Route};

/// Reports the current navigation as a concrete path and its template.
pub trait RouteResolver: Send + Sync {
	/// Returns `None` when there is no current route.
	fn resolve(&self) -> Option<Route>;
}

impl<F> RouteResolver for F
where
	F: Fn() -> Option<Route> + Send + Sync,
{
	fn resolve(&self) -> Option<Route> {
		self()
	}
}

/// Measures page load timings for the current view.
pub trait PerformanceSource: Send + Sync {
	/// Returns `None` when timings are unavailable.
	fn capture(&self) -> Option<PerformanceMetrics>;
}

impl<F> PerformanceSource for F
where
	F: Fn() -> Option<PerformanceMetrics> + Send + Sync,
{
	fn capture(&self) -> Option<PerformanceMetrics> {
		self()
	}
}
