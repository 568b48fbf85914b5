// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route observations and path template normalization.

use serde::{Deserialize, Serialize};

/// One navigation as seen by a route observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
	/// Concrete path, e.g. `/users/42`.
	pub path: String,
	/// Template form, e.g. `/users/:id`.
	pub normalized_path: String,
}

impl Route {
	pub fn new(path: impl Into<String>, normalized_path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			normalized_path: normalized_path.into(),
		}
	}

	/// A route with no dynamic segments; the template is the path itself.
	pub fn literal(path: impl Into<String>) -> Self {
		let path = path.into();
		Self {
			normalized_path: path.clone(),
			path,
		}
	}
}

/// Derives a route template from a concrete path and its bound parameters.
///
/// Starts from the router's matched `template` when there is one, otherwise
/// from `raw_path`, and replaces every segment equal to a parameter value
/// with `:name`. The result always starts with `/`.
///
/// ```
/// use watchlog_rum_core::normalize_path;
///
/// let path = normalize_path("/users/42/orders/7", None, &[("id", "42"), ("order", "7")]);
/// assert_eq!(path, "/users/:id/orders/:order");
/// ```
pub fn normalize_path<K, V>(raw_path: &str, template: Option<&str>, params: &[(K, V)]) -> String
where
	K: AsRef<str>,
	V: AsRef<str>,
{
	let base = template.filter(|t| !t.is_empty()).unwrap_or(raw_path);

	let normalized = base
		.split('/')
		.map(|segment| {
			params
				.iter()
				.find(|(_, value)| !segment.is_empty() && value.as_ref() == segment)
				.map(|(name, _)| format!(":{}", name.as_ref()))
				.unwrap_or_else(|| segment.to_string())
		})
		.collect::<Vec<_>>()
		.join("/");

	if normalized.starts_with('/') {
		normalized
	} else {
		format!("/{normalized}")
	}
}
