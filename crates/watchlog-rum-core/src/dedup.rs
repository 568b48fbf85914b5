// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Time-windowed suppression of repeated error signatures.
//!
//! Error hooks tend to fire several times for one root cause (a script that
//! rethrows, a rejection observed by two handlers). [`DedupWindow`] keeps an
//! expiry instant per signature and admits a signature again only once its
//! own window has elapsed. Expiry is evaluated lazily against the monotonic
//! `now` passed in, so wall-clock adjustments never stretch a window and no
//! timers are involved.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long an admitted signature suppresses repeats.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_millis(3000);

/// Expiring set of error signatures.
#[derive(Debug, Clone)]
pub struct DedupWindow {
	window: Duration,
	expires: HashMap<String, Instant>,
}

impl Default for DedupWindow {
	fn default() -> Self {
		Self::new(DEFAULT_DEDUP_WINDOW)
	}
}

impl DedupWindow {
	pub fn new(window: Duration) -> Self {
		Self {
			window,
			expires: HashMap::new(),
		}
	}

	/// Returns `true` if `signature` should be forwarded.
	///
	/// An admitted signature is armed until `now + window`; repeats before
	/// that instant are rejected and do not extend the window.
	pub fn admit(&mut self, signature: &str, now: Instant) -> bool {
		self.expires.retain(|_, expiry| *expiry > now);

		if self.expires.contains_key(signature) {
			return false;
		}

		self.expires.insert(signature.to_string(), now + self.window);
		true
	}

	/// Number of signatures that were still armed at the last `admit` call.
	pub fn len(&self) -> usize {
		self.expires.len()
	}

	pub fn is_empty(&self) -> bool {
		self.expires.is_empty()
	}
}
