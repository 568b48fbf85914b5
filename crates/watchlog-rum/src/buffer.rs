// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ordered buffer of stamped events awaiting the next flush.

use watchlog_rum_core::BufferedEvent;

use crate::config::FLUSH_THRESHOLD;

/// FIFO buffer with a size-triggered flush threshold.
///
/// The buffer itself is not synchronized; the engine keeps it behind its
/// state mutex so that [`drain`](Self::drain) is atomic with respect to
/// concurrent appends.
#[derive(Debug)]
pub struct EventBuffer {
	events: Vec<BufferedEvent>,
	flush_threshold: usize,
}

impl Default for EventBuffer {
	fn default() -> Self {
		Self::new(FLUSH_THRESHOLD)
	}
}

impl EventBuffer {
	pub fn new(flush_threshold: usize) -> Self {
		Self {
			events: Vec::new(),
			flush_threshold,
		}
	}

	/// Appends an event. Returns `true` once the buffer has reached the
	/// flush threshold.
	pub fn push(&mut self, event: BufferedEvent) -> bool {
		self.events.push(event);
		self.events.len() >= self.flush_threshold
	}

	/// Takes every buffered event in capture order, leaving the buffer empty.
	pub fn drain(&mut self) -> Vec<BufferedEvent> {
		std::mem::take(&mut self.events)
	}

	pub fn len(&self) -> usize {
		self.events.len()
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}
}
