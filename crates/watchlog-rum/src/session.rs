// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Page view and session lifecycle tracking.
//!
//! A UI layer may report the same navigation several times (re-renders,
//! remounts, router and history listeners firing together). The tracker
//! turns that stream of route observations into exactly one `page_view` per
//! change of normalized path, bracketed by `session_start` and
//! `session_end`.

use std::time::Instant;

use watchlog_rum_core::{Event, EventType, Route, SessionState};

/// State machine over one visit: `Uninitialized → Active → Ended`.
#[derive(Debug, Default)]
pub struct SessionTracker {
	state: SessionState,
	started_at: Option<Instant>,
	last_page_view_path: Option<String>,
}

impl SessionTracker {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn started_at(&self) -> Option<Instant> {
		self.started_at
	}

	pub fn last_page_view_path(&self) -> Option<&str> {
		self.last_page_view_path.as_deref()
	}

	/// Returns to `Uninitialized`, forgetting the previous visit.
	pub fn reset(&mut self) {
		*self = Self::default();
	}

	/// Feeds one route observation and returns the events it produces.
	///
	/// The first observation starts the session; later ones produce a
	/// `page_view` only when the normalized path changed. Nothing is produced
	/// once the session has ended.
	pub fn observe(&mut self, route: &Route, now: Instant) -> Vec<Event> {
		match self.state {
			SessionState::Ended => Vec::new(),
			SessionState::Uninitialized => {
				self.state = SessionState::Active;
				self.started_at = Some(now);
				self.last_page_view_path = Some(route.normalized_path.clone());
				vec![
					route_event(EventType::SessionStart, route),
					route_event(EventType::PageView, route),
				]
			}
			SessionState::Active => {
				if self.last_page_view_path.as_deref() == Some(route.normalized_path.as_str()) {
					return Vec::new();
				}
				self.last_page_view_path = Some(route.normalized_path.clone());
				vec![route_event(EventType::PageView, route)]
			}
		}
	}

	/// Ends the visit and returns its `session_end` event.
	///
	/// Duration is whole seconds since the session started, or absent when no
	/// route was ever observed. Returns `None` if the session already ended.
	pub fn end(&mut self, now: Instant) -> Option<Event> {
		if self.state == SessionState::Ended {
			return None;
		}
		self.state = SessionState::Ended;

		let duration = self.started_at.map(|start| {
			let elapsed = now.saturating_duration_since(start);
			(elapsed.as_millis() as f64 / 1000.0).round() as i64
		});
		Some(Event::session_end(duration))
	}
}

fn route_event(event_type: EventType, route: &Route) -> Event {
	Event::new(event_type)
		.with_path(route.path.clone())
		.with_normalized_path(route.normalized_path.clone())
}
