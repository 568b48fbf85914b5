// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Telemetry event types and their wire representation.
//!
//! An [`Event`] is what collaborators hand to the SDK. Once it passes the
//! ingestion policy it is stamped with the session metadata current at that
//! moment and becomes a [`BufferedEvent`], which is what goes over the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::session::{SessionMeta, SessionStamp};

/// Kind of telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
	SessionStart,
	SessionEnd,
	PageView,
	Error,
	Custom,
	Interaction,
	Performance,
	RouteChange,
}

impl EventType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::SessionStart => "session_start",
			Self::SessionEnd => "session_end",
			Self::PageView => "page_view",
			Self::Error => "error",
			Self::Custom => "custom",
			Self::Interaction => "interaction",
			Self::Performance => "performance",
			Self::RouteChange => "route_change",
		}
	}
}

impl fmt::Display for EventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EventType {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"session_start" => Ok(Self::SessionStart),
			"session_end" => Ok(Self::SessionEnd),
			"page_view" => Ok(Self::PageView),
			"error" => Ok(Self::Error),
			"custom" => Ok(Self::Custom),
			"interaction" => Ok(Self::Interaction),
			"performance" => Ok(Self::Performance),
			"route_change" => Ok(Self::RouteChange),
			_ => Err(CoreError::InvalidEventType(s.to_string())),
		}
	}
}

/// Source of an `error` event, sent as the `event` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Uncaught error reported by the global error hook.
	WindowError,
	/// Rejected promise or failed task nobody awaited.
	UnhandledPromise,
	/// Rust panic reported by the panic hook.
	Panic,
}

impl ErrorKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::WindowError => "window_error",
			Self::UnhandledPromise => "unhandled_promise",
			Self::Panic => "panic",
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ErrorKind {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"window_error" => Ok(Self::WindowError),
			"unhandled_promise" => Ok(Self::UnhandledPromise),
			"panic" => Ok(Self::Panic),
			_ => Err(CoreError::InvalidErrorKind(s.to_string())),
		}
	}
}

/// Page load timings in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
	/// Time to first byte.
	pub ttfb: i64,
	/// Navigation start to DOM content loaded.
	pub dom_load: i64,
	/// Navigation start to load complete.
	pub load: i64,
}

/// An event as submitted by a collaborator, before session stamping.
///
/// Only `event_type` is mandatory. Missing `path` and `normalized_path`
/// values are filled from the session at buffer time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
	#[serde(rename = "type")]
	pub event_type: EventType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub normalized_path: Option<String>,
	/// Error subtype (`window_error`, `unhandled_promise`, ...).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub event: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metric: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<f64>,
	/// Session length in whole seconds, only on `session_end`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub duration: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metrics: Option<PerformanceMetrics>,
}

impl Event {
	pub fn new(event_type: EventType) -> Self {
		Self {
			event_type,
			path: None,
			normalized_path: None,
			event: None,
			label: None,
			stack: None,
			metric: None,
			value: None,
			duration: None,
			metrics: None,
		}
	}

	/// An `error` event of the given kind.
	pub fn error(kind: ErrorKind, label: impl Into<String>) -> Self {
		Self::new(EventType::Error)
			.with_event(kind.as_str())
			.with_label(label)
	}

	/// A `custom` metric event.
	pub fn custom(metric: impl Into<String>, value: f64) -> Self {
		let mut event = Self::new(EventType::Custom);
		event.metric = Some(metric.into());
		event.value = Some(value);
		event
	}

	/// An `interaction` event labelled by the tracking attribute value.
	pub fn interaction(label: impl Into<String>) -> Self {
		Self::new(EventType::Interaction).with_label(label)
	}

	pub fn performance(metrics: PerformanceMetrics) -> Self {
		let mut event = Self::new(EventType::Performance);
		event.metrics = Some(metrics);
		event
	}

	pub fn session_end(duration: Option<i64>) -> Self {
		let mut event = Self::new(EventType::SessionEnd);
		event.duration = duration;
		event
	}

	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = Some(path.into());
		self
	}

	pub fn with_normalized_path(mut self, path: impl Into<String>) -> Self {
		self.normalized_path = Some(path.into());
		self
	}

	pub fn with_event(mut self, event: impl Into<String>) -> Self {
		self.event = Some(event.into());
		self
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
		self.stack = Some(stack.into());
		self
	}

	/// Deduplication signature, `event:label`. Only errors have one.
	pub fn signature(&self) -> Option<String> {
		if self.event_type != EventType::Error {
			return None;
		}
		Some(format!(
			"{}:{}",
			self.event.as_deref().unwrap_or_default(),
			self.label.as_deref().unwrap_or_default()
		))
	}
}

/// An event stamped with session metadata, ready for transmission.
///
/// The session fields are copied in at construction, so later changes to the
/// session never reach events that are already buffered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferedEvent {
	#[serde(flatten)]
	pub session: SessionStamp,
	#[serde(flatten)]
	pub event: Event,
	/// Capture time in epoch milliseconds.
	pub timestamp: i64,
}

impl BufferedEvent {
	/// Stamps `event` with `meta` as of `now`.
	///
	/// The raw path falls back to the last observed path; the normalized
	/// path falls back to the session's current value, then the raw path.
	pub fn stamp(meta: &SessionMeta, mut event: Event, now: DateTime<Utc>) -> Self {
		let path = event
			.path
			.take()
			.unwrap_or_else(|| meta.current_path.clone());
		let normalized_path = event
			.normalized_path
			.take()
			.or_else(|| meta.normalized_path.clone())
			.unwrap_or_else(|| path.clone());
		event.path = Some(path);
		event.normalized_path = Some(normalized_path);

		Self {
			session: meta.stamp(),
			event,
			timestamp: now.timestamp_millis(),
		}
	}

	pub fn event_type(&self) -> EventType {
		self.event.event_type
	}

	pub fn path(&self) -> &str {
		self.event.path.as_deref().unwrap_or_default()
	}

	pub fn normalized_path(&self) -> &str {
		self.event.normalized_path.as_deref().unwrap_or_default()
	}
}
