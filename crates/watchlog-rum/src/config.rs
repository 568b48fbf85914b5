// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Initialization options for the RUM SDK.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, RumError};

/// Default period of the background flush timer.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(10_000);

/// Buffer length that triggers an immediate flush.
pub const FLUSH_THRESHOLD: usize = 10;

/// Options accepted by [`Rum::init`](crate::Rum::init).
///
/// Deserializes from the camelCase object shared by the Watchlog SDKs:
///
/// ```
/// use watchlog_rum::RumConfig;
///
/// let config: RumConfig = serde_json::from_str(
///     r#"{
///         "apiKey": "k",
///         "endpoint": "https://collect.example.com",
///         "app": "shop",
///         "flushInterval": 5000
///     }"#,
/// ).unwrap();
/// assert_eq!(config.flush_interval().as_millis(), 5000);
/// assert!(!config.debug);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RumConfig {
	pub api_key: String,
	/// Collection URL that receives the POSTed batches.
	pub endpoint: String,
	pub app: String,
	/// Enables diagnostic logging of buffered events and transport failures.
	pub debug: bool,
	/// Flush timer period in milliseconds.
	#[serde(rename = "flushInterval")]
	pub flush_interval_ms: u64,
}

impl Default for RumConfig {
	fn default() -> Self {
		Self {
			api_key: String::new(),
			endpoint: String::new(),
			app: String::new(),
			debug: false,
			flush_interval_ms: DEFAULT_FLUSH_INTERVAL.as_millis() as u64,
		}
	}
}

impl RumConfig {
	pub fn new(
		api_key: impl Into<String>,
		endpoint: impl Into<String>,
		app: impl Into<String>,
	) -> Self {
		Self {
			api_key: api_key.into(),
			endpoint: endpoint.into(),
			app: app.into(),
			..Self::default()
		}
	}

	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	pub fn with_flush_interval(mut self, interval: Duration) -> Self {
		self.flush_interval_ms = interval.as_millis() as u64;
		self
	}

	/// Flush timer period. A zero interval falls back to the default.
	pub fn flush_interval(&self) -> Duration {
		if self.flush_interval_ms == 0 {
			DEFAULT_FLUSH_INTERVAL
		} else {
			Duration::from_millis(self.flush_interval_ms)
		}
	}

	/// Checks that every required field is present.
	pub fn validate(&self) -> Result<()> {
		if self.api_key.trim().is_empty() {
			return Err(RumError::MissingApiKey);
		}
		if self.endpoint.trim().is_empty() {
			return Err(RumError::MissingEndpoint);
		}
		if self.app.trim().is_empty() {
			return Err(RumError::MissingApp);
		}
		Ok(())
	}
}
