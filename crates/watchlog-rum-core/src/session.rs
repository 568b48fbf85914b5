// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session types for a single visit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

const SESSION_ID_PREFIX: &str = "sess-";
const SESSION_ID_LEN: usize = 8;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identifier for one visit, e.g. `sess-k3j9x0ab`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
	/// Generates a fresh identifier from eight random base-36 characters.
	#[must_use]
	pub fn generate() -> Self {
		let suffix: String = (0..SESSION_ID_LEN)
			.map(|_| BASE36[fastrand::usize(..BASE36.len())] as char)
			.collect();
		Self(format!("{SESSION_ID_PREFIX}{suffix}"))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for SessionId {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Metadata for the current visit, created by `init`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionMeta {
	pub session_id: SessionId,
	pub user_agent: String,
	pub language: String,
	pub timezone: String,
	pub api_key: String,
	pub app: String,
	/// Route template of the current view. Last write wins.
	pub normalized_path: Option<String>,
	/// Raw path of the last observed navigation.
	pub current_path: String,
}

impl SessionMeta {
	/// Copies the fields that are merged into every buffered event.
	pub fn stamp(&self) -> SessionStamp {
		SessionStamp {
			session_id: self.session_id.clone(),
			user_agent: self.user_agent.clone(),
			language: self.language.clone(),
			timezone: self.timezone.clone(),
			api_key: self.api_key.clone(),
			app: self.app.clone(),
		}
	}
}

/// Session fields carried by each event on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStamp {
	pub session_id: SessionId,
	pub user_agent: String,
	pub language: String,
	pub timezone: String,
	pub api_key: String,
	pub app: String,
}

/// Lifecycle of a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
	/// Initialized, waiting for the first route observation.
	#[default]
	Uninitialized,
	/// At least one page view recorded.
	Active,
	/// Unloaded. Terminal until the next `init`.
	Ended,
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SessionState::Uninitialized => write!(f, "uninitialized"),
			SessionState::Active => write!(f, "active"),
			SessionState::Ended => write!(f, "ended"),
		}
	}
}

impl FromStr for SessionState {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"uninitialized" => Ok(SessionState::Uninitialized),
			"active" => Ok(SessionState::Active),
			"ended" => Ok(SessionState::Ended),
			_ => Err(CoreError::InvalidSessionState(s.to_string())),
		}
	}
}
