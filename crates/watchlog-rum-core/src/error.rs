// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the RUM core.

use thiserror::Error;

/// Errors raised while parsing core types.
#[derive(Debug, Error)]
pub enum CoreError {
	/// Unknown event type string
	#[error("invalid event type: {0}")]
	InvalidEventType(String),

	/// Unknown error kind string
	#[error("invalid error kind: {0}")]
	InvalidErrorKind(String),

	/// Unknown session state string
	#[error("invalid session state: {0}")]
	InvalidSessionState(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
