// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the RUM SDK.

use thiserror::Error;

/// RUM SDK errors.
///
/// None of these ever reach the host application through a panic. They are
/// returned from `init` and from [`Transport`](crate::Transport)
/// implementations, and the dispatcher swallows the latter after logging.
#[derive(Debug, Error)]
pub enum RumError {
	/// `apiKey` is missing or empty.
	#[error("apiKey is required")]
	MissingApiKey,

	/// `endpoint` is missing or empty.
	#[error("endpoint is required")]
	MissingEndpoint,

	/// `app` is missing or empty.
	#[error("app is required")]
	MissingApp,

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Batch could not be serialized.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// The transport has no beacon-style send.
	#[error("beacon transport unavailable")]
	BeaconUnavailable,

	/// The send could not be handed to a worker.
	#[error("dispatch failed: {0}")]
	DispatchFailed(String),
}

impl RumError {
	/// Returns true for errors caused by an incomplete configuration.
	pub fn is_config_error(&self) -> bool {
		matches!(
			self,
			RumError::MissingApiKey | RumError::MissingEndpoint | RumError::MissingApp
		)
	}
}

/// Result type alias for RUM operations.
pub type Result<T> = std::result::Result<T, RumError>;
