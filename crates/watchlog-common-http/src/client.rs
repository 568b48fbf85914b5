// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client builders with a consistent User-Agent header.

use reqwest::{Client, ClientBuilder};

/// Creates an async HTTP client builder with the standard Watchlog User-Agent.
///
/// # Example
/// ```ignore
/// let client = watchlog_common_http::builder()
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a blocking HTTP client builder with the standard User-Agent.
///
/// Blocking clients must not be built or dropped on an async runtime thread;
/// callers run them on a dedicated thread.
pub fn blocking_builder() -> reqwest::blocking::ClientBuilder {
	reqwest::blocking::Client::builder().user_agent(user_agent())
}

/// Returns the standard Watchlog User-Agent string.
///
/// Format: `watchlog-rum/{version} ({os}-{arch})`
pub fn user_agent() -> String {
	format!(
		"watchlog-rum/{} ({}-{})",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}
