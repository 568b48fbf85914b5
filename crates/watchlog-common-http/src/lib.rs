// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Watchlog.
//!
//! This crate provides pre-configured async and blocking HTTP clients that
//! carry a consistent User-Agent header.

mod client;

pub use client::{blocking_builder, builder, user_agent};
