// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Watchlog real-user monitoring.
//!
//! This crate holds the pure data model shared by the `watchlog-rum` SDK:
//! telemetry events and their wire shape, session metadata and lifecycle
//! states, the error-signature deduplication window, and route template
//! normalization. Nothing in here performs I/O or reads the clock; callers
//! pass timestamps in explicitly.

pub mod dedup;
pub mod error;
pub mod event;
pub mod route;
pub mod session;

pub use dedup::{DedupWindow, DEFAULT_DEDUP_WINDOW};
pub use error::{CoreError, Result};
pub use event::{BufferedEvent, ErrorKind, Event, EventType, PerformanceMetrics};
pub use route::{normalize_path, Route};
pub use session::{SessionId, SessionMeta, SessionStamp, SessionState};
