// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Real-user monitoring SDK for Watchlog.
//!
//! This crate collects behavioral telemetry from a running application
//! (session lifecycle, page views, errors, custom metrics, interactions and
//! page timings), batches it, and ships each batch to a collection endpoint
//! as a single JSON POST.
//!
//! # Features
//!
//! - **One page view per navigation**: repeated route observations for the
//!   same route template are collapsed
//! - **Error burst suppression**: identical error signatures are dropped for
//!   3 seconds after the first one
//! - **Batching**: events flush every `flushInterval`, when 10 are buffered,
//!   on custom metrics, and on unload
//! - **Delivery on exit**: unload flushes through a beacon-style send or a
//!   blocking POST
//! - **Fire-and-forget**: no retries, no acknowledgement, and no telemetry
//!   failure ever reaches the host application
//!
//! # Example
//!
//! ```ignore
//! use watchlog_rum::{Route, Rum, RumConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rum = Rum::builder().build()?;
//!     rum.init(RumConfig::new("api_key", "https://collect.example.com/rum", "shop"))?;
//!
//!     rum.observe_route(Route::new("/users/42", "/users/:id"));
//!     rum.custom("latency_ms", 120.0);
//!
//!     rum.unload();
//!     Ok(())
//! }
//! ```

mod buffer;
mod client;
mod collectors;
mod config;
mod environment;
mod error;
mod hooks;
mod scheduler;
mod session;
mod transport;

pub use buffer::EventBuffer;
pub use client::{Rum, RumBuilder};
pub use collectors::{PerformanceSource, RouteResolver};
pub use config::{RumConfig, DEFAULT_FLUSH_INTERVAL, FLUSH_THRESHOLD};
pub use environment::{Clock, Environment, EnvironmentFacts, SystemClock, SystemEnvironment};
pub use error::{Result, RumError};
pub use session::SessionTracker;
pub use transport::{Delivery, Dispatcher, HttpTransport, Transport, DEFAULT_REQUEST_TIMEOUT};

// Re-export core types for convenience
pub use watchlog_rum_core::{
	normalize_path, BufferedEvent, ErrorKind, Event, EventType, PerformanceMetrics, Route,
	SessionId, SessionState,
};
