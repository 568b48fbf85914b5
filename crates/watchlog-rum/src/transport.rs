// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Batch transmission.
//!
//! Every flush is a single POST of a JSON array with no retry and no
//! acknowledgement. [`Dispatcher`] picks the primitive for the situation:
//!
//! | Flush | Transport supports beacon | Primitive |
//! |-------|---------------------------|-----------|
//! | sync  | yes                       | [`Transport::send_beacon`] |
//! | sync  | no                        | [`Transport::send_blocking`] |
//! | async | -                         | [`Transport::send`], spawned and never awaited |

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use watchlog_rum_core::BufferedEvent;

use crate::error::{Result, RumError};

/// Default timeout for a single POST.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const JSON_CONTENT_TYPE: &str = "application/json";

/// Sends serialized batches to the collection endpoint.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
	/// Non-blocking POST used for regular flushes.
	async fn send(&self, endpoint: &str, payload: String) -> Result<()>;

	/// POST that blocks the caller until the request completes.
	fn send_blocking(&self, endpoint: &str, payload: String) -> Result<()>;

	/// Whether [`send_beacon`](Self::send_beacon) is available.
	fn supports_beacon(&self) -> bool {
		false
	}

	/// Hands the payload to a sender that outlives the caller and returns
	/// immediately, without waiting for delivery.
	fn send_beacon(&self, _endpoint: &str, _payload: String) -> Result<()> {
		Err(RumError::BeaconUnavailable)
	}
}

/// HTTP transport built on `reqwest`.
///
/// Beacon sends run the POST on a detached thread, so they neither block the
/// caller nor depend on an async runtime that may be shutting down.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: reqwest::Client,
	timeout: Duration,
	beacon: bool,
}

impl HttpTransport {
	pub fn new() -> Result<Self> {
		Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
	}

	pub fn with_timeout(timeout: Duration) -> Result<Self> {
		let client = watchlog_common_http::builder()
			.timeout(timeout)
			.build()
			.map_err(RumError::RequestFailed)?;

		Ok(Self {
			client,
			timeout,
			beacon: true,
		})
	}

	/// Disables beacon sends so unload flushes use a blocking POST.
	pub fn without_beacon(mut self) -> Self {
		self.beacon = false;
		self
	}
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
	async fn send(&self, endpoint: &str, payload: String) -> Result<()> {
		let response = self
			.client
			.post(endpoint)
			.header(CONTENT_TYPE, JSON_CONTENT_TYPE)
			.body(payload)
			.send()
			.await?;

		debug!(status = response.status().as_u16(), "Batch delivered");
		Ok(())
	}

	fn send_blocking(&self, endpoint: &str, payload: String) -> Result<()> {
		let timeout = self.timeout;

		// reqwest's blocking client must not run on an async worker thread.
		std::thread::scope(|scope| {
			scope
				.spawn(move || post_blocking(endpoint, payload, timeout))
				.join()
		})
		.map_err(|_| RumError::DispatchFailed("blocking sender panicked".to_string()))?
	}

	fn supports_beacon(&self) -> bool {
		self.beacon
	}

	fn send_beacon(&self, endpoint: &str, payload: String) -> Result<()> {
		if !self.beacon {
			return Err(RumError::BeaconUnavailable);
		}

		let endpoint = endpoint.to_string();
		let timeout = self.timeout;
		std::thread::Builder::new()
			.name("watchlog-beacon".to_string())
			.spawn(move || {
				if let Err(e) = post_blocking(&endpoint, payload, timeout) {
					debug!(error = %e, "Beacon send failed");
				}
			})
			.map_err(|e| RumError::DispatchFailed(e.to_string()))?;
		Ok(())
	}
}

fn post_blocking(endpoint: &str, payload: String, timeout: Duration) -> Result<()> {
	let client = watchlog_common_http::blocking_builder()
		.timeout(timeout)
		.build()?;

	let response = client
		.post(endpoint)
		.header(CONTENT_TYPE, JSON_CONTENT_TYPE)
		.body(payload)
		.send()?;

	debug!(status = response.status().as_u16(), "Batch delivered");
	Ok(())
}

/// Primitive chosen for a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
	Beacon,
	Blocking,
	Async,
}

/// Serializes batches and routes them to the right transport primitive.
///
/// Failures never propagate: they are logged when `debug` is set and the
/// batch is dropped.
#[derive(Clone)]
pub struct Dispatcher {
	transport: Arc<dyn Transport>,
}

impl Dispatcher {
	pub fn new(transport: Arc<dyn Transport>) -> Self {
		Self { transport }
	}

	/// Primitive for a regular (`sync = false`) or unload (`sync = true`) flush.
	pub fn select(&self, sync: bool) -> Delivery {
		match (sync, self.transport.supports_beacon()) {
			(true, true) => Delivery::Beacon,
			(true, false) => Delivery::Blocking,
			(false, _) => Delivery::Async,
		}
	}

	/// Sends `batch` to `endpoint` with the given primitive. Returns the
	/// primitive used, or `None` when the batch was empty or could not be
	/// serialized.
	pub fn dispatch(
		&self,
		endpoint: &str,
		batch: Vec<BufferedEvent>,
		delivery: Delivery,
		debug: bool,
	) -> Option<Delivery> {
		if batch.is_empty() {
			return None;
		}

		let count = batch.len();
		let payload = match serde_json::to_string(&batch) {
			Ok(payload) => payload,
			Err(e) => {
				if debug {
					debug!(error = %e, count, "Dropping batch that failed to serialize");
				}
				return None;
			}
		};

		if debug {
			debug!(count, ?delivery, "Flushing event batch");
		}

		let outcome = match delivery {
			Delivery::Beacon => self.transport.send_beacon(endpoint, payload),
			Delivery::Blocking => self.transport.send_blocking(endpoint, payload),
			Delivery::Async => self.spawn_send(endpoint.to_string(), payload, debug),
		};

		if let Err(e) = outcome {
			if debug {
				debug!(error = %e, count, ?delivery, "Flush failed; batch discarded");
			}
		}

		Some(delivery)
	}

	fn spawn_send(&self, endpoint: String, payload: String, debug: bool) -> Result<()> {
		let transport = Arc::clone(&self.transport);

		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				handle.spawn(async move {
					if let Err(e) = transport.send(&endpoint, payload).await {
						if debug {
							debug!(error = %e, "Flush failed; batch discarded");
						}
					}
				});
				Ok(())
			}
			Err(_) => {
				std::thread::Builder::new()
					.name("watchlog-flush".to_string())
					.spawn(move || {
						if let Err(e) = transport.send_blocking(&endpoint, payload) {
							if debug {
								debug!(error = %e, "Flush failed; batch discarded");
							}
						}
					})
					.map_err(|e| RumError::DispatchFailed(e.to_string()))?;
				Ok(())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use std::sync::Mutex;
	use watchlog_rum_core::{Event, SessionId, SessionMeta};
	use wiremock::matchers::{header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	#[derive(Default)]
	struct RecordingTransport {
		beacon: bool,
		fail: bool,
		calls: Mutex<Vec<(Delivery, String)>>,
	}

	#[async_trait::async_trait]
	impl Transport for RecordingTransport {
		async fn send(&self, _endpoint: &str, payload: String) -> Result<()> {
			self.calls.lock().unwrap().push((Delivery::Async, payload));
			Ok(())
		}

		fn send_blocking(&self, _endpoint: &str, payload: String) -> Result<()> {
			self.calls.lock().unwrap().push((Delivery::Blocking, payload));
			if self.fail {
				return Err(RumError::DispatchFailed("mock failure".to_string()));
			}
			Ok(())
		}

		fn supports_beacon(&self) -> bool {
			self.beacon
		}

		fn send_beacon(&self, _endpoint: &str, payload: String) -> Result<()> {
			self.calls.lock().unwrap().push((Delivery::Beacon, payload));
			Ok(())
		}
	}

	fn batch(n: usize) -> Vec<BufferedEvent> {
		let meta = SessionMeta {
			session_id: SessionId::from("sess-aaaaaaaa"),
			user_agent: "ua".to_string(),
			language: "en-US".to_string(),
			timezone: "UTC".to_string(),
			api_key: "key".to_string(),
			app: "app".to_string(),
			normalized_path: None,
			current_path: "/".to_string(),
		};
		(0..n)
			.map(|i| BufferedEvent::stamp(&meta, Event::interaction(format!("e{i}")), Utc::now()))
			.collect()
	}

	#[test]
	fn sync_prefers_beacon() {
		let transport = Arc::new(RecordingTransport {
			beacon: true,
			..Default::default()
		});
		let dispatcher = Dispatcher::new(transport.clone());

		let delivery =
			dispatcher.dispatch("http://collect", batch(2), dispatcher.select(true), false);

		assert_eq!(delivery, Some(Delivery::Beacon));
		assert_eq!(transport.calls.lock().unwrap()[0].0, Delivery::Beacon);
	}

	#[test]
	fn sync_without_beacon_blocks() {
		let transport = Arc::new(RecordingTransport::default());
		let dispatcher = Dispatcher::new(transport.clone());

		let delivery =
			dispatcher.dispatch("http://collect", batch(1), dispatcher.select(true), false);

		assert_eq!(delivery, Some(Delivery::Blocking));
		assert_eq!(transport.calls.lock().unwrap().len(), 1);
	}

	#[test]
	fn empty_batch_is_not_sent() {
		let transport = Arc::new(RecordingTransport::default());
		let dispatcher = Dispatcher::new(transport.clone());

		let delivery = dispatcher.dispatch("http://collect", Vec::new(), Delivery::Blocking, true);
		assert_eq!(delivery, None);
		assert!(transport.calls.lock().unwrap().is_empty());
	}

	#[test]
	fn transport_failure_is_swallowed() {
		let transport = Arc::new(RecordingTransport {
			fail: true,
			..Default::default()
		});
		let dispatcher = Dispatcher::new(transport.clone());

		let delivery = dispatcher.dispatch("http://collect", batch(1), Delivery::Blocking, true);
		assert_eq!(delivery, Some(Delivery::Blocking));
	}

	#[test]
	fn payload_is_ordered_json_array() {
		let transport = Arc::new(RecordingTransport::default());
		let dispatcher = Dispatcher::new(transport.clone());

		dispatcher.dispatch("http://collect", batch(3), Delivery::Blocking, false);

		let calls = transport.calls.lock().unwrap();
		let payload: Vec<serde_json::Value> = serde_json::from_str(&calls[0].1).unwrap();
		let labels: Vec<_> = payload.iter().map(|e| e["label"].clone()).collect();
		assert_eq!(labels, ["e0", "e1", "e2"]);
	}

	#[tokio::test]
	async fn async_send_runs_on_runtime() {
		let transport = Arc::new(RecordingTransport::default());
		let dispatcher = Dispatcher::new(transport.clone());

		let delivery =
			dispatcher.dispatch("http://collect", batch(1), dispatcher.select(false), false);
		assert_eq!(delivery, Some(Delivery::Async));

		for _ in 0..10 {
			if !transport.calls.lock().unwrap().is_empty() {
				break;
			}
			tokio::task::yield_now().await;
		}
		assert_eq!(transport.calls.lock().unwrap()[0].0, Delivery::Async);
	}

	#[tokio::test]
	async fn http_transport_posts_json() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/collect"))
			.and(header("content-type", "application/json"))
			.respond_with(ResponseTemplate::new(202))
			.expect(1)
			.mount(&server)
			.await;

		let transport = HttpTransport::new().unwrap();
		let payload = serde_json::to_string(&batch(2)).unwrap();
		transport
			.send(&format!("{}/collect", server.uri()), payload)
			.await
			.unwrap();

		let requests = server.received_requests().await.unwrap();
		let body: Vec<serde_json::Value> = serde_json::from_slice(&requests[0].body).unwrap();
		assert_eq!(body.len(), 2);
		assert_eq!(body[0]["type"], "interaction");
	}

	#[tokio::test]
	async fn http_transport_ignores_error_status() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(500))
			.mount(&server)
			.await;

		let transport = HttpTransport::new().unwrap();
		let result = transport
			.send(&format!("{}/collect", server.uri()), "[]".to_string())
			.await;
		assert!(result.is_ok());
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn http_transport_blocking_send() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/collect"))
			.respond_with(ResponseTemplate::new(200))
			.expect(1)
			.mount(&server)
			.await;

		let transport = HttpTransport::new().unwrap().without_beacon();
		let endpoint = format!("{}/collect", server.uri());
		let result = tokio::task::spawn_blocking(move || {
			transport.send_blocking(&endpoint, "[]".to_string())
		})
		.await
		.unwrap();
		assert!(result.is_ok());
	}

	#[test]
	fn http_transport_beacon_flag() {
		let transport = HttpTransport::new().unwrap();
		assert!(transport.supports_beacon());
		assert!(!transport.without_beacon().supports_beacon());
	}
}
