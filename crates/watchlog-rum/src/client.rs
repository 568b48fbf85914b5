// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The RUM engine and its public facade.

use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, info, warn};
use watchlog_rum_core::{
	BufferedEvent, DedupWindow, ErrorKind, Event, EventType, PerformanceMetrics, Route, SessionId,
	SessionMeta, SessionState,
};

use crate::buffer::EventBuffer;
use crate::collectors::{PerformanceSource, RouteResolver};
use crate::config::{RumConfig, FLUSH_THRESHOLD};
use crate::environment::{Clock, Environment, SystemClock, SystemEnvironment};
use crate::error::Result;
use crate::hooks;
use crate::scheduler::FlushTimer;
use crate::transport::{Delivery, Dispatcher, HttpTransport, Transport};

/// Builder for constructing a [`Rum`] engine.
pub struct RumBuilder {
	transport: Option<Arc<dyn Transport>>,
	clock: Arc<dyn Clock>,
	environment: Arc<dyn Environment>,
	route_resolver: Option<Arc<dyn RouteResolver>>,
	performance_source: Option<Arc<dyn PerformanceSource>>,
	capture_panics: bool,
	unload_on_ctrl_c: bool,
	flush_threshold: usize,
}

impl RumBuilder {
	/// Creates a new builder with default settings.
	pub fn new() -> Self {
		Self {
			transport: None,
			clock: Arc::new(SystemClock),
			environment: Arc::new(SystemEnvironment),
			route_resolver: None,
			performance_source: None,
			capture_panics: true,
			unload_on_ctrl_c: false,
			flush_threshold: FLUSH_THRESHOLD,
		}
	}

	/// Sets the transport. Defaults to [`HttpTransport`].
	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;
		self
	}

	pub fn environment(mut self, environment: Arc<dyn Environment>) -> Self {
		self.environment = environment;
		self
	}

	/// Sets the resolver consulted by [`Rum::navigate`].
	pub fn route_resolver(mut self, resolver: impl RouteResolver + 'static) -> Self {
		self.route_resolver = Some(Arc::new(resolver));
		self
	}

	/// Sets the source of page timings captured with every page view.
	pub fn performance_source(mut self, source: impl PerformanceSource + 'static) -> Self {
		self.performance_source = Some(Arc::new(source));
		self
	}

	/// Reports panics as `error` events. Enabled by default.
	pub fn capture_panics(mut self, enabled: bool) -> Self {
		self.capture_panics = enabled;
		self
	}

	/// Ends the session and exits the process on Ctrl-C. Disabled by default.
	///
	/// Installing the listener replaces the default SIGINT behaviour, so only
	/// enable it in applications that have no Ctrl-C handling of their own.
	pub fn unload_on_ctrl_c(mut self, enabled: bool) -> Self {
		self.unload_on_ctrl_c = enabled;
		self
	}

	/// Buffer length that triggers an immediate flush. Defaults to 10.
	pub fn flush_threshold(mut self, threshold: usize) -> Self {
		self.flush_threshold = threshold.max(1);
		self
	}

	/// Builds the engine. It stays inert until [`Rum::init`] succeeds.
	pub fn build(self) -> Result<Rum> {
		let transport = match self.transport {
			Some(transport) => transport,
			None => Arc::new(HttpTransport::new()?),
		};

		let inner = Arc::new(RumInner {
			dispatcher: Dispatcher::new(transport),
			clock: self.clock,
			environment: self.environment,
			route_resolver: self.route_resolver,
			performance_source: self.performance_source,
			capture_panics: self.capture_panics,
			unload_on_ctrl_c: self.unload_on_ctrl_c,
			state: Mutex::new(EngineState::new(self.flush_threshold)),
			timer_ticks: AtomicU64::new(0),
		});

		Ok(Rum { inner })
	}
}

impl Default for RumBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Settings captured from a successful `init`.
#[derive(Debug, Clone)]
struct Settings {
	endpoint: String,
	debug: bool,
}

/// Everything `init`, the hooks, the timer and the facade mutate.
struct EngineState {
	settings: Option<Settings>,
	meta: Option<SessionMeta>,
	/// Normalized path set before the first `init`.
	pending_normalized_path: Option<String>,
	buffer: EventBuffer,
	dedup: DedupWindow,
	tracker: crate::session::SessionTracker,
	timer: Option<FlushTimer>,
	hooks_installed: bool,
}

impl EngineState {
	fn new(flush_threshold: usize) -> Self {
		Self {
			settings: None,
			meta: None,
			pending_normalized_path: None,
			buffer: EventBuffer::new(flush_threshold),
			dedup: DedupWindow::default(),
			tracker: crate::session::SessionTracker::new(),
			timer: None,
			hooks_installed: false,
		}
	}

	fn debug(&self) -> bool {
		self.settings.as_ref().is_some_and(|s| s.debug)
	}

	/// Stamps and appends `event`, applying the error dedup window.
	///
	/// `now` is the wire timestamp; `instant` drives the dedup window.
	/// Returns `true` when the buffer reached its flush threshold. Does
	/// nothing while the engine is inert.
	fn append(
		&mut self,
		event: Event,
		now: chrono::DateTime<chrono::Utc>,
		instant: Instant,
	) -> bool {
		let debug = self.debug();
		let Some(meta) = self.meta.as_ref() else {
			return false;
		};

		if let Some(signature) = event.signature() {
			if !self.dedup.admit(&signature, instant) {
				return false;
			}
		}

		let stamped = BufferedEvent::stamp(meta, event, now);
		if debug {
			debug!(
				event_type = %stamped.event_type(),
				path = %stamped.path(),
				normalized_path = %stamped.normalized_path(),
				"Buffered event"
			);
		}
		self.buffer.push(stamped)
	}
}

thread_local! {
	/// Set while this thread holds an engine lock.
	static HOLDING_ENGINE_LOCK: Cell<bool> = const { Cell::new(false) };
}

/// Engine lock guard that marks the owning thread, so a panic raised under
/// the lock can be told apart from one on a thread merely waiting for it.
struct EngineGuard<'a> {
	guard: MutexGuard<'a, EngineState>,
	was_holding: bool,
}

impl<'a> EngineGuard<'a> {
	fn new(guard: MutexGuard<'a, EngineState>) -> Self {
		let was_holding = HOLDING_ENGINE_LOCK.with(|flag| flag.replace(true));
		Self { guard, was_holding }
	}
}

impl Deref for EngineGuard<'_> {
	type Target = EngineState;

	fn deref(&self) -> &EngineState {
		&self.guard
	}
}

impl DerefMut for EngineGuard<'_> {
	fn deref_mut(&mut self) -> &mut EngineState {
		&mut self.guard
	}
}

impl Drop for EngineGuard<'_> {
	fn drop(&mut self) {
		HOLDING_ENGINE_LOCK.with(|flag| flag.set(self.was_holding));
	}
}

/// Shared engine behind every [`Rum`] clone and the process hooks.
pub(crate) struct RumInner {
	dispatcher: Dispatcher,
	clock: Arc<dyn Clock>,
	environment: Arc<dyn Environment>,
	route_resolver: Option<Arc<dyn RouteResolver>>,
	performance_source: Option<Arc<dyn PerformanceSource>>,
	capture_panics: bool,
	unload_on_ctrl_c: bool,
	state: Mutex<EngineState>,
	timer_ticks: AtomicU64,
}

impl RumInner {
	fn lock(&self) -> EngineGuard<'_> {
		EngineGuard::new(self.state.lock().unwrap_or_else(PoisonError::into_inner))
	}

	fn init(self: &Arc<Self>, config: RumConfig) -> Result<()> {
		if let Err(e) = config.validate() {
			warn!(error = %e, "apiKey, endpoint, and app are required; RUM stays inactive");
			return Err(e);
		}

		let facts = self.environment.facts();
		let flush_interval = config.flush_interval();

		let mut guard = self.lock();
		let state = &mut *guard;

		let previous = state.meta.take();
		let normalized_path = previous
			.as_ref()
			.and_then(|m| m.normalized_path.clone())
			.or_else(|| state.pending_normalized_path.take());
		let current_path = previous
			.map(|m| m.current_path)
			.unwrap_or_else(|| "/".to_string());

		let session_id = SessionId::generate();
		state.meta = Some(SessionMeta {
			session_id: session_id.clone(),
			user_agent: facts.user_agent,
			language: facts.language,
			timezone: facts.timezone,
			api_key: config.api_key,
			app: config.app.clone(),
			normalized_path,
			current_path,
		});
		state.settings = Some(Settings {
			endpoint: config.endpoint,
			debug: config.debug,
		});
		state.tracker.reset();

		drop(state.timer.take());
		let weak = Arc::downgrade(self);
		state.timer = FlushTimer::start(flush_interval, move || match weak.upgrade() {
			Some(inner) => {
				inner.timer_ticks.fetch_add(1, Ordering::SeqCst);
				inner.flush_with(Delivery::Async);
				true
			}
			None => false,
		});

		let install_hooks = !state.hooks_installed;
		state.hooks_installed = true;
		drop(guard);

		if install_hooks {
			self.install_hooks();
		}

		info!(
			session_id = %session_id,
			app = %config.app,
			flush_interval_ms = flush_interval.as_millis() as u64,
			"RUM initialized"
		);
		Ok(())
	}

	fn install_hooks(self: &Arc<Self>) {
		if self.capture_panics {
			hooks::install_panic_hook(Arc::downgrade(self));
		}
		if self.unload_on_ctrl_c && !hooks::spawn_ctrl_c_listener(Arc::downgrade(self)) {
			warn!("No Tokio runtime available; Ctrl-C unload listener not installed");
		}
	}

	fn buffer_event(&self, event: Event) {
		let (now, instant) = (self.clock.now(), self.clock.instant());
		let should_flush = {
			let mut state = self.lock();
			if state.tracker.state() == SessionState::Ended {
				return;
			}
			state.append(event, now, instant)
		};

		if should_flush {
			self.flush_with(Delivery::Async);
		}
	}

	fn set_normalized_path(&self, path: String) {
		let mut state = self.lock();
		match state.meta.as_mut() {
			Some(meta) => meta.normalized_path = Some(path),
			None => state.pending_normalized_path = Some(path),
		}
	}

	fn observe_route(&self, route: Route) {
		let (now, instant) = (self.clock.now(), self.clock.instant());
		let (should_flush, page_viewed) = {
			let mut guard = self.lock();
			let state = &mut *guard;
			let Some(meta) = state.meta.as_mut() else {
				return;
			};
			meta.current_path = route.path.clone();
			meta.normalized_path = Some(route.normalized_path.clone());

			let events = state.tracker.observe(&route, instant);
			let page_viewed = events.iter().any(|e| e.event_type == EventType::PageView);

			let mut should_flush = false;
			for event in events {
				should_flush |= state.append(event, now, instant);
			}
			(should_flush, page_viewed)
		};

		if page_viewed {
			self.capture_performance(&route);
		}
		if should_flush {
			self.flush_with(Delivery::Async);
		}
	}

	fn capture_performance(&self, route: &Route) {
		let Some(source) = self.performance_source.as_ref() else {
			return;
		};
		if let Some(metrics) = source.capture() {
			self.buffer_event(
				Event::performance(metrics)
					.with_path(route.path.clone())
					.with_normalized_path(route.normalized_path.clone()),
			);
		}
	}

	/// Drains the buffer and hands the batch to the dispatcher.
	fn flush_with(&self, delivery: Delivery) -> Option<Delivery> {
		let (endpoint, debug, batch) = {
			let mut guard = self.lock();
			let state = &mut *guard;
			let settings = state.settings.as_ref()?;
			if state.buffer.is_empty() {
				return None;
			}
			(settings.endpoint.clone(), settings.debug, state.buffer.drain())
		};

		self.dispatcher.dispatch(&endpoint, batch, delivery, debug)
	}

	fn end_session(&self, delivery: Delivery) -> Option<Delivery> {
		let (now, instant) = (self.clock.now(), self.clock.instant());
		{
			let mut state = self.lock();
			state.meta.as_ref()?;
			let end = state.tracker.end(instant)?;
			state.append(end, now, instant);
		}

		let sent = self.flush_with(delivery);

		let timer = self.lock().timer.take();
		drop(timer);

		info!("RUM session ended");
		sent
	}

	fn unload(&self) -> Option<Delivery> {
		self.end_session(self.dispatcher.select(true))
	}

	/// Unload variant for process exit, where a detached beacon thread would
	/// be killed before it finishes.
	pub(crate) fn unload_for_exit(&self) {
		self.end_session(Delivery::Blocking);
	}

	/// Reports a panic from the panic hook.
	///
	/// A panic raised while this thread holds an engine lock is skipped, since
	/// taking the lock again would deadlock. Panics on any other thread wait
	/// for the lock.
	pub(crate) fn report_panic(&self, message: String, location: Option<String>) {
		if HOLDING_ENGINE_LOCK.with(Cell::get) {
			return;
		}

		let (now, instant) = (self.clock.now(), self.clock.instant());
		{
			let mut state = self.lock();
			if state.tracker.state() == SessionState::Ended {
				return;
			}
			let event = Event::error(ErrorKind::Panic, message);
			let event = match location {
				Some(location) => event.with_stack(location),
				None => event,
			};
			state.append(event, now, instant);
		}

		self.flush_with(Delivery::Blocking);
	}
}

/// Client for collecting real-user monitoring events.
///
/// # Example
///
/// ```ignore
/// use watchlog_rum::{Route, Rum, RumConfig};
///
/// let rum = Rum::builder().build()?;
/// rum.init(RumConfig::new("api_key", "https://collect.example.com/rum", "shop"))?;
///
/// // From the route observer on every navigation
/// rum.observe_route(Route::new("/users/42", "/users/:id"));
///
/// // From error hooks and UI code
/// rum.capture_error("TypeError: x is undefined", None);
/// rum.interaction("checkout-button");
/// rum.custom("latency_ms", 120.0);
///
/// // When the host is going away
/// rum.unload();
/// ```
#[derive(Clone)]
pub struct Rum {
	inner: Arc<RumInner>,
}

impl Rum {
	/// Creates a new builder for constructing a Rum engine.
	pub fn builder() -> RumBuilder {
		RumBuilder::new()
	}

	/// Starts a session with `config`.
	///
	/// Missing `api_key`, `endpoint` or `app` logs a warning and leaves the
	/// engine untouched; an engine that was never initialized ignores every
	/// call. Calling `init` again starts a new session and replaces the
	/// flush timer.
	pub fn init(&self, config: RumConfig) -> Result<()> {
		self.inner.init(config)
	}

	/// Overwrites the normalized path stamped on subsequent events.
	pub fn set_normalized_path(&self, path: impl Into<String>) {
		self.inner.set_normalized_path(path.into());
	}

	/// Buffers an arbitrary event.
	///
	/// Errors are subject to the 3 second signature dedup window. Reaching
	/// the flush threshold triggers an asynchronous flush.
	pub fn buffer_event(&self, event: Event) {
		self.inner.buffer_event(event);
	}

	/// Records a custom metric and flushes immediately.
	pub fn custom(&self, metric: &str, value: f64) {
		self.inner.buffer_event(Event::custom(metric, value));
		self.inner.flush_with(Delivery::Async);
	}

	/// Records a custom metric with value 1.
	pub fn increment(&self, metric: &str) {
		self.custom(metric, 1.0);
	}

	/// Records a custom metric whose name arrives untyped, e.g. from JSON.
	/// Non-string names are dropped silently.
	pub fn custom_json(&self, metric: &serde_json::Value, value: f64) {
		if let Some(metric) = metric.as_str() {
			self.custom(metric, value);
		}
	}

	/// Flushes buffered events.
	///
	/// `sync = false` sends in the background; `sync = true` uses the
	/// unload path (beacon when available, blocking POST otherwise).
	/// Returns the primitive used, or `None` if nothing was sent.
	pub fn flush(&self, sync: bool) -> Option<Delivery> {
		let delivery = if sync {
			self.inner.dispatcher.select(true)
		} else {
			Delivery::Async
		};
		self.inner.flush_with(delivery)
	}

	/// Feeds a route observation into the session tracker.
	pub fn observe_route(&self, route: Route) {
		self.inner.observe_route(route);
	}

	/// Observes the route reported by the configured [`RouteResolver`].
	pub fn navigate(&self) {
		let route = self
			.inner
			.route_resolver
			.as_ref()
			.and_then(|resolver| resolver.resolve());
		if let Some(route) = route {
			self.inner.observe_route(route);
		}
	}

	/// Reports an uncaught error.
	pub fn capture_error(&self, label: impl Into<String>, stack: Option<String>) {
		let event = Event::error(ErrorKind::WindowError, label);
		let event = match stack {
			Some(stack) => event.with_stack(stack),
			None => event,
		};
		self.inner.buffer_event(event);
	}

	/// Reports a rejection or failure nobody handled.
	pub fn capture_rejection(&self, reason: impl Into<String>) {
		self.inner
			.buffer_event(Event::error(ErrorKind::UnhandledPromise, reason));
	}

	/// Records an interaction with an element carrying a tracking label.
	pub fn interaction(&self, label: impl Into<String>) {
		self.inner.buffer_event(Event::interaction(label));
	}

	/// Records page load timings for the current view.
	pub fn performance(&self, metrics: PerformanceMetrics) {
		self.inner.buffer_event(Event::performance(metrics));
	}

	/// Ends the session: emits `session_end`, flushes synchronously and stops
	/// the flush timer. Later events are ignored until the next `init`.
	pub fn unload(&self) -> Option<Delivery> {
		self.inner.unload()
	}

	/// Returns the current session ID, if initialized.
	pub fn session_id(&self) -> Option<SessionId> {
		self.inner
			.lock()
			.meta
			.as_ref()
			.map(|m| m.session_id.clone())
	}

	pub fn state(&self) -> SessionState {
		self.inner.lock().tracker.state()
	}

	pub fn is_initialized(&self) -> bool {
		self.inner.lock().meta.is_some()
	}

	/// Number of events waiting for the next flush.
	pub fn buffered_len(&self) -> usize {
		self.inner.lock().buffer.len()
	}

	/// Number of periodic timer ticks since the engine was built.
	#[cfg(test)]
	fn timer_ticks(&self) -> u64 {
		self.inner.timer_ticks.load(Ordering::SeqCst)
	}
}
