// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic flush timer.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Handle to a running flush timer. Dropping it cancels the timer.
#[derive(Debug)]
pub struct FlushTimer {
	handle: JoinHandle<()>,
	period: Duration,
}

impl FlushTimer {
	/// Spawns a task that calls `tick` every `period`, first after one full
	/// period. The task stops when `tick` returns `false`.
	///
	/// Returns `None` outside a Tokio runtime; size, unload and explicit
	/// flushes keep working without the timer.
	pub fn start<F>(period: Duration, tick: F) -> Option<Self>
	where
		F: Fn() -> bool + Send + 'static,
	{
		let Ok(runtime) = tokio::runtime::Handle::try_current() else {
			warn!("No Tokio runtime available; periodic flush disabled");
			return None;
		};

		let handle = runtime.spawn(async move {
			let mut interval = tokio::time::interval_at(Instant::now() + period, period);
			interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

			loop {
				interval.tick().await;
				if !tick() {
					break;
				}
			}
			debug!("Flush timer stopped");
		});

		debug!(period_ms = period.as_millis() as u64, "Flush timer started");
		Some(Self { handle, period })
	}

	pub fn period(&self) -> Duration {
		self.period
	}

	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}
}

impl Drop for FlushTimer {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	#[tokio::test(start_paused = true)]
	async fn ticks_at_period() {
		let ticks = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&ticks);
		let timer = FlushTimer::start(Duration::from_millis(1000), move || {
			counter.fetch_add(1, Ordering::SeqCst);
			true
		})
		.unwrap();
		assert_eq!(timer.period(), Duration::from_millis(1000));

		tokio::time::sleep(Duration::from_millis(3500)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 3);
	}

	#[tokio::test(start_paused = true)]
	async fn drop_cancels() {
		let ticks = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&ticks);
		let timer = FlushTimer::start(Duration::from_millis(1000), move || {
			counter.fetch_add(1, Ordering::SeqCst);
			true
		})
		.unwrap();

		tokio::time::sleep(Duration::from_millis(1500)).await;
		drop(timer);
		tokio::time::sleep(Duration::from_millis(5000)).await;
		assert_eq!(ticks.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn stops_when_tick_returns_false() {
		let timer = FlushTimer::start(Duration::from_millis(100), || false).unwrap();
		tokio::time::sleep(Duration::from_millis(250)).await;
		assert!(timer.is_finished());
	}

	#[test]
	fn no_runtime_no_timer() {
		assert!(FlushTimer::start(Duration::from_millis(100), || true).is_none());
	}
}
