// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process-wide hooks that feed the engine: panics and Ctrl-C.
//!
//! Both hold weak references so an engine that has been dropped is never
//! kept alive by a hook, and a dead engine turns the hook into a pass-through.

use std::sync::{Arc, Mutex, Once, PoisonError, Weak};

use tracing::{debug, info};

use crate::client::RumInner;

/// Exit code used after a Ctrl-C triggered unload (128 + SIGINT).
const SIGINT_EXIT_CODE: i32 = 130;

/// Engines that report panics. Dead entries are pruned on registration.
static PANIC_REPORTERS: Mutex<Vec<Weak<RumInner>>> = Mutex::new(Vec::new());
static PANIC_HOOK: Once = Once::new();

/// Registers `inner` to report panics as `error` events.
///
/// The first registration chains a single process-wide hook in front of the
/// previously installed one; later engines only join the registry.
pub(crate) fn install_panic_hook(inner: Weak<RumInner>) {
	{
		let mut reporters = PANIC_REPORTERS
			.lock()
			.unwrap_or_else(PoisonError::into_inner);
		reporters.retain(|reporter| reporter.strong_count() > 0);
		reporters.push(inner);
	}

	PANIC_HOOK.call_once(|| {
		let previous = std::panic::take_hook();

		std::panic::set_hook(Box::new(move |info| {
			let engines = live_reporters();
			if !engines.is_empty() {
				let payload = info.payload();
				let message = payload
					.downcast_ref::<&str>()
					.map(|s| (*s).to_string())
					.or_else(|| payload.downcast_ref::<String>().cloned())
					.unwrap_or_else(|| "panic".to_string());
				let location = info.location().map(|l| l.to_string());

				for inner in engines {
					inner.report_panic(message.clone(), location.clone());
				}
			}

			previous(info);
		}));
	});

	debug!("Panic reporting enabled");
}

fn live_reporters() -> Vec<Arc<RumInner>> {
	PANIC_REPORTERS
		.lock()
		.unwrap_or_else(PoisonError::into_inner)
		.iter()
		.filter_map(Weak::upgrade)
		.collect()
}

#[cfg(test)]
pub(crate) fn registered_panic_reporters() -> usize {
	PANIC_REPORTERS
		.lock()
		.unwrap_or_else(PoisonError::into_inner)
		.len()
}

/// Spawns a task that unloads the engine on Ctrl-C and then exits the
/// process. Returns `false` when no Tokio runtime is running.
pub(crate) fn spawn_ctrl_c_listener(inner: Weak<RumInner>) -> bool {
	let Ok(runtime) = tokio::runtime::Handle::try_current() else {
		return false;
	};

	runtime.spawn(async move {
		if tokio::signal::ctrl_c().await.is_err() {
			return;
		}

		if let Some(inner) = inner.upgrade() {
			info!("Ctrl-C received; ending RUM session");
			inner.unload_for_exit();
		}
		std::process::exit(SIGINT_EXIT_CODE);
	});

	debug!("Ctrl-C unload listener installed");
	true
}
