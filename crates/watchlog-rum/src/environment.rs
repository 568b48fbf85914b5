// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-only access to the current time and static host facts.

use std::time::Instant;

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Wall-clock time only stamps events. Windows and durations are measured
/// with [`Clock::instant`], which never goes backwards.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;

	fn instant(&self) -> Instant;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}

	fn instant(&self) -> Instant {
		Instant::now()
	}
}

/// Static facts about the host, captured once per `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentFacts {
	pub user_agent: String,
	/// BCP 47 language tag, e.g. `en-US`.
	pub language: String,
	/// IANA zone name, e.g. `Europe/Berlin`.
	pub timezone: String,
}

/// Reader for [`EnvironmentFacts`].
pub trait Environment: Send + Sync {
	fn facts(&self) -> EnvironmentFacts;
}

/// Reads facts from the process environment.
///
/// Language comes from `LC_ALL`, `LC_MESSAGES` or `LANG` (first non-empty,
/// POSIX locale names converted to language tags). Timezone comes from `TZ`
/// and defaults to `UTC`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
	fn facts(&self) -> EnvironmentFacts {
		let locale = ["LC_ALL", "LC_MESSAGES", "LANG"]
			.iter()
			.filter_map(|key| std::env::var(key).ok())
			.find(|value| !value.is_empty());

		EnvironmentFacts {
			user_agent: watchlog_common_http::user_agent(),
			language: locale
				.as_deref()
				.map(locale_to_language_tag)
				.unwrap_or_else(|| "en-US".to_string()),
			timezone: std::env::var("TZ")
				.ok()
				.map(|tz| tz.trim_start_matches(':').to_string())
				.filter(|tz| !tz.is_empty())
				.unwrap_or_else(|| "UTC".to_string()),
		}
	}
}

/// `en_US.UTF-8` → `en-US`. `C` and `POSIX` map to `en-US`.
fn locale_to_language_tag(locale: &str) -> String {
	let base = locale
		.split(['.', '@'])
		.next()
		.unwrap_or_default();

	match base {
		"" | "C" | "POSIX" => "en-US".to_string(),
		_ => base.replace('_', "-"),
	}
}

#[cfg(test)]
pub(crate) mod test_support {
	use super::*;
	use std::sync::Mutex;

	use std::time::Duration;

	/// Clock that only moves when told to.
	pub struct ManualClock {
		wall: Mutex<DateTime<Utc>>,
		origin: Instant,
		elapsed: Mutex<Duration>,
	}

	impl ManualClock {
		pub fn new() -> Self {
			Self {
				wall: Mutex::new(DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()),
				origin: Instant::now(),
				elapsed: Mutex::new(Duration::ZERO),
			}
		}

		/// Lets `ms` pass on both the wall clock and the monotonic clock.
		pub fn advance_ms(&self, ms: u64) {
			*self.wall.lock().unwrap() += chrono::Duration::milliseconds(ms as i64);
			*self.elapsed.lock().unwrap() += Duration::from_millis(ms);
		}

		/// Adjusts the wall clock only, like an NTP step.
		pub fn step_wall_ms(&self, ms: i64) {
			*self.wall.lock().unwrap() += chrono::Duration::milliseconds(ms);
		}
	}

	impl Clock for ManualClock {
		fn now(&self) -> DateTime<Utc> {
			*self.wall.lock().unwrap()
		}

		fn instant(&self) -> Instant {
			self.origin + *self.elapsed.lock().unwrap()
		}
	}

	pub struct FixedEnvironment;

	impl Environment for FixedEnvironment {
		fn facts(&self) -> EnvironmentFacts {
			EnvironmentFacts {
				user_agent: "test-agent/1.0".to_string(),
				language: "de-DE".to_string(),
				timezone: "Europe/Berlin".to_string(),
			}
		}
	}
}
