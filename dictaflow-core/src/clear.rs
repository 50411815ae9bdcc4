//! Composer clearing with retry and dwell verification.
//!
//! The host framework may restore its own editor state some milliseconds
//! after a raw DOM overwrite. A clear only counts once the composer has
//! stayed blank for `verify_for`; otherwise the next attempt starts over.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::host::HostPage;
use crate::text::is_blank_text;

pub const DEFAULT_CLEAR_ATTEMPTS: u32 = 4;
pub const DEFAULT_CLEAR_ATTEMPT_TIMEOUT_MS: u64 = 1_800;
pub const DEFAULT_CLEAR_VERIFY_MS: u64 = 320;
pub const DEFAULT_CLEAR_POLL_MS: u64 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    /// Blank held for the dwell window during this 1-based attempt.
    ClearedAttempt(u32),
    ClearTimeout,
    NoComposer,
}

impl fmt::Display for ClearReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClearedAttempt(attempt) => write!(f, "cleared-attempt-{attempt}"),
            Self::ClearTimeout => f.write_str("clear-timeout"),
            Self::NoComposer => f.write_str("no-composer"),
        }
    }
}

impl Serialize for ClearReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ClearResult {
    pub ok: bool,
    pub reason: ClearReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearOptions {
    pub attempts: u32,
    pub timeout_per_attempt: Duration,
    pub verify_for: Duration,
    pub poll_interval: Duration,
}

impl Default for ClearOptions {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_CLEAR_ATTEMPTS,
            timeout_per_attempt: Duration::from_millis(DEFAULT_CLEAR_ATTEMPT_TIMEOUT_MS),
            verify_for: Duration::from_millis(DEFAULT_CLEAR_VERIFY_MS),
            poll_interval: Duration::from_millis(DEFAULT_CLEAR_POLL_MS),
        }
    }
}

pub async fn clear_composer_robust<H: HostPage + ?Sized>(
    host: &H,
    options: &ClearOptions,
) -> ClearResult {
    match host.read_composer_text().await {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!("no composer to clear");
            return ClearResult {
                ok: false,
                reason: ClearReason::NoComposer,
            };
        }
        Err(err) => {
            warn!("failed to locate composer before clearing: {err}");
            return ClearResult {
                ok: false,
                reason: ClearReason::NoComposer,
            };
        }
    }

    for attempt in 1..=options.attempts {
        issue_clear_commands(host, attempt).await;

        let deadline = Instant::now() + options.timeout_per_attempt;
        if holds_blank_until(host, options, deadline).await {
            info!(attempt, "composer cleared");
            return ClearResult {
                ok: true,
                reason: ClearReason::ClearedAttempt(attempt),
            };
        }
        debug!(attempt, "composer did not stay blank; retrying");
    }

    // The last attempt may have reached blank without finishing its dwell.
    let ok = match host.read_composer_text().await {
        Ok(text) => is_blank_text(text.as_deref()),
        Err(err) => {
            warn!("failed to read composer after clear attempts: {err}");
            false
        }
    };
    warn!(ok, attempts = options.attempts, "composer clear timed out");
    ClearResult {
        ok,
        reason: ClearReason::ClearTimeout,
    }
}

async fn issue_clear_commands<H: HostPage + ?Sized>(host: &H, attempt: u32) {
    if let Err(err) = host.focus_composer().await {
        warn!(attempt, "failed to focus composer: {err}");
    }
    if let Err(err) = host.select_all_and_delete().await {
        warn!(attempt, "select-all/delete failed: {err}");
    }
    // Overwrite regardless; the command pair can leave empty-but-nonzero markup.
    if let Err(err) = host.reset_composer().await {
        warn!(attempt, "failed to reset composer content: {err}");
    }
    if let Err(err) = host.dispatch_input_events().await {
        warn!(attempt, "failed to dispatch input events: {err}");
    }
}

async fn holds_blank_until<H: HostPage + ?Sized>(
    host: &H,
    options: &ClearOptions,
    deadline: Instant,
) -> bool {
    let mut blank_since: Option<Instant> = None;

    loop {
        let now = Instant::now();
        let blank = match host.read_composer_text().await {
            Ok(text) => is_blank_text(text.as_deref()),
            Err(err) => {
                debug!("composer read failed during clear verification: {err}");
                false
            }
        };

        if !blank {
            blank_since = None;
        } else if blank_since.is_none() {
            blank_since = Some(now);
        }

        if blank_since.is_some_and(|since| now.duration_since(since) >= options.verify_for) {
            return true;
        }
        if now >= deadline {
            return false;
        }

        sleep(options.poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;

    #[tokio::test(start_paused = true)]
    async fn clears_on_first_attempt() {
        let host = FakeHost::new("dictated text");

        let result = clear_composer_robust(&host, &ClearOptions::default()).await;

        assert_eq!(
            result,
            ClearResult {
                ok: true,
                reason: ClearReason::ClearedAttempt(1)
            }
        );
        assert_eq!(host.resets(), 1);
        assert_eq!(host.input_events(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn converges_after_host_refills() {
        let host = FakeHost::new("dictated text");
        host.refill_after_resets(&["dictated text", "dictated text"], 100);

        let result = clear_composer_robust(&host, &ClearOptions::default()).await;

        assert!(result.ok);
        assert_eq!(result.reason, ClearReason::ClearedAttempt(3));
        assert_eq!(host.resets(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn refill_on_every_attempt_times_out() {
        let host = FakeHost::new("dictated text");
        host.refill_after_resets(&["x"; 4], 100);

        let result = clear_composer_robust(&host, &ClearOptions::default()).await;

        assert_eq!(
            result,
            ClearResult {
                ok: false,
                reason: ClearReason::ClearTimeout
            }
        );
        assert_eq!(host.resets(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn never_empty_composer_times_out() {
        let host = FakeHost::new("stuck text");
        host.make_sticky();

        let result = clear_composer_robust(&host, &ClearOptions::default()).await;

        assert!(!result.ok);
        assert_eq!(result.reason, ClearReason::ClearTimeout);
        assert_eq!(host.resets(), DEFAULT_CLEAR_ATTEMPTS as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn late_blank_counts_after_exhaustion() {
        let host = FakeHost::new("stuck text");
        host.make_sticky();
        let last_deadline = DEFAULT_CLEAR_ATTEMPTS as u64 * DEFAULT_CLEAR_ATTEMPT_TIMEOUT_MS;
        host.schedule_text(last_deadline - 100, "\n");

        let result = clear_composer_robust(&host, &ClearOptions::default()).await;

        assert_eq!(
            result,
            ClearResult {
                ok: true,
                reason: ClearReason::ClearTimeout
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_composer_fails_fast() {
        let host = FakeHost::without_composer();

        let result = clear_composer_robust(&host, &ClearOptions::default()).await;

        assert_eq!(
            result,
            ClearResult {
                ok: false,
                reason: ClearReason::NoComposer
            }
        );
        assert_eq!(host.resets(), 0);
    }

    #[test]
    fn reasons_serialize_as_protocol_strings() {
        let cleared = serde_json::to_value(ClearResult {
            ok: true,
            reason: ClearReason::ClearedAttempt(2),
        })
        .unwrap();
        assert_eq!(cleared["reason"], "cleared-attempt-2");
        assert_eq!(ClearReason::ClearTimeout.to_string(), "clear-timeout");
        assert_eq!(ClearReason::NoComposer.to_string(), "no-composer");
    }
}
