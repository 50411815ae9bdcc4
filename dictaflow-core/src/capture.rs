use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::host::HostPage;
use crate::text::normalize;
use crate::utils::duration_ms;

pub const DEFAULT_CAPTURE_INTERVAL_MS: u64 = 80;
pub const DEFAULT_CAPTURE_STABLE_MS: u64 = 520;
pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 9_000;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureReason {
    Stable,
    Timeout,
    TimeoutWithoutChange,
    Canceled,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub text: String,
    pub reason: CaptureReason,
    pub elapsed_ms: u64,
}

impl CaptureResult {
    fn new(text: String, reason: CaptureReason, started: Instant) -> Self {
        Self {
            text,
            reason,
            elapsed_ms: duration_ms(started.elapsed()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    pub interval: Duration,
    pub stable_for: Duration,
    pub timeout: Duration,
    pub require_change: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_CAPTURE_INTERVAL_MS),
            stable_for: Duration::from_millis(DEFAULT_CAPTURE_STABLE_MS),
            timeout: Duration::from_millis(DEFAULT_CAPTURE_TIMEOUT_MS),
            require_change: true,
        }
    }
}

/// Monotonic capture token shared by every waiter of a session.
///
/// Only the waiter holding the latest value may finish with a non-canceled
/// result. Older waiters notice on their next poll.
#[derive(Debug, Clone, Default)]
pub struct CaptureTokens {
    current: Arc<AtomicU64>,
}

impl CaptureTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token, superseding every earlier one.
    pub fn begin(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Supersedes any waiter still running. Safe to call at any time.
    pub fn invalidate(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.current.load(Ordering::SeqCst) == token
    }
}

/// Reads and normalizes the composer. `None` when the host read failed; a
/// missing composer samples as empty text.
pub(crate) async fn sample_composer<H: HostPage + ?Sized>(host: &H) -> Option<String> {
    match host.read_composer_text().await {
        Ok(text) => Some(normalize(text.as_deref())),
        Err(err) => {
            warn!("failed to read composer text: {err}");
            None
        }
    }
}

pub(crate) async fn read_normalized<H: HostPage + ?Sized>(host: &H) -> String {
    sample_composer(host).await.unwrap_or_default()
}

/// Waits until the composer has moved away from `old_text` and then held a
/// new value for `stable_for`, or until `timeout` passes.
///
/// Starting a capture supersedes every capture still in flight on the same
/// `tokens`. The token check runs first on every poll, so a superseded
/// waiter returns `Canceled` within one interval.
pub async fn capture_stable_text_after_change<H: HostPage + ?Sized>(
    host: &H,
    tokens: &CaptureTokens,
    old_text: &str,
    options: &CaptureOptions,
) -> CaptureResult {
    let token = tokens.begin();
    capture_with_token(host, tokens, token, old_text, options).await
}

/// Same wait as [`capture_stable_text_after_change`] under a token the
/// caller already issued, so a whole submit cycle can own one token.
pub async fn capture_with_token<H: HostPage + ?Sized>(
    host: &H,
    tokens: &CaptureTokens,
    token: u64,
    old_text: &str,
    options: &CaptureOptions,
) -> CaptureResult {
    let old = normalize(Some(old_text));
    let started = Instant::now();

    let mut latest = read_normalized(host).await;
    let mut last = latest.clone();
    let mut stable_start = Instant::now();
    let mut saw_change = !options.require_change;

    loop {
        if !tokens.is_current(token) {
            let text = read_normalized(host).await;
            debug!(token, "capture superseded by a newer cycle");
            return CaptureResult::new(text, CaptureReason::Canceled, started);
        }

        let sample = sample_composer(host).await;
        let now = Instant::now();

        // A failed read is no sample at all, never a divergence.
        if let Some(current) = sample {
            // Stability only counts from the first divergence; the pre-change
            // text must never be reported as the settled result.
            if !saw_change && current != old {
                saw_change = true;
                last = current.clone();
                stable_start = now;
                debug!(token, "composer diverged from previous text");
            }

            if saw_change && current != last {
                last = current.clone();
                stable_start = now;
            }
            latest = current;

            if saw_change && now.duration_since(stable_start) >= options.stable_for {
                info!(
                    token,
                    elapsed_ms = duration_ms(now.duration_since(started)),
                    "captured stable composer text"
                );
                return CaptureResult::new(latest, CaptureReason::Stable, started);
            }
        }

        if now.duration_since(started) >= options.timeout {
            let reason = if saw_change {
                CaptureReason::Timeout
            } else {
                CaptureReason::TimeoutWithoutChange
            };
            warn!(token, ?reason, "capture timed out");
            return CaptureResult::new(latest, reason, started);
        }

        sleep(options.interval).await;
    }
}
