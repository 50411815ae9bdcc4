use std::collections::VecDeque;

use serde::Serialize;

use crate::capture::CaptureReason;
use crate::utils::now_epoch_ms;

const DEFAULT_WINDOW_SIZE: usize = 256;
const SUBMIT_P95_TARGET_MS: u64 = 12_000;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LatencySummary {
    pub samples: usize,
    pub average_ms: u64,
    pub p95_ms: u64,
    pub max_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub generated_at_ms: u64,
    pub capture: LatencySummary,
    pub clear: LatencySummary,
    pub submit: LatencySummary,
    pub stable_captures: u64,
    pub timed_out_captures: u64,
    pub unchanged_captures: u64,
    pub canceled_captures: u64,
    pub empty_results: u64,
    pub clear_failures: u64,
    pub warnings: Vec<String>,
}

/// Last `limit` latency samples with a running total.
#[derive(Debug)]
struct LatencyWindow {
    samples: VecDeque<u64>,
    limit: usize,
    total: u64,
}

impl LatencyWindow {
    fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            samples: VecDeque::with_capacity(limit),
            limit,
            total: 0,
        }
    }

    fn push(&mut self, elapsed_ms: u64) {
        if self.samples.len() == self.limit {
            if let Some(evicted) = self.samples.pop_front() {
                self.total -= evicted;
            }
        }
        self.samples.push_back(elapsed_ms);
        self.total += elapsed_ms;
    }

    fn summarize(&self) -> LatencySummary {
        let count = self.samples.len();
        if count == 0 {
            return LatencySummary::default();
        }

        let mut ordered: Vec<u64> = self.samples.iter().copied().collect();
        ordered.sort_unstable();

        LatencySummary {
            samples: count,
            average_ms: self.total / count as u64,
            p95_ms: nearest_rank(&ordered, 95),
            max_ms: ordered.last().copied().unwrap_or_default(),
        }
    }
}

/// Nearest-rank percentile over an ascending, non-empty slice.
fn nearest_rank(ordered: &[u64], percentile: usize) -> u64 {
    let rank = (ordered.len() * percentile).div_ceil(100).max(1);
    ordered[rank.min(ordered.len()) - 1]
}

#[derive(Debug)]
pub struct SessionMetrics {
    capture_ms: LatencyWindow,
    clear_ms: LatencyWindow,
    submit_ms: LatencyWindow,
    stable_captures: u64,
    timed_out_captures: u64,
    unchanged_captures: u64,
    canceled_captures: u64,
    empty_results: u64,
    clear_failures: u64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            capture_ms: LatencyWindow::with_limit(DEFAULT_WINDOW_SIZE),
            clear_ms: LatencyWindow::with_limit(DEFAULT_WINDOW_SIZE),
            submit_ms: LatencyWindow::with_limit(DEFAULT_WINDOW_SIZE),
            stable_captures: 0,
            timed_out_captures: 0,
            unchanged_captures: 0,
            canceled_captures: 0,
            empty_results: 0,
            clear_failures: 0,
        }
    }

    pub fn record_capture(&mut self, reason: CaptureReason, elapsed_ms: u64) {
        match reason {
            CaptureReason::Stable => self.stable_captures += 1,
            CaptureReason::Timeout => self.timed_out_captures += 1,
            CaptureReason::TimeoutWithoutChange => self.unchanged_captures += 1,
            CaptureReason::Canceled => {
                self.canceled_captures += 1;
                return;
            }
        }
        self.capture_ms.push(elapsed_ms);
    }

    pub fn record_empty_result(&mut self) {
        self.empty_results += 1;
    }

    pub fn record_clear(&mut self, ok: bool, elapsed_ms: u64) {
        self.clear_ms.push(elapsed_ms);
        if !ok {
            self.clear_failures += 1;
        }
    }

    pub fn record_submit(&mut self, elapsed_ms: u64) {
        self.submit_ms.push(elapsed_ms);
    }

    pub fn report(&self) -> SessionReport {
        let capture = self.capture_ms.summarize();
        let clear = self.clear_ms.summarize();
        let submit = self.submit_ms.summarize();

        let mut warnings = Vec::new();
        if self.clear_failures > 0 {
            warnings.push(format!(
                "Composer clear may not have fully succeeded {} time(s).",
                self.clear_failures
            ));
        }
        if self.unchanged_captures > 0 {
            warnings.push(format!(
                "{} capture(s) saw no transcription change before timing out.",
                self.unchanged_captures
            ));
        }
        if submit.samples > 0 && submit.p95_ms > SUBMIT_P95_TARGET_MS {
            warnings.push(format!(
                "Submit P95 latency {}ms exceeded target {}ms.",
                submit.p95_ms, SUBMIT_P95_TARGET_MS
            ));
        }

        SessionReport {
            generated_at_ms: now_epoch_ms(),
            capture,
            clear,
            submit,
            stable_captures: self.stable_captures,
            timed_out_captures: self.timed_out_captures,
            unchanged_captures: self.unchanged_captures,
            canceled_captures: self.canceled_captures,
            empty_results: self.empty_results,
            clear_failures: self.clear_failures,
            warnings,
        }
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
