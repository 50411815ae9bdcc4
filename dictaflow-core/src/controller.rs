use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::capture::{
    CaptureOptions, CaptureReason, CaptureResult, capture_with_token, read_normalized,
    sample_composer,
};
use crate::clear::{ClearOptions, ClearResult, clear_composer_robust};
use crate::config::DictationSettings;
use crate::diff::compute_added_text;
use crate::error::AppError;
use crate::history::HistoryItem;
use crate::host::{HostControl, HostPage};
use crate::metrics::SessionReport;
use crate::state::{ControllerPhase, SessionEvent, SessionState};
use crate::status::{DictationStatus, DomSignals, HealthReport, check_health, detect_status};
use crate::utils::duration_ms;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    pub control: HostControl,
    pub clicked: bool,
    pub status: DictationStatus,
}

/// How the pre-capture wait after clicking submit ended. Advisory only.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AdvisoryWait {
    TextChanged,
    ReturnedIdle,
    TimedOut,
    Superseded,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub added_text: String,
    pub full_text: String,
    pub capture: CaptureResult,
    /// `None` when the cycle was canceled before clearing.
    pub clear: Option<ClearResult>,
    pub advisory: AdvisoryWait,
}

/// Drives one host page through start / pause / submit cycles.
pub struct ReconciliationController<H: HostPage> {
    host: H,
    settings: DictationSettings,
    session: Arc<SessionState>,
}

impl<H: HostPage> ReconciliationController<H> {
    pub fn new(host: H, settings: DictationSettings) -> Self {
        let session = SessionState::new(settings.history_limit);
        Self {
            host,
            settings,
            session,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn settings(&self) -> &DictationSettings {
        &self.settings
    }

    pub fn session(&self) -> Arc<SessionState> {
        Arc::clone(&self.session)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.events.subscribe()
    }

    pub async fn phase(&self) -> ControllerPhase {
        *self.session.phase.lock().await
    }

    pub async fn baseline(&self) -> String {
        self.session.baseline_snapshot().await
    }

    pub async fn history(&self) -> Vec<HistoryItem> {
        self.session.history.lock().await.items()
    }

    pub async fn metrics_report(&self) -> SessionReport {
        self.session.metrics.lock().await.report()
    }

    /// Raw signal sample from the host page.
    pub async fn signals(&self) -> Result<DomSignals, AppError> {
        Ok(self.host.read_signals().await?)
    }

    pub async fn get_status(&self) -> DictationStatus {
        match self.signals().await {
            Ok(signals) => detect_status(&signals),
            Err(err) => {
                warn!("failed to read host signals: {err}");
                DictationStatus::Unknown
            }
        }
    }

    pub async fn health(&self) -> HealthReport {
        match self.signals().await {
            Ok(signals) => check_health(&signals),
            Err(err) => {
                warn!("failed to read host signals for health check: {err}");
                HealthReport {
                    healthy: false,
                    composer_present: false,
                    dictation_controls_present: false,
                }
            }
        }
    }

    /// Snapshots the composer as this cycle's baseline and starts dictation.
    pub async fn start(&self) -> CommandOutcome {
        let baseline = read_normalized(&self.host).await;
        debug!(chars = baseline.chars().count(), "baseline captured");
        self.session.replace_baseline(baseline).await;

        let clicked = self.click(HostControl::Start).await;
        if clicked {
            self.session.set_phase(ControllerPhase::Dictating).await;
        }
        self.command_outcome(HostControl::Start, clicked).await
    }

    pub async fn pause(&self) -> CommandOutcome {
        let clicked = self.click(HostControl::Stop).await;
        self.command_outcome(HostControl::Stop, clicked).await
    }

    /// Supersedes any capture in flight. Safe to call repeatedly.
    pub fn cancel_capture(&self) {
        self.session.tokens.invalidate();
        info!("capture cancellation requested");
    }

    /// Submits the dictation, captures the settled text, reports what was
    /// added since `start` and clears the composer.
    ///
    /// A cycle superseded by a newer submit (or `cancel_capture`) returns a
    /// `Canceled` capture and performs no diff, history write or clear.
    pub async fn submit(&self) -> SubmitOutcome {
        let started = Instant::now();
        let token = self.session.begin_cycle();
        let baseline = self.session.baseline_snapshot().await;
        self.session.set_phase(ControllerPhase::Submitting).await;

        let pre_submit = read_normalized(&self.host).await;
        if !self.click(HostControl::Submit).await {
            warn!("submit control not found; capturing current composer text");
        }

        let advisory = self.wait_for_change_or_idle(&pre_submit, token).await;
        debug!(?advisory, "advisory submit wait finished");

        let capture = capture_with_token(
            &self.host,
            &self.session.tokens,
            token,
            &pre_submit,
            &CaptureOptions::from(&self.settings),
        )
        .await;
        self.session
            .metrics
            .lock()
            .await
            .record_capture(capture.reason, capture.elapsed_ms);

        if capture.reason == CaptureReason::Canceled {
            return self.finish_canceled(token, capture, advisory).await;
        }

        let added_text = compute_added_text(&baseline, &capture.text);
        self.report_result(&added_text, &capture).await;

        self.set_phase_if_latest(token, ControllerPhase::Clearing).await;
        let clear_started = Instant::now();
        let clear = clear_composer_robust(&self.host, &ClearOptions::from(&self.settings)).await;
        {
            let mut metrics = self.session.metrics.lock().await;
            metrics.record_clear(clear.ok, duration_ms(clear_started.elapsed()));
            metrics.record_submit(duration_ms(started.elapsed()));
        }
        if !clear.ok {
            warn!(reason = %clear.reason, "composer clear may not have fully succeeded");
        }
        self.session.emit(SessionEvent::ClearFinished { clear });

        self.session.reset_baseline().await;
        self.set_phase_if_latest(token, ControllerPhase::Idle).await;

        info!(
            capture = ?capture.reason,
            clear = %clear.reason,
            added_chars = added_text.chars().count(),
            "submit cycle finished"
        );

        SubmitOutcome {
            added_text,
            full_text: capture.text.clone(),
            capture,
            clear: Some(clear),
            advisory,
        }
    }

    async fn report_result(&self, added_text: &str, capture: &CaptureResult) {
        if added_text.is_empty() {
            self.session.metrics.lock().await.record_empty_result();
            info!(reason = ?capture.reason, "no new dictated content detected");
            self.session.emit(SessionEvent::NoContent {
                capture: capture.clone(),
            });
            return;
        }

        if let Some(item) = self.session.history.lock().await.push(added_text) {
            debug!(id = item.id, "dictation recorded in history");
        }
        self.session.emit(SessionEvent::ResultReady {
            text: added_text.to_string(),
            capture: capture.clone(),
        });
    }

    /// The superseding cycle owns the phase and the baseline reset. An
    /// explicit cancel with no newer cycle ends the cycle here.
    async fn finish_canceled(
        &self,
        token: u64,
        capture: CaptureResult,
        advisory: AdvisoryWait,
    ) -> SubmitOutcome {
        info!(token, "submit cycle canceled before capture settled");
        self.session.emit(SessionEvent::CaptureCanceled);
        if self.session.is_latest_cycle(token) {
            self.session.reset_baseline().await;
            self.session.set_phase(ControllerPhase::Idle).await;
        }

        SubmitOutcome {
            added_text: String::new(),
            full_text: capture.text.clone(),
            capture,
            clear: None,
            advisory,
        }
    }

    /// Phase belongs to the newest submit; an overtaken cycle leaves it alone.
    async fn set_phase_if_latest(&self, token: u64, phase: ControllerPhase) {
        if self.session.is_latest_cycle(token) {
            self.session.set_phase(phase).await;
        } else {
            debug!(token, ?phase, "newer submit owns the phase");
        }
    }

    async fn click(&self, control: HostControl) -> bool {
        match self.host.click(control).await {
            Ok(true) => {
                debug!(control = control.as_str(), "host control clicked");
                true
            }
            Ok(false) => {
                warn!(control = control.as_str(), "host control not found");
                false
            }
            Err(err) => {
                warn!(control = control.as_str(), "failed to click host control: {err}");
                false
            }
        }
    }

    async fn command_outcome(&self, control: HostControl, clicked: bool) -> CommandOutcome {
        CommandOutcome {
            control,
            clicked,
            status: self.get_status().await,
        }
    }

    /// Keeps the waiter from settling on content the host has not yet
    /// replaced. Neither side timing out is an error.
    async fn wait_for_change_or_idle(&self, before: &str, token: u64) -> AdvisoryWait {
        let timeout = self.settings.submit_wait();
        let interval = Duration::from_millis(self.settings.capture_interval_ms);

        let outcome = tokio::select! {
            biased;
            changed = self.wait_for_text_change(before, token, timeout, interval) => {
                changed.then_some(AdvisoryWait::TextChanged)
            }
            idle = self.wait_for_idle(token, timeout, interval) => {
                idle.then_some(AdvisoryWait::ReturnedIdle)
            }
        };

        match outcome {
            Some(outcome) => outcome,
            None if !self.session.tokens.is_current(token) => AdvisoryWait::Superseded,
            None => AdvisoryWait::TimedOut,
        }
    }

    async fn wait_for_text_change(
        &self,
        before: &str,
        token: u64,
        timeout: Duration,
        interval: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.session.tokens.is_current(token) {
                return false;
            }
            if sample_composer(&self.host)
                .await
                .is_some_and(|current| current != before)
            {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(interval).await;
        }
    }

    async fn wait_for_idle(&self, token: u64, timeout: Duration, interval: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.session.tokens.is_current(token) {
                return false;
            }
            if self.get_status().await == DictationStatus::Idle {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(interval).await;
        }
    }
}
