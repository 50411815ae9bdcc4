use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{Mutex, broadcast};

use crate::capture::{CaptureResult, CaptureTokens};
use crate::clear::ClearResult;
use crate::history::HistoryLog;
use crate::metrics::SessionMetrics;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    #[default]
    Idle,
    Dictating,
    Submitting,
    Clearing,
}

/// Outcomes pushed to the messaging layer, in cycle order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    PhaseChanged {
        phase: ControllerPhase,
    },
    ResultReady {
        text: String,
        capture: CaptureResult,
    },
    NoContent {
        capture: CaptureResult,
    },
    ClearFinished {
        clear: ClearResult,
    },
    CaptureCanceled,
}

/// Mutable state of one dictation session.
///
/// The baseline is the only cross-cycle value; a completed submit resets it
/// so the next `start` establishes a fresh one.
pub struct SessionState {
    pub baseline: Mutex<String>,
    pub phase: Mutex<ControllerPhase>,
    pub tokens: CaptureTokens,
    /// Token of the most recently started submit cycle.
    pub active_cycle: AtomicU64,
    pub history: Mutex<HistoryLog>,
    pub metrics: Mutex<SessionMetrics>,
    pub events: broadcast::Sender<SessionEvent>,
}

impl SessionState {
    pub fn new(history_limit: usize) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            baseline: Mutex::new(String::new()),
            phase: Mutex::new(ControllerPhase::Idle),
            tokens: CaptureTokens::new(),
            active_cycle: AtomicU64::new(0),
            history: Mutex::new(HistoryLog::new(history_limit)),
            metrics: Mutex::new(SessionMetrics::new()),
            events,
        })
    }

    /// Sends without caring whether anyone is subscribed.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub async fn set_phase(&self, phase: ControllerPhase) {
        let changed = {
            let mut current = self.phase.lock().await;
            let changed = *current != phase;
            *current = phase;
            changed
        };
        if changed {
            self.emit(SessionEvent::PhaseChanged { phase });
        }
    }

    /// Opens a submit cycle, superseding any capture still in flight.
    pub fn begin_cycle(&self) -> u64 {
        let token = self.tokens.begin();
        self.active_cycle.store(token, Ordering::SeqCst);
        token
    }

    /// True while no later submit cycle has started.
    pub fn is_latest_cycle(&self, token: u64) -> bool {
        self.active_cycle.load(Ordering::SeqCst) == token
    }

    pub async fn baseline_snapshot(&self) -> String {
        let baseline = self.baseline.lock().await;
        baseline.clone()
    }

    pub async fn replace_baseline(&self, text: String) {
        let mut baseline = self.baseline.lock().await;
        *baseline = text;
    }

    pub async fn reset_baseline(&self) {
        self.baseline.lock().await.clear();
    }
}
