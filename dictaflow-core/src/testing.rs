use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::host::{HostControl, HostError, HostPage};
use crate::status::DomSignals;

/// Scripted host page driven by tokio's virtual clock.
///
/// Text changes are scheduled as offsets from construction. Clears can be
/// answered with delayed refills to mimic a framework restoring its state.
pub(crate) struct FakeHost {
    epoch: Instant,
    state: Mutex<FakeState>,
}

struct FakeState {
    text: Option<String>,
    scheduled: VecDeque<(Duration, String)>,
    signals: DomSignals,
    clicks: Vec<HostControl>,
    refills: VecDeque<String>,
    refill_delay: Duration,
    sticky: bool,
    resets: usize,
    input_events: usize,
    failing_reads: usize,
}

impl FakeHost {
    pub(crate) fn new(initial: &str) -> Self {
        Self {
            epoch: Instant::now(),
            state: Mutex::new(FakeState {
                text: Some(initial.to_string()),
                scheduled: VecDeque::new(),
                signals: DomSignals {
                    composer_present: true,
                    composer_visible: true,
                    start_present: true,
                    ..DomSignals::default()
                },
                clicks: Vec::new(),
                refills: VecDeque::new(),
                refill_delay: Duration::from_millis(100),
                sticky: false,
                resets: 0,
                input_events: 0,
                failing_reads: 0,
            }),
        }
    }

    pub(crate) fn without_composer() -> Self {
        let host = Self::new("");
        {
            let mut state = host.state.lock().unwrap();
            state.text = None;
            state.signals.composer_present = false;
            state.signals.composer_visible = false;
        }
        host
    }

    /// Composer text becomes `text` once `at_ms` of virtual time has passed.
    pub(crate) fn schedule_text(&self, at_ms: u64, text: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .scheduled
            .push_back((Duration::from_millis(at_ms), text.to_string()));
        state.scheduled.make_contiguous().sort_by_key(|(at, _)| *at);
    }

    /// Each reset is answered by restoring the next text after `delay_ms`.
    pub(crate) fn refill_after_resets(&self, texts: &[&str], delay_ms: u64) {
        let mut state = self.state.lock().unwrap();
        state.refills = texts.iter().map(|text| text.to_string()).collect();
        state.refill_delay = Duration::from_millis(delay_ms);
    }

    /// Clear commands no longer change the text.
    pub(crate) fn make_sticky(&self) {
        self.state.lock().unwrap().sticky = true;
    }

    /// The next `count` composer reads fail with a script error.
    pub(crate) fn fail_next_reads(&self, count: usize) {
        self.state.lock().unwrap().failing_reads = count;
    }

    pub(crate) fn set_signals(&self, signals: DomSignals) {
        self.state.lock().unwrap().signals = signals;
    }

    pub(crate) fn clicks(&self) -> Vec<HostControl> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub(crate) fn resets(&self) -> usize {
        self.state.lock().unwrap().resets
    }

    pub(crate) fn input_events(&self) -> usize {
        self.state.lock().unwrap().input_events
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState, Duration) -> T) -> T {
        let elapsed = self.epoch.elapsed();
        let mut state = self.state.lock().unwrap();
        while state
            .scheduled
            .front()
            .is_some_and(|(at, _)| *at <= elapsed)
        {
            if let Some((_, text)) = state.scheduled.pop_front() {
                if state.text.is_some() {
                    state.text = Some(text);
                }
            }
        }
        f(&mut *state, elapsed)
    }

    fn with_composer<T>(
        &self,
        f: impl FnOnce(&mut FakeState, Duration) -> T,
    ) -> Result<T, HostError> {
        self.with_state(|state, elapsed| {
            if state.text.is_none() {
                Err(HostError::Unavailable)
            } else {
                Ok(f(state, elapsed))
            }
        })
    }
}

#[async_trait]
impl HostPage for FakeHost {
    async fn read_signals(&self) -> Result<DomSignals, HostError> {
        Ok(self.with_state(|state, _| state.signals.clone()))
    }

    async fn read_composer_text(&self) -> Result<Option<String>, HostError> {
        self.with_state(|state, _| {
            if state.failing_reads > 0 {
                state.failing_reads -= 1;
                return Err(HostError::Script("composer read failed".to_string()));
            }
            Ok(state.text.clone())
        })
    }

    async fn click(&self, control: HostControl) -> Result<bool, HostError> {
        Ok(self.with_state(|state, _| {
            let present = match control {
                HostControl::Start => state.signals.start_present,
                HostControl::Stop => state.signals.stop_present,
                HostControl::Submit => state.signals.submit_present,
            };
            if present {
                state.clicks.push(control);
            }
            present
        }))
    }

    async fn focus_composer(&self) -> Result<(), HostError> {
        self.with_composer(|_, _| ())
    }

    async fn select_all_and_delete(&self) -> Result<(), HostError> {
        self.with_composer(|state, _| {
            if !state.sticky {
                state.text = Some(String::new());
            }
        })
    }

    async fn reset_composer(&self) -> Result<(), HostError> {
        self.with_composer(|state, elapsed| {
            state.resets += 1;
            if !state.sticky {
                state.text = Some("\n".to_string());
            }
            if let Some(refill) = state.refills.pop_front() {
                let at = elapsed + state.refill_delay;
                state.scheduled.push_back((at, refill));
                state.scheduled.make_contiguous().sort_by_key(|(at, _)| *at);
            }
        })
    }

    async fn dispatch_input_events(&self) -> Result<(), HostError> {
        self.with_composer(|state, _| state.input_events += 1)
    }
}
