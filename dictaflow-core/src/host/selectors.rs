use serde::{Deserialize, Serialize};

use crate::host::HostControl;

const DEFAULT_COMPOSER: &str = "#prompt-textarea";
const DEFAULT_START_BUTTON: &str = "button[aria-label=\"Dictate button\"]";
const DEFAULT_STOP_BUTTON: &str = "button[aria-label=\"Stop dictation\"]";
const DEFAULT_SUBMIT_BUTTON: &str = "button[aria-label=\"Submit dictation\"]";
const DEFAULT_ACTIVITY_INDICATOR: &str = "[data-testid=\"dictation-waveform\"] canvas";
const DEFAULT_BUSY_INDICATOR: &str = "button[aria-label=\"Submit dictation\"][disabled]";

/// CSS selectors for the host page's dictation surface.
///
/// Host markup drifts, so every selector is user-configurable and empty
/// selectors are treated as "never matches".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct HostSelectors {
    pub composer: String,
    pub start_button: String,
    pub stop_button: String,
    pub submit_button: String,
    pub activity_indicator: String,
    pub busy_indicator: String,
}

impl Default for HostSelectors {
    fn default() -> Self {
        Self {
            composer: DEFAULT_COMPOSER.to_string(),
            start_button: DEFAULT_START_BUTTON.to_string(),
            stop_button: DEFAULT_STOP_BUTTON.to_string(),
            submit_button: DEFAULT_SUBMIT_BUTTON.to_string(),
            activity_indicator: DEFAULT_ACTIVITY_INDICATOR.to_string(),
            busy_indicator: DEFAULT_BUSY_INDICATOR.to_string(),
        }
    }
}

impl HostSelectors {
    pub fn control(&self, control: HostControl) -> &str {
        match control {
            HostControl::Start => &self.start_button,
            HostControl::Stop => &self.stop_button,
            HostControl::Submit => &self.submit_button,
        }
    }

    /// Replaces blank selectors with their defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        for (value, fallback) in [
            (&mut self.composer, defaults.composer),
            (&mut self.start_button, defaults.start_button),
            (&mut self.stop_button, defaults.stop_button),
            (&mut self.submit_button, defaults.submit_button),
            (&mut self.activity_indicator, defaults.activity_indicator),
            (&mut self.busy_indicator, defaults.busy_indicator),
        ] {
            let trimmed = value.trim();
            *value = if trimmed.is_empty() {
                fallback
            } else {
                trimmed.to_string()
            };
        }
        self
    }
}
