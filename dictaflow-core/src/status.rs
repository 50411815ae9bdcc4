use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DictationStatus {
    Idle,
    Listening,
    Recording,
    Processing,
    Unknown,
}

/// One sample of the host page's dictation controls.
///
/// Sampled fresh on every read; the host page owns all of these and may
/// change them between two samples.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct DomSignals {
    pub composer_present: bool,
    pub composer_visible: bool,
    pub start_present: bool,
    pub stop_present: bool,
    pub submit_present: bool,
    /// Action controls are disabled or the busy indicator is shown.
    pub controls_disabled: bool,
    /// Waveform or transcription-activity indicator is running.
    pub activity_active: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub healthy: bool,
    pub composer_present: bool,
    pub dictation_controls_present: bool,
}

/// Classifies a signal sample. Busy wins over listening, listening over
/// ready-to-submit, and that over idle.
pub fn detect_status(signals: &DomSignals) -> DictationStatus {
    let capturing = signals.activity_active || !signals.composer_visible;

    if signals.controls_disabled {
        DictationStatus::Processing
    } else if signals.stop_present && capturing {
        DictationStatus::Listening
    } else if signals.submit_present && capturing {
        DictationStatus::Recording
    } else if signals.start_present {
        DictationStatus::Idle
    } else {
        DictationStatus::Unknown
    }
}

pub fn check_health(signals: &DomSignals) -> HealthReport {
    let dictation_controls_present = signals.stop_present || signals.submit_present;
    HealthReport {
        healthy: signals.composer_present || dictation_controls_present,
        composer_present: signals.composer_present,
        dictation_controls_present,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_page() -> DomSignals {
        DomSignals {
            composer_present: true,
            composer_visible: true,
            start_present: true,
            ..DomSignals::default()
        }
    }

    #[test]
    fn start_control_alone_is_idle() {
        assert_eq!(detect_status(&idle_page()), DictationStatus::Idle);
    }

    #[test]
    fn busy_controls_win_over_everything() {
        let signals = DomSignals {
            controls_disabled: true,
            stop_present: true,
            submit_present: true,
            activity_active: true,
            ..idle_page()
        };
        assert_eq!(detect_status(&signals), DictationStatus::Processing);
    }

    #[test]
    fn stop_with_activity_is_listening() {
        let signals = DomSignals {
            stop_present: true,
            submit_present: true,
            activity_active: true,
            ..idle_page()
        };
        assert_eq!(detect_status(&signals), DictationStatus::Listening);
    }

    #[test]
    fn hidden_composer_counts_as_capturing() {
        let signals = DomSignals {
            composer_visible: false,
            submit_present: true,
            start_present: false,
            ..idle_page()
        };
        assert_eq!(detect_status(&signals), DictationStatus::Recording);
    }

    #[test]
    fn stop_without_activity_falls_through_to_idle() {
        let signals = DomSignals {
            stop_present: true,
            ..idle_page()
        };
        assert_eq!(detect_status(&signals), DictationStatus::Idle);
    }

    #[test]
    fn no_known_controls_is_unknown() {
        assert_eq!(
            detect_status(&DomSignals::default()),
            DictationStatus::Unknown
        );
    }

    #[test]
    fn health_requires_composer_or_active_controls() {
        assert!(check_health(&idle_page()).healthy);
        assert!(!check_health(&DomSignals::default()).healthy);

        let dictating = DomSignals {
            submit_present: true,
            ..DomSignals::default()
        };
        let report = check_health(&dictating);
        assert!(report.healthy);
        assert!(report.dictation_controls_present);
        assert!(!report.composer_present);
    }
}
