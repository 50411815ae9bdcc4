pub mod capture;
pub mod clear;
pub mod config;
pub mod controller;
pub mod diff;
pub mod error;
pub mod history;
pub mod host;
pub mod metrics;
pub mod state;
pub mod status;
pub mod text;
pub mod utils;

#[cfg(test)]
mod testing;

use tracing_subscriber::EnvFilter;

pub use capture::{
    CaptureOptions, CaptureReason, CaptureResult, CaptureTokens, capture_stable_text_after_change,
};
pub use clear::{ClearOptions, ClearReason, ClearResult, clear_composer_robust};
pub use config::{DictationSettings, default_config_path, load_settings, save_settings};
pub use controller::{AdvisoryWait, CommandOutcome, ReconciliationController, SubmitOutcome};
pub use diff::compute_added_text;
pub use error::AppError;
pub use history::{HistoryItem, HistoryLog};
pub use host::{HostControl, HostError, HostPage, HostSelectors, ScriptHost, ScriptRunner};
pub use metrics::SessionReport;
pub use state::{ControllerPhase, SessionEvent, SessionState};
pub use status::{DictationStatus, DomSignals, HealthReport};
pub use text::normalize;

/// Installs the global fmt subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging() -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| AppError::LoggingInit(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_logging_init_reports_error() {
        let _ = init_logging();
        assert!(matches!(init_logging(), Err(AppError::LoggingInit(_))));
    }
}
