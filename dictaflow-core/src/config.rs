use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::capture::{
    CaptureOptions, DEFAULT_CAPTURE_INTERVAL_MS, DEFAULT_CAPTURE_STABLE_MS,
    DEFAULT_CAPTURE_TIMEOUT_MS,
};
use crate::clear::{
    ClearOptions, DEFAULT_CLEAR_ATTEMPTS, DEFAULT_CLEAR_ATTEMPT_TIMEOUT_MS, DEFAULT_CLEAR_POLL_MS,
    DEFAULT_CLEAR_VERIFY_MS,
};
use crate::error::AppError;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::host::HostSelectors;

const CONFIG_DIR_NAME: &str = "dictaflow";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_SUBMIT_WAIT_MS: u64 = 4_500;

const CAPTURE_INTERVAL_RANGE: RangeInclusive<u64> = 20..=1_000;
const CAPTURE_STABLE_RANGE: RangeInclusive<u64> = 100..=5_000;
const CAPTURE_TIMEOUT_RANGE: RangeInclusive<u64> = 1_000..=60_000;
const CLEAR_ATTEMPTS_RANGE: RangeInclusive<u32> = 1..=10;
const CLEAR_ATTEMPT_TIMEOUT_RANGE: RangeInclusive<u64> = 200..=10_000;
const CLEAR_VERIFY_RANGE: RangeInclusive<u64> = 50..=5_000;
const CLEAR_POLL_RANGE: RangeInclusive<u64> = 10..=500;
const SUBMIT_WAIT_RANGE: RangeInclusive<u64> = 0..=30_000;
const HISTORY_LIMIT_RANGE: RangeInclusive<usize> = 1..=500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DictationSettings {
    #[serde(default = "default_capture_interval_ms")]
    pub capture_interval_ms: u64,
    #[serde(default = "default_capture_stable_ms")]
    pub capture_stable_ms: u64,
    #[serde(default = "default_capture_timeout_ms")]
    pub capture_timeout_ms: u64,
    #[serde(default = "default_clear_attempts")]
    pub clear_attempts: u32,
    #[serde(default = "default_clear_attempt_timeout_ms")]
    pub clear_attempt_timeout_ms: u64,
    #[serde(default = "default_clear_verify_ms")]
    pub clear_verify_ms: u64,
    #[serde(default = "default_clear_poll_ms")]
    pub clear_poll_ms: u64,
    #[serde(default = "default_submit_wait_ms")]
    pub submit_wait_ms: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub selectors: HostSelectors,
}

impl Default for DictationSettings {
    fn default() -> Self {
        Self {
            capture_interval_ms: default_capture_interval_ms(),
            capture_stable_ms: default_capture_stable_ms(),
            capture_timeout_ms: default_capture_timeout_ms(),
            clear_attempts: default_clear_attempts(),
            clear_attempt_timeout_ms: default_clear_attempt_timeout_ms(),
            clear_verify_ms: default_clear_verify_ms(),
            clear_poll_ms: default_clear_poll_ms(),
            submit_wait_ms: default_submit_wait_ms(),
            history_limit: default_history_limit(),
            selectors: HostSelectors::default(),
        }
    }
}

impl DictationSettings {
    pub fn submit_wait(&self) -> Duration {
        Duration::from_millis(self.submit_wait_ms)
    }
}

impl From<&DictationSettings> for CaptureOptions {
    fn from(settings: &DictationSettings) -> Self {
        Self {
            interval: Duration::from_millis(settings.capture_interval_ms),
            stable_for: Duration::from_millis(settings.capture_stable_ms),
            timeout: Duration::from_millis(settings.capture_timeout_ms),
            require_change: true,
        }
    }
}

impl From<&DictationSettings> for ClearOptions {
    fn from(settings: &DictationSettings) -> Self {
        Self {
            attempts: settings.clear_attempts,
            timeout_per_attempt: Duration::from_millis(settings.clear_attempt_timeout_ms),
            verify_for: Duration::from_millis(settings.clear_verify_ms),
            poll_interval: Duration::from_millis(settings.clear_poll_ms),
        }
    }
}

fn default_capture_interval_ms() -> u64 {
    DEFAULT_CAPTURE_INTERVAL_MS
}

fn default_capture_stable_ms() -> u64 {
    DEFAULT_CAPTURE_STABLE_MS
}

fn default_capture_timeout_ms() -> u64 {
    DEFAULT_CAPTURE_TIMEOUT_MS
}

fn default_clear_attempts() -> u32 {
    DEFAULT_CLEAR_ATTEMPTS
}

fn default_clear_attempt_timeout_ms() -> u64 {
    DEFAULT_CLEAR_ATTEMPT_TIMEOUT_MS
}

fn default_clear_verify_ms() -> u64 {
    DEFAULT_CLEAR_VERIFY_MS
}

fn default_clear_poll_ms() -> u64 {
    DEFAULT_CLEAR_POLL_MS
}

fn default_submit_wait_ms() -> u64 {
    DEFAULT_SUBMIT_WAIT_MS
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

pub fn default_config_path() -> Result<PathBuf, AppError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("no user config directory available".to_string()))?;
    Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Loads settings, falling back to defaults for a missing file and for any
/// value outside its supported range.
pub fn load_settings(path: &Path) -> Result<DictationSettings, AppError> {
    if !path.exists() {
        info!(path = %path.display(), "no settings file; using defaults");
        return Ok(DictationSettings::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|err| AppError::Config(format!("failed to read {}: {err}", path.display())))?;
    let settings: DictationSettings = serde_json::from_str(&content)
        .map_err(|err| AppError::Config(format!("failed to parse {}: {err}", path.display())))?;

    Ok(normalize_loaded_settings(settings))
}

pub fn save_settings(
    path: &Path,
    settings: DictationSettings,
) -> Result<DictationSettings, AppError> {
    let validated = validate_settings(settings)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            AppError::Config(format!("failed to create {}: {err}", parent.display()))
        })?;
    }
    let content = serde_json::to_string_pretty(&validated)
        .map_err(|err| AppError::Config(err.to_string()))?;
    fs::write(path, content)
        .map_err(|err| AppError::Config(format!("failed to write {}: {err}", path.display())))?;

    Ok(validated)
}

pub fn normalize_loaded_settings(mut settings: DictationSettings) -> DictationSettings {
    let defaults = DictationSettings::default();

    settings.capture_interval_ms = reset_out_of_range(
        "captureIntervalMs",
        settings.capture_interval_ms,
        &CAPTURE_INTERVAL_RANGE,
        defaults.capture_interval_ms,
    );
    settings.capture_stable_ms = reset_out_of_range(
        "captureStableMs",
        settings.capture_stable_ms,
        &CAPTURE_STABLE_RANGE,
        defaults.capture_stable_ms,
    );
    settings.capture_timeout_ms = reset_out_of_range(
        "captureTimeoutMs",
        settings.capture_timeout_ms,
        &CAPTURE_TIMEOUT_RANGE,
        defaults.capture_timeout_ms,
    );
    settings.clear_attempts = reset_out_of_range(
        "clearAttempts",
        settings.clear_attempts,
        &CLEAR_ATTEMPTS_RANGE,
        defaults.clear_attempts,
    );
    settings.clear_attempt_timeout_ms = reset_out_of_range(
        "clearAttemptTimeoutMs",
        settings.clear_attempt_timeout_ms,
        &CLEAR_ATTEMPT_TIMEOUT_RANGE,
        defaults.clear_attempt_timeout_ms,
    );
    settings.clear_verify_ms = reset_out_of_range(
        "clearVerifyMs",
        settings.clear_verify_ms,
        &CLEAR_VERIFY_RANGE,
        defaults.clear_verify_ms,
    );
    settings.clear_poll_ms = reset_out_of_range(
        "clearPollMs",
        settings.clear_poll_ms,
        &CLEAR_POLL_RANGE,
        defaults.clear_poll_ms,
    );
    settings.submit_wait_ms = reset_out_of_range(
        "submitWaitMs",
        settings.submit_wait_ms,
        &SUBMIT_WAIT_RANGE,
        defaults.submit_wait_ms,
    );
    settings.history_limit = reset_out_of_range(
        "historyLimit",
        settings.history_limit,
        &HISTORY_LIMIT_RANGE,
        defaults.history_limit,
    );
    settings.selectors = settings.selectors.normalized();

    settings
}

pub fn validate_settings(mut settings: DictationSettings) -> Result<DictationSettings, AppError> {
    check_range(
        "captureIntervalMs",
        settings.capture_interval_ms,
        &CAPTURE_INTERVAL_RANGE,
    )?;
    check_range(
        "captureStableMs",
        settings.capture_stable_ms,
        &CAPTURE_STABLE_RANGE,
    )?;
    check_range(
        "captureTimeoutMs",
        settings.capture_timeout_ms,
        &CAPTURE_TIMEOUT_RANGE,
    )?;
    check_range(
        "clearAttempts",
        settings.clear_attempts,
        &CLEAR_ATTEMPTS_RANGE,
    )?;
    check_range(
        "clearAttemptTimeoutMs",
        settings.clear_attempt_timeout_ms,
        &CLEAR_ATTEMPT_TIMEOUT_RANGE,
    )?;
    check_range("clearVerifyMs", settings.clear_verify_ms, &CLEAR_VERIFY_RANGE)?;
    check_range("clearPollMs", settings.clear_poll_ms, &CLEAR_POLL_RANGE)?;
    check_range("submitWaitMs", settings.submit_wait_ms, &SUBMIT_WAIT_RANGE)?;
    check_range("historyLimit", settings.history_limit, &HISTORY_LIMIT_RANGE)?;

    if settings.capture_stable_ms >= settings.capture_timeout_ms {
        return Err(AppError::Config(
            "captureStableMs must be shorter than captureTimeoutMs".to_string(),
        ));
    }
    if settings.clear_verify_ms >= settings.clear_attempt_timeout_ms {
        return Err(AppError::Config(
            "clearVerifyMs must be shorter than clearAttemptTimeoutMs".to_string(),
        ));
    }

    settings.selectors = settings.selectors.normalized();
    Ok(settings)
}

fn reset_out_of_range<T>(name: &str, value: T, range: &RangeInclusive<T>, default: T) -> T
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    if range.contains(&value) {
        return value;
    }
    warn!(
        setting = name,
        value = %value,
        "loaded setting is out of range; resetting to default"
    );
    default
}

fn check_range<T>(name: &str, value: T, range: &RangeInclusive<T>) -> Result<(), AppError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "{name} must be between {} and {}",
            range.start(),
            range.end()
        )))
    }
}
