pub mod script;
pub mod selectors;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::DomSignals;

pub use script::{ScriptHost, ScriptRunner};
pub use selectors::HostSelectors;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error("failed to decode host response: {0}")]
    Decode(String),
    #[error("host page is not available")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HostControl {
    Start,
    Stop,
    Submit,
}

impl HostControl {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Submit => "submit",
        }
    }
}

/// Everything the reconciliation core needs from the page it drives.
///
/// The page mutates its own DOM concurrently, so implementations must read
/// fresh state on every call and never cache.
#[async_trait]
pub trait HostPage: Send + Sync {
    async fn read_signals(&self) -> Result<DomSignals, HostError>;

    /// Raw composer text, or `None` when the composer is not in the page.
    async fn read_composer_text(&self) -> Result<Option<String>, HostError>;

    /// Clicks a dictation control. `Ok(false)` when the control is absent.
    async fn click(&self, control: HostControl) -> Result<bool, HostError>;

    async fn focus_composer(&self) -> Result<(), HostError>;

    /// Native select-all followed by delete, through the editing command path.
    async fn select_all_and_delete(&self) -> Result<(), HostError>;

    /// Overwrites the composer with a single empty paragraph.
    async fn reset_composer(&self) -> Result<(), HostError>;

    /// Synthetic `input` and `change` notifications on the composer.
    async fn dispatch_input_events(&self) -> Result<(), HostError>;
}
