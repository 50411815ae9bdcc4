use thiserror::Error;

use crate::host::HostError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("host page error: {0}")]
    Host(#[from] HostError),
}
