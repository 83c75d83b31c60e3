use crate::app::StartupError;
use crate::capture::CaptureError;
use crate::location::LocationError;
use crate::state::StateError;
use crate::storage::StorageError;
use crate::submission::SubmissionError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error("location unavailable: {0}")]
    Location(#[from] LocationError),
    #[error("media library: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("terminal io error: {0}")]
    Io(#[from] std::io::Error),
}
