//! Error types for motion program encoding and execution

use crate::transport::EventLogEntry;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MotionProgramError>;

/// Failure reported by a controller transport implementation.
///
/// Kept separate from [`MotionProgramError`] so that transports can be written
/// against any HTTP stack without knowing the orchestrator's error taxonomy.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected response: {0}")]
    Response(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Closed set of error categories a caller can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Precondition,
    Transport,
    Correlation,
    ControllerFailure,
    Format,
    Timeout,
    Config,
}

#[derive(Error, Debug)]
pub enum MotionProgramError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Event log correlation error: {message} ({} entries inspected)", entries.len())]
    Correlation {
        message: String,
        entries: Vec<EventLogEntry>,
    },

    #[error("Could not find log file messages in robot event log")]
    MissingResultLog { entries: Vec<EventLogEntry> },

    #[error("Motion program failed: {0}")]
    ControllerFailure(String),

    #[error("Motion program failed, see robot error log for details")]
    ProgramFailed,

    #[error("Format error: {0}")]
    Format(String),

    #[error("Motion program still running after {0} status polls")]
    PollTimeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MotionProgramError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MotionProgramError::Validation(_) => ErrorKind::Validation,
            MotionProgramError::Precondition(_) => ErrorKind::Precondition,
            MotionProgramError::Transport(_) => ErrorKind::Transport,
            MotionProgramError::Correlation { .. }
            | MotionProgramError::MissingResultLog { .. } => ErrorKind::Correlation,
            MotionProgramError::ControllerFailure(_) | MotionProgramError::ProgramFailed => {
                ErrorKind::ControllerFailure
            }
            MotionProgramError::Format(_) => ErrorKind::Format,
            MotionProgramError::PollTimeout(_) => ErrorKind::Timeout,
            MotionProgramError::Config(_)
            | MotionProgramError::Io(_)
            | MotionProgramError::Yaml(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn correlation(message: impl Into<String>, entries: &[EventLogEntry]) -> Self {
        MotionProgramError::Correlation {
            message: message.into(),
            entries: entries.to_vec(),
        }
    }
}
