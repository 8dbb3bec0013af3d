use mm_core::{HttpError, IngestError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("http client setup failed: {0}")]
    Setup(#[from] HttpError),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Ingest(IngestError::Network { .. } | IngestError::Status { .. }) => 3,
            Self::Ingest(IngestError::Parse { .. } | IngestError::Empty { .. }) => 4,
            Self::Ingest(IngestError::Storage(_)) => 5,
            Self::Setup(_) => 10,
        }
    }
}
