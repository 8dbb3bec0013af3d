use mm_warehouse::WarehouseError;
use thiserror::Error;

use crate::http_client::HttpError;

/// Typed failure for a fetch or an upsert.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("network error calling {provider}: {source}")]
    Network {
        provider: &'static str,
        #[source]
        source: HttpError,
    },

    #[error("{provider} returned HTTP {status} for {url}")]
    Status {
        provider: &'static str,
        status: u16,
        url: String,
    },

    #[error("failed to parse {provider} response: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned no usable data: {message}")]
    Empty {
        provider: &'static str,
        message: String,
    },

    #[error(transparent)]
    Storage(#[from] WarehouseError),
}

impl IngestError {
    pub fn parse(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            provider,
            message: message.into(),
        }
    }

    pub fn empty(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Empty {
            provider,
            message: message.into(),
        }
    }
}
