//! Error kinds of a single print job

use super::renderer::RenderError;
use crate::db::repository::RepoError;
use kitchen_printer::PrintError;
use thiserror::Error;

/// Why a ticket could not be printed
///
/// Everything except [`PrintJobError::StoreUnavailable`] is a per-ticket
/// outcome that ends in a status transition. A store failure aborts the
/// whole poll cycle instead.
#[derive(Debug, Error)]
pub enum PrintJobError {
    #[error("no active printer for station '{station}'")]
    PrinterNotFound { station: String },

    #[error("printer timed out: {0}")]
    TransportTimeout(String),

    #[error("printer refused connection: {0}")]
    TransportRefused(String),

    #[error("printer error: {0}")]
    TransportOther(String),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] RepoError),
}

impl PrintJobError {
    /// Classify a transport failure
    pub fn from_transport(err: PrintError) -> Self {
        match err {
            PrintError::Timeout(msg) => PrintJobError::TransportTimeout(msg),
            PrintError::Refused(msg) => PrintJobError::TransportRefused(msg),
            other => PrintJobError::TransportOther(other.to_string()),
        }
    }

    /// Transport failures are retried up to the ticket's ceiling
    pub fn is_retryable(&self) -> bool {
        self.is_transport()
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PrintJobError::TransportTimeout(_)
                | PrintJobError::TransportRefused(_)
                | PrintJobError::TransportOther(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PrintJobError::PrinterNotFound { .. } => "PrinterNotFound",
            PrintJobError::TransportTimeout(_) => "TransportTimeout",
            PrintJobError::TransportRefused(_) => "TransportRefused",
            PrintJobError::TransportOther(_) => "TransportOther",
            PrintJobError::Render(_) => "RenderError",
            PrintJobError::StoreUnavailable(_) => "StoreUnavailable",
        }
    }

    /// Text stored in `last_error`, prefixed with the kind
    pub fn describe(&self) -> String {
        format!("[{}] {}", self.kind(), self)
    }
}
