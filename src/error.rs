use thiserror::Error;

use crate::guard::FailureDetail;

/// Failure of one unit of work (one report) inside the export pipeline.
///
/// These never escape the batch driver: they are logged against the unit's
/// label and the next unit runs.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("remote call failed: {0}")]
    Remote(#[from] FailureDetail),

    #[error("invalid report id `{0}`")]
    InvalidReportId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by the delivery adapter.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("upload rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("could not read artifact {path}: {source}")]
    Artifact {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
