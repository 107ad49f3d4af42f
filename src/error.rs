// =============================================================================
// Error taxonomy for computations
// =============================================================================
//
// Every variant is `Clone`: one failed computation is delivered to all callers
// that were coalesced onto the same cache entry.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputeError {
    /// The request referenced a dataset that is no longer resident.
    #[error("Stale dataset")]
    StaleDataset,

    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),

    /// The resident dataset is malformed (e.g. ragged columns).
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// The algorithm failed or panicked.
    #[error("{0}")]
    Algorithm(String),

    /// The backend thread or its channel is gone.
    #[error("Compute backend unavailable")]
    BackendUnavailable,
}

impl ComputeError {
    /// Rebuild an error from the message carried by a `ComputeResult`.
    ///
    /// Only the stale marker is recognised structurally; everything else is
    /// reported as an algorithm failure with the original text.
    pub fn from_message(message: String) -> Self {
        if message == ComputeError::StaleDataset.to_string() {
            ComputeError::StaleDataset
        } else {
            ComputeError::Algorithm(message)
        }
    }
}
