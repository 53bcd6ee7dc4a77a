//! Error types for the tracking and fusion library.

use thiserror::Error;

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, FoodTrackError>;

/// Errors that can occur during tracking, enrichment and aggregation.
///
/// Collaborator failures (`Segmentation`, `Measurement`) are recovered
/// per-track per-frame by the pipeline: the affected track simply receives
/// no measurement for that frame. The contract-violation variants indicate
/// a broken invariant rather than noisy input.
#[derive(Error, Debug)]
pub enum FoodTrackError {
    #[error("segmentation failed: {0}")]
    Segmentation(String),

    #[error("measurement estimation failed: {0}")]
    Measurement(String),

    #[error("measurement for frame {frame_idx} is not after ledger tail frame {last_frame}")]
    LedgerOrder { frame_idx: u64, last_frame: u64 },

    #[error("attempt to mutate retired track {track_id}")]
    RetiredTrackMutation { track_id: u64 },

    #[error("report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
