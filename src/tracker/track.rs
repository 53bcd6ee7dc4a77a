//! Persistent per-object track record.

use std::sync::atomic::{AtomicU64, Ordering};

use log::{trace, warn};

use crate::error::{FoodTrackError, Result};
use crate::fusion::{Measurement, MeasurementLedger};
use crate::tracker::description::DescriptionMemory;
use crate::tracker::detection::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Global track ID counter for unique ID generation.
static TRACK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Reset the global track ID counter (useful for testing).
pub fn reset_track_id_counter() {
    TRACK_ID_COUNTER.store(0, Ordering::SeqCst);
}

/// Get the next unique track ID.
fn next_track_id() -> u64 {
    TRACK_ID_COUNTER.fetch_add(1, Ordering::SeqCst) + 1
}

/// A persistent physical-object identity across frames.
///
/// Owned exclusively by the [`FoodTracker`](crate::tracker::FoodTracker)
/// while Active/Occluded; read-only once Retired.
#[derive(Debug, Clone)]
pub struct FoodTrack {
    /// Unique track identifier, never reused
    pub track_id: u64,
    /// Current lifecycle state
    pub state: TrackState,
    /// Last known bounding box
    pub bbox: Rect,
    /// Detector score of the most recent matched detection
    pub score: f32,
    /// Frame index when the track was created
    pub start_frame: u64,
    /// Frame index of the most recent match
    pub last_frame: u64,
    /// Consecutive frames without a match
    pub misses: u32,
    description: DescriptionMemory,
    ledger: MeasurementLedger,
}

impl FoodTrack {
    /// Create and activate a new track from an unmatched detection.
    pub fn new(frame_idx: u64, detection: &Detection) -> Self {
        let track_id = next_track_id();
        trace!(
            "track {} created at frame {} ({})",
            track_id, frame_idx, detection.label
        );
        Self {
            track_id,
            state: TrackState::Active,
            bbox: detection.bbox,
            score: detection.score,
            start_frame: frame_idx,
            last_frame: frame_idx,
            misses: 0,
            description: DescriptionMemory::new(),
            ledger: MeasurementLedger::default(),
        }
    }

    /// Apply a matched detection: the box snaps to the detection, the miss
    /// counter resets and an Occluded track becomes Active again.
    pub fn touch(&mut self, frame_idx: u64, detection: &Detection) {
        if self.state == TrackState::Retired {
            debug_assert!(false, "touch on retired track {}", self.track_id);
            warn!("ignoring match for retired track {}", self.track_id);
            return;
        }
        if self.state == TrackState::Occluded {
            trace!("track {} reacquired at frame {}", self.track_id, frame_idx);
        }
        self.state = TrackState::Active;
        self.bbox = detection.bbox;
        self.score = detection.score;
        self.last_frame = frame_idx;
        self.misses = 0;
    }

    /// Register a frame without a match. Returns the new consecutive-miss
    /// count. The first miss moves an Active track to Occluded.
    pub fn mark_missed(&mut self) -> u32 {
        if self.state == TrackState::Retired {
            debug_assert!(false, "mark_missed on retired track {}", self.track_id);
            warn!("ignoring miss for retired track {}", self.track_id);
            return self.misses;
        }
        self.misses += 1;
        if self.state == TrackState::Active {
            self.state = TrackState::Occluded;
            trace!("track {} occluded ({} miss)", self.track_id, self.misses);
        }
        self.misses
    }

    /// Terminal transition: the track leaves the matching pool for good.
    pub fn mark_retired(&mut self) {
        self.state = TrackState::Retired;
        trace!("track {} retired", self.track_id);
    }

    /// Whether the track is still eligible for matching.
    pub fn is_live(&self) -> bool {
        matches!(self.state, TrackState::Active | TrackState::Occluded)
    }

    /// Offer a candidate description observed at the given visibility.
    pub fn consider_description(
        &mut self,
        candidate: &str,
        visibility: f32,
        reliable_thresh: f32,
    ) -> bool {
        if self.state == TrackState::Retired {
            debug_assert!(false, "description update on retired track {}", self.track_id);
            warn!("ignoring description for retired track {}", self.track_id);
            return false;
        }
        self.description
            .consider(candidate, visibility, reliable_thresh)
    }

    /// Append one fused per-frame observation to the ledger.
    ///
    /// Appending to a retired track or out of frame order is a contract
    /// violation: fatal in debug builds, a logged no-op in release.
    pub fn record_measurement(&mut self, measurement: Measurement) -> Result<()> {
        if self.state == TrackState::Retired {
            debug_assert!(false, "measurement on retired track {}", self.track_id);
            warn!("dropping measurement for retired track {}", self.track_id);
            return Err(FoodTrackError::RetiredTrackMutation {
                track_id: self.track_id,
            });
        }
        self.ledger.append(measurement)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.description()
    }

    /// Visibility of the frame the retained description came from.
    pub fn best_description_visibility(&self) -> f32 {
        self.description.best_visibility()
    }

    pub fn ledger(&self) -> &MeasurementLedger {
        &self.ledger
    }
}
