//! Boundary record handed to downstream nutrition mapping.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fusion::{AggregationResult, aggregate};
use crate::tracker::description::DESCRIPTION_UNAVAILABLE;
use crate::tracker::{FoodTrack, TrackerConfig};

/// One finalized track: persistent identity, preserved description and
/// fused volume estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackReport {
    pub track_id: u64,
    pub description: String,
    pub volume_ml: f32,
    pub uncertainty_ml: f32,
    pub frames_used: Vec<u64>,
    pub low_confidence: bool,
}

impl TrackReport {
    /// Finalize a retired track into its boundary record.
    pub fn from_track(track: &FoodTrack, config: &TrackerConfig) -> Self {
        let AggregationResult {
            volume_ml,
            uncertainty_ml,
            frames_used,
            low_confidence,
        } = aggregate(track.ledger(), config.fusion_visibility_thresh);

        Self {
            track_id: track.track_id,
            description: track
                .description()
                .unwrap_or(DESCRIPTION_UNAVAILABLE)
                .to_string(),
            volume_ml,
            uncertainty_ml,
            frames_used,
            low_confidence,
        }
    }

    /// Serialize to a JSON object for the downstream consumer.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::Measurement;
    use crate::tracker::Detection;

    #[test]
    fn test_report_carries_description_and_volume() {
        let mut track = FoodTrack::new(1, &Detection::new(0.0, 0.0, 100.0, 100.0, "apple", 0.9));
        track.consider_description("red apple", 0.9, 0.4);
        track
            .record_measurement(Measurement::new(1, 200.0, 0.9, 1.0))
            .unwrap();
        track.mark_retired();

        let report = TrackReport::from_track(&track, &TrackerConfig::default());
        assert_eq!(report.description, "red apple");
        assert!((report.volume_ml - 200.0).abs() < 1e-4);
        assert!(!report.low_confidence);
    }

    #[test]
    fn test_report_sentinel_without_description() {
        let track = FoodTrack::new(1, &Detection::new(0.0, 0.0, 100.0, 100.0, "apple", 0.9));
        let report = TrackReport::from_track(&track, &TrackerConfig::default());
        assert_eq!(report.description, DESCRIPTION_UNAVAILABLE);
        assert!(report.low_confidence);
    }

    #[test]
    fn test_report_round_trips_json() {
        let track = FoodTrack::new(1, &Detection::new(0.0, 0.0, 100.0, 100.0, "apple", 0.9));
        let report = TrackReport::from_track(&track, &TrackerConfig::default());
        let json = report.to_json().unwrap();
        let parsed: TrackReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
