//! Per-frame measurements and the append-only per-track ledger.

use serde::{Deserialize, Serialize};

use crate::error::{FoodTrackError, Result};

/// One fused observation for one track at one frame.
///
/// Immutable once appended to a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Frame the observation came from
    pub frame_idx: u64,
    /// Raw volume estimate in milliliters
    pub volume_ml: f32,
    /// Fraction of the object's expected extent actually visible, in [0, 1]
    pub visibility: f32,
    /// Confidence weight in [0, 1], combined from the detector,
    /// segmentation and depth confidences
    pub weight: f32,
}

impl Measurement {
    /// Build a measurement, clamping visibility and weight into [0, 1] and
    /// volume to non-negative.
    pub fn new(frame_idx: u64, volume_ml: f32, visibility: f32, weight: f32) -> Self {
        Self {
            frame_idx,
            volume_ml: volume_ml.max(0.0),
            visibility: visibility.clamp(0.0, 1.0),
            weight: weight.clamp(0.0, 1.0),
        }
    }
}

/// Append-only, frame-ordered list of a track's measurements.
///
/// Entries are never deleted or mutated after append, so aggregation over
/// an unmutated ledger is reproducible.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasurementLedger {
    entries: Vec<Measurement>,
}

impl MeasurementLedger {
    /// Append one measurement. Frame indices must be strictly increasing.
    pub fn append(&mut self, measurement: Measurement) -> Result<()> {
        if let Some(last) = self.entries.last() {
            if measurement.frame_idx <= last.frame_idx {
                return Err(FoodTrackError::LedgerOrder {
                    frame_idx: measurement.frame_idx,
                    last_frame: last.frame_idx,
                });
            }
        }
        self.entries.push(measurement);
        Ok(())
    }

    pub fn entries(&self) -> &[Measurement] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Frame index of the most recent entry.
    pub fn last_frame(&self) -> Option<u64> {
        self.entries.last().map(|m| m.frame_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_frame_order() {
        let mut ledger = MeasurementLedger::default();
        ledger.append(Measurement::new(1, 100.0, 0.9, 0.8)).unwrap();
        ledger.append(Measurement::new(3, 105.0, 0.8, 0.9)).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.last_frame(), Some(3));
    }

    #[test]
    fn test_append_rejects_stale_frame() {
        let mut ledger = MeasurementLedger::default();
        ledger.append(Measurement::new(2, 100.0, 0.9, 0.8)).unwrap();

        let err = ledger
            .append(Measurement::new(2, 101.0, 0.9, 0.8))
            .unwrap_err();
        assert!(matches!(
            err,
            FoodTrackError::LedgerOrder {
                frame_idx: 2,
                last_frame: 2
            }
        ));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_new_clamps_ranges() {
        let m = Measurement::new(1, -5.0, 1.5, -0.2);
        assert_eq!(m.volume_ml, 0.0);
        assert_eq!(m.visibility, 1.0);
        assert_eq!(m.weight, 0.0);
    }
}
