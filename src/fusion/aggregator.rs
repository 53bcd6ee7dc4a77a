//! Cross-frame measurement fusion.
//!
//! Fuses a track's ledger into one volume estimate with reduced
//! uncertainty. Entries below the visibility threshold served tracking
//! continuity only and are excluded from the fused value.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::fusion::measurement::{Measurement, MeasurementLedger};

/// Final fused output for one track's ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Confidence-weighted fused volume in milliliters
    pub volume_ml: f32,
    /// Weighted standard error of the fused volume
    pub uncertainty_ml: f32,
    /// Frames whose measurements contributed to the fused value
    pub frames_used: Vec<u64>,
    /// Set when the result rests on unreliable or zero-weight data
    pub low_confidence: bool,
}

/// Fuse a ledger into one volume estimate.
///
/// Pure over the ledger contents: calling it twice on an unmutated ledger
/// yields identical results.
///
/// - Entries with `visibility >= visibility_thresh` form the reliable set
///   and are fused by confidence-weighted mean.
/// - With all reliable weights zero, the mean degrades to unweighted and
///   the result is flagged low-confidence.
/// - With no reliable entries at all, the single highest-weight unreliable
///   entry is reported with a wide uncertainty band and the flag set.
pub fn aggregate(ledger: &MeasurementLedger, visibility_thresh: f32) -> AggregationResult {
    let reliable: Vec<&Measurement> = ledger
        .entries()
        .iter()
        .filter(|m| m.visibility >= visibility_thresh)
        .collect();

    if reliable.is_empty() {
        return fallback_from_unreliable(ledger);
    }

    let total_weight: f32 = reliable.iter().map(|m| m.weight).sum();

    if total_weight <= 0.0 {
        // Degenerate: every reliable entry carries zero confidence.
        let n = reliable.len() as f32;
        let mean = reliable.iter().map(|m| m.volume_ml).sum::<f32>() / n;
        let uncertainty = if reliable.len() > 1 {
            let var = reliable
                .iter()
                .map(|m| (m.volume_ml - mean).powi(2))
                .sum::<f32>()
                / n;
            (var / n).sqrt()
        } else {
            mean
        };
        debug!("all reliable weights zero; falling back to unweighted mean");
        return AggregationResult {
            volume_ml: mean,
            uncertainty_ml: uncertainty,
            frames_used: reliable.iter().map(|m| m.frame_idx).collect(),
            low_confidence: true,
        };
    }

    let mean = reliable
        .iter()
        .map(|m| m.volume_ml * m.weight)
        .sum::<f32>()
        / total_weight;

    let contributing: Vec<&&Measurement> =
        reliable.iter().filter(|m| m.weight > 0.0).collect();

    let uncertainty = if contributing.len() == 1 {
        // A single reliable frame has no spread to estimate; its own
        // confidence drives the band instead of claiming zero error.
        mean * (1.0 - contributing[0].weight)
    } else {
        let weighted_var = reliable
            .iter()
            .map(|m| m.weight * (m.volume_ml - mean).powi(2))
            .sum::<f32>()
            / total_weight;
        let sum_sq_weight: f32 = reliable.iter().map(|m| m.weight * m.weight).sum();
        let effective_n = total_weight * total_weight / sum_sq_weight;
        (weighted_var / effective_n).sqrt()
    };

    AggregationResult {
        volume_ml: mean,
        uncertainty_ml: uncertainty,
        frames_used: contributing.iter().map(|m| m.frame_idx).collect(),
        low_confidence: false,
    }
}

/// No reliable frames at all: report the best unreliable entry, flagged.
fn fallback_from_unreliable(ledger: &MeasurementLedger) -> AggregationResult {
    let best = ledger
        .entries()
        .iter()
        .max_by(|a, b| a.weight.total_cmp(&b.weight));

    match best {
        Some(m) => {
            debug!(
                "no reliable measurements; falling back to frame {} (visibility {:.2})",
                m.frame_idx, m.visibility
            );
            AggregationResult {
                volume_ml: m.volume_ml,
                uncertainty_ml: m.volume_ml * (1.0 - m.visibility),
                frames_used: vec![m.frame_idx],
                low_confidence: true,
            }
        }
        None => AggregationResult {
            volume_ml: 0.0,
            uncertainty_ml: 0.0,
            frames_used: vec![],
            low_confidence: true,
        },
    }
}
