//! Detection input for the tracker.

use crate::tracker::rect::Rect;

/// One labeled observation within one frame.
///
/// Ephemeral: consumed by the tracker in the frame it arrives.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Bounding box in pixel space
    pub bbox: Rect,
    /// Free-text label from the detector ("apple", "club sandwich", ...)
    pub label: String,
    /// Detection confidence score in [0, 1]
    pub score: f32,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, label: impl Into<String>, score: f32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            label: label.into(),
            score,
        }
    }

    pub fn from_rect(bbox: Rect, label: impl Into<String>, score: f32) -> Self {
        Self {
            bbox,
            label: label.into(),
            score,
        }
    }

    /// Whether the detection can participate in matching at all.
    pub fn is_valid(&self) -> bool {
        !self.bbox.is_degenerate() && self.score.is_finite()
    }
}
