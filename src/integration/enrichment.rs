//! Call contracts for the per-track enrichment collaborators.
//!
//! Segmentation, depth-based volume estimation and semantic description run
//! once per matched track per frame. All three are external services from
//! the tracker's point of view; implementations may call into a model, a
//! remote endpoint or a fixture.

use crate::error::Result;
use crate::tracker::Rect;

/// Pixel-level instance mask for one detection crop.
#[derive(Debug, Clone)]
pub struct Mask {
    /// Row-major binary mask, one byte per pixel (nonzero = object)
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Segmentation confidence in `[0, 1]`
    pub confidence: f32,
}

/// Raw single-frame volume estimate, before ledger entry.
#[derive(Debug, Clone, Copy)]
pub struct RawMeasurement {
    /// Estimated volume in milliliters
    pub volume_ml: f32,
    /// Fraction of the object unoccluded in this frame, `[0, 1]`
    pub visibility: f32,
    /// Estimator confidence in `[0, 1]`
    pub confidence: f32,
}

/// Instance segmentation over one tracked box.
///
/// `Send + Sync` so enrichment for independent tracks can run on scoped
/// worker threads.
pub trait Segmenter: Send + Sync {
    /// Produce a pixel mask for the object inside `bbox`.
    fn segment(&self, frame: &[u8], width: u32, height: u32, bbox: &Rect) -> Result<Mask>;
}

/// Depth-based volume estimation over a segmented object.
pub trait MeasurementEstimator: Send + Sync {
    /// Estimate single-frame volume and visibility from a mask.
    fn estimate(
        &self,
        frame: &[u8],
        width: u32,
        height: u32,
        mask: &Mask,
    ) -> Result<RawMeasurement>;
}

/// Semantic description of a tracked object.
///
/// Returning `None` means no description could be produced this frame;
/// the track keeps whatever it already holds.
pub trait Describer: Send + Sync {
    fn describe(&self, frame: &[u8], width: u32, height: u32, bbox: &Rect) -> Option<String>;
}
