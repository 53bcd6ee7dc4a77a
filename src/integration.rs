//! Integration module for connecting external vision collaborators with the
//! tracker.
//!
//! Detection, segmentation, depth-based measurement and semantic description
//! are all external services; this module defines their call contracts and
//! the [`AnalysisPipeline`] that sequences them per frame.

mod builder;
mod detector;
mod enrichment;
mod pipeline;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, IntoDetections};
pub use enrichment::{Describer, Mask, MeasurementEstimator, RawMeasurement, Segmenter};
pub use pipeline::AnalysisPipeline;
