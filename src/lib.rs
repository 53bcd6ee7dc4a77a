//! Temporal identity tracking and cross-frame measurement fusion for food
//! item detections.
//!
//! Given a sequence of per-frame detections (bounding box + label + score),
//! this crate maintains one persistent track per physical object, preserves
//! the best semantic description seen for it across occlusion, and fuses the
//! per-frame volume measurements into a single confidence-weighted estimate
//! with an uncertainty figure.
//!
//! Detection, segmentation, depth estimation and description are external
//! collaborators plugged in through the traits in [`integration`].

pub mod error;
pub mod fusion;
pub mod integration;
pub mod report;
pub mod tracker;

pub use error::{FoodTrackError, Result};
pub use fusion::{AggregationResult, Measurement, MeasurementLedger, aggregate};
pub use integration::{
    AnalysisPipeline, Describer, DetectionBuilder, DetectionSource, Mask, MeasurementEstimator,
    RawMeasurement, Segmenter,
};
pub use report::TrackReport;
pub use tracker::{
    Assignment, Detection, FoodTrack, FoodTracker, Rect, TrackState, TrackerConfig,
};
