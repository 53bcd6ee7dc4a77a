//! Per-frame analysis pipeline: detect, match, enrich, fuse.

use std::sync::mpsc;
use std::thread;

use log::{debug, warn};

use crate::error::Result;
use crate::fusion::Measurement;
use crate::report::TrackReport;
use crate::tracker::{Assignment, FoodTracker, Rect, TrackerConfig};

use super::DetectionSource;
use super::enrichment::{Describer, MeasurementEstimator, Segmenter};

/// End-to-end frame processor.
///
/// Sequences one frame through the stages the tracker needs: detection,
/// identity matching, per-track enrichment (segmentation, volume
/// estimation, description) and ledger bookkeeping. Matching is
/// sequential; enrichment for independent tracks fans out onto scoped
/// worker threads and the results are committed back on the calling
/// thread.
///
/// Tracks retired during processing are finalized into [`TrackReport`]s
/// and held until [`finish`](AnalysisPipeline::finish).
pub struct AnalysisPipeline<D: DetectionSource> {
    detector: D,
    tracker: FoodTracker,
    segmenter: Box<dyn Segmenter>,
    estimator: Box<dyn MeasurementEstimator>,
    describer: Box<dyn Describer>,
    reports: Vec<TrackReport>,
    frame_idx: u64,
}

impl<D: DetectionSource> AnalysisPipeline<D> {
    /// Create a pipeline from a detector and the three enrichment
    /// collaborators.
    pub fn new(
        detector: D,
        segmenter: Box<dyn Segmenter>,
        estimator: Box<dyn MeasurementEstimator>,
        describer: Box<dyn Describer>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            detector,
            tracker: FoodTracker::new(config),
            segmenter,
            estimator,
            describer,
            reports: Vec::new(),
            frame_idx: 0,
        }
    }

    /// Process a single frame.
    ///
    /// Runs detection, one matching pass, and enrichment for every
    /// assigned detection. A detector failure aborts the frame; an
    /// enrichment failure is logged and costs that track its measurement
    /// for this frame only.
    ///
    /// Returns the frame's assignments, in detection order.
    pub fn process_frame(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> std::result::Result<Vec<Assignment>, D::Error> {
        let detections = self.detector.detect(frame, width, height)?;
        self.frame_idx += 1;
        let frame_idx = self.frame_idx;

        let assignments = self.tracker.assign(frame_idx, &detections);

        // One enrichment job per assigned detection. The workers only see
        // the frame and the box; ledger and description commits stay on
        // this thread.
        let jobs: Vec<(u64, Rect, f32)> = assignments
            .iter()
            .map(|a| {
                let det = &detections[a.detection_idx];
                (a.track_id, det.bbox, det.score)
            })
            .collect();

        let segmenter = self.segmenter.as_ref();
        let estimator = self.estimator.as_ref();
        let describer = self.describer.as_ref();

        let results: Vec<(u64, Result<(Measurement, Option<String>)>)> =
            thread::scope(|s| {
                let (tx, rx) = mpsc::channel();
                for &(track_id, bbox, score) in &jobs {
                    let tx = tx.clone();
                    s.spawn(move || {
                        let outcome = segmenter
                            .segment(frame, width, height, &bbox)
                            .and_then(|mask| {
                                let raw = estimator.estimate(frame, width, height, &mask)?;
                                let weight = score * mask.confidence * raw.confidence;
                                let description = describer.describe(frame, width, height, &bbox);
                                Ok((
                                    Measurement::new(
                                        frame_idx,
                                        raw.volume_ml,
                                        raw.visibility,
                                        weight,
                                    ),
                                    description,
                                ))
                            });
                        let _ = tx.send((track_id, outcome));
                    });
                }
                drop(tx);
                rx.iter().collect()
            });

        let description_thresh = self.tracker.config().description_visibility_thresh;
        for (track_id, outcome) in results {
            match outcome {
                Ok((measurement, description)) => {
                    let Some(track) = self.tracker.get_live_mut(track_id) else {
                        warn!(
                            "frame {}: track {} vanished before enrichment commit",
                            frame_idx, track_id
                        );
                        continue;
                    };
                    if let Some(text) = description {
                        track.consider_description(
                            &text,
                            measurement.visibility,
                            description_thresh,
                        );
                    }
                    if let Err(err) = track.record_measurement(measurement) {
                        warn!(
                            "frame {}: dropping measurement for track {}: {}",
                            frame_idx, track_id, err
                        );
                    }
                }
                Err(err) => {
                    warn!(
                        "frame {}: enrichment failed for track {}: {}",
                        frame_idx, track_id, err
                    );
                }
            }
        }

        for track in self.tracker.drain_retired() {
            self.reports
                .push(TrackReport::from_track(&track, self.tracker.config()));
        }

        debug!(
            "frame {}: {} assignments, {} reports pending",
            frame_idx,
            assignments.len(),
            self.reports.len()
        );
        Ok(assignments)
    }

    /// End of stream: retire every live track and return all reports
    /// accumulated since construction (or the previous `finish` call).
    pub fn finish(&mut self) -> Vec<TrackReport> {
        let config = self.tracker.config().clone();
        for track in self.tracker.finish() {
            self.reports.push(TrackReport::from_track(&track, &config));
        }
        std::mem::take(&mut self.reports)
    }

    /// Reports finalized so far, without taking them.
    pub fn reports(&self) -> &[TrackReport] {
        &self.reports
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    pub fn tracker(&self) -> &FoodTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut FoodTracker {
        &mut self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FoodTrackError;
    use crate::integration::enrichment::{Mask, RawMeasurement};
    use crate::tracker::Detection;

    struct MockDetector {
        detections: Vec<Detection>,
    }

    impl DetectionSource for MockDetector {
        type Error = std::convert::Infallible;

        fn detect(
            &mut self,
            _input: &[u8],
            _width: u32,
            _height: u32,
        ) -> std::result::Result<Vec<Detection>, Self::Error> {
            Ok(self.detections.clone())
        }
    }

    struct MockSegmenter;

    impl Segmenter for MockSegmenter {
        fn segment(&self, _frame: &[u8], _w: u32, _h: u32, _bbox: &Rect) -> Result<Mask> {
            Ok(Mask {
                data: vec![1; 4],
                width: 2,
                height: 2,
                confidence: 1.0,
            })
        }
    }

    struct MockEstimator {
        volume_ml: f32,
    }

    impl MeasurementEstimator for MockEstimator {
        fn estimate(
            &self,
            _frame: &[u8],
            _w: u32,
            _h: u32,
            _mask: &Mask,
        ) -> Result<RawMeasurement> {
            Ok(RawMeasurement {
                volume_ml: self.volume_ml,
                visibility: 0.9,
                confidence: 0.8,
            })
        }
    }

    struct MockDescriber;

    impl Describer for MockDescriber {
        fn describe(&self, _frame: &[u8], _w: u32, _h: u32, _bbox: &Rect) -> Option<String> {
            Some("red apple".to_string())
        }
    }

    struct FailingSegmenter;

    impl Segmenter for FailingSegmenter {
        fn segment(&self, _frame: &[u8], _w: u32, _h: u32, _bbox: &Rect) -> Result<Mask> {
            Err(FoodTrackError::Segmentation("no depth data".to_string()))
        }
    }

    fn pipeline_with(
        segmenter: Box<dyn Segmenter>,
    ) -> AnalysisPipeline<MockDetector> {
        AnalysisPipeline::new(
            MockDetector {
                detections: vec![Detection::new(10.0, 20.0, 110.0, 120.0, "apple", 1.0)],
            },
            segmenter,
            Box::new(MockEstimator { volume_ml: 200.0 }),
            Box::new(MockDescriber),
            TrackerConfig::default(),
        )
    }

    #[test]
    fn test_frame_commits_measurement_and_description() {
        let mut pipeline = pipeline_with(Box::new(MockSegmenter));
        let assignments = pipeline.process_frame(&[], 640, 480).unwrap();
        assert_eq!(assignments.len(), 1);
        assert!(assignments[0].is_new);

        let track = &pipeline.tracker().live_tracks()[0];
        assert_eq!(track.description(), Some("red apple"));
        assert_eq!(track.ledger().len(), 1);
        let entry = track.ledger().entries()[0];
        assert!((entry.volume_ml - 200.0).abs() < 1e-4);
        assert!((entry.weight - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_enrichment_failure_skips_frame_but_keeps_track() {
        let mut pipeline = pipeline_with(Box::new(FailingSegmenter));
        let assignments = pipeline.process_frame(&[], 640, 480).unwrap();
        assert_eq!(assignments.len(), 1);

        let track = &pipeline.tracker().live_tracks()[0];
        assert!(track.ledger().is_empty());
        assert_eq!(track.description(), None);
    }

    #[test]
    fn test_finish_reports_every_track() {
        let mut pipeline = pipeline_with(Box::new(MockSegmenter));
        pipeline.process_frame(&[], 640, 480).unwrap();
        pipeline.process_frame(&[], 640, 480).unwrap();

        let reports = pipeline.finish();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].description, "red apple");
        assert_eq!(reports[0].frames_used, vec![1, 2]);
        assert!(pipeline.reports().is_empty());
    }
}
