//! Sequential identity tracker and track lifecycle manager.

use log::{debug, warn};

use crate::tracker::detection::Detection;
use crate::tracker::matching::{GreedyMatcher, MatchingStrategy};
use crate::tracker::rect::Rect;
use crate::tracker::track::FoodTrack;

/// Configuration for the tracker and the downstream fusion thresholds.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// IoU a detection must exceed to match an existing track
    pub match_thresh: f32,
    /// Consecutive misses after which an occluded track is retired
    pub max_misses: u32,
    /// Visibility at or above which a measurement counts toward the fused volume
    pub fusion_visibility_thresh: f32,
    /// Visibility at or above which a stored description locks in
    pub description_visibility_thresh: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            match_thresh: 0.5,
            max_misses: 30,
            fusion_visibility_thresh: 0.4,
            description_visibility_thresh: 0.4,
        }
    }
}

/// One detection-to-track decision from a frame's matching pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    /// Index into the detection slice passed to `assign`
    pub detection_idx: usize,
    /// Track the detection was assigned to
    pub track_id: u64,
    /// Whether the assignment created the track
    pub is_new: bool,
}

/// Maintains the live track table across frames.
///
/// Frames must be fed strictly sequentially: matching for frame t+1 depends
/// on the boxes committed by frame t. The tracker owns every live track
/// exclusively; retired tracks are handed out read-only via
/// [`drain_retired`](FoodTracker::drain_retired).
pub struct FoodTracker {
    tracks: Vec<FoodTrack>,
    retired: Vec<FoodTrack>,
    last_frame: Option<u64>,
    config: TrackerConfig,
    matcher: Box<dyn MatchingStrategy>,
}

impl FoodTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_matcher(config, Box::new(GreedyMatcher))
    }

    /// Swap in an alternative association policy (e.g. [`OptimalMatcher`]).
    ///
    /// [`OptimalMatcher`]: crate::tracker::OptimalMatcher
    pub fn with_matcher(config: TrackerConfig, matcher: Box<dyn MatchingStrategy>) -> Self {
        Self {
            tracks: Vec::new(),
            retired: Vec::new(),
            last_frame: None,
            config,
            matcher,
        }
    }

    /// Run one frame's matching pass.
    ///
    /// Returns one [`Assignment`] per detection that survived ingestion,
    /// in detection order. Malformed detections (degenerate box,
    /// non-finite score) are dropped and logged. Tracks left unmatched
    /// accumulate misses and may retire before the call returns.
    pub fn assign(&mut self, frame_idx: u64, detections: &[Detection]) -> Vec<Assignment> {
        if let Some(last) = self.last_frame {
            if frame_idx <= last {
                warn!(
                    "frame index {} not after previous frame {}; processing anyway",
                    frame_idx, last
                );
            }
        }
        self.last_frame = Some(frame_idx);

        // Ingestion: drop malformed detections, keep original indices.
        let mut valid_indices = Vec::with_capacity(detections.len());
        let mut det_boxes = Vec::with_capacity(detections.len());
        for (idx, det) in detections.iter().enumerate() {
            if det.is_valid() {
                valid_indices.push(idx);
                det_boxes.push(det.bbox);
            } else {
                warn!(
                    "dropping malformed detection {} at frame {} ({:?})",
                    idx, frame_idx, det.bbox
                );
            }
        }

        let track_boxes: Vec<Rect> = self.tracks.iter().map(|t| t.bbox).collect();
        let result = self
            .matcher
            .assign(&track_boxes, &det_boxes, self.config.match_thresh);

        let mut assignments = Vec::with_capacity(det_boxes.len());

        for &(track_pos, det_pos) in &result.matches {
            let det_idx = valid_indices[det_pos];
            let track = &mut self.tracks[track_pos];
            track.touch(frame_idx, &detections[det_idx]);
            assignments.push(Assignment {
                detection_idx: det_idx,
                track_id: track.track_id,
                is_new: false,
            });
        }

        for &det_pos in &result.unmatched_detections {
            let det_idx = valid_indices[det_pos];
            let track = FoodTrack::new(frame_idx, &detections[det_idx]);
            assignments.push(Assignment {
                detection_idx: det_idx,
                track_id: track.track_id,
                is_new: true,
            });
            self.tracks.push(track);
        }

        for &track_pos in &result.unmatched_tracks {
            self.tracks[track_pos].mark_missed();
        }

        // Lifecycle: retire tracks that have been occluded too long.
        let max_misses = self.config.max_misses;
        let mut i = 0;
        while i < self.tracks.len() {
            if self.tracks[i].misses > max_misses {
                let mut track = self.tracks.remove(i);
                track.mark_retired();
                self.retired.push(track);
            } else {
                i += 1;
            }
        }

        assignments.sort_unstable_by_key(|a| a.detection_idx);
        debug!(
            "frame {}: {} detections, {} live tracks, {} retired total",
            frame_idx,
            detections.len(),
            self.tracks.len(),
            self.retired.len()
        );
        assignments
    }

    /// Live (Active or Occluded) tracks.
    pub fn live_tracks(&self) -> &[FoodTrack] {
        &self.tracks
    }

    /// Mutable access to a live track by id.
    pub fn get_live_mut(&mut self, track_id: u64) -> Option<&mut FoodTrack> {
        self.tracks.iter_mut().find(|t| t.track_id == track_id)
    }

    /// Take ownership of tracks retired since the last call.
    pub fn drain_retired(&mut self) -> Vec<FoodTrack> {
        std::mem::take(&mut self.retired)
    }

    /// End of stream: force-retire every remaining live track.
    ///
    /// Returns all tracks retired and not yet drained, in retirement order.
    pub fn finish(&mut self) -> Vec<FoodTrack> {
        for mut track in self.tracks.drain(..) {
            track.mark_retired();
            self.retired.push(track);
        }
        std::mem::take(&mut self.retired)
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::TrackState;

    fn cfg(max_misses: u32) -> TrackerConfig {
        TrackerConfig {
            max_misses,
            ..TrackerConfig::default()
        }
    }

    #[test]
    fn test_single_track_persists() {
        let mut tracker = FoodTracker::new(TrackerConfig::default());

        let a1 = tracker.assign(1, &[Detection::new(0.0, 0.0, 100.0, 100.0, "apple", 0.9)]);
        assert_eq!(a1.len(), 1);
        assert!(a1[0].is_new);
        let id = a1[0].track_id;

        let a2 = tracker.assign(2, &[Detection::new(5.0, 5.0, 105.0, 105.0, "apple", 0.9)]);
        assert_eq!(a2.len(), 1);
        assert!(!a2[0].is_new);
        assert_eq!(a2[0].track_id, id);
    }

    #[test]
    fn test_no_double_assignment_within_frame() {
        let mut tracker = FoodTracker::new(TrackerConfig::default());
        tracker.assign(1, &[Detection::new(0.0, 0.0, 100.0, 100.0, "apple", 0.9)]);

        // Two detections both overlapping the single live track.
        let assignments = tracker.assign(
            2,
            &[
                Detection::new(2.0, 2.0, 102.0, 102.0, "apple", 0.9),
                Detection::new(4.0, 4.0, 104.0, 104.0, "apple", 0.8),
            ],
        );
        assert_eq!(assignments.len(), 2);
        assert_ne!(assignments[0].track_id, assignments[1].track_id);
        assert_eq!(
            assignments.iter().filter(|a| a.is_new).count(),
            1,
            "exactly one of the contenders spawns a new track"
        );
    }

    #[test]
    fn test_degenerate_detection_dropped() {
        let mut tracker = FoodTracker::new(TrackerConfig::default());
        let assignments = tracker.assign(
            1,
            &[
                Detection::new(10.0, 10.0, 10.0, 60.0, "zero width", 0.9),
                Detection::new(0.0, 0.0, 100.0, 100.0, "apple", 0.9),
            ],
        );
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].detection_idx, 1);
    }

    #[test]
    fn test_occlusion_then_reacquire_keeps_id() {
        let mut tracker = FoodTracker::new(cfg(5));
        let id = tracker.assign(1, &[Detection::new(0.0, 0.0, 100.0, 100.0, "apple", 0.9)])[0]
            .track_id;

        tracker.assign(2, &[]);
        assert_eq!(tracker.live_tracks()[0].state, TrackState::Occluded);

        let a = tracker.assign(3, &[Detection::new(3.0, 3.0, 103.0, 103.0, "apple", 0.9)]);
        assert_eq!(a[0].track_id, id);
        assert_eq!(tracker.live_tracks()[0].state, TrackState::Active);
    }

    #[test]
    fn test_retirement_after_max_misses() {
        let mut tracker = FoodTracker::new(cfg(3));
        let id = tracker.assign(1, &[Detection::new(0.0, 0.0, 100.0, 100.0, "apple", 0.9)])[0]
            .track_id;

        for frame in 2..=5 {
            tracker.assign(frame, &[]);
        }
        assert!(tracker.live_tracks().is_empty());

        let retired = tracker.drain_retired();
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].track_id, id);
        assert_eq!(retired[0].state, TrackState::Retired);

        // A reappearing box gets a fresh identity; retired tracks are out
        // of the matching pool for good.
        let a = tracker.assign(6, &[Detection::new(0.0, 0.0, 100.0, 100.0, "apple", 0.9)]);
        assert!(a[0].is_new);
        assert_ne!(a[0].track_id, id);
    }

    #[test]
    fn test_finish_retires_everything() {
        let mut tracker = FoodTracker::new(TrackerConfig::default());
        tracker.assign(
            1,
            &[
                Detection::new(0.0, 0.0, 100.0, 100.0, "apple", 0.9),
                Detection::new(300.0, 300.0, 400.0, 400.0, "banana", 0.8),
            ],
        );

        let finished = tracker.finish();
        assert_eq!(finished.len(), 2);
        assert!(finished.iter().all(|t| t.state == TrackState::Retired));
        assert!(tracker.live_tracks().is_empty());
    }
}
