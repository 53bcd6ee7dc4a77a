//! Matching strategies for associating detections with live tracks.

use ndarray::Array2;

use crate::tracker::rect::{Rect, iou_batch};

/// Outcome of one frame's matching pass.
///
/// `matches` holds `(track_index, detection_index)` pairs into the slices
/// handed to [`MatchingStrategy::assign`].
#[derive(Debug, Clone)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Pluggable association policy between track boxes and detection boxes.
///
/// Implementations must keep the gate semantics: a pair only matches when
/// its IoU exceeds `match_thresh`, and every detection below the gate spawns
/// a new track.
pub trait MatchingStrategy: Send + Sync {
    fn assign(
        &self,
        track_boxes: &[Rect],
        det_boxes: &[Rect],
        match_thresh: f32,
    ) -> AssignmentResult;
}

/// Greedy highest-IoU-wins matcher, the default policy.
///
/// Detections are considered in the order supplied; each takes the unused
/// track with the highest IoU above the gate. Ties in IoU are broken by
/// earliest detection order (the first detection in the list wins the
/// contested track). This is a documented simplification, not an optimal
/// bipartite assignment; see [`OptimalMatcher`] for the strict upgrade.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyMatcher;

impl MatchingStrategy for GreedyMatcher {
    fn assign(
        &self,
        track_boxes: &[Rect],
        det_boxes: &[Rect],
        match_thresh: f32,
    ) -> AssignmentResult {
        let ious = iou_batch(track_boxes, det_boxes);
        let mut used = vec![false; track_boxes.len()];
        let mut matches = Vec::new();
        let mut unmatched_detections = Vec::new();

        for j in 0..det_boxes.len() {
            let mut best_iou = match_thresh;
            let mut best_track = None;
            for i in 0..track_boxes.len() {
                if used[i] {
                    continue;
                }
                // Strict > keeps the lowest track index on an exact IoU tie.
                if ious[[i, j]] > best_iou {
                    best_iou = ious[[i, j]];
                    best_track = Some(i);
                }
            }
            match best_track {
                Some(i) => {
                    used[i] = true;
                    matches.push((i, j));
                }
                None => unmatched_detections.push(j),
            }
        }

        let unmatched_tracks = (0..track_boxes.len()).filter(|&i| !used[i]).collect();

        AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        }
    }
}

/// Optimal-assignment matcher backed by the Jonker-Volgenant solver.
///
/// Minimizes total 1-IoU cost over the padded square matrix, then applies
/// the same gate as the greedy policy: pairs at or below `match_thresh`
/// IoU are rejected and treated as unmatched.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimalMatcher;

impl MatchingStrategy for OptimalMatcher {
    fn assign(
        &self,
        track_boxes: &[Rect],
        det_boxes: &[Rect],
        match_thresh: f32,
    ) -> AssignmentResult {
        let num_rows = track_boxes.len();
        let num_cols = det_boxes.len();

        if num_rows == 0 {
            return AssignmentResult {
                matches: vec![],
                unmatched_tracks: vec![],
                unmatched_detections: (0..num_cols).collect(),
            };
        }

        if num_cols == 0 {
            return AssignmentResult {
                matches: vec![],
                unmatched_tracks: (0..num_rows).collect(),
                unmatched_detections: vec![],
            };
        }

        let ious = iou_batch(track_boxes, det_boxes);
        let size = num_rows.max(num_cols);
        let mut padded = Array2::<f64>::from_elem((size, size), 1e6);

        for i in 0..num_rows {
            for j in 0..num_cols {
                padded[[i, j]] = 1.0 - ious[[i, j]] as f64;
            }
        }

        let mut matches = vec![];
        let mut unmatched_tracks = vec![];
        let mut unmatched_detections_mask: Vec<bool> = vec![true; num_cols];

        match lapjv::lapjv(&padded) {
            Ok((row_to_col, _)) => {
                for (row_idx, &col_idx) in row_to_col.iter().enumerate() {
                    if row_idx >= num_rows {
                        continue;
                    }
                    if col_idx >= num_cols {
                        unmatched_tracks.push(row_idx);
                    } else if ious[[row_idx, col_idx]] > match_thresh {
                        matches.push((row_idx, col_idx));
                        unmatched_detections_mask[col_idx] = false;
                    } else {
                        unmatched_tracks.push(row_idx);
                    }
                }
            }
            Err(_) => {
                unmatched_tracks = (0..num_rows).collect();
            }
        }

        let unmatched_detections: Vec<usize> = unmatched_detections_mask
            .iter()
            .enumerate()
            .filter_map(|(i, &u)| if u { Some(i) } else { None })
            .collect();

        AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        }
    }
}
