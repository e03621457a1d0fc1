//! Association of detections to tracked people.
//!
//! Greedy, single pass, one-to-one: detections are visited in input order and
//! each takes the cheapest eligible person not already claimed this batch.
//! This is not a global optimum; crowded scenes can mis-associate.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::tracker::rect::Rect;
use crate::tracker::tracked_person::TrackedPerson;

/// Class label the counter follows by default.
pub const PERSON_CLASS: &str = "person";

/// Match radius as a multiple of the detection's largest side.
pub const MATCH_RADIUS_FACTOR: f32 = 1.0;
/// Weight of the relative area change in the composite cost.
pub const SIZE_WEIGHT: f32 = 0.5;
/// Weight of staleness in the composite cost.
pub const STALENESS_WEIGHT: f32 = 0.5;
/// Idle time at which the staleness factor saturates.
pub const STALENESS_SATURATION_MS: f32 = 1000.0;

/// Marks a detection/person pair that may not be matched.
pub const INVALID_MATCH: f32 = f32::INFINITY;

/// One detector output entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label reported by the detector
    pub class: String,
    /// Detection confidence score
    pub score: f32,
    /// Bounding box in TLWH format
    pub bbox: Rect,
}

impl Detection {
    pub fn new(class: impl Into<String>, score: f32, bbox: Rect) -> Self {
        Self {
            class: class.into(),
            score,
            bbox,
        }
    }

    /// Shorthand for a `"person"` detection.
    pub fn person(bbox: Rect, score: f32) -> Self {
        Self::new(PERSON_CLASS, score, bbox)
    }

    /// Whether this entry should reach association at all.
    pub fn is_trackable(&self, class: &str, min_confidence: f32) -> bool {
        self.class == class
            && self.score.is_finite()
            && self.score > min_confidence
            && self.bbox.is_valid()
    }
}

/// Composite cost of matching `det` to `person`, or `None` if the person lies
/// outside the detection's match radius.
pub fn association_cost(det: &Rect, person: &TrackedPerson, now_ms: u64) -> Option<f32> {
    let (cx, cy) = det.center();
    let center = nalgebra::Point2::new(cx, cy);
    let distance = nalgebra::distance(&center, &person.last_center());
    if distance >= det.max_side() * MATCH_RADIUS_FACTOR {
        return None;
    }

    let det_area = det.area();
    let size_dissimilarity = (det_area - person.bbox().area()).abs() / det_area;
    let staleness = (person.idle_ms(now_ms) as f32 / STALENESS_SATURATION_MS).min(1.0);

    Some(
        distance
            * (1.0 + SIZE_WEIGHT * size_dissimilarity)
            * (1.0 + STALENESS_WEIGHT * staleness),
    )
}

/// Cost matrix of shape (detections, people); ineligible pairs hold `INVALID_MATCH`.
pub fn cost_matrix(
    detections: &[Detection],
    people: &[TrackedPerson],
    now_ms: u64,
) -> Array2<f32> {
    let mut costs = Array2::from_elem((detections.len(), people.len()), INVALID_MATCH);
    for (i, det) in detections.iter().enumerate() {
        for (j, person) in people.iter().enumerate() {
            if let Some(cost) = association_cost(&det.bbox, person, now_ms) {
                costs[[i, j]] = cost;
            }
        }
    }
    costs
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    /// `(detection index, person index)` pairs
    pub matches: Vec<(usize, usize)>,
    pub unmatched_detections: Vec<usize>,
    pub unmatched_people: Vec<usize>,
}

/// Row-by-row greedy assignment. Ties go to the lowest column index.
pub fn greedy_assignment(cost_matrix: &Array2<f32>) -> AssignmentResult {
    let (num_rows, num_cols) = cost_matrix.dim();
    let mut claimed = vec![false; num_cols];
    let mut result = AssignmentResult::default();

    for row in 0..num_rows {
        let mut best: Option<(usize, f32)> = None;
        for col in 0..num_cols {
            if claimed[col] {
                continue;
            }
            let cost = cost_matrix[[row, col]];
            if !cost.is_finite() {
                continue;
            }
            if best.is_none_or(|(_, best_cost)| cost < best_cost) {
                best = Some((col, cost));
            }
        }

        match best {
            Some((col, _)) => {
                claimed[col] = true;
                result.matches.push((row, col));
            }
            None => result.unmatched_detections.push(row),
        }
    }

    result.unmatched_people = claimed
        .iter()
        .enumerate()
        .filter_map(|(j, &c)| if c { None } else { Some(j) })
        .collect();
    result
}
