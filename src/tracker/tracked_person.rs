//! Persistent identity of a person across frames.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tracker::geometry::Point;
use crate::tracker::rect::Rect;

/// Opaque person identifier: creation timestamp plus a random suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonId {
    created_ms: u64,
    suffix: Uuid,
}

impl PersonId {
    pub(crate) fn generate(now_ms: u64) -> Self {
        Self {
            created_ms: now_ms,
            suffix: Uuid::new_v4(),
        }
    }

    pub fn created_ms(&self) -> u64 {
        self.created_ms
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.created_ms, self.suffix.as_simple())
    }
}

/// Direction of a completed crossing, judged on the x axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum CrossingDirection {
    LeftToRight,
    RightToLeft,
    #[default]
    None,
}

impl CrossingDirection {
    /// `to.x > from.x` is left-to-right, anything else right-to-left.
    pub fn between(from: &Point, to: &Point) -> Self {
        if to.x > from.x {
            Self::LeftToRight
        } else {
            Self::RightToLeft
        }
    }
}

/// One observed centroid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSample {
    pub x: f32,
    pub y: f32,
    pub timestamp_ms: u64,
}

/// FIFO of the most recent samples; pushing past capacity evicts the oldest.
#[derive(Debug, Clone)]
pub struct PositionHistory {
    samples: VecDeque<TrackSample>,
    capacity: usize,
}

impl PositionHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, returning the evicted one if the history was full.
    pub fn push(&mut self, sample: TrackSample) -> Option<TrackSample> {
        let evicted = if self.samples.len() >= self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// Change the capacity, evicting the oldest samples that no longer fit.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn latest(&self) -> Option<&TrackSample> {
        self.samples.back()
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TrackSample> {
        self.samples.iter()
    }
}

/// A person the engine is currently following.
#[derive(Debug, Clone)]
pub struct TrackedPerson {
    /// Unique identifier, never reused
    pub(crate) id: PersonId,
    /// Last observed bounding box (TLWH)
    pub(crate) bbox: Rect,
    /// Centroid of `bbox`
    pub(crate) last_center: Point,
    pub(crate) history: PositionHistory,
    pub(crate) last_seen_ms: u64,
    /// Highest detection score seen so far
    pub(crate) confidence: f32,
    /// Accumulated crossing evidence in `[0, 1]`
    pub(crate) crossing_confidence: f32,
    pub(crate) has_crossed: bool,
    pub(crate) crossing_direction: CrossingDirection,
}

impl TrackedPerson {
    /// Start tracking from a first, unmatched detection.
    pub(crate) fn new(bbox: Rect, score: f32, now_ms: u64, history_limit: usize) -> Self {
        let (cx, cy) = bbox.center();
        let mut history = PositionHistory::with_capacity(history_limit);
        history.push(TrackSample {
            x: cx,
            y: cy,
            timestamp_ms: now_ms,
        });
        Self {
            id: PersonId::generate(now_ms),
            bbox,
            last_center: Point::new(cx, cy),
            history,
            last_seen_ms: now_ms,
            confidence: score,
            crossing_confidence: 0.0,
            has_crossed: false,
            crossing_direction: CrossingDirection::None,
        }
    }

    /// Apply a matched observation. Returns the centroid before the update.
    pub(crate) fn observe(&mut self, bbox: Rect, score: f32, now_ms: u64) -> Point {
        let previous = self.last_center;
        let (cx, cy) = bbox.center();
        self.history.push(TrackSample {
            x: cx,
            y: cy,
            timestamp_ms: now_ms,
        });
        self.bbox = bbox;
        self.last_center = Point::new(cx, cy);
        self.last_seen_ms = now_ms;
        self.confidence = self.confidence.max(score);
        previous
    }

    /// Add crossing evidence, saturating at 1.0. Returns the new total.
    pub(crate) fn add_crossing_evidence(&mut self, amount: f32) -> f32 {
        self.crossing_confidence = (self.crossing_confidence + amount).min(1.0);
        self.crossing_confidence
    }

    /// Latch the crossing. Only the first call has any effect.
    pub(crate) fn mark_crossed(&mut self, direction: CrossingDirection) -> bool {
        if self.has_crossed {
            return false;
        }
        self.has_crossed = true;
        self.crossing_direction = direction;
        true
    }

    pub fn id(&self) -> PersonId {
        self.id
    }

    pub fn bbox(&self) -> Rect {
        self.bbox
    }

    pub fn last_center(&self) -> Point {
        self.last_center
    }

    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    /// Trail for overlays, oldest to newest.
    pub fn trail(&self) -> impl Iterator<Item = Point> + '_ {
        self.history.iter().map(|s| Point::new(s.x, s.y))
    }

    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn crossing_confidence(&self) -> f32 {
        self.crossing_confidence
    }

    pub fn has_crossed(&self) -> bool {
        self.has_crossed
    }

    pub fn crossing_direction(&self) -> CrossingDirection {
        self.crossing_direction
    }

    /// Milliseconds since the last match; zero if `now_ms` is behind.
    #[inline]
    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_seen_ms)
    }
}
