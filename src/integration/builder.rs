//! Builder for creating Detection objects from various input formats.

use crate::tracker::{Detection, PERSON_CLASS, Rect};

/// Builder for creating `Detection` objects from various input formats.
#[derive(Debug, Clone)]
pub struct DetectionBuilder {
    class: String,
    bbox: Rect,
    score: f32,
}

impl Default for DetectionBuilder {
    fn default() -> Self {
        Self {
            class: PERSON_CLASS.to_string(),
            bbox: Rect::default(),
            score: 0.0,
        }
    }
}

impl DetectionBuilder {
    /// Create a new detection builder for the `"person"` class.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the class label.
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    /// Set bounding box in TLBR format (x1, y1, x2, y2).
    pub fn tlbr(mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        self.bbox = Rect::from_tlbr(x1, y1, x2, y2);
        self
    }

    /// Set bounding box in XYWH format (center_x, center_y, width, height).
    pub fn xywh(mut self, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::from_center(cx, cy, w, h);
        self
    }

    /// Set bounding box in TLWH format (x, y, width, height).
    pub fn tlwh(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bbox = Rect::new(x, y, w, h);
        self
    }

    /// Set the confidence score.
    pub fn score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Build the final `Detection`.
    pub fn build(self) -> Detection {
        Detection::new(self.class, self.score, self.bbox)
    }
}
