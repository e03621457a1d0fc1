//! Trait for object detection inference backends.

use crate::tracker::Detection;

/// Trait for object detection inference backends.
///
/// Implement this trait to feed any detection model into the counter.
///
/// # Example
///
/// ```ignore
/// use linecount_rs::{DetectionSource, Detection};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(
///         &mut self,
///         input: &[u8],
///         width: u32,
///         height: u32,
///     ) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections of every class
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error: std::fmt::Display;

    /// Run inference on raw image data and return detections.
    ///
    /// # Arguments
    /// * `input` - Raw image bytes (format depends on implementation)
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    fn detect(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, Self::Error>;
}

/// Helper trait for converting model-specific outputs to `Detection`.
pub trait IntoDetections {
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

/// `(class, score, [x, y, width, height])` tuples, the shape most detector
/// bindings hand back.
impl IntoDetections for Vec<(String, f32, [f32; 4])> {
    fn into_detections(self) -> Vec<Detection> {
        self.into_iter()
            .map(|(class, score, [x, y, w, h])| {
                Detection::new(class, score, crate::tracker::Rect::new(x, y, w, h))
            })
            .collect()
    }
}
