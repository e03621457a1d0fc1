//! CountingPipeline for combining detection with counting.

use log::warn;

use crate::tracker::{BatchStatus, CountingEngine};

use super::DetectionSource;
use super::cleanup::{self, SharedEngine};

/// Bundles a `DetectionSource` with a shared `CountingEngine`.
///
/// The engine handle can be cloned out with `engine()` and handed to a
/// `CleanupTask`; both sides lock the same mutex.
pub struct CountingPipeline<D: DetectionSource> {
    detector: D,
    engine: SharedEngine,
}

impl<D: DetectionSource> CountingPipeline<D> {
    /// Create a new pipeline around an existing engine.
    pub fn new(detector: D, engine: CountingEngine) -> Self {
        Self {
            detector,
            engine: cleanup::shared(engine),
        }
    }

    /// Create a new pipeline with default engine configuration.
    pub fn with_default_config(detector: D) -> Self {
        Self::new(detector, CountingEngine::with_defaults())
    }

    /// Process a single frame.
    ///
    /// The detector only runs when the engine would accept a batch at
    /// `now_ms`. A detector failure leaves the engine untouched and is
    /// returned to the caller.
    ///
    /// # Arguments
    /// * `input` - Raw image bytes
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `now_ms` - Frame timestamp, non-decreasing across calls
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
        now_ms: u64,
    ) -> Result<BatchStatus, D::Error> {
        if !self.engine.lock().is_due(now_ms) {
            return Ok(BatchStatus::Throttled);
        }

        let detections = match self.detector.detect(input, width, height) {
            Ok(detections) => detections,
            Err(err) => {
                warn!("detector failed at {now_ms}ms: {err}");
                return Err(err);
            }
        };

        Ok(self
            .engine
            .lock()
            .process_detections(&detections, width, height, now_ms))
    }

    /// Get a handle to the shared engine.
    pub fn engine(&self) -> SharedEngine {
        self.engine.clone()
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }
}
