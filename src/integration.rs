//! Integration module for connecting detectors, schedulers and observers to
//! the counting engine.
//!
//! The engine never runs a model or reads a clock itself; this module
//! provides the traits and glue that do.

mod builder;
mod cleanup;
mod detector;
mod pipeline;

pub use builder::DetectionBuilder;
pub use cleanup::{CleanupTask, Clock, MonotonicClock, SharedEngine, shared};
pub use detector::{DetectionSource, IntoDetections};
pub use pipeline::CountingPipeline;
