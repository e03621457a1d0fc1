//! Person tracking and directional line-crossing counting.
//!
//! Feed per-frame detections from any detector into a [`CountingEngine`]; it
//! keeps identities across frames, decides when each person crosses the
//! configured [`CrossingLine`] and in which direction, and reports running
//! [`AggregateCount`]s to registered observers.
//!
//! ```
//! use linecount_rs::{
//!     AggregateCount, CountingEngine, CrossingLine, DetectionBuilder, EngineConfig,
//! };
//!
//! let line = CrossingLine::new(320.0, 0.0, 320.0, 480.0).unwrap();
//! let mut engine = CountingEngine::new(EngineConfig::default(), line).unwrap();
//! engine.add_observer(|count: &AggregateCount| println!("{count:?}"));
//!
//! let at = |cx| DetectionBuilder::new().xywh(cx, 240.0, 200.0, 400.0).score(0.9).build();
//! engine.process_detections(&[at(250.0)], 640, 480, 0);
//! engine.process_detections(&[at(390.0)], 640, 480, 100);
//! assert_eq!(engine.count().left_to_right, 1);
//! ```

pub mod error;
pub mod integration;
pub mod tracker;

pub use error::Error;
pub use integration::{
    CleanupTask, CountingPipeline, DetectionBuilder, DetectionSource, IntoDetections, SharedEngine,
};
pub use tracker::{
    AggregateCount, BatchStatus, ChannelObserver, CountObserver, CountingEngine, CrossingDirection,
    CrossingLine, Detection, EngineConfig, PersonId, Rect, TrackedPerson,
};
