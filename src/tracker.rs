mod count;
mod counting_engine;
mod geometry;
mod matching;
mod rect;
mod tracked_person;

pub use count::{AggregateCount, ChannelObserver, CountObserver};
pub use counting_engine::{BatchStatus, CROSSING_EVIDENCE_STEP, CountingEngine, EngineConfig};
pub use geometry::{CrossingLine, INTERSECTION_TOLERANCE, Point, segments_intersect};
pub use matching::{
    AssignmentResult, Detection, PERSON_CLASS, association_cost, cost_matrix, greedy_assignment,
};
pub use rect::Rect;
pub use tracked_person::{CrossingDirection, PersonId, PositionHistory, TrackSample, TrackedPerson};
