//! Directional totals and the notification seam for their consumers.

use crossbeam_channel::{Sender, TrySendError};
use log::trace;
use serde::{Deserialize, Serialize};

use crate::tracker::tracked_person::CrossingDirection;

/// Running directional count. `total` always equals the sum of both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateCount {
    pub left_to_right: u64,
    pub right_to_left: u64,
    pub total: u64,
}

impl AggregateCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed crossing. `CrossingDirection::None` is ignored.
    pub fn record(&mut self, direction: CrossingDirection) {
        match direction {
            CrossingDirection::LeftToRight => self.left_to_right += 1,
            CrossingDirection::RightToLeft => self.right_to_left += 1,
            CrossingDirection::None => return,
        }
        self.total = self.left_to_right + self.right_to_left;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Receives count snapshots from the engine.
///
/// Called synchronously on the thread driving the engine. Implementations
/// must return promptly and must not call back into the engine.
pub trait CountObserver: Send {
    fn on_count_changed(&mut self, count: &AggregateCount);
}

impl<F> CountObserver for F
where
    F: FnMut(&AggregateCount) + Send,
{
    fn on_count_changed(&mut self, count: &AggregateCount) {
        self(count)
    }
}

/// Channel-backed observer for decoupled consumers. A full bounded channel
/// drops the snapshot rather than blocking the engine; a later notification
/// carries the newer totals.
#[derive(Debug, Clone)]
pub struct ChannelObserver(pub Sender<AggregateCount>);

impl ChannelObserver {
    pub fn new(sender: Sender<AggregateCount>) -> Self {
        Self(sender)
    }
}

impl CountObserver for ChannelObserver {
    fn on_count_changed(&mut self, count: &AggregateCount) {
        match self.0.try_send(*count) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("count channel full, dropping {count:?}"),
            Err(TrySendError::Disconnected(_)) => trace!("count channel disconnected"),
        }
    }
}
