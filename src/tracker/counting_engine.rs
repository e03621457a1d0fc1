//! Tracking and counting engine.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::tracker::count::{AggregateCount, CountObserver};
use crate::tracker::geometry::CrossingLine;
use crate::tracker::matching::{self, AssignmentResult, Detection, PERSON_CLASS};
use crate::tracker::tracked_person::{CrossingDirection, PersonId, TrackedPerson};

/// Evidence added each time a trajectory step intersects the line.
pub const CROSSING_EVIDENCE_STEP: f32 = 0.7;

/// Configuration for the `CountingEngine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum time between accepted batches
    pub detection_interval_ms: u64,
    /// Period at which a scheduler should run `cleanup_stale`
    pub cleanup_interval_ms: u64,
    /// Idle time after which a person is forgotten
    pub cleanup_horizon_ms: u64,
    pub min_tracking_confidence: f32,
    pub min_crossing_confidence: f32,
    pub position_history_limit: usize,
    /// Movement below `frame_width * movement_noise_floor` is ignored for crossings
    pub movement_noise_floor: f32,
    /// Detector class label that gets tracked
    pub target_class: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            detection_interval_ms: 50,
            cleanup_interval_ms: 3000,
            cleanup_horizon_ms: 5000,
            min_tracking_confidence: 0.3,
            min_crossing_confidence: 0.3,
            position_history_limit: 20,
            movement_noise_floor: 0.002,
            target_class: PERSON_CLASS.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), Error> {
        fn unit(field: &'static str, value: f32) -> Result<(), Error> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(Error::InvalidConfig {
                    field,
                    reason: format!("{value} is outside [0, 1]"),
                })
            }
        }

        unit("min_tracking_confidence", self.min_tracking_confidence)?;
        unit("min_crossing_confidence", self.min_crossing_confidence)?;

        if self.position_history_limit == 0 {
            return Err(Error::InvalidConfig {
                field: "position_history_limit",
                reason: "must hold at least one sample".into(),
            });
        }
        if !self.movement_noise_floor.is_finite() || self.movement_noise_floor < 0.0 {
            return Err(Error::InvalidConfig {
                field: "movement_noise_floor",
                reason: format!(
                    "{} is not a finite non-negative factor",
                    self.movement_noise_floor
                ),
            });
        }
        if self.cleanup_horizon_ms == 0 {
            return Err(Error::InvalidConfig {
                field: "cleanup_horizon_ms",
                reason: "must be positive".into(),
            });
        }
        if self.cleanup_interval_ms == 0 {
            return Err(Error::InvalidConfig {
                field: "cleanup_interval_ms",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Outcome of a `process_detections` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Arrived within the detection interval; nothing changed.
    Throttled,
    /// Zero-size frame; nothing changed.
    Skipped,
    Processed {
        matched: usize,
        created: usize,
        crossings: usize,
    },
}

/// Owns every tracked person and the aggregate count.
///
/// Not internally synchronized: callers serialize `process_detections`,
/// `cleanup_stale` and `reset_count` (see `integration::SharedEngine`).
pub struct CountingEngine {
    people: Vec<TrackedPerson>,
    count: AggregateCount,
    line: CrossingLine,
    config: EngineConfig,
    last_batch_ms: Option<u64>,
    observers: Vec<Box<dyn CountObserver>>,
}

impl std::fmt::Debug for CountingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingEngine")
            .field("people", &self.people.len())
            .field("count", &self.count)
            .field("line", &self.line)
            .field("config", &self.config)
            .field("last_batch_ms", &self.last_batch_ms)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for CountingEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CountingEngine {
    pub fn new(config: EngineConfig, line: CrossingLine) -> Result<Self, Error> {
        config.validate()?;
        line.validate()?;
        Ok(Self {
            people: Vec::new(),
            count: AggregateCount::default(),
            line,
            config,
            last_batch_ms: None,
            observers: Vec::new(),
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            people: Vec::new(),
            count: AggregateCount::default(),
            line: CrossingLine::default(),
            config: EngineConfig::default(),
            last_batch_ms: None,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: impl CountObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Whether a batch stamped `now_ms` would pass the throttle. Lets callers
    /// skip running the detector for frames the engine would ignore.
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.last_batch_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.config.detection_interval_ms)
    }

    /// Consume one frame worth of detections.
    ///
    /// `now_ms` must be non-decreasing across calls. Invalid entries are
    /// dropped; this never fails.
    pub fn process_detections(
        &mut self,
        detections: &[Detection],
        frame_width: u32,
        frame_height: u32,
        now_ms: u64,
    ) -> BatchStatus {
        if !self.is_due(now_ms) {
            trace!("throttled batch at {now_ms}ms");
            return BatchStatus::Throttled;
        }
        if frame_width == 0 || frame_height == 0 {
            trace!("skipping batch for empty frame {frame_width}x{frame_height}");
            return BatchStatus::Skipped;
        }
        self.last_batch_ms = Some(now_ms);

        // Step 1: Filter
        let candidates: Vec<Detection> = detections
            .iter()
            .filter(|d| {
                let keep = d.is_trackable(
                    &self.config.target_class,
                    self.config.min_tracking_confidence,
                );
                if !keep && d.class == self.config.target_class {
                    trace!("dropping detection {:?} (score {})", d.bbox, d.score);
                }
                keep
            })
            .cloned()
            .collect();

        // Step 2: Associate
        let costs = matching::cost_matrix(&candidates, &self.people, now_ms);
        let AssignmentResult {
            matches,
            unmatched_detections,
            ..
        } = matching::greedy_assignment(&costs);

        // Step 3: Update matched people and evaluate crossings
        let noise_floor = frame_width as f32 * self.config.movement_noise_floor;
        let mut crossings = 0;
        for &(idet, iperson) in &matches {
            let det = &candidates[idet];
            let person = &mut self.people[iperson];
            let previous = person.observe(det.bbox, det.score, now_ms);
            let current = person.last_center();

            if person.has_crossed() {
                continue;
            }
            if nalgebra::distance(&previous, &current) < noise_floor {
                continue;
            }
            if !self.line.is_crossed_by(&previous, &current) {
                continue;
            }

            let evidence = person.add_crossing_evidence(CROSSING_EVIDENCE_STEP);
            if evidence >= self.config.min_crossing_confidence {
                let direction = CrossingDirection::between(&previous, &current);
                if person.mark_crossed(direction) {
                    debug!("person {} crossed {:?} at {now_ms}ms", person.id(), direction);
                    self.count.record(direction);
                    crossings += 1;
                    let snapshot = self.count;
                    self.notify(&snapshot);
                }
            }
        }

        // Step 4: Start tracking unmatched detections
        for &idet in &unmatched_detections {
            let det = &candidates[idet];
            let limit = self.config.position_history_limit;
            let person = TrackedPerson::new(det.bbox, det.score, now_ms, limit);
            debug!("new person {} at {:?}", person.id(), person.last_center());
            self.people.push(person);
        }

        let snapshot = self.count;
        self.notify(&snapshot);

        BatchStatus::Processed {
            matched: matches.len(),
            created: unmatched_detections.len(),
            crossings,
        }
    }

    /// Forget every person idle for longer than the cleanup horizon.
    /// Counts are untouched. Returns the number removed.
    pub fn cleanup_stale(&mut self, now_ms: u64) -> usize {
        let horizon = self.config.cleanup_horizon_ms;
        let before = self.people.len();
        self.people.retain(|p| {
            let keep = p.idle_ms(now_ms) <= horizon;
            if !keep {
                debug!("removing stale person {} (idle {}ms)", p.id(), p.idle_ms(now_ms));
            }
            keep
        });
        before - self.people.len()
    }

    /// Zero the count, drop every tracked person and notify observers.
    pub fn reset_count(&mut self) {
        debug!("resetting count {:?} and {} tracked people", self.count, self.people.len());
        self.count.reset();
        self.people.clear();
        self.last_batch_ms = None;
        let snapshot = self.count;
        self.notify(&snapshot);
    }

    /// Replace the crossing line. Existing crossing state and counts are kept.
    ///
    /// A line with a non-finite coordinate or zero length is rejected with
    /// `Error::InvalidLine` and the current line stays in place. This is the
    /// only engine operation on the counting path that can fail, and it only
    /// fails on a reconfiguration request, never on frame input.
    pub fn set_crossing_line(&mut self, line: CrossingLine) -> Result<(), Error> {
        line.validate()?;
        debug!("crossing line set to {line:?}");
        self.line = line;
        Ok(())
    }

    /// Replace the configuration.
    ///
    /// A changed `position_history_limit` is applied to every live person
    /// immediately, evicting their oldest samples if needed. A running
    /// `CleanupTask` picks up a new `cleanup_interval_ms` after its current wait.
    pub fn set_config(&mut self, config: EngineConfig) -> Result<(), Error> {
        config.validate()?;
        if config.position_history_limit != self.config.position_history_limit {
            for person in self.people.iter_mut() {
                person.history.set_capacity(config.position_history_limit);
            }
        }
        self.config = config;
        Ok(())
    }

    pub fn crossing_line(&self) -> CrossingLine {
        self.line
    }

    pub fn count(&self) -> AggregateCount {
        self.count
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Live people in insertion order.
    pub fn tracked_people(&self) -> &[TrackedPerson] {
        &self.people
    }

    pub fn person(&self, id: &PersonId) -> Option<&TrackedPerson> {
        self.people.iter().find(|p| p.id() == *id)
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    fn notify(&mut self, count: &AggregateCount) {
        for observer in self.observers.iter_mut() {
            observer.on_count_changed(count);
        }
    }
}
