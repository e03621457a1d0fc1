use linecount_rs::tracker::PERSON_CLASS;
use linecount_rs::{
    AggregateCount, BatchStatus, ChannelObserver, CountingEngine, CrossingDirection, CrossingLine,
    Detection, EngineConfig, Rect,
};

const W: u32 = 640;
const H: u32 = 480;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn person_at(cx: f32, cy: f32) -> Detection {
    Detection::person(Rect::from_center(cx, cy, 200.0, 400.0), 0.9)
}

fn horizontal_engine() -> CountingEngine {
    let line = CrossingLine::new(0.0, 240.0, 640.0, 240.0).unwrap();
    CountingEngine::new(EngineConfig::default(), line).unwrap()
}

fn recording(engine: &mut CountingEngine) -> crossbeam_channel::Receiver<AggregateCount> {
    let (tx, rx) = crossbeam_channel::unbounded();
    engine.add_observer(ChannelObserver::new(tx));
    rx
}

#[test]
fn test_left_to_right_crossing() {
    init_logger();
    let mut engine = horizontal_engine();

    engine.process_detections(&[person_at(100.0, 240.0)], W, H, 0);
    assert_eq!(engine.count().total, 0);

    engine.process_detections(&[person_at(400.0, 240.0)], W, H, 100);
    let count = engine.count();
    assert_eq!(count.left_to_right, 1);
    assert_eq!(count.right_to_left, 0);
    assert_eq!(count.total, 1);
}

#[test]
fn test_right_to_left_crossing() {
    let mut engine = horizontal_engine();

    engine.process_detections(&[person_at(400.0, 240.0)], W, H, 0);
    engine.process_detections(&[person_at(100.0, 240.0)], W, H, 100);

    let count = engine.count();
    assert_eq!(count.left_to_right, 0);
    assert_eq!(count.right_to_left, 1);
    assert_eq!(count.total, 1);
    assert_eq!(
        engine.tracked_people()[0].crossing_direction(),
        CrossingDirection::RightToLeft
    );
}

#[test]
fn test_low_confidence_is_never_tracked() {
    let mut engine = horizontal_engine();
    let weak = Detection::person(Rect::from_center(100.0, 240.0, 200.0, 400.0), 0.2);

    engine.process_detections(&[weak], W, H, 0);
    assert!(engine.is_empty());
}

#[test]
fn test_stale_person_is_removed_but_count_kept() {
    let mut engine = horizontal_engine();
    engine.process_detections(&[person_at(100.0, 240.0)], W, H, 0);
    engine.process_detections(&[person_at(400.0, 240.0)], W, H, 100);
    assert_eq!(engine.len(), 1);

    let removed = engine.cleanup_stale(6100);
    assert_eq!(removed, 1);
    assert!(engine.is_empty());
    assert_eq!(engine.count().left_to_right, 1);
    assert_eq!(engine.count().total, 1);
}

#[test]
fn test_reset_then_recount() {
    let mut engine = horizontal_engine();
    let rx = recording(&mut engine);

    // Prior history: one crossing, then the same person wandering back.
    engine.process_detections(&[person_at(100.0, 240.0)], W, H, 0);
    engine.process_detections(&[person_at(400.0, 240.0)], W, H, 100);
    engine.process_detections(&[person_at(400.0, 100.0)], W, H, 10_000);
    engine.process_detections(&[person_at(100.0, 100.0)], W, H, 10_100);
    assert!(engine.count().total >= 1);

    engine.reset_count();
    assert!(engine.is_empty());
    assert_eq!(engine.count(), AggregateCount::default());
    assert_eq!(rx.try_iter().last(), Some(AggregateCount::default()));

    engine.process_detections(&[person_at(100.0, 240.0)], W, H, 20_000);
    engine.process_detections(&[person_at(400.0, 240.0)], W, H, 20_100);
    let count = engine.count();
    assert_eq!(count.left_to_right, 1);
    assert_eq!(count.right_to_left, 0);
    assert_eq!(count.total, 1);
}

#[test]
fn test_observer_sees_crossing_then_batch_sync() {
    let mut engine = horizontal_engine();
    let rx = recording(&mut engine);

    engine.process_detections(&[person_at(100.0, 240.0)], W, H, 0);
    engine.process_detections(&[person_at(400.0, 240.0)], W, H, 100);

    let totals: Vec<u64> = rx.try_iter().map(|c| c.total).collect();
    assert_eq!(totals, vec![0, 1, 1]);
}

#[test]
fn test_counts_are_monotonic_and_consistent() {
    init_logger();
    let mut engine = CountingEngine::with_defaults();
    let rx = recording(&mut engine);

    // Three people walking across x=320 at different heights and speeds,
    // one of them turning back after crossing.
    let walks: [(f32, f32, f32); 3] = [
        (100.0, 40.0, 60.0),
        (560.0, -50.0, 240.0),
        (200.0, 30.0, 420.0),
    ];
    for step in 0..12u64 {
        let dets: Vec<Detection> = walks
            .iter()
            .map(|&(start, speed, y)| {
                let mut x = start + speed * step as f32;
                if speed < 0.0 && step > 8 {
                    x = start + speed * (16 - step) as f32;
                }
                Detection::person(Rect::from_center(x, y, 60.0, 120.0), 0.8)
            })
            .collect();
        engine.process_detections(&dets, W, H, step * 100);
    }

    let snapshots: Vec<AggregateCount> = rx.try_iter().collect();
    assert!(!snapshots.is_empty());
    let mut last_total = 0;
    for count in &snapshots {
        assert_eq!(count.total, count.left_to_right + count.right_to_left);
        assert!(count.total >= last_total);
        last_total = count.total;
    }

    // Each person contributes at most once.
    let crossed = engine.tracked_people().iter().filter(|p| p.has_crossed()).count() as u64;
    assert_eq!(engine.count().total, crossed);
    assert_eq!(engine.count().left_to_right, 2);
    assert_eq!(engine.count().right_to_left, 1);
}

#[test]
fn test_crossing_evidence_accumulates_over_steps() {
    let line = CrossingLine::new(0.0, 240.0, 640.0, 240.0).unwrap();
    let config = EngineConfig {
        min_crossing_confidence: 0.9,
        ..Default::default()
    };
    let mut engine = CountingEngine::new(config, line).unwrap();
    let rx = recording(&mut engine);

    engine.process_detections(&[person_at(100.0, 240.0)], W, H, 0);

    // One intersecting step is not enough evidence at 0.9.
    let status = engine.process_detections(&[person_at(200.0, 240.0)], W, H, 100);
    assert!(matches!(status, BatchStatus::Processed { crossings: 0, .. }));
    let person = &engine.tracked_people()[0];
    assert!(!person.has_crossed());
    assert!((person.crossing_confidence() - 0.7).abs() < 1e-6);
    assert_eq!(person.crossing_direction(), CrossingDirection::None);
    assert_eq!(engine.count().total, 0);

    // The second intersecting step latches the crossing.
    let status = engine.process_detections(&[person_at(300.0, 240.0)], W, H, 200);
    assert!(matches!(status, BatchStatus::Processed { crossings: 1, .. }));
    let person = &engine.tracked_people()[0];
    assert!(person.has_crossed());
    assert!(person.crossing_confidence() <= 1.0);
    assert_eq!(person.crossing_direction(), CrossingDirection::LeftToRight);

    // Further intersecting steps add nothing.
    engine.process_detections(&[person_at(400.0, 240.0)], W, H, 300);
    let person = &engine.tracked_people()[0];
    assert!(person.crossing_confidence() <= 1.0);
    assert_eq!(engine.len(), 1);
    let count = engine.count();
    assert_eq!(count.left_to_right, 1);
    assert_eq!(count.total, 1);

    let totals: Vec<u64> = rx.try_iter().map(|c| c.total).collect();
    assert_eq!(totals, vec![0, 0, 1, 1, 1]);
}

#[test]
fn test_throttled_call_changes_nothing() {
    let mut once = horizontal_engine();
    let mut twice = horizontal_engine();

    once.process_detections(&[person_at(100.0, 240.0)], W, H, 0);
    twice.process_detections(&[person_at(100.0, 240.0)], W, H, 0);
    let dets = [person_at(400.0, 240.0), person_at(500.0, 50.0)];
    let status = twice.process_detections(&dets, W, H, 20);

    assert_eq!(status, BatchStatus::Throttled);
    assert_eq!(once.count(), twice.count());
    assert_eq!(once.len(), twice.len());
    let a = &once.tracked_people()[0];
    let b = &twice.tracked_people()[0];
    assert_eq!(a.last_center(), b.last_center());
    assert_eq!(a.history().len(), b.history().len());
    assert_eq!(a.last_seen_ms(), b.last_seen_ms());
}

#[test]
fn test_identical_inputs_give_identical_counts() {
    let batches: Vec<(Vec<Detection>, u64)> = (0..10u64)
        .map(|i| {
            let t = i as f32;
            (
                vec![
                    person_at(150.0 + 30.0 * t, 200.0),
                    person_at(500.0 - 35.0 * t, 260.0),
                    Detection::new("car", 0.95, Rect::new(0.0, 0.0, 50.0, 50.0)),
                ],
                i * 60,
            )
        })
        .collect();

    let run = || {
        let mut engine = CountingEngine::with_defaults();
        let rx = recording(&mut engine);
        for (dets, now) in &batches {
            engine.process_detections(dets, W, H, *now);
        }
        rx.try_iter().collect::<Vec<_>>()
    };

    let first = run();
    let second = run();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_duplicate_detection_spawns_second_person() {
    let mut engine = horizontal_engine();
    engine.process_detections(&[person_at(100.0, 100.0)], W, H, 0);

    let dets = [person_at(110.0, 100.0), person_at(111.0, 100.0)];
    let status = engine.process_detections(&dets, W, H, 100);
    assert_eq!(
        status,
        BatchStatus::Processed {
            matched: 1,
            created: 1,
            crossings: 0
        }
    );
    assert_eq!(engine.len(), 2);
    assert_eq!(engine.tracked_people()[0].last_center().x, 110.0);
}

#[test]
fn test_malformed_and_foreign_detections_are_dropped() {
    let mut engine = horizontal_engine();
    let dets = vec![
        Detection::person(Rect::new(f32::NAN, 0.0, 10.0, 10.0), 0.9),
        Detection::person(Rect::new(0.0, 0.0, -10.0, 10.0), 0.9),
        Detection::person(Rect::new(0.0, 0.0, 10.0, f32::INFINITY), 0.9),
        Detection::new("dog", 0.9, Rect::new(0.0, 0.0, 10.0, 10.0)),
        Detection::new(PERSON_CLASS, 0.9, Rect::new(0.0, 0.0, 10.0, 10.0)),
    ];

    let status = engine.process_detections(&dets, W, H, 0);
    assert_eq!(
        status,
        BatchStatus::Processed {
            matched: 0,
            created: 1,
            crossings: 0
        }
    );
    assert_eq!(engine.len(), 1);
}

#[test]
fn test_empty_batches_and_repeated_timestamps() {
    let mut engine = CountingEngine::with_defaults();
    engine.process_detections(&[], W, H, 0);
    engine.process_detections(&[], W, H, 0);
    engine.process_detections(&[person_at(100.0, 240.0)], W, H, 0);
    assert!(engine.is_empty());

    engine.process_detections(&[person_at(100.0, 240.0)], W, H, 50);
    engine.process_detections(&[], W, H, 100);
    assert_eq!(engine.len(), 1);
    assert_eq!(engine.cleanup_stale(100), 0);
}

#[test]
fn test_cleanup_on_all_stale_empties_live_set() {
    let mut engine = CountingEngine::with_defaults();
    engine.process_detections(&[person_at(100.0, 100.0), person_at(500.0, 400.0)], W, H, 0);
    engine.process_detections(&[person_at(105.0, 100.0)], W, H, 1000);
    assert_eq!(engine.len(), 2);

    assert_eq!(engine.cleanup_stale(5500), 1);
    assert_eq!(engine.cleanup_stale(6001), 1);
    assert!(engine.is_empty());
}
