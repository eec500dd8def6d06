//! End-to-end coordinator runs: completeness, backpressure, shutdown and failure handling.

mod common;

use anyhow::Result;
use common::*;
use crossbeam_channel::Sender;
use segsig::engine::{Blake3Hasher, SegmentHasher, hash_hex};
use segsig::source::{IterSource, segments_source};
use segsig::{Digest, QueueSettings, Segment};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

fn queue(max_queue_size: usize, cooldown_ms: u64) -> QueueSettings {
    QueueSettings {
        max_queue_size,
        cooldown: Duration::from_millis(cooldown_ms),
    }
}

// --- completeness ---

#[test]
fn test_every_segment_hashed_exactly_once() {
    let log = RecordingLog::new();
    let c = vec_coordinator(make_segments(500, 64), &log, QueueSettings::unbounded());
    let report = run_with_timeout(c, 4, TIMEOUT);

    assert!(report.succeeded);
    assert_eq!(report.segments_produced, 500);
    assert_eq!(report.segments_hashed, 500);
    assert_eq!(report.hashed_per_worker.len(), 4);
    assert_eq!(report.hashed_per_worker.iter().sum::<u64>(), 500);
    assert_eq!(report.segments_abandoned, 0);

    let digests = log.digests_by_id();
    let ids: HashSet<u64> = digests.keys().copied().collect();
    assert_eq!(ids, (0..500).collect::<HashSet<u64>>());
}

#[test]
fn test_signatures_match_blake3_of_segment_data() {
    let log = RecordingLog::new();
    let segments = make_segments(20, 1000);
    let c = vec_coordinator(segments.clone(), &log, QueueSettings::unbounded());
    assert!(c.run(3));

    let digests = log.digests_by_id();
    for s in &segments {
        assert_eq!(digests[&s.id], hash_hex(&s.data));
    }
}

#[test]
fn test_identical_reruns_produce_identical_digests() {
    let log_a = RecordingLog::new();
    let log_b = RecordingLog::new();
    let segments = make_segments(50, 128);
    assert!(vec_coordinator(segments.clone(), &log_a, QueueSettings::unbounded()).run(4));
    assert!(vec_coordinator(segments, &log_b, QueueSettings::unbounded()).run(2));
    assert_eq!(log_a.digests_by_id(), log_b.digests_by_id());
}

#[test]
fn test_same_coordinator_can_run_twice() {
    let log = RecordingLog::new();
    let c = vec_coordinator(make_segments(10, 4), &log, QueueSettings::unbounded());
    assert!(c.run(2));
    assert!(c.run(2));
    assert_eq!(log.signatures().len(), 20);
    assert_eq!(log.flush_count(), 2);
}

// --- concrete scenario ---

#[test]
fn test_five_single_byte_segments_two_workers() {
    let log = RecordingLog::new();
    let segments: Vec<Segment> = (0..5).map(|i| Segment::new(i, vec![b'a' + i as u8])).collect();
    let c = vec_coordinator(segments, &log, queue(0, 0));
    let report = run_with_timeout(c, 2, TIMEOUT);

    assert!(report.succeeded);
    let sigs = log.signatures();
    assert_eq!(sigs.len(), 5);
    let distinct: HashSet<(u64, String)> = sigs.iter().map(|(_, id, d)| (*id, d.clone())).collect();
    assert_eq!(distinct.len(), 5);
    assert!(report.hashed_per_worker.iter().all(|&n| n >= 1));
}

/// BLAKE3 that signals after every digest, so a source can wait for the worker.
struct NotifyingHasher(Sender<()>);

impl SegmentHasher for NotifyingHasher {
    fn hash(&self, data: &[u8]) -> Result<Digest> {
        let digest = Blake3Hasher.hash(data);
        let _ = self.0.send(());
        digest
    }

    fn name(&self) -> &'static str {
        "notifying"
    }
}

#[test]
fn test_last_segment_queued_while_worker_self_serves_is_hashed() {
    // The second segment arrives right as the only worker finishes the first, while it is
    // checking the queue and the end-of-input flag.
    for round in 0..200 {
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<()>();
        let source = IterSource::new(move || {
            let done_rx = done_rx.clone();
            (0..2u64).map(move |i| {
                if i == 1 {
                    let _ = done_rx.recv_timeout(Duration::from_secs(5));
                }
                Ok::<_, anyhow::Error>(Segment::new(i, vec![i as u8; 8]))
            })
        });
        let log = RecordingLog::new();
        let c = coordinator(
            source,
            NotifyingHasher(done_tx),
            &log,
            QueueSettings::unbounded(),
        );
        let report = run_with_timeout(c, 1, TIMEOUT);

        assert!(report.succeeded, "round {}", round);
        assert_eq!(report.segments_produced, 2, "round {}", round);
        assert_eq!(report.segments_hashed, 2, "round {}", round);
        assert_eq!(log.digests_by_id().len(), 2, "round {}", round);
    }
}

// --- backpressure ---

#[test]
fn test_queue_never_exceeds_cap_plus_one() {
    let log = RecordingLog::new();
    let c = coordinator(
        segments_source(make_segments(80, 16)),
        SlowHasher(Duration::from_millis(2)),
        &log,
        queue(3, 1),
    );
    let report = run_with_timeout(c, 2, TIMEOUT);

    assert!(report.succeeded);
    assert_eq!(report.segments_hashed, 80);
    assert!(report.peak_queue_len <= 4, "peak {}", report.peak_queue_len);
    assert!(report.cooldowns > 0);
}

#[test]
fn test_no_cooldown_when_queue_unbounded() {
    let log = RecordingLog::new();
    let c = coordinator(
        segments_source(make_segments(60, 16)),
        SlowHasher(Duration::from_millis(1)),
        &log,
        queue(0, 5),
    );
    let report = run_with_timeout(c, 2, TIMEOUT);

    assert!(report.succeeded);
    assert_eq!(report.cooldowns, 0);
    assert_eq!(report.segments_hashed, 60);
}

#[test]
fn test_no_cooldown_when_cooldown_zero() {
    let log = RecordingLog::new();
    let c = coordinator(
        segments_source(make_segments(60, 16)),
        SlowHasher(Duration::from_millis(1)),
        &log,
        queue(2, 0),
    );
    let report = run_with_timeout(c, 2, TIMEOUT);

    assert!(report.succeeded);
    assert_eq!(report.cooldowns, 0);
}

// --- shutdown ---

#[test]
fn test_empty_source_finishes_successfully() {
    let log = RecordingLog::new();
    let c = vec_coordinator(Vec::new(), &log, QueueSettings::unbounded());
    let started = Instant::now();
    let report = run_with_timeout(c, 4, TIMEOUT);

    assert!(report.succeeded);
    assert_eq!(report.segments_hashed, 0);
    assert!(started.elapsed() < Duration::from_secs(5));
    for w in 0..4 {
        assert!(log.has_info(&format!("worker {} stopped", w)));
    }
}

#[test]
fn test_more_workers_than_segments() {
    let log = RecordingLog::new();
    let c = vec_coordinator(make_segments(2, 8), &log, QueueSettings::unbounded());
    let report = run_with_timeout(c, 8, TIMEOUT);
    assert!(report.succeeded);
    assert_eq!(report.segments_hashed, 2);
}

#[test]
fn test_zero_workers_runs_with_one() {
    let log = RecordingLog::new();
    let c = vec_coordinator(make_segments(5, 8), &log, QueueSettings::unbounded());
    let report = run_with_timeout(c, 0, TIMEOUT);
    assert!(report.succeeded);
    assert_eq!(report.workers, 1);
    assert_eq!(report.hashed_per_worker, vec![5]);
}

#[test]
fn test_flush_once_after_every_worker_stopped() {
    let log = RecordingLog::new();
    let c = vec_coordinator(make_segments(30, 8), &log, QueueSettings::unbounded());
    assert!(c.run(3));

    let events = log.events();
    assert_eq!(log.flush_count(), 1);
    assert_eq!(events.last(), Some(&Event::Flush));
    let flush_at = events.len() - 1;
    for w in 0..3 {
        let stopped = Event::Info(format!("worker {} stopped", w));
        let pos = events.iter().position(|e| *e == stopped).expect("stop line");
        assert!(pos < flush_at);
    }
    assert!(log.has_info("producer started"));
    assert!(log.has_info("producer stopped"));
}

#[test]
fn test_repeated_runs_do_not_deadlock() {
    for round in 0..25 {
        let log = RecordingLog::new();
        let workers = 1 + round % 6;
        let c = vec_coordinator(make_segments(300, 1), &log, queue(2, 0));
        let report = run_with_timeout(c, workers, TIMEOUT);
        assert!(report.succeeded, "round {}", round);
        assert_eq!(report.segments_hashed, 300, "round {}", round);
        assert_eq!(log.digests_by_id().len(), 300);
    }
}

// --- failures ---

#[test]
fn test_source_failure_fails_run_but_keeps_earlier_segments() {
    let log = RecordingLog::new();
    let c = coordinator(failing_source(6), Blake3Hasher, &log, QueueSettings::unbounded());
    let report = run_with_timeout(c, 3, TIMEOUT);

    assert!(!report.succeeded);
    assert_eq!(report.segments_produced, 7);
    let ids: HashSet<u64> = log.digests_by_id().keys().copied().collect();
    assert_eq!(ids, (0..=6).collect::<HashSet<u64>>());
    let errors = log.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("disk went away"), "{}", errors[0]);
    assert!(report.error.is_some());
    assert_eq!(log.flush_count(), 1);
}

#[test]
fn test_source_failure_before_first_segment() {
    let log = RecordingLog::new();
    let c = coordinator(failing_source(0), Blake3Hasher, &log, QueueSettings::unbounded());
    let report = run_with_timeout(c, 2, TIMEOUT);
    assert!(!report.succeeded);
    assert!(log.digests_by_id().keys().all(|&id| id == 0));
}

#[test]
fn test_hasher_error_fails_run_and_shuts_down() {
    let log = RecordingLog::new();
    let c = coordinator(
        segments_source(make_segments(40, 8)),
        FailingHasher(5),
        &log,
        QueueSettings::unbounded(),
    );
    let report = run_with_timeout(c, 4, TIMEOUT);

    assert!(!report.succeeded);
    assert!(!log.digests_by_id().contains_key(&5));
    let errors = log.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("segment 5"), "{}", errors[0]);
    assert_eq!(log.flush_count(), 1);
    // Every produced segment is hashed, the failed one, or counted as left behind.
    assert_eq!(
        report.segments_hashed + report.segments_abandoned + 1,
        report.segments_produced
    );
}

#[test]
fn test_hasher_panic_fails_run_without_hanging() {
    let log = RecordingLog::new();
    let c = coordinator(
        segments_source(make_segments(40, 8)),
        PanickingHasher(3),
        &log,
        QueueSettings::unbounded(),
    );
    let report = run_with_timeout(c, 3, TIMEOUT);

    assert!(!report.succeeded);
    assert!(log.errors().iter().any(|e| e.contains("panicked")));
    assert_eq!(log.flush_count(), 1);
}

#[test]
fn test_interrupt_stops_producer() {
    let log = RecordingLog::new();
    let flag = Arc::new(AtomicBool::new(true));
    let c = vec_coordinator(make_segments(100, 8), &log, QueueSettings::unbounded())
        .with_interrupt(flag);
    let report = run_with_timeout(c, 2, TIMEOUT);

    assert!(!report.succeeded);
    assert_eq!(report.segments_hashed, 0);
    assert_eq!(report.error.as_deref(), Some("interrupted"));
}
