//! Shared fixtures: recording log sink, scripted sources and misbehaving hashers.
#![allow(dead_code)]

use anyhow::{Result, anyhow};
use segsig::engine::{Blake3Hasher, SegmentHasher};
use segsig::pipeline::Coordinator;
use segsig::source::{IterSource, SegmentSource, segments_source};
use segsig::utils::LogSink;
use segsig::{Digest, QueueSettings, RunReport, Segment};
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Everything the sink saw, in call order.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Info(String),
    Important(String),
    Error(String),
    Signature {
        worker: usize,
        segment_id: u64,
        digest: String,
    },
    Flush,
}

#[derive(Default)]
pub struct RecordingLog {
    events: Mutex<Vec<Event>>,
}

impl RecordingLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn signatures(&self) -> Vec<(usize, u64, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Signature {
                    worker,
                    segment_id,
                    digest,
                } => Some((worker, segment_id, digest)),
                _ => None,
            })
            .collect()
    }

    /// segment id → digest. Panics if a segment was hashed twice.
    pub fn digests_by_id(&self) -> HashMap<u64, String> {
        let mut map = HashMap::new();
        for (_, id, digest) in self.signatures() {
            assert!(
                map.insert(id, digest).is_none(),
                "segment {} hashed more than once",
                id
            );
        }
        map
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn flush_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Flush))
            .count()
    }

    pub fn has_info(&self, msg: &str) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, Event::Info(m) if m == msg))
    }

    fn push(&self, e: Event) {
        self.events.lock().unwrap().push(e);
    }
}

impl LogSink for RecordingLog {
    fn info(&self, msg: &str) {
        self.push(Event::Info(msg.to_string()));
    }

    fn important(&self, msg: &str) {
        self.push(Event::Important(msg.to_string()));
    }

    fn error(&self, msg: &str, cause: &anyhow::Error) {
        self.push(Event::Error(format!("{}: {:#}", msg, cause)));
    }

    fn flush(&self) {
        self.push(Event::Flush);
    }

    fn signature(&self, worker: usize, segment_id: u64, digest_hex: &str) {
        self.push(Event::Signature {
            worker,
            segment_id,
            digest: digest_hex.to_string(),
        });
    }
}

/// `count` segments of `size` bytes; segment `i` is filled with `i as u8`.
pub fn make_segments(count: u64, size: usize) -> Vec<Segment> {
    (0..count)
        .map(|i| Segment::new(i, vec![i as u8; size]))
        .collect()
}

/// Yields segments `0..=last_ok`, then an error.
pub fn failing_source(last_ok: u64) -> impl SegmentSource {
    IterSource::new(move || {
        (0..=last_ok + 1).map(move |i| {
            if i <= last_ok {
                Ok(Segment::new(i, vec![i as u8; 8]))
            } else {
                Err(anyhow!("disk went away at segment {}", i))
            }
        })
    })
}

/// BLAKE3 after a fixed delay, to make workers slower than the producer.
pub struct SlowHasher(pub Duration);

impl SegmentHasher for SlowHasher {
    fn hash(&self, data: &[u8]) -> Result<Digest> {
        thread::sleep(self.0);
        Blake3Hasher.hash(data)
    }

    fn name(&self) -> &'static str {
        "slow-blake3"
    }
}

/// Fails on segments whose first byte equals the marker.
pub struct FailingHasher(pub u8);

impl SegmentHasher for FailingHasher {
    fn hash(&self, data: &[u8]) -> Result<Digest> {
        if data.first() == Some(&self.0) {
            return Err(anyhow!("cannot hash segment starting with {}", self.0));
        }
        Blake3Hasher.hash(data)
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Panics on segments whose first byte equals the marker.
pub struct PanickingHasher(pub u8);

impl SegmentHasher for PanickingHasher {
    fn hash(&self, data: &[u8]) -> Result<Digest> {
        if data.first() == Some(&self.0) {
            panic!("hasher exploded");
        }
        Blake3Hasher.hash(data)
    }

    fn name(&self) -> &'static str {
        "panicking"
    }
}

pub fn coordinator(
    source: impl SegmentSource + 'static,
    hasher: impl SegmentHasher + 'static,
    log: &Arc<RecordingLog>,
    settings: QueueSettings,
) -> Coordinator {
    Coordinator::new(
        Arc::new(source),
        Arc::new(hasher),
        Arc::clone(log) as Arc<dyn LogSink>,
        settings,
    )
}

pub fn vec_coordinator(
    segments: Vec<Segment>,
    log: &Arc<RecordingLog>,
    settings: QueueSettings,
) -> Coordinator {
    coordinator(segments_source(segments), Blake3Hasher, log, settings)
}

/// Run on a helper thread and fail the test instead of hanging if the run does not finish.
pub fn run_with_timeout(coordinator: Coordinator, workers: usize, limit: Duration) -> RunReport {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(coordinator.run_with_report(workers));
    });
    rx.recv_timeout(limit)
        .expect("run did not finish in time (deadlock?)")
}

pub const TIMEOUT: Duration = Duration::from_secs(30);
