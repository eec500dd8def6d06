//! Segment sources: turn an input into an ordered, lazy sequence of [`Segment`]s.

pub mod file;

pub use file::FileSource;

use anyhow::Result;

use crate::Segment;

/// Lazy segment sequence handed to the producer thread.
pub type SegmentIter = Box<dyn Iterator<Item = Result<Segment>> + Send>;

/// Produces the segments of one input. `produce` is called once per run, on the producer thread.
///
/// The sequence is finite, ids are unique and increasing. An `Err` item ends the run's
/// production; nothing after it is read.
pub trait SegmentSource: Send + Sync {
    fn produce(&self) -> Result<SegmentIter>;

    /// Expected number of segments, when cheap to know (progress bar total).
    fn segment_count_hint(&self) -> Option<u64> {
        None
    }
}

/// Source backed by a closure that builds a fresh iterator for every run.
pub struct IterSource<F> {
    make: F,
}

impl<F, I> IterSource<F>
where
    F: Fn() -> I + Send + Sync,
    I: IntoIterator<Item = Result<Segment>>,
    I::IntoIter: Send + 'static,
{
    pub fn new(make: F) -> Self {
        Self { make }
    }
}

impl<F, I> SegmentSource for IterSource<F>
where
    F: Fn() -> I + Send + Sync,
    I: IntoIterator<Item = Result<Segment>>,
    I::IntoIter: Send + 'static,
{
    fn produce(&self) -> Result<SegmentIter> {
        Ok(Box::new((self.make)().into_iter()))
    }
}

/// Source over an in-memory list of segments; every run yields the same list.
pub fn segments_source(segments: Vec<Segment>) -> impl SegmentSource {
    IterSource::new(move || segments.clone().into_iter().map(Ok::<Segment, anyhow::Error>))
}
