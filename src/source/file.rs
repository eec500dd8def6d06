//! Fixed-size segments read from a file on disk.

use anyhow::{Context, Result, bail};
use log::debug;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::{SegmentIter, SegmentSource};
use crate::Segment;
use crate::utils::config::HashingConsts;

/// Splits a file into `segment_size` pieces. The last one may be short; an empty file yields none.
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
    segment_size: usize,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, segment_size: usize) -> Result<Self> {
        if segment_size == 0 {
            bail!("segment size must be at least 1 byte");
        }
        let path = path.into();
        let meta = std::fs::metadata(&path)
            .with_context(|| format!("read metadata of {}", path.display()))?;
        if !meta.is_file() {
            bail!("{} is not a regular file", path.display());
        }
        Ok(Self { path, segment_size })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn segment_size(&self) -> usize {
        self.segment_size
    }
}

impl SegmentSource for FileSource {
    fn produce(&self) -> Result<SegmentIter> {
        let file =
            File::open(&self.path).with_context(|| format!("open {}", self.path.display()))?;
        let size = file.metadata()?.len();
        if size > HashingConsts::MMAP_THRESHOLD {
            debug!("Reading {} via mmap ({} bytes)", self.path.display(), size);
            // Memory-mapped I/O for large files
            let mmap = unsafe { Mmap::map(&file)? };
            Ok(Box::new(MmapSegments::new(mmap, self.segment_size)))
        } else {
            debug!("Reading {} buffered ({} bytes)", self.path.display(), size);
            let reader = BufReader::with_capacity(HashingConsts::READ_BUFFER_SIZE, file);
            Ok(Box::new(ReaderSegments::new(reader, self.segment_size)))
        }
    }

    fn segment_count_hint(&self) -> Option<u64> {
        let len = std::fs::metadata(&self.path).ok()?.len();
        Some(len.div_ceil(self.segment_size as u64))
    }
}

/// Segments from any reader. Stops after the first read error.
pub struct ReaderSegments<R> {
    reader: R,
    segment_size: usize,
    next_id: u64,
    done: bool,
}

impl<R: Read> ReaderSegments<R> {
    pub fn new(reader: R, segment_size: usize) -> Self {
        Self {
            reader,
            segment_size: segment_size.max(1),
            next_id: 0,
            done: false,
        }
    }
}

impl<R: Read> Iterator for ReaderSegments<R> {
    type Item = Result<Segment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut data = Vec::with_capacity(self.segment_size);
        match (&mut self.reader)
            .take(self.segment_size as u64)
            .read_to_end(&mut data)
        {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                let id = self.next_id;
                self.next_id += 1;
                Some(Ok(Segment::new(id, data)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(anyhow::Error::new(e)
                    .context(format!("read segment {}", self.next_id))))
            }
        }
    }
}

/// Segments copied out of a memory-mapped file.
pub struct MmapSegments {
    mmap: Mmap,
    offset: usize,
    next_id: u64,
    segment_size: usize,
}

impl MmapSegments {
    pub fn new(mmap: Mmap, segment_size: usize) -> Self {
        Self {
            mmap,
            offset: 0,
            next_id: 0,
            segment_size: segment_size.max(1),
        }
    }
}

impl Iterator for MmapSegments {
    type Item = Result<Segment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.mmap.len() {
            return None;
        }
        let end = (self.offset + self.segment_size).min(self.mmap.len());
        let data = self.mmap[self.offset..end].to_vec();
        self.offset = end;
        let id = self.next_id;
        self.next_id += 1;
        Some(Ok(Segment::new(id, data)))
    }
}
