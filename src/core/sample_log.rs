// Incremental line splitting and the append-only sample log

use std::sync::{Mutex, MutexGuard};

use crate::core::extract::extract_milliwatts;
use crate::core::format::EnergySample;

/// Accumulates raw bytes and hands out complete lines. A chunk may end in the
/// middle of a line or of a multi-byte character; the tail waits for the next
/// chunk.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every line it completed, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let scan_from = self.buf.len();
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut cursor = scan_from;
        while let Some(offset) = self.buf[cursor..].iter().position(|&b| b == b'\n') {
            let end = cursor + offset;
            lines.push(decode_line(&self.buf[start..end]));
            start = end + 1;
            cursor = start;
        }
        self.buf.drain(..start);
        lines
    }

    /// Takes whatever is left after the last newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(decode_line(&rest))
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[derive(Debug, Default)]
struct LogInner {
    pending: LineBuffer,
    samples: Vec<EnergySample>,
}

/// Samples recorded by one tracker, shared between the stream reader and the
/// stop path. Survives the reader task failing or being aborted.
#[derive(Debug, Default)]
pub struct SampleLog {
    inner: Mutex<LogInner>,
}

impl SampleLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Feeds a raw stdout chunk. Returns how many samples it produced.
    pub fn ingest(&self, chunk: &[u8]) -> usize {
        let mut inner = self.lock();
        let lines = inner.pending.push(chunk);
        let before = inner.samples.len();
        inner
            .samples
            .extend(lines.iter().filter_map(|line| extract_milliwatts(line)));
        inner.samples.len() - before
    }

    /// Runs the trailing partial line, if any, through the extractor.
    pub fn flush(&self) -> usize {
        let mut inner = self.lock();
        match inner.pending.finish().and_then(|line| extract_milliwatts(&line)) {
            Some(mw) => {
                inner.samples.push(mw);
                1
            }
            None => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<EnergySample> {
        self.lock().samples.clone()
    }

    pub fn take(&self) -> Vec<EnergySample> {
        std::mem::take(&mut self.lock().samples)
    }
}
