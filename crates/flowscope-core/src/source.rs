//! Line sources.
//!
//! Sources feed raw lines to the reducer. Transport trouble is never an
//! error for the caller: it shows up in the stream itself as a status line
//! (`INFO: …` / `ERROR: …`) which the reducer treats as ordinary input.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::normalizer::leading_timestamp_ms;

/// An asynchronous, in-order stream of raw log lines.
#[async_trait]
pub trait LineSource: Send {
    /// Next raw line, or `None` once the source is exhausted or stopped.
    async fn next_line(&mut self) -> Option<String>;
}

enum ReplayPhase {
    Pending,
    Streaming(VecDeque<String>),
    Finished,
}

/// Replays a complete log file.
pub struct ReplaySource {
    path: PathBuf,
    phase: ReplayPhase,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            phase: ReplayPhase::Pending,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LineSource for ReplaySource {
    async fn next_line(&mut self) -> Option<String> {
        match &mut self.phase {
            ReplayPhase::Pending => {
                let mut lines = VecDeque::new();
                match tokio::fs::read_to_string(&self.path).await {
                    Ok(content) => {
                        lines.extend(content.lines().map(str::to_string));
                        lines.push_back("INFO: replay finished".to_string());
                    }
                    Err(e) => {
                        warn!(path = %self.path.display(), error = %e, "Replay failed");
                        lines.push_back(format!("ERROR: replay failed: {e}"));
                    }
                }
                debug!(path = %self.path.display(), lines = lines.len(), "Replay started");
                self.phase = ReplayPhase::Streaming(lines);
                Some(format!("INFO: replay started ({})", self.path.display()))
            }
            ReplayPhase::Streaming(lines) => {
                let line = lines.pop_front();
                if line.is_none() {
                    self.phase = ReplayPhase::Finished;
                }
                line
            }
            ReplayPhase::Finished => None,
        }
    }
}

/// Reads complete lines appended to a file since the last read.
#[derive(Debug)]
pub struct TailReader {
    path: PathBuf,
    position: u64,
}

impl TailReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            position: 0,
        }
    }

    /// Starts reading at the current end of the file.
    pub fn from_end(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let position = match std::fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e),
        };
        Ok(Self { path, position })
    }

    /// Reads newline-terminated lines written since the last call.
    ///
    /// A trailing partial line is left for the next call. A missing file
    /// yields nothing; a file that shrank is read again from the start.
    pub fn read_new_lines(&mut self) -> io::Result<Vec<String>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let len = file.metadata()?.len();
        if len < self.position {
            debug!(path = %self.path.display(), "File truncated, reading from start");
            self.position = 0;
        }
        file.seek(SeekFrom::Start(self.position))?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        let Some(end) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(Vec::new());
        };

        let complete = &buf[..=end];
        self.position += complete.len() as u64;
        Ok(String::from_utf8_lossy(complete)
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Returns the current byte position.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Cloneable flag that ends a running source.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<(AtomicBool, Notify)>,
}

impl StopSignal {
    pub fn stop(&self) {
        self.inner.0.store(true, Ordering::SeqCst);
        self.inner.1.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.0.load(Ordering::SeqCst)
    }

    async fn stopped(&self) {
        loop {
            let notified = self.inner.1.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

/// Follows a growing log file until stopped.
pub struct TailSource {
    reader: TailReader,
    poll_interval: Duration,
    buffered: VecDeque<String>,
    announced: bool,
    signal: StopSignal,
}

impl TailSource {
    pub fn new(reader: TailReader, poll_interval: Duration) -> Self {
        Self {
            reader,
            poll_interval,
            buffered: VecDeque::new(),
            announced: false,
            signal: StopSignal::default(),
        }
    }

    /// Ends the stream; a pending [`LineSource::next_line`] returns `None`.
    pub fn stop(&self) {
        self.signal.stop();
    }

    /// A handle that stops this source from elsewhere.
    pub fn stop_signal(&self) -> StopSignal {
        self.signal.clone()
    }
}

#[async_trait]
impl LineSource for TailSource {
    async fn next_line(&mut self) -> Option<String> {
        if !self.announced {
            self.announced = true;
            return Some(format!("INFO: watching {}", self.reader.path().display()));
        }

        loop {
            if self.signal.is_stopped() {
                return None;
            }
            if let Some(line) = self.buffered.pop_front() {
                return Some(line);
            }

            match self.reader.read_new_lines() {
                Ok(lines) if !lines.is_empty() => {
                    self.buffered.extend(lines);
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %self.reader.path().display(), error = %e, "Tail read failed");
                    return Some(format!("ERROR: tail failed: {e}"));
                }
            }

            tokio::select! {
                () = tokio::time::sleep(self.poll_interval) => {}
                () = self.signal.stopped() => return None,
            }
        }
    }
}

/// A log line with its position on the session timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedLine {
    pub line: String,
    /// Epoch milliseconds of the line's own timestamp, if it has one.
    pub timestamp_ms: Option<i64>,
    /// Milliseconds since the first timestamped line; untimed lines carry
    /// the offset of the line before them.
    pub offset_ms: u64,
}

/// A log file loaded into memory with per-line offsets.
#[derive(Debug, Clone, Default)]
pub struct ReplayRecords {
    records: Vec<TimedLine>,
}

impl ReplayRecords {
    pub fn from_reader<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut records = Vec::new();
        let mut first_ts: Option<i64> = None;
        let mut offset_ms = 0;

        for line in reader.lines() {
            let line = line?;
            let timestamp_ms = leading_timestamp_ms(&line);
            if let Some(ts) = timestamp_ms {
                let base = *first_ts.get_or_insert(ts);
                offset_ms = ts.saturating_sub(base).max(0) as u64;
            }
            records.push(TimedLine {
                line,
                timestamp_ms,
                offset_ms,
            });
        }

        Ok(Self { records })
    }

    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        Self::from_reader(BufReader::new(bytes))
    }

    pub fn records(&self) -> &[TimedLine] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.line.as_str())
    }

    /// Span between the first and the last timestamped line.
    pub fn duration_ms(&self) -> u64 {
        self.records.iter().map(|r| r.offset_ms).max().unwrap_or(0)
    }
}
