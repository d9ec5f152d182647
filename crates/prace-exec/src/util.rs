use std::{
    path::Path,
    process::Stdio,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
};

/// Command for a job binary: no shell, stdin closed, stdout discarded, stderr piped.
pub fn cmd_program(program: &Path, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(|s| s.as_str()))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// What was seen on a job's stderr.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    /// Leading bytes, at most the retention limit.
    pub kept: Vec<u8>,
    /// Bytes read in total, including the ones not kept.
    pub total: usize,
    /// One of the watched patterns occurred anywhere in the stream.
    pub matched: bool,
}

/// Streaming stderr accumulator.
///
/// Retention is capped, pattern matching is not: a pattern is found even when it appears past
/// the retained prefix or straddles two reads.
#[derive(Debug)]
pub struct StderrSink {
    limit: usize,
    needles: Vec<Vec<u8>>,
    longest: usize,
    carry: Vec<u8>,
    seen: Captured,
}

impl StderrSink {
    /// Empty patterns are ignored.
    pub fn new(limit: usize, patterns: &[String]) -> Self {
        let needles: Vec<Vec<u8>> = patterns
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.as_bytes().to_vec())
            .collect();
        let longest = needles.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            limit,
            needles,
            longest,
            carry: Vec::new(),
            seen: Captured::default(),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.seen.total += chunk.len();
        let room = self.limit.saturating_sub(self.seen.kept.len());
        self.seen.kept.extend_from_slice(&chunk[..chunk.len().min(room)]);

        if self.seen.matched || self.needles.is_empty() {
            return;
        }
        let mut window = std::mem::take(&mut self.carry);
        window.extend_from_slice(chunk);
        self.seen.matched = self
            .needles
            .iter()
            .any(|n| window.windows(n.len()).any(|w| w == n.as_slice()));

        let keep = (self.longest - 1).min(window.len());
        self.carry = window.split_off(window.len() - keep);
    }

    pub fn take(&mut self) -> Captured {
        self.carry.clear();
        std::mem::take(&mut self.seen)
    }
}

/// Drain `stream` to EOF into `sink`.
///
/// Bytes land in `sink` as they arrive, so whatever was read stays available even if the
/// draining task is aborted.
pub async fn capture<R>(mut stream: R, sink: Arc<Mutex<StderrSink>>)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => lock(&sink).push(&buf[..n]),
        }
    }
}

pub fn take_captured(sink: &Mutex<StderrSink>) -> Captured {
    lock(sink).take()
}

fn lock(sink: &Mutex<StderrSink>) -> std::sync::MutexGuard<'_, StderrSink> {
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}
