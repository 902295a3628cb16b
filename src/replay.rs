//! Frame replay
//!
//! Reads captured frames (one hex string per line, `#` comments allowed)
//! and feeds them to a handler from several blocking workers at once, all
//! sharing the same counting table.

use crate::handler::Handler;
use crate::metrics::ReplayStats;
use crate::{HostcountError, Result};
use bytes::Bytes;
use hostcount_common::Verdict;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Parse a frames document. Line numbers in errors are 1-based.
pub fn parse_frames(text: &str) -> Result<Vec<Bytes>> {
    let mut frames = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let compact: String = line.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let raw = hex::decode(&compact).map_err(|e| HostcountError::InvalidFrame {
            line: idx + 1,
            reason: e.to_string(),
        })?;
        frames.push(Bytes::from(raw));
    }

    Ok(frames)
}

pub async fn load_frames(path: &Path) -> Result<Vec<Bytes>> {
    let text = tokio::fs::read_to_string(path).await?;
    let frames = parse_frames(&text)?;
    debug!("Loaded {} frames from {}", frames.len(), path.display());
    Ok(frames)
}

/// Invoke `handler` once per frame across `workers` blocking tasks.
///
/// Worker `i` takes frames `i`, `i + workers`, ... so every frame is
/// invoked exactly once. Order across workers is unspecified.
pub async fn replay<H>(
    handler: Arc<H>,
    frames: Arc<[Bytes]>,
    workers: usize,
    stats: ReplayStats,
) -> Result<ReplayStats>
where
    H: Handler + 'static,
{
    let workers = workers.clamp(1, frames.len().max(1));
    info!(
        "Replaying {} frames through {} on {} workers",
        frames.len(),
        handler.meta().name,
        workers
    );

    let tasks = (0..workers).map(|worker| {
        let handler = handler.clone();
        let frames = frames.clone();
        let stats = stats.clone();

        tokio::task::spawn_blocking(move || {
            for frame in frames.iter().skip(worker).step_by(workers) {
                let observed = handler.observe(frame);
                stats.record(observed.verdict.name(), observed.outcome);
            }
        })
    });

    for joined in futures::future::join_all(tasks).await {
        joined.map_err(|e| HostcountError::ReplayFailed(e.to_string()))?;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let frames = parse_frames("# capture\n\n00 11 22\naabb\n").unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0][..], &[0x00, 0x11, 0x22]);
        assert_eq!(&frames[1][..], &[0xaa, 0xbb]);
    }

    #[test]
    fn test_parse_reports_line() {
        let err = parse_frames("0011\nzz\n").unwrap_err();
        match err {
            HostcountError::InvalidFrame { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_odd_length() {
        assert!(parse_frames("abc").is_err());
    }
}
