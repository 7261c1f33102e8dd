//! # Output relay.
//!
//! Reads the child's combined stdout/stderr stream and forwards each line to
//! `tracing` at debug level, tagged with the agent name. Lines are assembled with
//! `read_until(b'\n')`, decoded lossily, and stripped of `\n` / `\r\n`; a trailing
//! unterminated line is still emitted at EOF.
//!
//! The relay is an ordinary tokio task reading an [`OutputStream`] for the lifetime
//! of one child. It ends at EOF (every write end closed) or when the runtime shuts
//! down, whichever comes first. It is never reused across restarts.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use super::pipes::OutputStream;

/// Spawns a relay for one output stream of a child run.
pub fn spawn_relay(output: OutputStream, agent: Arc<str>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let res = relay_lines(BufReader::new(output), |line| {
            tracing::debug!(agent = &*agent, "{line}");
        })
        .await;
        if let Err(err) = res {
            tracing::debug!(agent = &*agent, %err, "agent output relay stopped");
        }
    })
}

/// Feeds every line of `reader` to `emit` until EOF.
pub async fn relay_lines<R>(mut reader: R, mut emit: impl FnMut(&str)) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        emit(&String::from_utf8_lossy(trim_eol(&buf)));
    }
}

fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        relay_lines(input, |l| lines.push(l.to_string())).await.unwrap();
        lines
    }

    #[tokio::test]
    async fn splits_on_newlines() {
        assert_eq!(collect(b"one\ntwo\r\nthree\n").await, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn emits_trailing_partial_line() {
        assert_eq!(collect(b"done\npartial").await, vec!["done", "partial"]);
    }

    #[tokio::test]
    async fn keeps_empty_lines_and_invalid_utf8() {
        assert_eq!(collect(b"\n\xffok\n").await, vec!["".to_string(), "\u{fffd}ok".to_string()]);
    }

    #[tokio::test]
    async fn empty_stream_emits_nothing() {
        assert!(collect(b"").await.is_empty());
    }
}
