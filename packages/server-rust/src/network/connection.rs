//! Per-connection command loop.
//!
//! Each accepted socket gets its own task running [`serve_connection`] with
//! a private parser and interpreter; the cache is the only shared state.
//! The loop owns every side effect for its socket: responses, purge passes
//! after mutations, deferred `flush_all` timers, and closing the stream on
//! every exit path.

use std::sync::Arc;
use std::time::Duration;

use minicached_core::{Cache, Interpreter, LineParser, ParserEvent};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use super::shutdown::ConnectionToken;

/// A chunk whose first byte is EOT closes the connection.
const EOT: u8 = 0x04;

/// Why a connection loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// Peer closed the socket.
    Eof,
    /// Peer sent the EOT byte.
    Eot,
    /// Peer sent `quit`.
    Quit,
    /// The server is shutting down.
    Shutdown,
}

/// Runs the command loop for one accepted socket until it closes.
///
/// `fast` short-circuits parsing and answers every chunk with the literal
/// `ERROR` line. The socket and the drain token are dropped on return,
/// whatever the exit path.
pub async fn serve_connection(
    stream: TcpStream,
    cache: Arc<Cache>,
    fast: bool,
    token: ConnectionToken,
) {
    let peer = stream.peer_addr().ok();
    debug!(?peer, "connection opened");
    match drive(stream, &cache, fast, token).await {
        Ok(reason) => debug!(?peer, ?reason, "connection closed"),
        Err(error) => warn!(?peer, %error, "connection failed"),
    }
}

async fn drive(
    mut stream: TcpStream,
    cache: &Arc<Cache>,
    fast: bool,
    mut token: ConnectionToken,
) -> std::io::Result<CloseReason> {
    let interpreter = Interpreter::new(Arc::clone(cache));
    let mut parser = LineParser::new();
    let mut buf = [0_u8; 4096];

    loop {
        let read = tokio::select! {
            read = stream.read(&mut buf) => read,
            () = token.signalled() => return Ok(CloseReason::Shutdown),
        };
        let chunk = match read? {
            0 => return Ok(CloseReason::Eof),
            n => &buf[..n],
        };
        if chunk[0] == EOT {
            return Ok(CloseReason::Eot);
        }
        if fast {
            stream.write_all(b"ERROR\r\n").await?;
            continue;
        }

        for event in parser.feed(chunk) {
            match event {
                ParserEvent::Request(request) => {
                    let reply = interpreter.execute(&request);
                    let mut out = reply.body;
                    out.extend_from_slice(b"\r\n");
                    stream.write_all(&out).await?;
                    // The mutator has returned and its response is on the
                    // wire; the purge runs before this connection reads
                    // anything further.
                    if reply.mutated {
                        cache.purge();
                    }
                    if let Some(delay_secs) = reply.deferred_flush_secs {
                        schedule_deferred_flush(Arc::clone(cache), delay_secs);
                    }
                }
                ParserEvent::Error(error) => {
                    let mut out = error.wire_token().as_bytes().to_vec();
                    out.extend_from_slice(b"\r\n");
                    stream.write_all(&out).await?;
                }
                ParserEvent::Quit => return Ok(CloseReason::Quit),
            }
        }
    }
}

/// Spawns an independent timer that flushes the cache after `delay_secs`.
///
/// Overlapping schedules each run to completion; an earlier flush emptying
/// the cache is permitted.
fn schedule_deferred_flush(cache: Arc<Cache>, delay_secs: i64) {
    let delay = Duration::from_secs(u64::try_from(delay_secs).unwrap_or(0));
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        debug!(delay_secs, "deferred flush firing");
        cache.flush();
    });
}
