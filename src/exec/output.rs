// src/exec/output.rs

//! Stdout / stderr forwarding for the backend process.
//!
//! Both pumps are fire-and-forget Tokio tasks that run until the stream
//! closes. Output is forwarded per read chunk, exactly as the pipe hands
//! it over: a backend printing a prompt without a trailing newline is
//! still seen immediately. Chunks are decoded lossily, so invalid UTF-8
//! never stalls the pump.
//!
//! - stdout chunks are logged, fed to the readiness probe, then handed to
//!   the caller's callback.
//! - stderr chunks are only logged.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::exec::backend::OutputStream;
use crate::ready::{ReadyProbe, ReadySignal};
use crate::types::SessionId;

/// Upper bound on a single forwarded chunk.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Receives each stdout chunk of the backend verbatim, line terminators
/// included.
///
/// Runs on the stdout pump task: long blocking work here delays every
/// following chunk.
pub type OutputCallback = Arc<dyn Fn(&str) + Send + Sync>;

pub fn spawn_stdout_pump(
    stream: OutputStream,
    on_output: Option<OutputCallback>,
    probe: ReadyProbe,
    ready: ReadySignal,
) -> JoinHandle<()> {
    let session = ready.session();

    tokio::spawn(async move {
        let watch_stdout = !probe.is_network();

        for_each_chunk(session, "stdout", stream, |chunk| {
            for line in chunk.lines() {
                info!(session, stream = "stdout", "{}", line);
            }

            if let Some(cb) = &on_output {
                cb(chunk);
            }

            if watch_stdout && ready.is_pending() && probe.matches_output(chunk) {
                ready.mark_ready();
            }
        })
        .await;

        debug!(session, "stdout pump ended");
    })
}

pub fn spawn_stderr_pump(session: SessionId, stream: OutputStream) -> JoinHandle<()> {
    tokio::spawn(async move {
        for_each_chunk(session, "stderr", stream, |chunk| {
            for line in chunk.lines() {
                warn!(session, stream = "stderr", "{}", line);
            }
        })
        .await;

        debug!(session, "stderr pump ended");
    })
}

async fn for_each_chunk<F>(
    session: SessionId,
    name: &'static str,
    mut stream: OutputStream,
    mut f: F,
) where
    F: FnMut(&str),
{
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = decode_chunk(&buf[..n]);
                f(&chunk);
            }
            Err(e) => {
                warn!(session, stream = name, error = %e, "failed reading backend output");
                break;
            }
        }
    }
}

/// Lossy UTF-8 decode of one read.
pub fn decode_chunk(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}
