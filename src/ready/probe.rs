// src/ready/probe.rs

//! Polling probes against the backend's bind address.

use std::borrow::Cow;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use super::{ReadyProbe, ReadySignal};

/// Upper bound on a single connect / request attempt.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

enum NetworkCheck {
    Tcp { addr: String },
    Http { client: reqwest::Client, url: String },
}

impl NetworkCheck {
    async fn passes(&self) -> bool {
        match self {
            NetworkCheck::Tcp { addr } => tcp_check(addr).await,
            NetworkCheck::Http { client, url } => http_check(client, url).await,
        }
    }
}

/// Host part of the probe address.
///
/// A wildcard bind address is not connectable, so loopback is probed
/// instead. Bare IPv6 literals are bracketed for `host:port`.
pub fn probe_host(bind_host: &str) -> Cow<'_, str> {
    match bind_host {
        "0.0.0.0" => Cow::Borrowed("127.0.0.1"),
        "::" | "[::]" => Cow::Borrowed("[::1]"),
        other if other.contains(':') && !other.starts_with('[') => {
            Cow::Owned(format!("[{other}]"))
        }
        other => Cow::Borrowed(other),
    }
}

/// Start polling `host:port` until the probe passes or the session stops
/// being pending.
///
/// Returns `None` for stdout-based probes, which need no poller.
pub fn spawn_network_probe(
    probe: &ReadyProbe,
    host: &str,
    port: u16,
    interval: Duration,
    ready: ReadySignal,
) -> Option<JoinHandle<()>> {
    let host = probe_host(host);
    let check = match probe {
        ReadyProbe::Tcp => NetworkCheck::Tcp {
            addr: format!("{host}:{port}"),
        },
        ReadyProbe::Http { path } => {
            let client = match reqwest::Client::builder()
                .timeout(ATTEMPT_TIMEOUT)
                .build()
            {
                Ok(c) => c,
                Err(e) => {
                    warn!(
                        session = ready.session(),
                        error = %e,
                        "failed to build HTTP client for readiness probe"
                    );
                    return None;
                }
            };
            NetworkCheck::Http {
                client,
                url: format!("http://{host}:{port}{path}"),
            }
        }
        ReadyProbe::FirstOutput | ReadyProbe::StdoutPattern(_) => return None,
    };

    Some(tokio::spawn(async move {
        let session = ready.session();
        let mut attempts: u32 = 0;

        while ready.is_pending() {
            attempts += 1;
            if check.passes().await {
                debug!(session, attempts, "network readiness probe passed");
                ready.mark_ready();
                break;
            }
            sleep(interval).await;
        }

        debug!(session, attempts, "network readiness probe finished");
    }))
}

async fn tcp_check(addr: &str) -> bool {
    matches!(
        timeout(ATTEMPT_TIMEOUT, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

async fn http_check(client: &reqwest::Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}
