// src/watch/livereload.rs

//! Live-reload notification channel.
//!
//! Clients connect over TCP and receive one JSON object per line:
//!
//! ```text
//! {"command":"reload","path":"dist/css/site.css","binding":"css"}
//! ```

use std::net::SocketAddr;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Serialize)]
struct ReloadMessage<'a> {
    command: &'static str,
    path: &'a str,
    binding: &'a str,
}

/// Broadcasts reload notifications to every connected client.
///
/// Dropping the server stops accepting connections; connected clients are
/// closed once the channel drains.
#[derive(Debug)]
pub struct LiveReloadServer {
    addr: SocketAddr,
    tx: broadcast::Sender<String>,
    accept: JoinHandle<()>,
}

impl LiveReloadServer {
    /// Bind `host:port` and start accepting clients. Port 0 picks a free
    /// port; see [`LiveReloadServer::local_addr`].
    pub async fn bind(host: &str, port: u16) -> Result<Self> {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("binding live-reload listener on {host}:{port}"))?;
        let addr = listener.local_addr()?;
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);

        let accept = tokio::spawn(accept_loop(listener, tx.clone()));
        info!(%addr, "live-reload server listening");

        Ok(Self { addr, tx, accept })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Send one reload message per path. Returns the number of clients
    /// reached.
    pub fn notify(&self, binding: &str, paths: &[String]) -> usize {
        let mut reached = 0;
        for path in paths.iter() {
            let msg = ReloadMessage {
                command: "reload",
                path,
                binding,
            };
            let line = match serde_json::to_string(&msg) {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, "failed to encode live-reload message");
                    continue;
                }
            };
            // No subscribers is not an error.
            reached = self.tx.send(line).unwrap_or(0);
        }
        debug!(binding = %binding, paths = paths.len(), clients = reached, "live-reload notified");
        reached
    }
}

impl Drop for LiveReloadServer {
    fn drop(&mut self) {
        self.accept.abort();
    }
}

async fn accept_loop(listener: TcpListener, tx: broadcast::Sender<String>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "live-reload client connected");
                tokio::spawn(serve_client(stream, tx.subscribe()));
            }
            Err(err) => {
                warn!(error = %err, "live-reload accept failed");
            }
        }
    }
}

async fn serve_client(mut stream: TcpStream, mut rx: broadcast::Receiver<String>) {
    loop {
        let line = match rx.recv().await {
            Ok(line) => line,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "live-reload client lagging; messages dropped");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };
        let write = async {
            stream.write_all(line.as_bytes()).await?;
            stream.write_all(b"\n").await
        };
        if write.await.is_err() {
            debug!("live-reload client disconnected");
            return;
        }
    }
}
