// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A connected display and the write side of its connection.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use queuedesk_core::QueueDeskError;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

use crate::snapshot::Snapshot;

/// Write half of a display connection.
///
/// Implemented by the WebSocket layer and by test doubles. A sink is only
/// ever driven by one writer at a time.
#[async_trait]
pub trait ClientSink: Send + 'static {
    async fn send_text(&mut self, text: Arc<str>) -> Result<(), QueueDeskError>;

    /// Sends a liveness probe. The acknowledgment arrives on the read side.
    async fn send_ping(&mut self) -> Result<(), QueueDeskError>;

    async fn close(&mut self);
}

/// Process-unique display session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Outcome of handing a snapshot to one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The client already has this version or a newer one.
    Stale,
    /// The client was closed before the write started.
    Closed,
}

pub struct DisplayClient {
    id: ClientId,
    writer: Mutex<Box<dyn ClientSink>>,
    last_ack: std::sync::Mutex<Instant>,
    last_version: AtomicU64,
    closed: AtomicBool,
    closed_token: CancellationToken,
}

impl fmt::Debug for DisplayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayClient")
            .field("id", &self.id)
            .field("last_version", &self.last_version())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl DisplayClient {
    pub fn new(id: ClientId, sink: Box<dyn ClientSink>) -> Self {
        Self {
            id,
            writer: Mutex::new(sink),
            last_ack: std::sync::Mutex::new(Instant::now()),
            last_version: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            closed_token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Records a liveness acknowledgment.
    pub fn touch(&self) {
        *self.last_ack.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    pub fn last_ack(&self) -> Instant {
        *self.last_ack.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Version of the last snapshot written to this client; 0 before any.
    pub fn last_version(&self) -> u64 {
        self.last_version.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Resolves once the client is closed.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed_token.cancelled()
    }

    /// Marks the client closed. Returns `true` for the call that closed it.
    pub fn mark_closed(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::AcqRel);
        if first {
            self.closed_token.cancel();
        }
        first
    }

    /// Writes `snapshot` unless the client has already seen a version at
    /// least as new. A failed or timed-out write closes the client.
    ///
    /// `timeout` covers waiting for the writer as well as the write itself.
    pub async fn deliver(
        &self,
        snapshot: &Snapshot,
        timeout: Duration,
    ) -> Result<Delivery, QueueDeskError> {
        if self.is_closed() {
            return Ok(Delivery::Closed);
        }
        let attempt = async {
            let mut sink = self.writer.lock().await;
            if self.is_closed() {
                return Ok(Delivery::Closed);
            }
            if snapshot.version <= self.last_version() {
                return Ok(Delivery::Stale);
            }
            sink.send_text(snapshot.payload()).await.map(|()| {
                self.last_version.store(snapshot.version, Ordering::Release);
                Delivery::Sent
            })
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(delivery)) => Ok(delivery),
            Ok(Err(e)) => {
                self.mark_closed();
                Err(e)
            }
            Err(_) => {
                self.mark_closed();
                Err(QueueDeskError::Channel {
                    message: format!("write to {} timed out after {timeout:?}", self.id),
                    source: None,
                })
            }
        }
    }

    /// Sends one liveness probe. A failed or timed-out probe closes the client.
    pub async fn ping(&self, timeout: Duration) -> Result<(), QueueDeskError> {
        if self.is_closed() {
            return Ok(());
        }
        let attempt = async {
            let mut sink = self.writer.lock().await;
            if self.is_closed() {
                return Ok(());
            }
            sink.send_ping().await
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.mark_closed();
                Err(e)
            }
            Err(_) => {
                self.mark_closed();
                Err(QueueDeskError::Channel {
                    message: format!("ping to {} timed out after {timeout:?}", self.id),
                    source: None,
                })
            }
        }
    }

    /// Marks the client closed and closes its connection, giving up on the
    /// close handshake after `timeout`.
    pub async fn shut(&self, timeout: Duration) {
        self.mark_closed();
        let close = async { self.writer.lock().await.close().await };
        if tokio::time::timeout(timeout, close).await.is_err() {
            debug!(client = %self.id, ?timeout, "close abandoned after deadline");
        }
    }
}
