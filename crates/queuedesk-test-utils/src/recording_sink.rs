// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Display connection double.
//!
//! `RecordingSink` implements `ClientSink`, capturing every message written
//! to it. Clones share state, so a test keeps one handle while the hub owns
//! another. Writes can be made to fail or to stall forever, and so can closing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use queuedesk_core::QueueDeskError;
use queuedesk_realtime::ClientSink;

#[derive(Debug, Default)]
struct Shared {
    sent: Mutex<Vec<String>>,
    pings: AtomicUsize,
    closed: AtomicBool,
    fail_writes: AtomicBool,
    stall_writes: AtomicBool,
    fail_pings: AtomicBool,
    stall_close: AtomicBool,
    notify: Notify,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    shared: Arc<Shared>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A boxed clone, ready to hand to the hub.
    pub fn boxed(&self) -> Box<dyn ClientSink> {
        Box::new(self.clone())
    }

    /// Every text message written so far.
    pub fn messages(&self) -> Vec<String> {
        self.shared
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Every message parsed as JSON.
    pub fn json_messages(&self) -> Vec<serde_json::Value> {
        self.messages()
            .iter()
            .filter_map(|m| serde_json::from_str(m).ok())
            .collect()
    }

    /// `version` of every message received, in arrival order.
    pub fn versions(&self) -> Vec<u64> {
        self.json_messages()
            .iter()
            .filter_map(|m| m["version"].as_u64())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.shared
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn pings(&self) -> usize {
        self.shared.pings.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Makes every following write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every following write hang until the caller gives up.
    pub fn stall_writes(&self, stall: bool) {
        self.shared.stall_writes.store(stall, Ordering::SeqCst);
    }

    /// Makes `close` hang forever, like a peer that stopped draining.
    pub fn stall_close(&self, stall: bool) {
        self.shared.stall_close.store(stall, Ordering::SeqCst);
    }

    /// Makes every following liveness probe fail.
    pub fn fail_pings(&self, fail: bool) {
        self.shared.fail_pings.store(fail, Ordering::SeqCst);
    }

    /// Waits until at least `count` messages have been written.
    pub async fn wait_for_messages(&self, count: usize) {
        loop {
            let notified = self.shared.notify.notified();
            if self.sent_count() >= count {
                return;
            }
            notified.await;
        }
    }
}

fn refused(what: &str) -> QueueDeskError {
    QueueDeskError::Channel {
        message: format!("{what} refused by recording sink"),
        source: None,
    }
}

#[async_trait]
impl ClientSink for RecordingSink {
    async fn send_text(&mut self, text: Arc<str>) -> Result<(), QueueDeskError> {
        if self.shared.stall_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.shared.closed.load(Ordering::SeqCst) || self.shared.fail_writes.load(Ordering::SeqCst)
        {
            return Err(refused("write"));
        }
        self.shared
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        self.shared.notify.notify_waiters();
        Ok(())
    }

    async fn send_ping(&mut self) -> Result<(), QueueDeskError> {
        if self.shared.fail_pings.load(Ordering::SeqCst) {
            return Err(refused("ping"));
        }
        self.shared.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) {
        if self.shared.stall_close.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_writes_across_clones() {
        let sink = RecordingSink::new();
        let mut handle = sink.clone();
        handle.send_text(Arc::from(r#"{"version":3}"#)).await.unwrap();
        handle.send_ping().await.unwrap();

        assert_eq!(sink.sent_count(), 1);
        assert_eq!(sink.versions(), [3]);
        assert_eq!(sink.pings(), 1);
    }

    #[tokio::test]
    async fn failing_and_closed_sinks_refuse_writes() {
        let sink = RecordingSink::new();
        let mut handle = sink.clone();
        sink.fail_writes(true);
        assert!(handle.send_text(Arc::from("x")).await.is_err());
        sink.fail_writes(false);

        handle.close().await;
        assert!(sink.is_closed());
        assert!(handle.send_text(Arc::from("x")).await.is_err());
        assert_eq!(sink.sent_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_write_never_completes() {
        let sink = RecordingSink::new();
        sink.stall_writes(true);
        let mut handle = sink.clone();
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(3),
            handle.send_text(Arc::from("x")),
        )
        .await;
        assert!(result.is_err());
    }
}
