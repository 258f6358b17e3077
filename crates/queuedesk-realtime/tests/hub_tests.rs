// SPDX-FileCopyrightText: 2026 QueueDesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast hub behaviour on paused time with recording sinks.

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use queuedesk_core::{QueueObserver, TicketStatus};
use queuedesk_realtime::{Delivery, HubSettings, LivenessSettings};
use queuedesk_test_utils::TestHarness;
use queuedesk_test_utils::harness::{DUKCAPIL, KK, KTP, VISITOR};
use queuedesk_test_utils::RecordingSink;
use tokio::time::sleep;

const DEBOUNCE: Duration = Duration::from_millis(50);

#[tokio::test(start_paused = true)]
async fn burst_of_takes_collapses_into_one_broadcast() {
    let h = TestHarness::new();
    let sink = RecordingSink::new();
    h.hub.connect(sink.boxed()).await;
    assert_eq!(sink.sent_count(), 1);
    let reads_after_connect = h.store.board_reads();

    for _ in 0..5 {
        h.machine.take(DUKCAPIL, KK, VISITOR).await.unwrap();
    }
    assert!(h.hub.is_pending());

    sleep(DEBOUNCE * 4).await;

    assert_eq!(h.hub.broadcasts(), 1);
    assert_eq!(sink.sent_count(), 2);
    assert_eq!(h.store.board_reads(), reads_after_connect + 1);
    let last = sink.json_messages().pop().unwrap();
    assert_eq!(last["service_stats"][KK.0.to_string()]["waiting_count"], 5);
}

#[tokio::test(start_paused = true)]
async fn each_signal_pushes_the_deadline_back() {
    let h = TestHarness::new();

    h.hub.state_changed();
    sleep(Duration::from_millis(30)).await;
    h.hub.state_changed();
    sleep(Duration::from_millis(30)).await;
    assert_eq!(h.hub.broadcasts(), 0, "second signal reset the timer");

    sleep(Duration::from_millis(30)).await;
    assert_eq!(h.hub.broadcasts(), 1);
    assert!(!h.hub.is_pending());
}

#[tokio::test(start_paused = true)]
async fn same_day_reads_hit_the_cache() {
    let h = TestHarness::new();

    let first = h.hub.current_snapshot().await.unwrap();
    let second = h.hub.current_snapshot().await.unwrap();

    assert_eq!(first.payload(), second.payload());
    assert_eq!(h.store.board_reads(), 1);
    assert_eq!(h.hub.rebuilds(), 1);
}

#[tokio::test(start_paused = true)]
async fn cache_expires_at_day_rollover() {
    let h = TestHarness::new();
    let first = h.hub.current_snapshot().await.unwrap();

    h.clock.advance(ChronoDuration::days(1));
    let next = h.hub.current_snapshot().await.unwrap();

    assert!(next.version > first.version);
    assert_ne!(next.day(), first.day());
    assert_eq!(h.store.board_reads(), 2);
}

#[tokio::test(start_paused = true)]
async fn new_connection_is_served_without_broadcasting() {
    let h = TestHarness::new();
    let a = RecordingSink::new();
    let b = RecordingSink::new();

    h.hub.connect(a.boxed()).await;
    h.hub.connect(b.boxed()).await;

    assert_eq!(a.sent_count(), 1);
    assert_eq!(b.sent_count(), 1);
    assert_eq!(a.messages(), b.messages());
    assert_eq!(h.hub.broadcasts(), 0);
    assert_eq!(h.hub.rebuilds(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_write_evicts_only_that_client() {
    let h = TestHarness::new();
    let broken = RecordingSink::new();
    let healthy = RecordingSink::new();
    h.hub.connect(broken.boxed()).await;
    h.hub.connect(healthy.boxed()).await;

    broken.fail_writes(true);
    let fan_out = h.hub.broadcast_now().await.unwrap();

    assert_eq!(fan_out.sent, 1);
    assert_eq!(fan_out.failed, 1);
    assert_eq!(h.hub.registry().len(), 1);
    assert!(broken.is_closed());
    assert_eq!(healthy.sent_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn stalled_client_does_not_delay_the_rest() {
    let h = TestHarness::builder()
        .with_hub_settings(HubSettings {
            debounce: DEBOUNCE,
            fanout_concurrency: 2,
            write_timeout: Duration::from_secs(3),
        })
        .build();
    let stalled = RecordingSink::new();
    let others: Vec<RecordingSink> = (0..4).map(|_| RecordingSink::new()).collect();
    h.hub.connect(stalled.boxed()).await;
    for sink in &others {
        h.hub.connect(sink.boxed()).await;
    }

    stalled.stall_writes(true);
    h.machine.take(DUKCAPIL, KTP, VISITOR).await.unwrap();
    sleep(Duration::from_millis(200)).await;

    for sink in &others {
        assert_eq!(sink.sent_count(), 2);
    }
    assert_eq!(h.hub.registry().len(), 5, "stalled write still within its deadline");

    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.hub.registry().len(), 4);
    assert!(stalled.is_closed());
}

#[tokio::test(start_paused = true)]
async fn silent_client_is_swept_after_going_stale() {
    let h = TestHarness::new();
    let silent = RecordingSink::new();
    let chatty = RecordingSink::new();
    h.hub.connect(silent.boxed()).await;
    let chatty_client = h.hub.connect(chatty.boxed()).await;

    sleep(Duration::from_secs(60)).await;
    chatty_client.touch();
    sleep(Duration::from_secs(31)).await;
    // 91s without an ack, but the next sweep has not run yet.
    assert_eq!(h.hub.registry().len(), 2);
    assert!(silent.pings() >= 4);

    sleep(Duration::from_secs(9)).await;
    chatty_client.touch();
    sleep(Duration::from_secs(21)).await;

    assert_eq!(h.hub.registry().len(), 1);
    assert!(silent.is_closed());
    assert!(!chatty.is_closed());
    assert!(h.hub.registry().get(chatty_client.id()).is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_probe_evicts_client() {
    let h = TestHarness::new();
    let sink = RecordingSink::new();
    h.hub.connect(sink.boxed()).await;

    sink.fail_pings(true);
    sleep(LivenessSettings::default().ping_interval + Duration::from_secs(1)).await;

    assert!(h.hub.registry().is_empty());
    assert!(sink.is_closed());
}

#[tokio::test(start_paused = true)]
async fn wedged_close_does_not_stall_the_sweeper() {
    let h = TestHarness::new();
    let wedged = RecordingSink::new();
    wedged.stall_close(true);
    h.hub.connect(wedged.boxed()).await;
    let other = RecordingSink::new();
    let other_client = h.hub.connect(other.boxed()).await;

    // Acks stop at t=150s, so the second client is stale from t=240s.
    for _ in 0..15 {
        sleep(Duration::from_secs(10)).await;
        other_client.touch();
    }
    assert_eq!(h.hub.registry().len(), 1, "silent client evicted at t=120s");
    assert!(!wedged.is_closed(), "its close never finished");

    sleep(Duration::from_secs(160)).await;
    assert!(h.hub.registry().is_empty(), "stale client never evicted");
    assert!(other.is_closed());
    assert!(!h.hub.registry().sweeper_running());
}

#[tokio::test(start_paused = true)]
async fn disconnect_gives_up_on_wedged_close() {
    let h = TestHarness::new();
    let wedged = RecordingSink::new();
    wedged.stall_close(true);
    let client = h.hub.connect(wedged.boxed()).await;

    let closed = tokio::time::timeout(Duration::from_secs(10), h.hub.disconnect(client.id())).await;

    assert!(closed.is_ok());
    assert!(client.is_closed());
    assert!(h.hub.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_initial_snapshot_is_retried_by_broadcast() {
    let h = TestHarness::new();
    h.store.fail_next_board_read();
    let sink = RecordingSink::new();

    h.hub.connect(sink.boxed()).await;
    assert_eq!(sink.sent_count(), 0);
    assert_eq!(h.hub.registry().len(), 1);
    assert!(h.hub.is_pending());

    sleep(DEBOUNCE * 2).await;
    assert_eq!(sink.sent_count(), 1);
    assert_eq!(h.hub.broadcasts(), 1);
}

#[tokio::test(start_paused = true)]
async fn sweeper_runs_only_while_clients_exist() {
    let h = TestHarness::new();
    let registry = h.hub.registry().clone();
    assert!(!registry.sweeper_running());

    let client = h.hub.connect(RecordingSink::new().boxed()).await;
    assert!(registry.sweeper_running());

    h.hub.disconnect(client.id()).await;
    sleep(LivenessSettings::default().sweep_interval + Duration::from_secs(1)).await;
    assert!(!registry.sweeper_running());

    h.hub.connect(RecordingSink::new().boxed()).await;
    assert!(registry.sweeper_running());
}

#[tokio::test(start_paused = true)]
async fn clients_never_receive_older_snapshots() {
    let h = TestHarness::new();
    let old = h.hub.current_snapshot().await.unwrap();
    let sink = RecordingSink::new();
    let client = h.hub.connect(sink.boxed()).await;

    h.hub.broadcast_now().await.unwrap();
    let delivery = client
        .deliver(&old, Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(delivery, Delivery::Stale);
    assert_eq!(sink.versions(), [1, 2]);
}

#[tokio::test(start_paused = true)]
async fn called_ticket_is_announced() {
    let h = TestHarness::new();
    let sink = RecordingSink::new();
    h.hub.connect(sink.boxed()).await;

    h.machine.take(DUKCAPIL, KTP, VISITOR).await.unwrap();
    h.machine
        .call_next(KTP, h.staff(DUKCAPIL))
        .await
        .unwrap();
    sleep(DEBOUNCE * 2).await;

    let last = sink.json_messages().pop().unwrap();
    assert_eq!(last["type"], "queue_update");
    assert_eq!(last["currently_playing"]["ticket_code"], "KTP001");
    let paths = last["currently_playing"]["audio_paths"].as_array().unwrap();
    assert_eq!(paths[0], "audio/ting.mp3");
    assert_eq!(paths.last().unwrap(), "audio/loket_1.mp3");
}

#[tokio::test(start_paused = true)]
async fn failed_advance_changes_nothing_and_stays_quiet() {
    let h = TestHarness::new();
    let first = h.machine.take(DUKCAPIL, KTP, VISITOR).await.unwrap();
    h.machine.take(DUKCAPIL, KTP, VISITOR).await.unwrap();
    h.machine.call_next(KTP, h.staff(DUKCAPIL)).await.unwrap();
    sleep(DEBOUNCE * 2).await;
    let broadcasts = h.hub.broadcasts();

    h.store.fail_next_log_append();
    let err = h
        .machine
        .call_next(KTP, h.staff(DUKCAPIL))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "transient");
    sleep(DEBOUNCE * 2).await;

    let called: Vec<_> = h
        .store
        .tickets()
        .into_iter()
        .filter(|t| t.status == TicketStatus::Called)
        .collect();
    assert_eq!(called.len(), 1);
    assert_eq!(called[0].id, first.ticket.id);
    assert_eq!(h.store.log().len(), 3);
    assert_eq!(h.hub.broadcasts(), broadcasts);
}

#[tokio::test(start_paused = true)]
async fn shutdown_finishes_despite_wedged_close() {
    let h = TestHarness::new();
    let wedged = RecordingSink::new();
    wedged.stall_close(true);
    let healthy = RecordingSink::new();
    h.hub.connect(wedged.boxed()).await;
    h.hub.connect(healthy.boxed()).await;

    let done = tokio::time::timeout(Duration::from_secs(10), h.hub.shutdown()).await;

    assert!(done.is_ok());
    assert!(healthy.is_closed());
    assert!(h.hub.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_every_client() {
    let h = TestHarness::new();
    let sinks: Vec<RecordingSink> = (0..3).map(|_| RecordingSink::new()).collect();
    for sink in &sinks {
        h.hub.connect(sink.boxed()).await;
    }
    h.hub.state_changed();

    h.hub.shutdown().await;
    sleep(DEBOUNCE * 2).await;

    assert!(h.hub.registry().is_empty());
    assert!(sinks.iter().all(RecordingSink::is_closed));
    assert_eq!(h.hub.broadcasts(), 0);
}
