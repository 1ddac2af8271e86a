//! Integration tests for the single-flight playback controller
//!
//! Fetches are settled by the test and audio handles are mocks, so every
//! interleaving of toggles and async completions is deterministic.

mod helpers;

use helpers::{settle, wait_for_phase, wait_for_status, wait_until, Harness};
use secretary_common::{PlaybackPhase, PlaybackStatus, SecretaryEvent, TrackId};
use secretary_player::SwitchPolicy;
use std::time::Duration;

fn track(id: &str) -> TrackId {
    TrackId::from(id)
}

// ============================================================================
// Testable properties
// ============================================================================

#[tokio::test]
async fn test_single_flight_across_toggle_sequence() {
    let mut h = Harness::new(SwitchPolicy::Restart);

    h.controller.toggle(track("a"));
    let fetch_a = h.fetches.next().await;
    h.controller.toggle(track("b"));
    let fetch_b = h.fetches.next().await;
    h.controller.toggle(track("c"));
    let fetch_c = h.fetches.next().await;

    // Superseded loads are aborted, not merely ignored
    wait_until(|| fetch_a.is_abandoned() && fetch_b.is_abandoned()).await;
    assert!(!fetch_c.is_abandoned());
    assert_eq!(h.controller.status(), PlaybackStatus::loading(track("c")));

    fetch_c.succeed();
    wait_for_status(&h.controller, &PlaybackStatus::playing(track("c"))).await;
    assert_eq!(h.backend.live_handles(), 1);

    h.controller.toggle(track("d"));
    assert_eq!(h.backend.live_handles(), 0);
    h.fetches.next().await.succeed();
    wait_for_phase(&h.controller, PlaybackPhase::Playing).await;

    assert_eq!(h.backend.opened(), 2);
    assert_eq!(h.backend.live_handles(), 1);
}

#[tokio::test]
async fn test_same_track_toggle_stops_playback() {
    let mut h = Harness::new(SwitchPolicy::Wait);
    let handle = h.play("a").await;
    assert_eq!(handle.plays(), 1);

    h.controller.toggle(track("a"));

    // Stop is synchronous
    assert_eq!(h.controller.status(), PlaybackStatus::idle());
    assert_eq!(handle.pauses(), 1);
    assert_eq!(handle.drops(), 1);
    assert_eq!(h.backend.live_handles(), 0);
}

#[tokio::test]
async fn test_switch_releases_previous_exactly_once() {
    let mut h = Harness::new(SwitchPolicy::Wait);
    let handle_a = h.play("a").await;
    let mut subscription = h.controller.subscribe();

    h.controller.toggle(track("b"));

    // Released before B's fetch is issued, and published as one transition
    assert_eq!(handle_a.pauses(), 1);
    assert_eq!(handle_a.drops(), 1);
    assert_eq!(
        subscription.next_status().await,
        Some(PlaybackStatus::loading(track("b")))
    );

    h.fetches.next().await.succeed();
    assert_eq!(
        subscription.next_status().await,
        Some(PlaybackStatus::playing(track("b")))
    );

    assert_eq!(handle_a.pauses(), 1);
    assert_eq!(handle_a.drops(), 1);
    assert_eq!(h.backend.last_handle().plays(), 1);
}

#[tokio::test]
async fn test_stale_fetch_does_not_revive_cancelled_playback() {
    let mut h = Harness::new(SwitchPolicy::Wait);

    h.controller.toggle(track("a"));
    let pending = h.fetches.next().await;
    h.controller.toggle(track("a"));
    assert_eq!(h.controller.status(), PlaybackStatus::idle());

    // The fetch was aborted; a late answer goes nowhere
    wait_until(|| pending.is_abandoned()).await;
    assert!(!pending.succeed());
    settle().await;

    assert_eq!(h.controller.status(), PlaybackStatus::idle());
    assert_eq!(h.backend.opened(), 0);
}

#[tokio::test]
async fn test_fetch_failure_then_retry() {
    let mut h = Harness::new(SwitchPolicy::Wait);

    h.controller.toggle(track("x"));
    h.fetches.next().await.fail("calls service returned 500 Internal Server Error");

    let status = wait_for_phase(&h.controller, PlaybackPhase::Error).await;
    assert_eq!(status.playing_id, None);
    assert_eq!(
        status.error.as_deref(),
        Some("Could not load call audio: calls service returned 500 Internal Server Error")
    );
    assert_eq!(h.backend.opened(), 0);

    h.controller.toggle(track("x"));
    assert_eq!(h.controller.status(), PlaybackStatus::loading(track("x")));

    h.fetches.next().await.succeed();
    wait_for_status(&h.controller, &PlaybackStatus::playing(track("x"))).await;
}

#[tokio::test]
async fn test_busy_guard_ignores_switch_while_loading() {
    let mut h = Harness::new(SwitchPolicy::Wait);

    h.controller.toggle(track("a"));
    let fetch_a = h.fetches.next().await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    h.controller.toggle(track("b"));
    assert_eq!(h.controller.status(), PlaybackStatus::loading(track("a")));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(h.controller.status(), PlaybackStatus::loading(track("a")));
    assert!(h.fetches.try_next().is_none());
    assert_eq!(h.fetcher.calls(), 1);

    fetch_a.succeed();
    wait_for_status(&h.controller, &PlaybackStatus::playing(track("a"))).await;

    // Once settled, B may switch in
    h.controller.toggle(track("b"));
    assert_eq!(h.controller.status(), PlaybackStatus::loading(track("b")));
}

#[tokio::test]
async fn test_natural_end_returns_to_idle() {
    let mut h = Harness::new(SwitchPolicy::Wait);
    let handle = h.play("a").await;
    let mut subscription = h.controller.subscribe();
    assert!(subscription.current().is_active_for(&track("a")));

    handle.end();

    assert_eq!(subscription.next_status().await, Some(PlaybackStatus::idle()));
    assert!(!subscription.current().is_active_for(&track("a")));
    assert_eq!(h.controller.status(), PlaybackStatus::idle());
    assert_eq!(handle.drops(), 1);
}

// ============================================================================
// Policies and failure paths
// ============================================================================

#[tokio::test]
async fn test_restart_policy_switches_during_load() {
    let mut h = Harness::new(SwitchPolicy::Restart);

    h.controller.toggle(track("a"));
    let fetch_a = h.fetches.next().await;
    h.controller.toggle(track("b"));

    assert_eq!(h.controller.status(), PlaybackStatus::loading(track("b")));
    let fetch_b = h.fetches.next().await;
    assert_eq!(fetch_b.track_id, track("b"));
    wait_until(|| fetch_a.is_abandoned()).await;

    fetch_b.succeed();
    wait_for_status(&h.controller, &PlaybackStatus::playing(track("b"))).await;
    assert_eq!(h.backend.opened(), 1);
}

#[tokio::test]
async fn test_same_track_stop_while_loading_with_restart_policy() {
    let mut h = Harness::new(SwitchPolicy::Restart);

    h.controller.toggle(track("a"));
    let _fetch = h.fetches.next().await;
    h.controller.toggle(track("a"));

    assert_eq!(h.controller.status(), PlaybackStatus::idle());
}

#[tokio::test]
async fn test_decode_failure_is_playback_error() {
    let mut h = Harness::new(SwitchPolicy::Wait);

    h.controller.toggle(track("a"));
    h.fetches.next().await.succeed_corrupt();

    let status = wait_for_phase(&h.controller, PlaybackPhase::Error).await;
    let message = status.error.expect("error message");
    assert!(message.starts_with("Could not decode call audio"), "{}", message);
    assert_eq!(h.backend.opened(), 0);
}

#[tokio::test]
async fn test_play_failure_releases_handle() {
    let mut h = Harness::new(SwitchPolicy::Wait);
    h.backend.set_fail_play(true);

    h.controller.toggle(track("a"));
    h.fetches.next().await.succeed();

    let status = wait_for_phase(&h.controller, PlaybackPhase::Error).await;
    assert_eq!(status.error.as_deref(), Some("Audio output error: device busy"));

    let handle = h.backend.last_handle();
    assert_eq!(handle.plays(), 1);
    assert_eq!(handle.drops(), 1);
}

#[tokio::test]
async fn test_runtime_error_moves_to_error_phase() {
    let mut h = Harness::new(SwitchPolicy::Wait);
    let handle = h.play("a").await;

    handle.fail("device unplugged");

    let status = wait_for_phase(&h.controller, PlaybackPhase::Error).await;
    assert_eq!(status.error.as_deref(), Some("Playback error: device unplugged"));
    assert_eq!(handle.drops(), 1);

    // Error holds nothing; another track starts normally
    h.controller.toggle(track("b"));
    assert_eq!(h.controller.status(), PlaybackStatus::loading(track("b")));
}

#[tokio::test]
async fn test_progress_forwarded_to_subscribers() {
    let mut h = Harness::new(SwitchPolicy::Wait);
    let handle = h.play("a").await;
    let mut subscription = h.controller.subscribe();

    handle.progress(1_250, 30_000);

    let event = tokio::time::timeout(Duration::from_secs(2), subscription.next_event())
        .await
        .expect("no event")
        .expect("bus closed");
    match event {
        SecretaryEvent::PlaybackProgress {
            track_id,
            position_ms,
            duration_ms,
            ..
        } => {
            assert_eq!(track_id, track("a"));
            assert_eq!(position_ms, 1_250);
            assert_eq!(duration_ms, Some(30_000));
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert_eq!(h.controller.status(), PlaybackStatus::playing(track("a")));
}

#[tokio::test]
async fn test_events_from_released_handle_are_ignored() {
    let mut h = Harness::new(SwitchPolicy::Wait);
    let old = h.play("a").await;

    h.controller.toggle(track("b"));
    old.end();
    old.fail("late failure");
    settle().await;

    assert_eq!(h.controller.status(), PlaybackStatus::loading(track("b")));

    h.fetches.next().await.succeed();
    wait_for_status(&h.controller, &PlaybackStatus::playing(track("b"))).await;
    old.end();
    settle().await;
    assert_eq!(h.controller.status(), PlaybackStatus::playing(track("b")));
}

// ============================================================================
// Subscribers and teardown
// ============================================================================

#[tokio::test]
async fn test_transitions_published_in_order() {
    let mut h = Harness::new(SwitchPolicy::Wait);
    let mut subscription = h.controller.subscribe();
    assert_eq!(subscription.current(), &PlaybackStatus::idle());

    h.controller.toggle(track("a"));
    h.fetches.next().await.succeed();
    wait_for_phase(&h.controller, PlaybackPhase::Playing).await;
    h.controller.toggle(track("a"));

    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(subscription.next_status().await.expect("bus closed"));
    }
    assert_eq!(
        seen,
        vec![
            PlaybackStatus::loading(track("a")),
            PlaybackStatus::playing(track("a")),
            PlaybackStatus::idle(),
        ]
    );
}

#[tokio::test]
async fn test_lagging_subscriber_resyncs_to_current_status() {
    let mut h = Harness::with_capacity(SwitchPolicy::Wait, 2);
    let mut subscription = h.controller.subscribe();

    for _ in 0..3 {
        h.controller.toggle(track("a"));
        let _ = h.fetches.next().await;
        h.controller.toggle(track("a"));
    }
    h.controller.toggle(track("b"));

    let status = subscription.next_status().await.expect("bus closed");
    assert_eq!(status, PlaybackStatus::loading(track("b")));
    assert_eq!(subscription.current(), &PlaybackStatus::loading(track("b")));
}

#[tokio::test]
async fn test_shutdown_releases_active_session() {
    let mut h = Harness::new(SwitchPolicy::Wait);
    let handle = h.play("a").await;

    h.controller.shutdown();

    assert_eq!(h.controller.status(), PlaybackStatus::idle());
    assert_eq!(handle.pauses(), 1);
    assert_eq!(handle.drops(), 1);
}

#[tokio::test]
async fn test_shutdown_aborts_pending_load() {
    let mut h = Harness::new(SwitchPolicy::Wait);

    h.controller.toggle(track("a"));
    let pending = h.fetches.next().await;
    h.controller.shutdown();

    wait_until(|| pending.is_abandoned()).await;
    assert_eq!(h.controller.status(), PlaybackStatus::idle());
}
