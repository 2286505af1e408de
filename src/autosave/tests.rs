use std::{sync::Arc, time::Duration};

use pretty_assertions::assert_eq;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver},
    time::sleep,
};

use super::*;
use crate::{config::AutosaveConfig, transport::MemoryDraftStore};

const LATENCY: Duration = Duration::from_millis(300);
/// Comfortably past the default interval plus one round trip.
const PAST_INTERVAL: Duration = Duration::from_secs(11);

struct Harness {
    store: Arc<MemoryDraftStore>,
    autosave: Autosave,
    events: UnboundedReceiver<SaveEvent>,
}

impl Harness {
    fn new(options: AutosaveOptions) -> Self {
        Self::with_store(options, MemoryDraftStore::new().with_latency(LATENCY))
    }

    /// Every change counts, including the first one.
    fn fresh() -> Self {
        Self::new(AutosaveOptions {
            suppress_initial_load: false,
            ..Default::default()
        })
    }

    fn with_store(options: AutosaveOptions, store: MemoryDraftStore) -> Self {
        let store = Arc::new(store);
        let (evt_tx, events) = mpsc::unbounded_channel();
        let autosave = Autosave::spawn(Arc::clone(&store), options, evt_tx);
        Self {
            store,
            autosave,
            events,
        }
    }

    fn drain_events(&mut self) -> Vec<SaveEvent> {
        let mut events = vec![];
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

fn snap(title: &str, body: &str) -> DocumentSnapshot {
    DocumentSnapshot::new(title, body, "")
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_snapshot_never_schedules() {
    let h = Harness::fresh();

    for _ in 0..3 {
        h.autosave.on_snapshot_changed(DocumentSnapshot::default());
    }
    assert!(!h.autosave.current_status().await.autosave_pending);

    h.autosave.on_snapshot_changed(snap("a", "b"));
    sleep(PAST_INTERVAL).await;
    assert_eq!(h.store.total_calls(), 1);

    for _ in 0..3 {
        h.autosave.on_snapshot_changed(snap("a", "b"));
    }
    assert!(!h.autosave.current_status().await.autosave_pending);
    sleep(Duration::from_secs(60)).await;
    assert_eq!(h.store.total_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_initial_load_is_not_saved() {
    let h = Harness::new(AutosaveOptions::default());

    h.autosave.on_snapshot_changed(snap("Hello", "World"));
    let status = h.autosave.current_status().await;
    assert!(!status.autosave_pending);
    assert_eq!(status.last_synced, snap("Hello", "World"));
    assert!(!status.unsaved_changes);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.store.total_calls(), 0);

    h.autosave.on_snapshot_changed(snap("Hello", "World!"));
    assert!(h.autosave.current_status().await.autosave_pending);
    sleep(PAST_INTERVAL).await;
    assert_eq!(h.store.create_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_loading_existing_draft_then_editing_updates_it() {
    let store = MemoryDraftStore::new().with_latency(LATENCY);
    let token = DraftToken::from("draft_existing");
    store.insert(token.clone(), snap("Hello", "World")).await;
    let h = Harness::with_store(
        AutosaveOptions::default().with_existing_token(Some(token.clone())),
        store,
    );
    assert_eq!(
        h.autosave.current_status().await.identity,
        SaveIdentity::Identified(token.clone())
    );

    h.autosave.on_snapshot_changed(snap("Hello", "World"));
    sleep(PAST_INTERVAL).await;
    assert_eq!(h.store.total_calls(), 0);

    h.autosave.on_snapshot_changed(snap("Hello", "Rust"));
    sleep(PAST_INTERVAL).await;
    assert_eq!((h.store.create_calls(), h.store.update_calls()), (0, 1));
    assert_eq!(h.store.get(&token).await, Some(snap("Hello", "Rust")));
}

#[tokio::test(start_paused = true)]
async fn test_back_to_back_manual_saves_are_single_flight() {
    let h = Harness::fresh();
    h.autosave.on_snapshot_changed(snap("a", "b"));

    let (first, second) = tokio::join!(
        h.autosave.request_manual_save(),
        h.autosave.request_manual_save()
    );

    assert!(matches!(first, Ok(SaveOutcome::Created(_))));
    assert_eq!(second.unwrap(), SaveOutcome::Skipped(SkipReason::InFlight));
    assert_eq!(h.store.total_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_manual_save_during_autosave_is_dropped() {
    let mut h = Harness::fresh();
    h.autosave.on_snapshot_changed(snap("a", "b"));

    sleep(Duration::from_millis(10_100)).await;
    assert!(h.autosave.status().is_saving);
    let outcome = h.autosave.request_manual_save().await.unwrap();
    assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::InFlight));

    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.store.total_calls(), 1);
    let events = h.drain_events();
    assert!(events.contains(&SaveEvent::Skipped {
        trigger: SaveTrigger::Manual,
        reason: SkipReason::InFlight,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_identity_transitions_once() {
    let mut h = Harness::fresh();

    h.autosave.on_snapshot_changed(snap("first", ""));
    sleep(PAST_INTERVAL).await;
    let SaveIdentity::Identified(token) = h.autosave.identity() else {
        panic!("expected the draft to be identified after the first save");
    };

    h.autosave.on_snapshot_changed(snap("second", ""));
    sleep(PAST_INTERVAL).await;

    assert_eq!((h.store.create_calls(), h.store.update_calls()), (1, 1));
    assert_eq!(h.autosave.identity(), SaveIdentity::Identified(token.clone()));
    assert_eq!(h.store.get(&token).await, Some(snap("second", "")));

    let saved: Vec<_> = h
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            SaveEvent::Saved { token, created, .. } => Some((token, created)),
            _ => None,
        })
        .collect();
    assert_eq!(saved, vec![(token.clone(), true), (token, false)]);
}

#[tokio::test(start_paused = true)]
async fn test_manual_save_cancels_pending_autosave() {
    let h = Harness::fresh();
    h.autosave.on_snapshot_changed(snap("a", "b"));
    sleep(Duration::from_secs(4)).await;
    assert!(h.autosave.status().autosave_pending);

    let outcome = h.autosave.request_manual_save().await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Created(_)));

    let status = h.autosave.status();
    assert!(!status.autosave_pending);
    assert_eq!(status.ms_until_next_attempt, 0);
    assert_eq!(status.last_synced, snap("a", "b"));
    assert!(status.last_saved_at.is_some());

    sleep(Duration::from_secs(20)).await;
    assert_eq!(h.store.total_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_create_keeps_identity_and_baseline() {
    let mut h = Harness::fresh();
    h.store.fail_next_creates(1);

    h.autosave.on_snapshot_changed(snap("a", "b"));
    sleep(PAST_INTERVAL).await;

    let status = h.autosave.status();
    assert_eq!(status.identity, SaveIdentity::Anonymous);
    assert_eq!(status.last_synced, DocumentSnapshot::default());
    assert_eq!(status.last_saved_at, None);
    assert!(!status.autosave_pending);
    assert!(matches!(
        h.drain_events().as_slice(),
        [SaveEvent::Failed {
            trigger: SaveTrigger::Automatic,
            ..
        }]
    ));

    // Same content again is still a pending change.
    h.autosave.on_snapshot_changed(snap("a", "b"));
    assert!(h.autosave.current_status().await.autosave_pending);
    sleep(PAST_INTERVAL).await;

    assert_eq!(h.store.create_calls(), 2);
    assert!(h.autosave.identity().is_identified());
}

#[tokio::test(start_paused = true)]
async fn test_failed_manual_save_is_reported() {
    let h = Harness::fresh();
    h.store.fail_next_creates(1);
    h.autosave.on_snapshot_changed(snap("a", "b"));

    let result = h.autosave.request_manual_save().await;

    assert!(matches!(result, Err(AutosaveError::Transport(_))));
    assert_eq!(h.autosave.identity(), SaveIdentity::Anonymous);
}

#[tokio::test(start_paused = true)]
async fn test_empty_document_never_autosaves() {
    let mut h = Harness::fresh();
    h.autosave.on_snapshot_changed(snap("a", "b"));
    sleep(PAST_INTERVAL).await;
    assert_eq!(h.store.total_calls(), 1);
    h.drain_events();

    h.autosave.on_snapshot_changed(DocumentSnapshot::default());
    assert!(h.autosave.current_status().await.autosave_pending);
    sleep(PAST_INTERVAL).await;
    assert_eq!(h.store.total_calls(), 1);

    h.autosave.on_snapshot_changed(DocumentSnapshot::new("", "", "rust"));
    sleep(PAST_INTERVAL).await;
    assert_eq!(h.store.total_calls(), 1);

    let skipped = SaveEvent::Skipped {
        trigger: SaveTrigger::Automatic,
        reason: SkipReason::EmptyDocument,
    };
    assert_eq!(h.drain_events(), vec![skipped.clone(), skipped]);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_clears_timers() {
    let h = Harness::fresh();
    h.autosave.on_snapshot_changed(snap("a", "b"));
    sleep(Duration::from_secs(4)).await;

    h.autosave.dispose().await;
    sleep(Duration::from_secs(60)).await;

    assert_eq!(h.store.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_clears_timers() {
    let Harness { store, autosave, .. } = Harness::fresh();
    autosave.on_snapshot_changed(snap("a", "b"));
    sleep(Duration::from_secs(4)).await;

    drop(autosave);
    sleep(Duration::from_secs(60)).await;

    assert_eq!(store.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dispose_closes_status_stream() {
    let Harness { autosave, .. } = Harness::fresh();
    let status_rx = autosave.subscribe();
    autosave.dispose().await;

    assert!(status_rx.has_changed().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_edit_during_save_restarts_window() {
    let h = Harness::with_store(
        AutosaveOptions {
            suppress_initial_load: false,
            ..Default::default()
        },
        MemoryDraftStore::new().with_latency(Duration::from_secs(2)),
    );
    h.autosave.on_snapshot_changed(snap("a", "1"));
    sleep(Duration::from_millis(10_500)).await;

    h.autosave.on_snapshot_changed(snap("a", "2"));
    let status = h.autosave.current_status().await;
    assert!(status.is_saving);
    assert!(!status.autosave_pending);

    sleep(Duration::from_secs(2)).await;
    let status = h.autosave.status();
    assert!(!status.is_saving);
    assert!(status.autosave_pending);
    assert_eq!(status.last_synced, snap("a", "1"));

    sleep(Duration::from_secs(12)).await;
    assert_eq!((h.store.create_calls(), h.store.update_calls()), (1, 1));
    assert_eq!(h.autosave.status().last_synced, snap("a", "2"));
}

#[tokio::test(start_paused = true)]
async fn test_rapid_edits_restart_the_window() {
    let h = Harness::fresh();
    h.autosave.on_snapshot_changed(snap("a", ""));
    sleep(Duration::from_secs(6)).await;
    h.autosave.on_snapshot_changed(snap("ab", ""));
    sleep(Duration::from_secs(6)).await;

    assert_eq!(h.store.total_calls(), 0);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(h.store.total_calls(), 1);
    assert_eq!(h.autosave.status().last_synced, snap("ab", ""));
}

#[tokio::test(start_paused = true)]
async fn test_countdown_and_progress() {
    let h = Harness::fresh();
    h.autosave.on_snapshot_changed(snap("a", "b"));
    let status = h.autosave.current_status().await;
    assert_eq!(status.ms_until_next_attempt, 10_000);
    assert_eq!(status.progress, 0.0);

    sleep(Duration::from_millis(3_050)).await;
    let status = h.autosave.status();
    assert_eq!(status.ms_until_next_attempt, 7_000);
    assert!((status.progress - 0.3).abs() < 1e-6);

    sleep(Duration::from_secs(8)).await;
    let status = h.autosave.status();
    assert_eq!(status.ms_until_next_attempt, 0);
    assert_eq!(status.progress, 0.0);
    assert!(status.last_saved_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_disabled_engine_does_not_schedule() {
    let h = Harness::new(AutosaveOptions {
        enabled: false,
        suppress_initial_load: false,
        ..Default::default()
    });
    h.autosave.on_snapshot_changed(snap("a", "b"));
    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.store.total_calls(), 0);

    h.autosave.set_enabled(true);
    assert!(h.autosave.current_status().await.autosave_pending);
    sleep(PAST_INTERVAL).await;
    assert_eq!(h.store.create_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disabling_cancels_scheduled_save() {
    let h = Harness::fresh();
    h.autosave.on_snapshot_changed(snap("a", "b"));
    sleep(Duration::from_secs(2)).await;

    h.autosave.set_enabled(false);
    assert!(!h.autosave.current_status().await.autosave_pending);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.store.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unsaved_changes_compare_with_loaded_content() {
    let h = Harness::new(AutosaveOptions::default());
    h.autosave
        .on_snapshot_changed(DocumentSnapshot::with_tags("Hello", "World", ["a"]));
    assert!(!h.autosave.has_unsaved_changes().await);

    h.autosave
        .on_snapshot_changed(DocumentSnapshot::with_tags("Hello", "World", ["a", "b"]));
    assert!(h.autosave.has_unsaved_changes().await);

    h.autosave
        .on_snapshot_changed(DocumentSnapshot::with_tags("Hello", "World", ["a"]));
    assert!(!h.autosave.has_unsaved_changes().await);
}

#[tokio::test(start_paused = true)]
async fn test_new_document_first_edit_is_saved() {
    let h = Harness::new(AutosaveConfig::default().to_options(None));
    h.autosave.on_snapshot_changed(DocumentSnapshot::default());
    h.autosave.on_snapshot_changed(snap("", "my only paragraph"));
    assert!(h.autosave.has_unsaved_changes().await);

    sleep(Duration::from_secs(60)).await;

    assert_eq!(h.store.create_calls(), 1);
    let status = h.autosave.status();
    assert_eq!(status.last_synced, snap("", "my only paragraph"));
    let Some(token) = status.identity.token() else {
        panic!("expected the new document to be identified");
    };
    assert_eq!(h.store.get(token).await, Some(snap("", "my only paragraph")));
}

#[tokio::test(start_paused = true)]
async fn test_failed_update_keeps_identity_and_baseline() {
    let mut h = Harness::fresh();
    h.autosave.on_snapshot_changed(snap("a", "b"));
    sleep(PAST_INTERVAL).await;
    let identity = h.autosave.identity();
    let Some(token) = identity.token().cloned() else {
        panic!("expected the draft to be identified after the first save");
    };
    h.drain_events();

    h.store.fail_next_updates(1);
    h.autosave.on_snapshot_changed(snap("a", "c"));
    sleep(PAST_INTERVAL).await;

    let status = h.autosave.status();
    assert_eq!(status.identity, identity);
    assert_eq!(status.last_synced, snap("a", "b"));
    assert!(matches!(
        h.drain_events().as_slice(),
        [SaveEvent::Failed {
            trigger: SaveTrigger::Automatic,
            ..
        }]
    ));
    assert_eq!(h.store.get(&token).await, Some(snap("a", "b")));

    h.autosave.on_snapshot_changed(snap("a", "c"));
    assert!(h.autosave.current_status().await.autosave_pending);
    sleep(PAST_INTERVAL).await;

    assert_eq!((h.store.create_calls(), h.store.update_calls()), (1, 2));
    assert_eq!(h.store.get(&token).await, Some(snap("a", "c")));
    assert_eq!(h.autosave.identity(), identity);
}

#[tokio::test(start_paused = true)]
async fn test_failed_manual_update_is_reported() {
    let h = Harness::fresh();
    h.autosave.on_snapshot_changed(snap("a", "b"));
    let Ok(SaveOutcome::Created(token)) = h.autosave.request_manual_save().await else {
        panic!("expected the first manual save to create the draft");
    };

    h.store.fail_next_updates(1);
    h.autosave.on_snapshot_changed(snap("a", "c"));
    let result = h.autosave.request_manual_save().await;

    assert!(matches!(result, Err(AutosaveError::Transport(_))));
    let status = h.autosave.status();
    assert_eq!(status.identity, SaveIdentity::Identified(token.clone()));
    assert_eq!(status.last_synced, snap("a", "b"));

    assert_eq!(h.autosave.request_manual_save().await.unwrap(), SaveOutcome::Updated);
    assert_eq!(h.store.get(&token).await, Some(snap("a", "c")));
}

#[tokio::test(start_paused = true)]
async fn test_initial_status_reflects_options() {
    let token = DraftToken::from("draft_existing");
    let h = Harness::new(AutosaveOptions::default().with_existing_token(Some(token.clone())));

    let status = h.autosave.status();
    assert!(status.enabled);
    assert_eq!(status.identity, SaveIdentity::Identified(token));
    assert!(!status.autosave_pending);

    let disabled = Harness::new(AutosaveOptions {
        enabled: false,
        ..Default::default()
    });
    assert!(!disabled.autosave.status().enabled);
}
