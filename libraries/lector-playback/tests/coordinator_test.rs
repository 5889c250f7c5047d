//! End-to-end coordinator tests
//!
//! Runs the actor with a fake engine on paused tokio time, so settle windows
//! and cooldowns elapse instantly and deterministically.


use lector_core::{ContentType, DocumentId, LectorError, PlayableUnit, UnitId};
use lector_playback::{
    AdvanceOutcome, AppEvent, CoordinatorEvent, OpenOutcome, PlaybackConfig, UserError, ViewId,
};
use lector_storage::{MemoryContentStore, MemoryStore, ResumeStore};
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{
    chapters, entries, new_log, paragraph_text, position_of, spawn, wait_for, wait_for_playing,
    FakeEngine, RecordingStore,
};
use tokio::sync::broadcast::error::TryRecvError;

fn opened(outcome: OpenOutcome) -> lector_playback::DisplayState {
    match outcome {
        OpenOutcome::Opened(display) => display,
        OpenOutcome::InFlight => panic!("open was coalesced"),
    }
}

async fn document_with(units: &[PlayableUnit]) -> MemoryContentStore {
    let content = MemoryContentStore::new();
    let document = units[0].source_id().unwrap();
    content.insert_document(document, units.to_vec()).await;
    content
}

// ===== Opening and resuming =====

#[tokio::test(start_paused = true)]
async fn test_open_resumes_at_saved_position() {
    let log = new_log();
    let store = MemoryStore::new();
    let units = chapters(DocumentId::generate(), 3, 100);
    ResumeStore::new(Arc::new(store.clone()))
        .save(&units[1], 1, 40, 0.4)
        .await
        .unwrap();

    let mut h = spawn(
        FakeEngine::with_ready(log.clone()),
        document_with(&units).await,
        store,
    )
    .await;

    let display = opened(h.handle.open(units[1].id()).await.unwrap());

    assert_eq!(display.unit_id, Some(units[1].id()));
    assert_eq!(display.position_chars, 40);
    assert!(display.is_resuming);
    assert_eq!(display.current_index, Some(1));
    assert_eq!(display.playlist.len(), 3);
    assert!(position_of(&log, "load Chapter 2@40").is_some());

    wait_for_playing(&mut h.events, true).await;
    let record = h.handle.global_record().await.unwrap();
    assert!(record.is_playing_content(units[1].id()));
    assert_eq!(record.content_type, ContentType::Document);
    assert_eq!(record.title, "Chapter 2");
}

#[tokio::test(start_paused = true)]
async fn test_start_falls_back_to_settle_window() {
    let log = new_log();
    let content = MemoryContentStore::new();
    let article = PlayableUnit::new("Article", "Some words to read.");
    content.insert_unit(article.clone()).await;

    let h = spawn(FakeEngine::new(log.clone()), content, MemoryStore::new()).await;

    let display = opened(h.handle.open(article.id()).await.unwrap());
    assert!(!display.is_playing);
    assert_eq!(position_of(&log, "start"), None);

    let window = PlaybackConfig::default().settle_window();
    tokio::time::sleep(window + Duration::from_millis(50)).await;

    assert!(h.handle.display().await.unwrap().is_playing);
    assert!(position_of(&log, "start").is_some());
    let record = h.handle.global_record().await.unwrap();
    assert_eq!(record.content_type, ContentType::Article);
}

#[tokio::test(start_paused = true)]
async fn test_open_document_follows_chapter_pointer() {
    let log = new_log();
    let store = MemoryStore::new();
    let document = DocumentId::generate();
    let units = chapters(document, 3, 100);
    ResumeStore::new(Arc::new(store.clone()))
        .save(&units[2], 2, 10, 0.1)
        .await
        .unwrap();

    let h = spawn(
        FakeEngine::with_ready(log.clone()),
        document_with(&units).await,
        store,
    )
    .await;

    let resumed = opened(h.handle.open_document(document, false).await.unwrap());
    assert_eq!(resumed.unit_id, Some(units[2].id()));
    assert_eq!(resumed.position_chars, 10);

    let restarted = opened(h.handle.open_document(document, true).await.unwrap());
    assert_eq!(restarted.unit_id, Some(units[0].id()));
    assert_eq!(restarted.position_chars, 0);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_open_is_coalesced() {
    let log = new_log();
    let units = chapters(DocumentId::generate(), 2, 50);
    let h = spawn(
        FakeEngine::with_ready(log.clone()),
        document_with(&units).await,
        MemoryStore::new(),
    )
    .await;

    let id = units[0].id();
    let (first, second) = tokio::join!(h.handle.open(id), h.handle.open(id));

    assert!(matches!(first.unwrap(), OpenOutcome::Opened(_)));
    assert_eq!(second.unwrap(), OpenOutcome::InFlight);
    assert_eq!(
        entries(&log).iter().filter(|e| e.starts_with("load")).count(),
        1
    );
}

// ===== Errors =====

#[tokio::test(start_paused = true)]
async fn test_missing_content_is_reported_to_user() {
    let mut h = spawn(
        FakeEngine::with_ready(new_log()),
        MemoryContentStore::new(),
        MemoryStore::new(),
    )
    .await;
    let missing = UnitId::generate();

    let result = h.handle.open(missing).await;

    assert!(matches!(result, Err(LectorError::ContentMissing(id)) if id == missing));
    let event = wait_for(&mut h.events, |e| matches!(e, CoordinatorEvent::Error(_))).await;
    assert_eq!(
        event,
        CoordinatorEvent::Error(UserError::ContentMissing { unit_id: missing })
    );

    // The actor keeps serving requests
    assert!(h.handle.display().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_language_mismatch_prompts_before_loading() {
    let log = new_log();
    let content = MemoryContentStore::new();
    let article = PlayableUnit::new("第一章", "这是一个关于语音朗读的测试段落。");
    content.insert_unit(article.clone()).await;

    let h = spawn(
        FakeEngine::with_voice(log.clone(), "fr-FR"),
        content,
        MemoryStore::new(),
    )
    .await;

    let result = h.handle.open(article.id()).await;
    assert!(matches!(
        result,
        Err(LectorError::LanguageMismatch { ref voice, ref content }) if voice == "fr" && content == "zh"
    ));
    assert_eq!(position_of(&log, "load"), None);

    let display = opened(h.handle.open_anyway(article.id()).await.unwrap());
    assert_eq!(display.unit_id, Some(article.id()));
    assert!(position_of(&log, "load").is_some());
}

#[tokio::test(start_paused = true)]
async fn test_allowed_language_pair_opens_directly() {
    let content = MemoryContentStore::new();
    let article = PlayableUnit::new("第一章", "这是一个关于语音朗读的测试段落。");
    content.insert_unit(article.clone()).await;

    let h = spawn(
        FakeEngine::with_voice(new_log(), "en-US"),
        content,
        MemoryStore::new(),
    )
    .await;

    assert!(h.handle.open(article.id()).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_empty_document_opens_placeholder() {
    let log = new_log();
    let document = DocumentId::generate();
    let h = spawn(
        FakeEngine::with_ready(log.clone()),
        MemoryContentStore::new(),
        MemoryStore::new(),
    )
    .await;

    let display = opened(h.handle.open_document(document, false).await.unwrap());

    assert!(display.unit_id.is_some());
    assert_eq!(display.playlist.len(), 1);
    assert_eq!(display.total_time_ms, 0);
    assert_eq!(position_of(&log, "load"), None);
}

// ===== Navigation and completion =====

#[tokio::test(start_paused = true)]
async fn test_navigation_is_debounced() {
    let units = chapters(DocumentId::generate(), 3, 50);
    let h = spawn(
        FakeEngine::with_ready(new_log()),
        document_with(&units).await,
        MemoryStore::new(),
    )
    .await;
    h.handle.open(units[0].id()).await.unwrap();

    assert!(matches!(
        h.handle.next().await.unwrap(),
        AdvanceOutcome::Accepted(_)
    ));
    assert_eq!(h.handle.next().await.unwrap(), AdvanceOutcome::Throttled);

    tokio::time::sleep(PlaybackConfig::default().transition_cooldown()).await;
    assert!(matches!(
        h.handle.previous().await.unwrap(),
        AdvanceOutcome::Accepted(t) if t.to == units[0].id()
    ));
}

#[tokio::test(start_paused = true)]
async fn test_completion_advances_then_ends_playlist() {
    let units = chapters(DocumentId::generate(), 2, 50);
    let mut h = spawn(
        FakeEngine::with_ready(new_log()),
        document_with(&units).await,
        MemoryStore::new(),
    )
    .await;
    h.handle.open(units[0].id()).await.unwrap();
    wait_for_playing(&mut h.events, true).await;

    h.engine.finish();
    wait_for(&mut h.events, |e| {
        matches!(e, CoordinatorEvent::Finished { unit_id } if *unit_id == units[0].id())
    })
    .await;
    wait_for(&mut h.events, |e| {
        matches!(e, CoordinatorEvent::Transitioned(t) if t.to == units[1].id())
    })
    .await;

    h.engine.finish();
    wait_for(&mut h.events, |e| matches!(e, CoordinatorEvent::PlaylistEnded)).await;

    let record = h.handle.global_record().await.unwrap();
    assert_eq!(record.content_id, Some(units[1].id()));
    assert!(!record.is_playing);
}

// ===== Registry interplay =====

#[tokio::test(start_paused = true)]
async fn test_opening_other_content_displaces_playing_one() {
    let content = MemoryContentStore::new();
    let a = PlayableUnit::new("A", "First article text.");
    let b = PlayableUnit::new("B", "Second article text.");
    content.insert_unit(a.clone()).await;
    content.insert_unit(b.clone()).await;

    let mut h = spawn(FakeEngine::with_ready(new_log()), content, MemoryStore::new()).await;
    h.handle.open(a.id()).await.unwrap();
    wait_for_playing(&mut h.events, true).await;

    h.handle.open(b.id()).await.unwrap();
    wait_for(&mut h.events, |e| {
        matches!(e, CoordinatorEvent::Registry(r) if r.content_id == Some(a.id()) && !r.is_playing)
    })
    .await;
    wait_for(&mut h.events, |e| {
        matches!(e, CoordinatorEvent::Registry(r) if r.is_playing_content(b.id()))
    })
    .await;

    let record = h.handle.global_record().await.unwrap();
    assert!(record.is_playing_content(b.id()));
    assert!(!record.is_playing_content(a.id()));
}

#[tokio::test(start_paused = true)]
async fn test_pause_goes_through_registry_and_play_resumes() {
    let log = new_log();
    let units = chapters(DocumentId::generate(), 2, 50);
    let mut h = spawn(
        FakeEngine::with_ready(log.clone()),
        document_with(&units).await,
        MemoryStore::new(),
    )
    .await;
    h.handle.open(units[0].id()).await.unwrap();
    wait_for_playing(&mut h.events, true).await;

    h.handle.pause().await.unwrap();

    assert!(position_of(&log, "pause").is_some());
    let record = h.handle.global_record().await.unwrap();
    assert_eq!(record.content_id, Some(units[0].id()));
    assert!(!record.is_playing);
    assert!(!h.handle.display().await.unwrap().is_playing);

    h.handle.play().await.unwrap();
    assert!(h
        .handle
        .global_record()
        .await
        .unwrap()
        .is_playing_content(units[0].id()));
}

// ===== Persistence failures =====

#[tokio::test(start_paused = true)]
async fn test_playback_continues_with_store_down() {
    let log = new_log();
    let units = chapters(DocumentId::generate(), 2, 50);
    let mut h = spawn(
        FakeEngine::with_ready(log.clone()),
        document_with(&units).await,
        RecordingStore::unavailable(log.clone()),
    )
    .await;
    let mut bus = h.handle.subscribe();

    let display = opened(h.handle.open(units[0].id()).await.unwrap());
    assert_eq!(display.unit_id, Some(units[0].id()));
    assert_eq!(display.position_chars, 0);
    assert!(!display.is_resuming);
    assert!(position_of(&log, "load Chapter 1@0").is_some());
    wait_for_playing(&mut h.events, true).await;
    assert!(h
        .handle
        .global_record()
        .await
        .unwrap()
        .is_playing_content(units[0].id()));

    h.handle.pause().await.unwrap();
    assert!(!h.handle.global_record().await.unwrap().is_playing);
    h.handle.play().await.unwrap();
    assert!(h
        .handle
        .global_record()
        .await
        .unwrap()
        .is_playing_content(units[0].id()));

    tokio::time::sleep(PlaybackConfig::default().transition_cooldown()).await;
    assert!(matches!(
        h.handle.next().await.unwrap(),
        AdvanceOutcome::Accepted(t) if t.to == units[1].id()
    ));
    wait_for(&mut h.events, |e| {
        matches!(e, CoordinatorEvent::Registry(r) if r.is_playing_content(units[1].id()))
    })
    .await;

    let document = units[0].source_id().unwrap();
    let display = opened(h.handle.open_document(document, false).await.unwrap());
    assert_eq!(display.unit_id, Some(units[0].id()));

    assert!(entries(&log).iter().any(|e| e.starts_with("failed set")));
    loop {
        match bus.try_recv() {
            Ok(CoordinatorEvent::Error(err)) => panic!("store outage surfaced: {err:?}"),
            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_store_recovery_resumes_persisting() {
    let log = new_log();
    let units = chapters(DocumentId::generate(), 2, 50);
    let store = RecordingStore::unavailable(log.clone());
    let mut h = spawn(
        FakeEngine::with_ready(log.clone()),
        document_with(&units).await,
        store.clone(),
    )
    .await;
    h.handle.open(units[0].id()).await.unwrap();
    wait_for_playing(&mut h.events, true).await;

    store.set_down(false);
    h.handle.pause().await.unwrap();

    let saved = lector_storage::global_record::load(&h.store).await.unwrap();
    assert_eq!(saved.and_then(|r| r.content_id), Some(units[0].id()));
}

// ===== Lifecycle events =====

#[tokio::test(start_paused = true)]
async fn test_exit_view_saves_boundary_position() {
    let store = MemoryStore::new();
    let document = DocumentId::generate();
    let unit = PlayableUnit::with_source(document, "Chapter 1", paragraph_text(4, 20));
    let content = MemoryContentStore::new();
    content.insert_document(document, vec![unit.clone()]).await;

    let mut h = spawn(FakeEngine::with_ready(new_log()), content, store.clone()).await;
    let view = ViewId(1);
    h.handle
        .dispatch(AppEvent::EnterPlaybackView {
            view,
            unit_id: unit.id(),
        })
        .await
        .unwrap();
    wait_for_playing(&mut h.events, true).await;

    h.engine.boundary(30..40);
    let event = wait_for(&mut h.events, |e| {
        matches!(e, CoordinatorEvent::Display(d) if d.position_chars == 30)
    })
    .await;
    let CoordinatorEvent::Display(display) = event else {
        unreachable!()
    };
    assert_eq!(display.highlighted, vec![1]);
    assert_eq!(display.scroll_to, Some(1));

    h.handle
        .dispatch(AppEvent::ExitPlaybackView { view })
        .await
        .unwrap();
    h.handle.display().await.unwrap();

    let record = ResumeStore::new(Arc::new(store))
        .load(unit.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.position_chars, 30);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_reconciles_silently_stopped_engine() {
    let log = new_log();
    let units = chapters(DocumentId::generate(), 2, 50);
    let mut h = spawn(
        FakeEngine::with_ready(log.clone()),
        document_with(&units).await,
        MemoryStore::new(),
    )
    .await;
    h.handle
        .dispatch(AppEvent::EnterPlaybackView {
            view: ViewId(7),
            unit_id: units[0].id(),
        })
        .await
        .unwrap();
    wait_for_playing(&mut h.events, true).await;

    h.engine.set_speaking_silently(false);
    h.handle.dispatch(AppEvent::AppForeground).await.unwrap();

    let record = h.handle.global_record().await.unwrap();
    assert_eq!(record.content_id, Some(units[0].id()));
    assert!(!record.is_playing);
    assert_eq!(entries(&log).last().map(String::as_str), Some("stop"));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_saves_and_stops() {
    let log = new_log();
    let store = MemoryStore::new();
    let units = chapters(DocumentId::generate(), 2, 100);
    let mut h = spawn(
        FakeEngine::with_ready(log.clone()),
        document_with(&units).await,
        store.clone(),
    )
    .await;
    h.handle.open(units[0].id()).await.unwrap();
    wait_for_playing(&mut h.events, true).await;

    h.engine.boundary(25..30);
    wait_for(&mut h.events, |e| {
        matches!(e, CoordinatorEvent::Display(d) if d.position_chars == 25)
    })
    .await;

    h.handle.shutdown().await.unwrap();
    h.task.await.unwrap();

    assert_eq!(entries(&log).last().map(String::as_str), Some("stop"));
    let record = ResumeStore::new(Arc::new(store))
        .load(units[0].id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.position_chars, 25);
    assert!(matches!(
        h.handle.display().await,
        Err(LectorError::CoordinatorClosed)
    ));
}
