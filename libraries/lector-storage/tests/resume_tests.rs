
use lector_core::{DocumentId, PlayableUnit};
use lector_storage::{MemoryStore, ResumeStore, SaveOutcome};
use proptest::prelude::*;
use std::sync::Arc;
use test_helpers::{chapters, TestDb};

// ===== Exact resume =====

#[tokio::test]
async fn test_save_then_load_returns_position() {
    let db = TestDb::new().await;
    let resume = ResumeStore::new(Arc::new(db.store.clone()));
    let unit = PlayableUnit::new("Article", "a".repeat(400));

    let outcome = resume.save(&unit, 0, 120, 0.3).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Written(_)));

    let record = resume.load(unit.id()).await.unwrap().unwrap();
    assert_eq!(record.position_chars, 120);
    assert!((record.progress_fraction - 0.3).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_last_played_round_trip() {
    let db = TestDb::new().await;
    let resume = ResumeStore::new(Arc::new(db.store.clone()));
    let unit = PlayableUnit::new("Article", "text");

    assert_eq!(resume.last_played().await.unwrap(), None);
    resume.set_last_played(unit.id()).await.unwrap();
    assert_eq!(resume.last_played().await.unwrap(), Some(unit.id()));
}

#[tokio::test]
async fn test_clear_forgets_record() {
    let resume = ResumeStore::new(Arc::new(MemoryStore::new()));
    let unit = PlayableUnit::new("Article", "some words here");

    resume.save(&unit, 0, 5, 0.33).await.unwrap();
    resume.clear(unit.id()).await.unwrap();

    assert_eq!(resume.load(unit.id()).await.unwrap(), None);
}

// ===== Document resume =====

#[tokio::test]
async fn test_resume_point_prefers_exact_record() {
    let resume = ResumeStore::new(Arc::new(MemoryStore::new()));
    let document = DocumentId::generate();
    let units = chapters(document, &[500, 300]);

    resume.save(&units[1], 1, 10, 10.0 / 300.0).await.unwrap();
    let target = resume
        .resume_point(&units[1], Some(0.9), &units)
        .await
        .unwrap()
        .unwrap();

    assert!(target.exact);
    assert_eq!(target.position_chars, 10);
    assert_eq!(target.chapter_index, 1);
}

#[tokio::test]
async fn test_resume_point_falls_back_to_overall_progress() {
    let resume = ResumeStore::new(Arc::new(MemoryStore::new()));
    let document = DocumentId::generate();
    let units = chapters(document, &[500, 300]);

    let target = resume
        .resume_point(&units[0], Some(0.7), &units)
        .await
        .unwrap()
        .unwrap();

    assert!(!target.exact);
    assert_eq!(target.unit_id, units[1].id());
    assert!((target.progress_fraction - 0.2).abs() < 0.01);
}

#[tokio::test]
async fn test_resume_point_without_any_state() {
    let resume = ResumeStore::new(Arc::new(MemoryStore::new()));
    let document = DocumentId::generate();
    let units = chapters(document, &[50]);

    let target = resume.resume_point(&units[0], None, &units).await.unwrap();

    assert_eq!(target, None);
}

#[tokio::test]
async fn test_resume_document_follows_pointer() {
    let db = TestDb::new().await;
    let resume = ResumeStore::new(Arc::new(db.store.clone()));
    let document = DocumentId::generate();
    let units = chapters(document, &[100, 100, 100]);

    resume.save(&units[2], 2, 40, 0.4).await.unwrap();
    resume.save_document_progress(document, 0.8).await.unwrap();

    let target = resume
        .resume_document(document, &units)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(target.unit_id, units[2].id());
    assert_eq!(target.position_chars, 40);
    assert!(target.exact);
}

#[tokio::test]
async fn test_resume_document_after_resegmentation_uses_index() {
    let resume = ResumeStore::new(Arc::new(MemoryStore::new()));
    let document = DocumentId::generate();
    let old = chapters(document, &[100, 100]);
    resume.save(&old[1], 1, 40, 0.4).await.unwrap();

    let resegmented = chapters(document, &[100, 100]);
    resume.save_document_progress(document, 0.7).await.unwrap();
    let target = resume
        .resume_document(document, &resegmented)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(target.unit_id, resegmented[1].id());
    assert!(!target.exact);
    assert_eq!(target.position_chars, 40);
}

// ===== Properties =====

proptest! {
    /// Property: saving a position and loading it back yields the same
    /// position and progress
    #[test]
    fn prop_save_then_load_round_trips(
        len in 1usize..2_000,
        position_seed in 0usize..2_000,
        fraction in 0.0f64..=1.0,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let position = position_seed % (len + 1);

        let record = runtime.block_on(async {
            let resume = ResumeStore::new(Arc::new(MemoryStore::new()));
            let unit = PlayableUnit::new("Unit", "b".repeat(len));
            resume.save(&unit, 0, position, fraction).await.unwrap();
            resume.load(unit.id()).await.unwrap().unwrap()
        });

        prop_assert_eq!(record.position_chars, position);
        prop_assert!((record.progress_fraction - fraction).abs() < 1e-12);
    }

    /// Property: overall progress always resolves inside a non-empty chapter
    #[test]
    fn prop_overall_progress_lands_in_non_empty_chapter(
        lengths in prop::collection::vec(0usize..300, 1..8),
        progress in 0.0f64..=1.0,
    ) {
        let document = DocumentId::generate();
        let units = chapters(document, &lengths);
        let total: usize = lengths.iter().sum();

        match ResumeStore::load_by_overall_progress(document, progress, &units) {
            None => prop_assert_eq!(total, 0),
            Some(target) => {
                let len = lengths[target.chapter_index];
                prop_assert!(len > 0);
                prop_assert!(target.position_chars <= len);
                prop_assert!((0.0..=1.0).contains(&target.progress_fraction));
            }
        }
    }
}
