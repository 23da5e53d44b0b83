use std::sync::Arc;

use async_trait::async_trait;
use lesson_core::model::{
    ActivityResult, LearnerId, LearningEvent, LessonId, OptionId,
};
use lesson_core::time::fixed_clock;
use serde_json::json;
use services::reporter::SAVE_FAILED_MESSAGE;
use services::{ActivityResultReporter, LessonPlayer, Notice, NoticeKind, RecordingNotifier};
use storage::repository::{
    ActivityResultRepository, InMemoryRepository, LearningEventRepository, StorageError,
};

struct OfflineRepository;

#[async_trait]
impl ActivityResultRepository for OfflineRepository {
    async fn append_result(&self, _result: &ActivityResult) -> Result<i64, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn results_for_lesson(
        &self,
        _learner_id: LearnerId,
        _lesson_id: LessonId,
    ) -> Result<Vec<ActivityResult>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[async_trait]
impl LearningEventRepository for OfflineRepository {
    async fn append_event(&self, _event: &LearningEvent) -> Result<i64, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn events_for_learner(
        &self,
        _learner_id: LearnerId,
    ) -> Result<Vec<LearningEvent>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

fn player(reporter: ActivityResultReporter) -> LessonPlayer {
    let records = vec![
        json!({
            "type": "mcq",
            "title": "Which word is a verb?",
            "options": [
                { "id": 1, "text": "run", "correct": true },
                { "id": 2, "text": "table" }
            ]
        }),
        json!({ "type": "summary", "title": "Well done" }),
    ];
    LessonPlayer::from_legacy(&records, "Verbs", LessonId::new(4), LearnerId::new(4))
        .unwrap()
        .with_clock(fixed_clock())
        .with_reporter(reporter)
}

#[tokio::test]
async fn progress_failure_warns_but_player_continues() {
    let notifier = RecordingNotifier::new();
    let offline = Arc::new(OfflineRepository);
    let reporter =
        ActivityResultReporter::new(offline.clone(), offline, Arc::new(notifier.clone()));
    let mut p = player(reporter);

    p.select_option(&OptionId::new("1").unwrap()).unwrap();
    let outcome = p.submit().unwrap();
    assert!(outcome.is_correct());

    let report = outcome.report.unwrap().wait().await;
    assert!(!report.progress_saved);
    assert!(!report.analytics_recorded);

    assert_eq!(
        notifier.notices(),
        vec![
            Notice::success("Great job! That's correct."),
            Notice::warning(SAVE_FAILED_MESSAGE),
        ]
    );

    p.next().unwrap();
    assert_eq!(p.index(), 1);
}

#[tokio::test]
async fn analytics_failure_is_only_logged() {
    let notifier = RecordingNotifier::new();
    let progress = InMemoryRepository::new();
    let reporter = ActivityResultReporter::new(
        Arc::new(progress.clone()),
        Arc::new(OfflineRepository),
        Arc::new(notifier.clone()),
    );
    let mut p = player(reporter);

    p.select_option(&OptionId::new("2").unwrap()).unwrap();
    let report = p.submit().unwrap().report.unwrap().wait().await;
    assert!(report.progress_saved);
    assert!(!report.analytics_recorded);

    let kinds: Vec<NoticeKind> = notifier.notices().iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NoticeKind::Encouragement]);

    let saved = progress
        .results_for_lesson(LearnerId::new(4), LessonId::new(4))
        .await
        .unwrap();
    assert_eq!(saved.len(), 1);
    assert!(!saved[0].is_correct());
}
