use async_trait::async_trait;
use lesson_core::model::{ActivityResult, LearnerId, LearningEvent, LessonId};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Progress persistence: one row per submitted answer.
#[async_trait]
pub trait ActivityResultRepository: Send + Sync {
    /// Append an activity result and return its storage row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a result with the same id was
    /// already stored, or other storage errors.
    async fn append_result(&self, result: &ActivityResult) -> Result<i64, StorageError>;

    /// All results a learner produced in a lesson, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the results cannot be loaded.
    async fn results_for_lesson(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Vec<ActivityResult>, StorageError>;
}

/// Learning analytics sink.
#[async_trait]
pub trait LearningEventRepository: Send + Sync {
    /// Append an analytics event and return its storage row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the event cannot be stored.
    async fn append_event(&self, event: &LearningEvent) -> Result<i64, StorageError>;

    /// All events for a learner, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the events cannot be loaded.
    async fn events_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<LearningEvent>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    results: Arc<Mutex<Vec<ActivityResult>>>,
    events: Arc<Mutex<Vec<LearningEvent>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn row_id(len: usize) -> Result<i64, StorageError> {
    i64::try_from(len).map_err(|_| StorageError::Serialization("row id overflow".into()))
}

#[async_trait]
impl ActivityResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &ActivityResult) -> Result<i64, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.iter().any(|existing| existing.id() == result.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(result.clone());
        row_id(guard.len())
    }

    async fn results_for_lesson(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Vec<ActivityResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<ActivityResult> = guard
            .iter()
            .filter(|r| r.learner_id() == learner_id && r.lesson_id() == lesson_id)
            .cloned()
            .collect();
        found.sort_by_key(ActivityResult::recorded_at);
        Ok(found)
    }
}

#[async_trait]
impl LearningEventRepository for InMemoryRepository {
    async fn append_event(&self, event: &LearningEvent) -> Result<i64, StorageError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(event.clone());
        row_id(guard.len())
    }

    async fn events_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<LearningEvent>, StorageError> {
        let guard = self
            .events
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<LearningEvent> = guard
            .iter()
            .filter(|e| e.learner_id == learner_id)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.occurred_at);
        Ok(found)
    }
}

/// Aggregates the progress and analytics sinks behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub results: Arc<dyn ActivityResultRepository>,
    pub events: Arc<dyn LearningEventRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let results: Arc<dyn ActivityResultRepository> = Arc::new(repo.clone());
        let events: Arc<dyn LearningEventRepository> = Arc::new(repo);
        Self { results, events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::{CefrLevel, Evaluation, SlideId};
    use lesson_core::time::fixed_now;

    fn result(learner: u64, lesson: u64, slide: &str, correct: bool) -> ActivityResult {
        ActivityResult::from_evaluation(Evaluation {
            learner_id: LearnerId::new(learner),
            lesson_id: LessonId::new(lesson),
            slide_id: SlideId::new(slide).unwrap(),
            correct,
            elapsed_ms: 900,
            attempts: 1,
            tags: vec!["warm-up".into()],
            level: CefrLevel::A2,
            recorded_at: fixed_now(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn results_are_filtered_by_learner_and_lesson() {
        let repo = InMemoryRepository::new();
        repo.append_result(&result(1, 10, "a", true)).await.unwrap();
        repo.append_result(&result(1, 11, "b", false)).await.unwrap();
        repo.append_result(&result(2, 10, "c", true)).await.unwrap();

        let found = repo
            .results_for_lesson(LearnerId::new(1), LessonId::new(10))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slide_id().as_str(), "a");
    }

    #[tokio::test]
    async fn duplicate_result_is_a_conflict() {
        let repo = InMemoryRepository::new();
        let r = result(1, 1, "a", true);
        repo.append_result(&r).await.unwrap();
        let err = repo.append_result(&r).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn storage_bundle_shares_one_backend() {
        let storage = Storage::in_memory();
        let r = result(5, 1, "a", false);
        storage.results.append_result(&r).await.unwrap();
        storage
            .events
            .append_event(&LearningEvent::from_result(&r))
            .await
            .unwrap();

        let events = storage
            .events
            .events_for_learner(LearnerId::new(5))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].result_id, r.id());
    }
}
