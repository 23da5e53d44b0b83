use lesson_core::model::{LearnerId, LearningEvent};

use super::{
    SqliteRepository,
    mapping::{id_i64, map_learning_event_row, tags_to_json},
};
use crate::repository::{LearningEventRepository, StorageError};

#[async_trait::async_trait]
impl LearningEventRepository for SqliteRepository {
    async fn append_event(&self, event: &LearningEvent) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO learning_events (
                    result_id, kind, learner_id, lesson_id, slide_id, success,
                    attempts, elapsed_ms, level, tags, occurred_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(event.result_id.to_string())
        .bind(event.kind.as_str())
        .bind(id_i64("learner_id", event.learner_id.value())?)
        .bind(id_i64("lesson_id", event.lesson_id.value())?)
        .bind(event.slide_id.as_str().to_owned())
        .bind(event.success)
        .bind(i64::from(event.attempts))
        .bind(id_i64("elapsed_ms", event.elapsed_ms)?)
        .bind(event.level.as_str())
        .bind(tags_to_json(&event.tags)?)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn events_for_learner(
        &self,
        learner_id: LearnerId,
    ) -> Result<Vec<LearningEvent>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    result_id, kind, learner_id, lesson_id, slide_id, success,
                    attempts, elapsed_ms, level, tags, occurred_at
                FROM learning_events
                WHERE learner_id = ?1
                ORDER BY occurred_at ASC, id ASC
            ",
        )
        .bind(id_i64("learner_id", learner_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_learning_event_row).collect()
    }
}
