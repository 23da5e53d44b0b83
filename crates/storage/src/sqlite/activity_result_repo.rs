use lesson_core::model::{ActivityResult, LearnerId, LessonId};

use super::{
    SqliteRepository,
    mapping::{id_i64, is_unique_violation, map_activity_result_row, tags_to_json},
};
use crate::repository::{ActivityResultRepository, StorageError};

#[async_trait::async_trait]
impl ActivityResultRepository for SqliteRepository {
    async fn append_result(&self, result: &ActivityResult) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO activity_results (
                    result_id, learner_id, lesson_id, slide_id, correct, elapsed_ms,
                    attempts, tags, level, accuracy_percent, recorded_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(result.id().to_string())
        .bind(id_i64("learner_id", result.learner_id().value())?)
        .bind(id_i64("lesson_id", result.lesson_id().value())?)
        .bind(result.slide_id().as_str().to_owned())
        .bind(result.is_correct())
        .bind(id_i64("elapsed_ms", result.elapsed_ms())?)
        .bind(i64::from(result.attempts()))
        .bind(tags_to_json(result.tags())?)
        .bind(result.level().as_str())
        .bind(i64::from(result.accuracy_percent()))
        .bind(result.recorded_at())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                StorageError::Connection(e.to_string())
            }
        })?;

        Ok(res.last_insert_rowid())
    }

    async fn results_for_lesson(
        &self,
        learner_id: LearnerId,
        lesson_id: LessonId,
    ) -> Result<Vec<ActivityResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    result_id, learner_id, lesson_id, slide_id, correct, elapsed_ms,
                    attempts, tags, level, accuracy_percent, recorded_at
                FROM activity_results
                WHERE learner_id = ?1 AND lesson_id = ?2
                ORDER BY recorded_at ASC, id ASC
            ",
        )
        .bind(id_i64("learner_id", learner_id.value())?)
        .bind(id_i64("lesson_id", lesson_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_activity_result_row).collect()
    }
}
