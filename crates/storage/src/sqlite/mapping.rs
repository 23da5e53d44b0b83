use lesson_core::model::{
    ActivityResult, CefrLevel, LearnerId, LearningEvent, LearningEventKind, LessonId, SlideId,
};
use sqlx::Row;
use uuid::Uuid;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn tags_to_json(tags: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(tags).map_err(ser)
}

fn tags_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

fn level_from_str(raw: &str) -> Result<CefrLevel, StorageError> {
    raw.parse::<CefrLevel>().map_err(ser)
}

fn uuid_from_str(raw: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(raw).map_err(ser)
}

fn attempts_from_i64(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid attempts: {v}")))
}

/// True when a sqlx error is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

pub(crate) fn map_activity_result_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ActivityResult, StorageError> {
    let result_id: String = row.try_get("result_id").map_err(ser)?;
    let slide_id: String = row.try_get("slide_id").map_err(ser)?;
    let tags: String = row.try_get("tags").map_err(ser)?;
    let level: String = row.try_get("level").map_err(ser)?;
    let accuracy: i64 = row.try_get("accuracy_percent").map_err(ser)?;
    let accuracy = u8::try_from(accuracy)
        .map_err(|_| StorageError::Serialization(format!("invalid accuracy: {accuracy}")))?;

    ActivityResult::from_persisted(
        uuid_from_str(&result_id)?,
        LearnerId::new(i64_to_u64("learner_id", row.try_get("learner_id").map_err(ser)?)?),
        LessonId::new(i64_to_u64("lesson_id", row.try_get("lesson_id").map_err(ser)?)?),
        SlideId::new(slide_id).map_err(ser)?,
        row.try_get::<bool, _>("correct").map_err(ser)?,
        i64_to_u64("elapsed_ms", row.try_get("elapsed_ms").map_err(ser)?)?,
        attempts_from_i64(row.try_get("attempts").map_err(ser)?)?,
        tags_from_json(&tags)?,
        level_from_str(&level)?,
        accuracy,
        row.try_get("recorded_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_learning_event_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<LearningEvent, StorageError> {
    let result_id: String = row.try_get("result_id").map_err(ser)?;
    let kind: String = row.try_get("kind").map_err(ser)?;
    let slide_id: String = row.try_get("slide_id").map_err(ser)?;
    let tags: String = row.try_get("tags").map_err(ser)?;
    let level: String = row.try_get("level").map_err(ser)?;

    Ok(LearningEvent {
        result_id: uuid_from_str(&result_id)?,
        kind: LearningEventKind::parse_str(&kind).map_err(ser)?,
        learner_id: LearnerId::new(i64_to_u64(
            "learner_id",
            row.try_get("learner_id").map_err(ser)?,
        )?),
        lesson_id: LessonId::new(i64_to_u64("lesson_id", row.try_get("lesson_id").map_err(ser)?)?),
        slide_id: SlideId::new(slide_id).map_err(ser)?,
        success: row.try_get::<bool, _>("success").map_err(ser)?,
        attempts: attempts_from_i64(row.try_get("attempts").map_err(ser)?)?,
        elapsed_ms: i64_to_u64("elapsed_ms", row.try_get("elapsed_ms").map_err(ser)?)?,
        level: level_from_str(&level)?,
        tags: tags_from_json(&tags)?,
        occurred_at: row.try_get("occurred_at").map_err(ser)?,
    })
}
