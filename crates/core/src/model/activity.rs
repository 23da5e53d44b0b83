use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::ids::{LearnerId, LessonId, SlideId};
use crate::model::lesson::CefrLevel;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActivityError {
    #[error("attempt count must be >= 1")]
    InvalidAttempts,

    #[error("accuracy must be between 0 and 100, got {0}")]
    InvalidAccuracy(u8),

    #[error("unknown learning event kind: {0}")]
    UnknownEventKind(String),
}

//
// ─── ACTIVITY RESULT ───────────────────────────────────────────────────────────
//

/// Everything the player knows about one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub learner_id: LearnerId,
    pub lesson_id: LessonId,
    pub slide_id: SlideId,
    pub correct: bool,
    pub elapsed_ms: u64,
    pub attempts: u32,
    pub tags: Vec<String>,
    pub level: CefrLevel,
    pub recorded_at: DateTime<Utc>,
}

/// Immutable record of one learner response to one slide.
///
/// One is created per submission, including incorrect retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResult {
    id: Uuid,
    learner_id: LearnerId,
    lesson_id: LessonId,
    slide_id: SlideId,
    correct: bool,
    elapsed_ms: u64,
    attempts: u32,
    tags: Vec<String>,
    level: CefrLevel,
    accuracy_percent: u8,
    recorded_at: DateTime<Utc>,
}

impl ActivityResult {
    /// Build a result from a finished evaluation.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError::InvalidAttempts` if `attempts` is zero.
    pub fn from_evaluation(evaluation: Evaluation) -> Result<Self, ActivityError> {
        if evaluation.attempts == 0 {
            return Err(ActivityError::InvalidAttempts);
        }
        let accuracy_percent = if evaluation.correct { 100 } else { 0 };
        Ok(Self {
            id: Uuid::new_v4(),
            learner_id: evaluation.learner_id,
            lesson_id: evaluation.lesson_id,
            slide_id: evaluation.slide_id,
            correct: evaluation.correct,
            elapsed_ms: evaluation.elapsed_ms,
            attempts: evaluation.attempts,
            tags: evaluation.tags,
            level: evaluation.level,
            accuracy_percent,
            recorded_at: evaluation.recorded_at,
        })
    }

    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if attempts or accuracy are out of range.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: Uuid,
        learner_id: LearnerId,
        lesson_id: LessonId,
        slide_id: SlideId,
        correct: bool,
        elapsed_ms: u64,
        attempts: u32,
        tags: Vec<String>,
        level: CefrLevel,
        accuracy_percent: u8,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, ActivityError> {
        if attempts == 0 {
            return Err(ActivityError::InvalidAttempts);
        }
        if accuracy_percent > 100 {
            return Err(ActivityError::InvalidAccuracy(accuracy_percent));
        }
        Ok(Self {
            id,
            learner_id,
            lesson_id,
            slide_id,
            correct,
            elapsed_ms,
            attempts,
            tags,
            level,
            accuracy_percent,
            recorded_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn slide_id(&self) -> &SlideId {
        &self.slide_id
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.correct
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn level(&self) -> CefrLevel {
        self.level
    }

    #[must_use]
    pub fn accuracy_percent(&self) -> u8 {
        self.accuracy_percent
    }

    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

//
// ─── LEARNING EVENT ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningEventKind {
    SlideAnsweredCorrect,
    SlideAnsweredIncorrect,
}

impl LearningEventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LearningEventKind::SlideAnsweredCorrect => "slide_answered_correct",
            LearningEventKind::SlideAnsweredIncorrect => "slide_answered_incorrect",
        }
    }

    /// # Errors
    ///
    /// Returns `ActivityError::UnknownEventKind` for unrecognized strings.
    pub fn parse_str(raw: &str) -> Result<Self, ActivityError> {
        match raw {
            "slide_answered_correct" => Ok(LearningEventKind::SlideAnsweredCorrect),
            "slide_answered_incorrect" => Ok(LearningEventKind::SlideAnsweredIncorrect),
            other => Err(ActivityError::UnknownEventKind(other.to_string())),
        }
    }
}

/// Analytics event derived from an `ActivityResult`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningEvent {
    pub result_id: Uuid,
    pub kind: LearningEventKind,
    pub learner_id: LearnerId,
    pub lesson_id: LessonId,
    pub slide_id: SlideId,
    pub success: bool,
    pub attempts: u32,
    pub elapsed_ms: u64,
    pub level: CefrLevel,
    pub tags: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

impl LearningEvent {
    #[must_use]
    pub fn from_result(result: &ActivityResult) -> Self {
        let kind = if result.is_correct() {
            LearningEventKind::SlideAnsweredCorrect
        } else {
            LearningEventKind::SlideAnsweredIncorrect
        };
        Self {
            result_id: result.id(),
            kind,
            learner_id: result.learner_id(),
            lesson_id: result.lesson_id(),
            slide_id: result.slide_id().clone(),
            success: result.is_correct(),
            attempts: result.attempts(),
            elapsed_ms: result.elapsed_ms(),
            level: result.level(),
            tags: result.tags().to_vec(),
            occurred_at: result.recorded_at(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
