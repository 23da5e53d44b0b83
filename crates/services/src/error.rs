//! Shared error types for the services crate.

use thiserror::Error;

use lesson_core::model::{ActivityError, OptionId};

/// Errors returned by `LessonPlayer` when the host asks for a transition the
/// current state does not allow. State is left unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("lesson already finished")]
    Finished,
    #[error("current slide does not take answers")]
    NotInteractive,
    #[error("unknown option: {0}")]
    UnknownOption(OptionId),
    #[error("no option selected")]
    NothingSelected,
    #[error("slide already answered correctly")]
    AlreadyAnswered,
    #[error("already at the first slide")]
    AtStart,
    #[error(transparent)]
    Activity(#[from] ActivityError),
}
