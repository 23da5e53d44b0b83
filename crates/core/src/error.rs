use thiserror::Error;

use crate::model::{ActivityError, LessonSlidesError, PlayerSettingsError, SlideError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Slide(#[from] SlideError),
    #[error(transparent)]
    Lesson(#[from] LessonSlidesError),
    #[error(transparent)]
    Activity(#[from] ActivityError),
    #[error(transparent)]
    Settings(#[from] PlayerSettingsError),
}
