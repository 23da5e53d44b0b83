mod activity;
mod ids;
mod lesson;
mod settings;
mod slide;

pub use ids::{LearnerId, LessonId, OptionId, ParseIdError, SlideId};

pub use activity::{ActivityError, ActivityResult, Evaluation, LearningEvent, LearningEventKind};
pub use lesson::{
    CefrLevel, LESSON_FORMAT_VERSION, LessonMeta, LessonSlides, LessonSlidesError, ScoringWeights,
};
pub use settings::{
    DEFAULT_AUTO_ADVANCE_MS, DEFAULT_PASS_RATIO, PlayerSettings, PlayerSettingsDraft,
    PlayerSettingsError,
};
pub use slide::{CorrectAnswer, Slide, SlideDraft, SlideError, SlideOption, SlideType};
