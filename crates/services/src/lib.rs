#![forbid(unsafe_code)]

pub mod error;
pub mod notify;
pub mod player;
pub mod reporter;

pub use lesson_core::Clock;

pub use error::PlayerError;
pub use notify::{Notice, NoticeKind, Notifier, RecordingNotifier, TracingNotifier};
pub use player::{
    AutoAdvanceTimer, LessonPlayer, LessonProgress, PlayerEvent, PlayerPhase, SubmitOutcome,
};
pub use reporter::{ActivityResultReporter, ReportHandle, ReportOutcome};
