mod progress;
mod service;
mod state;
mod timer;

// Public API of the lesson player.
pub use crate::error::PlayerError;
pub use progress::LessonProgress;
pub use service::LessonPlayer;
pub use state::{PlayerEvent, PlayerPhase, SubmitOutcome};
pub use timer::AutoAdvanceTimer;
