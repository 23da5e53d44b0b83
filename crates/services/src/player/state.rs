use lesson_core::model::ActivityResult;

use crate::reporter::ReportHandle;

/// Where the player is within the current slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerPhase {
    /// Slide shown, nothing selected yet.
    #[default]
    Idle,
    /// At least one option selected, not yet submitted.
    Answering,
    /// An answer was submitted and its feedback is visible.
    Feedback { correct: bool },
    /// Every slide has been passed.
    Done,
}

impl PlayerPhase {
    #[must_use]
    pub fn is_done(self) -> bool {
        matches!(self, PlayerPhase::Done)
    }
}

/// Messages delivered to the host's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The auto-advance delay elapsed for the timer carrying `ticket`.
    AutoAdvance { ticket: u64 },
}

/// What a single submission produced.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub result: ActivityResult,
    pub auto_advance_scheduled: bool,
    /// Background persistence, when a reporter is attached and a runtime is available.
    pub report: Option<ReportHandle>,
}

impl SubmitOutcome {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.result.is_correct()
    }
}
