use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use lesson_core::model::{
    ActivityResult, Evaluation, LearnerId, LessonId, LessonSlides, OptionId, PlayerSettings,
    Slide,
};
use lesson_core::{Clock, adapt_legacy_slides, evaluate};

use super::progress::{LessonProgress, SlideOutcome};
use super::state::{PlayerEvent, PlayerPhase, SubmitOutcome};
use super::timer::AutoAdvanceTimer;
use crate::error::PlayerError;
use crate::reporter::ActivityResultReporter;

//
// ─── LESSON PLAYER ─────────────────────────────────────────────────────────────
//

/// Steps a learner through one lesson, one slide at a time.
///
/// Owns the lesson for the duration of a viewing session. Every transition
/// takes `&mut self`; the only background work is the auto-advance timer and
/// the reporter's persistence tasks. Auto-advance events arrive on the
/// receiver returned by [`LessonPlayer::take_events`] and must be fed back
/// through [`LessonPlayer::handle_event`].
pub struct LessonPlayer {
    lesson: LessonSlides,
    lesson_id: LessonId,
    learner_id: LearnerId,
    settings: PlayerSettings,
    clock: Clock,
    reporter: Option<ActivityResultReporter>,

    index: usize,
    phase: PlayerPhase,
    selection: Vec<OptionId>,
    attempts: u32,
    slide_started_at: DateTime<Utc>,
    history: Vec<usize>,
    outcomes: Vec<Option<SlideOutcome>>,
    results: Vec<ActivityResult>,

    events_tx: UnboundedSender<PlayerEvent>,
    events_rx: Option<UnboundedReceiver<PlayerEvent>>,
    pending: Option<AutoAdvanceTimer>,
    next_ticket: u64,
}

impl LessonPlayer {
    /// Start a player on the first slide with default settings and no reporter.
    #[must_use]
    pub fn new(lesson: LessonSlides, lesson_id: LessonId, learner_id: LearnerId) -> Self {
        let clock = Clock::default();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let slide_count = lesson.len();
        Self {
            lesson,
            lesson_id,
            learner_id,
            settings: PlayerSettings::default(),
            clock,
            reporter: None,
            index: 0,
            phase: PlayerPhase::Idle,
            selection: Vec::new(),
            attempts: 0,
            slide_started_at: clock.now(),
            history: vec![0],
            outcomes: vec![None; slide_count],
            results: Vec::new(),
            events_tx,
            events_rx: Some(events_rx),
            pending: None,
            next_ticket: 1,
        }
    }

    /// Adapt raw lesson content and start a player on it.
    ///
    /// Returns `None` when the content holds no slides.
    #[must_use]
    pub fn from_legacy(
        records: &[Value],
        lesson_title: &str,
        lesson_id: LessonId,
        learner_id: LearnerId,
    ) -> Option<Self> {
        adapt_legacy_slides(records, lesson_title)
            .map(|lesson| Self::new(lesson, lesson_id, learner_id))
    }

    #[must_use]
    pub fn with_settings(mut self, settings: PlayerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use `clock` for timestamps; the current slide restarts its timer.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self.slide_started_at = clock.now();
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: ActivityResultReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Replace the clock without restarting the current slide's timer.
    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    /// Hand the auto-advance receiver to the host. Returns `None` after the first call.
    pub fn take_events(&mut self) -> Option<UnboundedReceiver<PlayerEvent>> {
        self.events_rx.take()
    }

    // ─── Accessors ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn lesson(&self) -> &LessonSlides {
        &self.lesson
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    /// Zero-based slide index; equals the slide count once finished.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase.is_done()
    }

    /// The slide on screen, or `None` once finished.
    #[must_use]
    pub fn current_slide(&self) -> Option<&Slide> {
        self.lesson.slide(self.index)
    }

    #[must_use]
    pub fn selection(&self) -> &[OptionId] {
        &self.selection
    }

    /// Submissions made on the current slide since it was entered.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Slide indices in the order they were shown.
    #[must_use]
    pub fn history(&self) -> &[usize] {
        &self.history
    }

    /// Every result produced so far, oldest first.
    #[must_use]
    pub fn results(&self) -> &[ActivityResult] {
        &self.results
    }

    #[must_use]
    pub fn has_pending_advance(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn progress(&self) -> LessonProgress {
        LessonProgress::compute(
            &self.lesson,
            self.index,
            &self.history,
            &self.outcomes,
            self.settings.pass_ratio(),
        )
    }

    /// True once every slide was seen, every question solved, and the pass ratio met.
    #[must_use]
    pub fn can_unlock_next(&self) -> bool {
        let progress = self.progress();
        progress.is_complete && progress.passed
    }

    // ─── Answering ─────────────────────────────────────────────────────────────

    /// Select (single-answer) or toggle (multi-answer) an option on the current slide.
    ///
    /// After incorrect feedback this starts a retry.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` if the lesson is finished, the slide takes no
    /// answers, it was already answered correctly, or the option is unknown.
    pub fn select_option(&mut self, option: &OptionId) -> Result<(), PlayerError> {
        let slide = self.answerable_slide()?;
        if slide.option(option).is_none() {
            return Err(PlayerError::UnknownOption(option.clone()));
        }
        let multi = slide.is_multi_select();

        if multi {
            if let Some(pos) = self.selection.iter().position(|id| id == option) {
                self.selection.remove(pos);
            } else {
                self.selection.push(option.clone());
            }
        } else {
            self.selection = vec![option.clone()];
        }

        self.phase = if self.selection.is_empty() {
            PlayerPhase::Idle
        } else {
            PlayerPhase::Answering
        };
        tracing::debug!(index = self.index, option = %option, selected = self.selection.len(), "option selected");
        Ok(())
    }

    /// Apply several selections in order. If any option is rejected, nothing changes.
    ///
    /// # Errors
    ///
    /// Same as [`LessonPlayer::select_option`], checked for every id up front.
    pub fn select_options(&mut self, options: &[OptionId]) -> Result<(), PlayerError> {
        let slide = self.answerable_slide()?;
        if let Some(unknown) = options.iter().find(|id| slide.option(id).is_none()) {
            return Err(PlayerError::UnknownOption(unknown.clone()));
        }
        options.iter().try_for_each(|id| self.select_option(id))
    }

    /// Evaluate the current selection and report the result.
    ///
    /// A correct answer on any slide but the last schedules an auto-advance
    /// when enabled. An incorrect answer keeps the selection so it can be
    /// changed or resubmitted.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError` if the lesson is finished, the slide takes no
    /// answers, it was already answered correctly, or nothing is selected.
    pub fn submit(&mut self) -> Result<SubmitOutcome, PlayerError> {
        let slide = self.answerable_slide()?;
        if self.selection.is_empty() {
            return Err(PlayerError::NothingSelected);
        }
        let Some(answer) = slide.correct() else {
            return Err(PlayerError::NotInteractive);
        };

        let correct = evaluate(answer, &self.selection);
        let attempts = self.attempts.saturating_add(1);
        let meta = self.lesson.meta();
        let mut tags = vec![slide.slide_type().as_str().to_string()];
        tags.extend(meta.target_skills.iter().cloned());

        let result = ActivityResult::from_evaluation(Evaluation {
            learner_id: self.learner_id,
            lesson_id: self.lesson_id,
            slide_id: slide.id().clone(),
            correct,
            elapsed_ms: self.clock.elapsed_ms(self.slide_started_at),
            attempts,
            tags,
            level: meta.level,
            recorded_at: self.clock.now(),
        })?;

        self.attempts = attempts;
        self.phase = PlayerPhase::Feedback { correct };
        if let Some(slot) = self.outcomes.get_mut(self.index) {
            slot.get_or_insert(SlideOutcome::first(correct)).solved |= correct;
        }
        self.results.push(result.clone());

        let report = self
            .reporter
            .as_ref()
            .map(|reporter| reporter.report(&result))
            .filter(|handle| !handle.is_detached());

        let is_last = self.index + 1 >= self.lesson.len();
        let auto_advance_scheduled = correct && self.settings.auto_advance() && !is_last && {
            let ticket = self.next_ticket;
            self.next_ticket += 1;
            self.pending = AutoAdvanceTimer::schedule(
                ticket,
                self.settings.auto_advance_delay(),
                self.events_tx.clone(),
            );
            self.pending.is_some()
        };

        tracing::debug!(
            index = self.index,
            slide_id = %result.slide_id(),
            correct,
            attempts,
            auto_advance_scheduled,
            "answer submitted"
        );

        Ok(SubmitOutcome {
            result,
            auto_advance_scheduled,
            report,
        })
    }

    fn answerable_slide(&self) -> Result<&Slide, PlayerError> {
        let Some(slide) = self.current_slide() else {
            return Err(PlayerError::Finished);
        };
        if !slide.is_interactive() {
            return Err(PlayerError::NotInteractive);
        }
        if self.phase == (PlayerPhase::Feedback { correct: true }) {
            return Err(PlayerError::AlreadyAnswered);
        }
        Ok(slide)
    }

    // ─── Navigation ────────────────────────────────────────────────────────────

    /// Move to the next slide, or finish the lesson from the last one.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Finished` if the lesson is already finished.
    pub fn next(&mut self) -> Result<(), PlayerError> {
        if self.is_finished() {
            return Err(PlayerError::Finished);
        }
        self.go_to(self.index + 1);
        Ok(())
    }

    /// Move to the previous slide; from the finished state, back to the last slide.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::AtStart` on the first slide.
    pub fn previous(&mut self) -> Result<(), PlayerError> {
        if self.is_finished() {
            self.go_to(self.lesson.len().saturating_sub(1));
            return Ok(());
        }
        if self.index == 0 {
            return Err(PlayerError::AtStart);
        }
        self.go_to(self.index - 1);
        Ok(())
    }

    /// Apply an event from the host loop. Returns true if it changed the slide.
    pub fn handle_event(&mut self, event: PlayerEvent) -> bool {
        match event {
            PlayerEvent::AutoAdvance { ticket } => {
                let current = self.pending.as_ref().map(AutoAdvanceTimer::ticket);
                if current != Some(ticket) {
                    tracing::debug!(ticket, ?current, "ignoring stale auto-advance");
                    return false;
                }
                self.next().is_ok()
            }
        }
    }

    fn go_to(&mut self, index: usize) {
        // Replacing the timer aborts any pending advance.
        self.pending = None;
        self.selection.clear();
        self.attempts = 0;
        self.slide_started_at = self.clock.now();

        if index >= self.lesson.len() {
            self.index = self.lesson.len();
            self.phase = PlayerPhase::Done;
            tracing::debug!(lesson_id = %self.lesson_id, results = self.results.len(), "lesson finished");
        } else {
            self.index = index;
            self.phase = PlayerPhase::Idle;
            self.history.push(index);
            tracing::debug!(index, "slide shown");
        }
    }
}

impl std::fmt::Debug for LessonPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LessonPlayer")
            .field("lesson_id", &self.lesson_id)
            .field("learner_id", &self.learner_id)
            .field("index", &self.index)
            .field("phase", &self.phase)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lesson_core::model::{
        CorrectAnswer, LessonMeta, PlayerSettingsDraft, SlideDraft, SlideId, SlideOption,
        SlideType,
    };
    use lesson_core::time::{fixed_clock, fixed_now};

    fn opt(id: &str) -> OptionId {
        OptionId::new(id).unwrap()
    }

    fn quiz(id: &str, correct: CorrectAnswer) -> Slide {
        let options = ["a", "b", "c"]
            .into_iter()
            .map(|o| SlideOption::new(opt(o), o.to_uppercase(), correct.contains(&opt(o))))
            .collect();
        SlideDraft::new(SlideId::new(id).unwrap(), SlideType::AccuracyMcq, "Choose")
            .with_options(options, correct)
            .validate()
            .unwrap()
    }

    fn intro() -> Slide {
        SlideDraft::new(SlideId::new("intro").unwrap(), SlideType::WarmUp, "Hello")
            .validate()
            .unwrap()
    }

    fn player(slides: Vec<Slide>) -> LessonPlayer {
        let lesson = LessonSlides::new(LessonMeta::new("Unit"), slides).unwrap();
        LessonPlayer::new(lesson, LessonId::new(1), LearnerId::new(2)).with_clock(fixed_clock())
    }

    #[test]
    fn single_select_replaces_choice() {
        let mut p = player(vec![quiz("q", CorrectAnswer::Single(opt("a")))]);
        p.select_option(&opt("b")).unwrap();
        p.select_option(&opt("a")).unwrap();
        assert_eq!(p.selection(), &[opt("a")]);
        assert_eq!(p.phase(), PlayerPhase::Answering);
    }

    #[test]
    fn multi_select_toggles_membership() {
        let mut p = player(vec![quiz("q", CorrectAnswer::Multiple(vec![opt("a"), opt("c")]))]);
        p.select_option(&opt("a")).unwrap();
        p.select_option(&opt("c")).unwrap();
        p.select_option(&opt("a")).unwrap();
        assert_eq!(p.selection(), &[opt("c")]);
        p.select_option(&opt("c")).unwrap();
        assert_eq!(p.phase(), PlayerPhase::Idle);
    }

    #[test]
    fn batch_selection_is_all_or_nothing() {
        let mut p = player(vec![quiz("q", CorrectAnswer::Multiple(vec![opt("a"), opt("c")]))]);
        assert_eq!(
            p.select_options(&[opt("a"), opt("z")]),
            Err(PlayerError::UnknownOption(opt("z")))
        );
        assert!(p.selection().is_empty());
        assert_eq!(p.phase(), PlayerPhase::Idle);

        p.select_options(&[opt("c"), opt("a")]).unwrap();
        assert_eq!(p.selection(), &[opt("c"), opt("a")]);
        assert!(p.submit().unwrap().is_correct());
    }

    #[test]
    fn rejects_bad_requests_without_changing_state() {
        let mut p = player(vec![intro(), quiz("q", CorrectAnswer::Single(opt("a")))]);
        assert_eq!(p.select_option(&opt("a")), Err(PlayerError::NotInteractive));
        assert_eq!(p.previous(), Err(PlayerError::AtStart));

        p.next().unwrap();
        assert_eq!(
            p.select_option(&opt("z")),
            Err(PlayerError::UnknownOption(opt("z")))
        );
        assert!(matches!(p.submit(), Err(PlayerError::NothingSelected)));
        assert_eq!(p.phase(), PlayerPhase::Idle);
        assert_eq!(p.attempts(), 0);
    }

    #[test]
    fn correct_answer_locks_slide() {
        let mut p = player(vec![quiz("q", CorrectAnswer::Single(opt("a")))]);
        p.select_option(&opt("a")).unwrap();
        let outcome = p.submit().unwrap();
        assert!(outcome.is_correct());
        assert!(outcome.report.is_none());
        assert_eq!(p.select_option(&opt("b")), Err(PlayerError::AlreadyAnswered));
        assert!(matches!(p.submit(), Err(PlayerError::AlreadyAnswered)));
    }

    #[test]
    fn no_report_handle_without_runtime() {
        let mut p = player(vec![quiz("q", CorrectAnswer::Single(opt("a")))])
            .with_reporter(ActivityResultReporter::in_memory());
        p.select_option(&opt("a")).unwrap();
        let outcome = p.submit().unwrap();
        assert!(outcome.report.is_none());
        assert_eq!(p.results().len(), 1);
    }

    #[test]
    fn elapsed_time_follows_clock() {
        let mut p = player(vec![quiz("q", CorrectAnswer::Single(opt("a")))]);
        p.set_clock(Clock::fixed(fixed_now() + Duration::milliseconds(3_500)));
        p.select_option(&opt("b")).unwrap();
        let outcome = p.submit().unwrap();
        assert_eq!(outcome.result.elapsed_ms(), 3_500);
        assert_eq!(outcome.result.tags(), &["accuracy-mcq".to_string()]);
    }

    #[test]
    fn retry_after_incorrect_feedback() {
        let mut p = player(vec![quiz("q", CorrectAnswer::Single(opt("a")))]);
        p.select_option(&opt("b")).unwrap();
        assert!(!p.submit().unwrap().is_correct());
        assert_eq!(p.phase(), PlayerPhase::Feedback { correct: false });

        p.select_option(&opt("a")).unwrap();
        assert_eq!(p.phase(), PlayerPhase::Answering);
        let second = p.submit().unwrap();
        assert!(second.is_correct());
        assert_eq!(second.result.attempts(), 2);

        let progress = p.progress();
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.first_try_correct, 0);
        assert!(!p.can_unlock_next());
    }

    #[test]
    fn navigation_resets_slide_state_and_tracks_history() {
        let mut p = player(vec![
            intro(),
            quiz("q1", CorrectAnswer::Single(opt("a"))),
            quiz("q2", CorrectAnswer::Single(opt("b"))),
        ]);
        p.next().unwrap();
        p.select_option(&opt("c")).unwrap();
        p.submit().unwrap();
        p.next().unwrap();
        assert_eq!(p.attempts(), 0);
        assert!(p.selection().is_empty());
        p.previous().unwrap();
        assert_eq!(p.history(), &[0, 1, 2, 1]);
        assert_eq!(p.phase(), PlayerPhase::Idle);
    }

    #[test]
    fn finishing_and_returning() {
        let mut p = player(vec![intro()]);
        p.next().unwrap();
        assert!(p.is_finished());
        assert_eq!(p.index(), 1);
        assert!(p.current_slide().is_none());
        assert_eq!(p.next(), Err(PlayerError::Finished));
        assert!(p.can_unlock_next());

        p.previous().unwrap();
        assert_eq!(p.index(), 0);
        assert_eq!(p.phase(), PlayerPhase::Idle);
    }

    #[test]
    fn no_auto_advance_without_runtime() {
        let mut p = player(vec![
            quiz("q1", CorrectAnswer::Single(opt("a"))),
            intro(),
        ]);
        p.select_option(&opt("a")).unwrap();
        assert!(!p.submit().unwrap().auto_advance_scheduled);
        assert!(!p.has_pending_advance());
    }

    #[test]
    fn disabled_auto_advance_is_respected() {
        let settings = PlayerSettingsDraft {
            auto_advance: Some(false),
            ..PlayerSettingsDraft::new()
        }
        .validate()
        .unwrap();
        let mut p = player(vec![quiz("q1", CorrectAnswer::Single(opt("a"))), intro()])
            .with_settings(settings);
        p.select_option(&opt("a")).unwrap();
        assert!(!p.submit().unwrap().auto_advance_scheduled);
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut p = player(vec![intro(), intro_two()]);
        assert!(!p.handle_event(PlayerEvent::AutoAdvance { ticket: 99 }));
        assert_eq!(p.index(), 0);
    }

    fn intro_two() -> Slide {
        SlideDraft::new(SlideId::new("intro-2").unwrap(), SlideType::WarmUp, "Again")
            .validate()
            .unwrap()
    }

    #[test]
    fn from_legacy_builds_player() {
        let records = vec![serde_json::json!({ "type": "quiz", "title": "Q" })];
        let p = LessonPlayer::from_legacy(&records, "Lesson", LessonId::new(1), LearnerId::new(1))
            .unwrap();
        assert_eq!(p.lesson().len(), 1);
        assert!(LessonPlayer::from_legacy(&[], "Lesson", LessonId::new(1), LearnerId::new(1)).is_none());
    }
}
