//! Fire-and-forget delivery of activity results to progress and analytics storage.

use std::sync::Arc;

use lesson_core::model::{ActivityResult, LearningEvent};
use storage::repository::{ActivityResultRepository, LearningEventRepository, Storage};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::notify::{Notice, Notifier, TracingNotifier};

pub const CORRECT_MESSAGE: &str = "Great job! That's correct.";
pub const INCORRECT_MESSAGE: &str = "Not quite. Give it another try!";
pub const SAVE_FAILED_MESSAGE: &str = "Your answer was recorded, but progress could not be saved.";

//
// ─── REPORT HANDLE ─────────────────────────────────────────────────────────────
//

/// Outcome of the two background writes started by one `report` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOutcome {
    pub progress_saved: bool,
    pub analytics_recorded: bool,
}

/// Join handles for the background writes. Dropping it detaches the tasks.
#[derive(Debug, Default)]
pub struct ReportHandle {
    progress: Option<JoinHandle<bool>>,
    analytics: Option<JoinHandle<bool>>,
}

impl ReportHandle {
    /// Wait for both writes to finish.
    ///
    /// A task that was never spawned or that panicked counts as failed.
    pub async fn wait(self) -> ReportOutcome {
        ReportOutcome {
            progress_saved: join(self.progress).await,
            analytics_recorded: join(self.analytics).await,
        }
    }

    /// True when no background task was started.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.progress.is_none() && self.analytics.is_none()
    }
}

async fn join(handle: Option<JoinHandle<bool>>) -> bool {
    match handle {
        Some(handle) => handle.await.unwrap_or(false),
        None => false,
    }
}

//
// ─── REPORTER ──────────────────────────────────────────────────────────────────
//

/// Acknowledges an answer to the learner and persists it without blocking the player.
#[derive(Clone)]
pub struct ActivityResultReporter {
    results: Arc<dyn ActivityResultRepository>,
    events: Arc<dyn LearningEventRepository>,
    notifier: Arc<dyn Notifier>,
}

impl ActivityResultReporter {
    #[must_use]
    pub fn new(
        results: Arc<dyn ActivityResultRepository>,
        events: Arc<dyn LearningEventRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            results,
            events,
            notifier,
        }
    }

    /// Build a reporter over a storage bundle.
    #[must_use]
    pub fn from_storage(storage: &Storage, notifier: Arc<dyn Notifier>) -> Self {
        Self::new(Arc::clone(&storage.results), Arc::clone(&storage.events), notifier)
    }

    /// Reporter over in-memory storage that logs its notices.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_storage(&Storage::in_memory(), Arc::new(TracingNotifier))
    }

    /// Send the learner acknowledgement, then start the progress and analytics writes.
    ///
    /// Outside a tokio runtime the writes are skipped with a warning.
    pub fn report(&self, result: &ActivityResult) -> ReportHandle {
        let ack = if result.is_correct() {
            Notice::success(CORRECT_MESSAGE)
        } else {
            Notice::encouragement(INCORRECT_MESSAGE)
        };
        self.notifier.notify(ack);

        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(result_id = %result.id(), "no async runtime, activity result not persisted");
            return ReportHandle::default();
        };

        let progress = {
            let results = Arc::clone(&self.results);
            let notifier = Arc::clone(&self.notifier);
            let result = result.clone();
            runtime.spawn(async move {
                match results.append_result(&result).await {
                    Ok(row_id) => {
                        tracing::debug!(result_id = %result.id(), row_id, "activity result saved");
                        true
                    }
                    Err(err) => {
                        tracing::warn!(result_id = %result.id(), error = %err, "failed to save activity result");
                        notifier.notify(Notice::warning(SAVE_FAILED_MESSAGE));
                        false
                    }
                }
            })
        };

        let analytics = {
            let events = Arc::clone(&self.events);
            let event = LearningEvent::from_result(result);
            runtime.spawn(async move {
                match events.append_event(&event).await {
                    Ok(_) => true,
                    Err(err) => {
                        tracing::warn!(result_id = %event.result_id, error = %err, "failed to record learning event");
                        false
                    }
                }
            })
        };

        ReportHandle {
            progress: Some(progress),
            analytics: Some(analytics),
        }
    }
}

impl std::fmt::Debug for ActivityResultReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityResultReporter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{NoticeKind, RecordingNotifier};
    use lesson_core::model::{CefrLevel, Evaluation, LearnerId, LessonId, SlideId};
    use lesson_core::time::fixed_now;

    fn result(correct: bool) -> ActivityResult {
        ActivityResult::from_evaluation(Evaluation {
            learner_id: LearnerId::new(1),
            lesson_id: LessonId::new(2),
            slide_id: SlideId::new("quiz").unwrap(),
            correct,
            elapsed_ms: 1_000,
            attempts: 1,
            tags: vec!["accuracy-mcq".into()],
            level: CefrLevel::A1,
            recorded_at: fixed_now(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn acknowledges_and_persists_correct_answer() {
        let storage = Storage::in_memory();
        let notifier = RecordingNotifier::new();
        let reporter = ActivityResultReporter::from_storage(&storage, Arc::new(notifier.clone()));

        let r = result(true);
        let outcome = reporter.report(&r).wait().await;
        assert!(outcome.progress_saved);
        assert!(outcome.analytics_recorded);

        let notices = notifier.notices();
        assert_eq!(notices, vec![Notice::success(CORRECT_MESSAGE)]);

        let saved = storage
            .results
            .results_for_lesson(LearnerId::new(1), LessonId::new(2))
            .await
            .unwrap();
        assert_eq!(saved, vec![r]);
    }

    #[tokio::test]
    async fn incorrect_answer_gets_encouragement() {
        let notifier = RecordingNotifier::new();
        let reporter = ActivityResultReporter::from_storage(
            &Storage::in_memory(),
            Arc::new(notifier.clone()),
        );
        reporter.report(&result(false)).wait().await;
        assert_eq!(notifier.notices()[0].kind, NoticeKind::Encouragement);
    }

    #[test]
    fn outside_runtime_only_acknowledges() {
        let notifier = RecordingNotifier::new();
        let reporter = ActivityResultReporter::from_storage(
            &Storage::in_memory(),
            Arc::new(notifier.clone()),
        );
        let handle = reporter.report(&result(true));
        assert!(handle.is_detached());
        assert_eq!(notifier.notices().len(), 1);
    }
}
