use std::collections::BTreeSet;

use lesson_core::model::LessonSlides;

/// Per-slide answer record kept by the player for interactive slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlideOutcome {
    pub first_try_correct: bool,
    pub solved: bool,
}

impl SlideOutcome {
    pub(crate) fn first(correct: bool) -> Self {
        Self {
            first_try_correct: correct,
            solved: correct,
        }
    }
}

/// Aggregated view of lesson progress, useful for UI and unlock decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonProgress {
    pub total_slides: usize,
    pub current_index: usize,
    pub visited: usize,
    pub interactive_total: usize,
    /// Interactive slides eventually answered correctly.
    pub answered: usize,
    pub first_try_correct: usize,
    /// 0.0..=100.0
    pub percent_complete: f32,
    /// First-try accuracy, 0.0..=1.0
    pub accuracy: f32,
    /// Lesson scoring weights applied to accuracy and completion, 0.0..=1.0
    pub weighted_score: f32,
    pub passed: bool,
    pub is_complete: bool,
}

impl LessonProgress {
    pub(crate) fn compute(
        lesson: &LessonSlides,
        current_index: usize,
        history: &[usize],
        outcomes: &[Option<SlideOutcome>],
        pass_ratio: f32,
    ) -> Self {
        let total_slides = lesson.len();
        let visited = history
            .iter()
            .filter(|i| **i < total_slides)
            .collect::<BTreeSet<_>>()
            .len();
        let interactive_total = lesson.interactive_count();
        let answered = outcomes.iter().flatten().filter(|o| o.solved).count();
        let first_try_correct = outcomes
            .iter()
            .flatten()
            .filter(|o| o.first_try_correct)
            .count();

        let completion = if interactive_total == 0 {
            ratio(visited, total_slides)
        } else {
            ratio(answered, interactive_total)
        };
        let accuracy = if interactive_total == 0 {
            1.0
        } else {
            ratio(first_try_correct, interactive_total)
        };
        let weighted_score = lesson.meta().scoring_weights.score(accuracy, completion);

        Self {
            total_slides,
            current_index,
            visited,
            interactive_total,
            answered,
            first_try_correct,
            percent_complete: completion * 100.0,
            accuracy,
            weighted_score,
            passed: accuracy >= pass_ratio,
            is_complete: visited == total_slides && answered == interactive_total,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f32 {
    if whole == 0 {
        return 0.0;
    }
    (part as f32 / whole as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::{
        CorrectAnswer, LessonMeta, OptionId, SlideDraft, SlideId, SlideOption, SlideType,
    };

    fn lesson(interactive: usize, plain: usize) -> LessonSlides {
        let mut slides = Vec::new();
        for i in 0..interactive {
            let a = OptionId::new("a").unwrap();
            let slide = SlideDraft::new(
                SlideId::new(format!("q{i}")).unwrap(),
                SlideType::AccuracyMcq,
                "Pick one",
            )
            .with_options(
                vec![
                    SlideOption::new(a.clone(), "yes", true),
                    SlideOption::new(OptionId::new("b").unwrap(), "no", false),
                ],
                CorrectAnswer::Single(a),
            )
            .validate()
            .unwrap();
            slides.push(slide);
        }
        for i in 0..plain {
            let slide = SlideDraft::new(
                SlideId::new(format!("p{i}")).unwrap(),
                SlideType::TargetLanguage,
                "Read this",
            )
            .validate()
            .unwrap();
            slides.push(slide);
        }
        LessonSlides::new(LessonMeta::new("Progress"), slides).unwrap()
    }

    #[test]
    fn three_of_four_first_try_passes() {
        let lesson = lesson(4, 0);
        let outcomes = vec![
            Some(SlideOutcome::first(true)),
            Some(SlideOutcome::first(true)),
            Some(SlideOutcome::first(true)),
            Some(SlideOutcome {
                first_try_correct: false,
                solved: true,
            }),
        ];
        let progress = LessonProgress::compute(&lesson, 3, &[0, 1, 2, 3], &outcomes, 0.75);
        assert!((progress.accuracy - 0.75).abs() < f32::EPSILON);
        assert!(progress.passed);
        assert!(progress.is_complete);
        assert!((progress.percent_complete - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn two_of_four_fails() {
        let lesson = lesson(4, 0);
        let outcomes = vec![
            Some(SlideOutcome::first(true)),
            Some(SlideOutcome::first(true)),
            Some(SlideOutcome::first(false)),
            None,
        ];
        let progress = LessonProgress::compute(&lesson, 2, &[0, 1, 2], &outcomes, 0.75);
        assert!(!progress.passed);
        assert!(!progress.is_complete);
        assert_eq!(progress.answered, 2);
        assert!((progress.percent_complete - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn lesson_without_questions_tracks_visits() {
        let lesson = lesson(0, 4);
        let outcomes = vec![None; 4];
        let progress = LessonProgress::compute(&lesson, 1, &[0, 1, 0, 1], &outcomes, 0.75);
        assert_eq!(progress.visited, 2);
        assert!((progress.percent_complete - 50.0).abs() < f32::EPSILON);
        assert!(progress.passed);
        assert!(!progress.is_complete);
    }
}
