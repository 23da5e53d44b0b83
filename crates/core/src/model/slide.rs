use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{OptionId, SlideId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SlideError {
    #[error("slide prompt cannot be empty")]
    EmptyPrompt,

    #[error("duplicate option id: {0}")]
    DuplicateOption(OptionId),

    #[error("correct answer references unknown option: {0}")]
    UnknownCorrectOption(OptionId),

    #[error("correct answer set cannot be empty")]
    EmptyCorrectSet,

    #[error("correct answer set lists {0} more than once")]
    DuplicateCorrectOption(OptionId),

    #[error("time limit must be > 0 seconds")]
    InvalidTimeLimit,
}

//
// ─── SLIDE TYPE ────────────────────────────────────────────────────────────────
//

/// The six canonical slide kinds a lesson is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlideType {
    WarmUp,
    /// Presentation of the target language. Default for unknown content.
    #[default]
    TargetLanguage,
    SentenceBuilder,
    AccuracyMcq,
    CommunicativeTask,
    ExitCheck,
}

impl SlideType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SlideType::WarmUp => "warm-up",
            SlideType::TargetLanguage => "target-language",
            SlideType::SentenceBuilder => "sentence-builder",
            SlideType::AccuracyMcq => "accuracy-mcq",
            SlideType::CommunicativeTask => "communicative-task",
            SlideType::ExitCheck => "exit-check",
        }
    }

    /// Parses the canonical kebab-case name.
    #[must_use]
    pub fn from_canonical(raw: &str) -> Option<Self> {
        match raw {
            "warm-up" => Some(SlideType::WarmUp),
            "target-language" => Some(SlideType::TargetLanguage),
            "sentence-builder" => Some(SlideType::SentenceBuilder),
            "accuracy-mcq" => Some(SlideType::AccuracyMcq),
            "communicative-task" => Some(SlideType::CommunicativeTask),
            "exit-check" => Some(SlideType::ExitCheck),
            _ => None,
        }
    }
}

impl std::fmt::Display for SlideType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── OPTIONS & ANSWERS ─────────────────────────────────────────────────────────
//

/// One selectable answer on a slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideOption {
    pub id: OptionId,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl SlideOption {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id,
            text: text.into(),
            is_correct,
        }
    }
}

/// Canonical answer for an interactive slide.
///
/// Serialized as a bare id for single-answer slides and as an array for
/// multi-answer slides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Single(OptionId),
    Multiple(Vec<OptionId>),
}

impl CorrectAnswer {
    /// All option ids that make up the answer, in authored order.
    #[must_use]
    pub fn ids(&self) -> &[OptionId] {
        match self {
            CorrectAnswer::Single(id) => std::slice::from_ref(id),
            CorrectAnswer::Multiple(ids) => ids,
        }
    }

    #[must_use]
    pub fn is_multiple(&self) -> bool {
        matches!(self, CorrectAnswer::Multiple(_))
    }

    #[must_use]
    pub fn contains(&self, id: &OptionId) -> bool {
        self.ids().contains(id)
    }
}

//
// ─── SLIDE ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated slide fields, also the serialized shape of a `Slide`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideDraft {
    pub id: SlideId,
    #[serde(rename = "type", default)]
    pub slide_type: SlideType,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SlideOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct: Option<CorrectAnswer>,
    #[serde(default, rename = "timeLimit", skip_serializing_if = "Option::is_none")]
    pub time_limit_secs: Option<u32>,
    #[serde(default, rename = "altText", skip_serializing_if = "Option::is_none")]
    pub accessibility_text: Option<String>,
}

impl SlideDraft {
    /// Minimal draft with just an id, type and prompt.
    #[must_use]
    pub fn new(id: SlideId, slide_type: SlideType, prompt: impl Into<String>) -> Self {
        Self {
            id,
            slide_type,
            prompt: prompt.into(),
            instructions: None,
            media: None,
            options: Vec::new(),
            correct: None,
            time_limit_secs: None,
            accessibility_text: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<SlideOption>, correct: CorrectAnswer) -> Self {
        self.options = options;
        self.correct = Some(correct);
        self
    }

    /// Validate the draft into a `Slide`.
    ///
    /// # Errors
    ///
    /// Returns `SlideError` if the prompt is blank, option ids repeat, the
    /// correct answer references an option that does not exist, or the time
    /// limit is zero.
    pub fn validate(self) -> Result<Slide, SlideError> {
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(SlideError::EmptyPrompt);
        }

        let mut seen = HashSet::with_capacity(self.options.len());
        for option in &self.options {
            if !seen.insert(&option.id) {
                return Err(SlideError::DuplicateOption(option.id.clone()));
            }
        }

        if let Some(correct) = &self.correct {
            if let CorrectAnswer::Multiple(ids) = correct {
                if ids.is_empty() {
                    return Err(SlideError::EmptyCorrectSet);
                }
                let mut unique = HashSet::with_capacity(ids.len());
                for id in ids {
                    if !unique.insert(id) {
                        return Err(SlideError::DuplicateCorrectOption(id.clone()));
                    }
                }
            }
            for id in correct.ids() {
                if !seen.contains(id) {
                    return Err(SlideError::UnknownCorrectOption(id.clone()));
                }
            }
        }

        if self.time_limit_secs == Some(0) {
            return Err(SlideError::InvalidTimeLimit);
        }

        Ok(Slide {
            id: self.id,
            slide_type: self.slide_type,
            prompt,
            instructions: normalize_optional(self.instructions),
            media: normalize_optional(self.media),
            options: self.options,
            correct: self.correct,
            time_limit_secs: self.time_limit_secs,
            accessibility_text: normalize_optional(self.accessibility_text),
        })
    }
}

/// One validated unit of lesson content.
///
/// Invariant: every id in `correct` names an option in `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SlideDraft", into = "SlideDraft")]
pub struct Slide {
    id: SlideId,
    slide_type: SlideType,
    prompt: String,
    instructions: Option<String>,
    media: Option<String>,
    options: Vec<SlideOption>,
    correct: Option<CorrectAnswer>,
    time_limit_secs: Option<u32>,
    accessibility_text: Option<String>,
}

impl Slide {
    #[must_use]
    pub fn id(&self) -> &SlideId {
        &self.id
    }

    #[must_use]
    pub fn slide_type(&self) -> SlideType {
        self.slide_type
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    #[must_use]
    pub fn media(&self) -> Option<&str> {
        self.media.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &[SlideOption] {
        &self.options
    }

    #[must_use]
    pub fn correct(&self) -> Option<&CorrectAnswer> {
        self.correct.as_ref()
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn accessibility_text(&self) -> Option<&str> {
        self.accessibility_text.as_deref()
    }

    /// True when the learner is expected to pick and submit an answer.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        !self.options.is_empty() && self.correct.is_some()
    }

    /// True when the slide accepts more than one selected option.
    #[must_use]
    pub fn is_multi_select(&self) -> bool {
        self.correct.as_ref().is_some_and(CorrectAnswer::is_multiple)
    }

    #[must_use]
    pub fn option(&self, id: &OptionId) -> Option<&SlideOption> {
        self.options.iter().find(|option| &option.id == id)
    }
}

impl TryFrom<SlideDraft> for Slide {
    type Error = SlideError;

    fn try_from(draft: SlideDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl From<Slide> for SlideDraft {
    fn from(slide: Slide) -> Self {
        Self {
            id: slide.id,
            slide_type: slide.slide_type,
            prompt: slide.prompt,
            instructions: slide.instructions,
            media: slide.media,
            options: slide.options,
            correct: slide.correct,
            time_limit_secs: slide.time_limit_secs,
            accessibility_text: slide.accessibility_text,
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn oid(raw: &str) -> OptionId {
        OptionId::new(raw).unwrap()
    }

    fn options() -> Vec<SlideOption> {
        vec![
            SlideOption::new(oid("a"), "Cat", true),
            SlideOption::new(oid("b"), "Dog", false),
        ]
    }

    fn draft() -> SlideDraft {
        SlideDraft::new(SlideId::new("s1").unwrap(), SlideType::AccuracyMcq, "Pick one")
    }

    #[test]
    fn valid_slide_is_interactive() {
        let slide = draft()
            .with_options(options(), CorrectAnswer::Single(oid("a")))
            .validate()
            .unwrap();
        assert!(slide.is_interactive());
        assert!(!slide.is_multi_select());
        assert_eq!(slide.option(&oid("b")).unwrap().text, "Dog");
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let mut d = draft();
        d.prompt = "   ".into();
        assert_eq!(d.validate().unwrap_err(), SlideError::EmptyPrompt);
    }

    #[test]
    fn correct_must_reference_existing_option() {
        let err = draft()
            .with_options(options(), CorrectAnswer::Single(oid("z")))
            .validate()
            .unwrap_err();
        assert_eq!(err, SlideError::UnknownCorrectOption(oid("z")));
    }

    #[test]
    fn multiple_answer_rejects_empty_and_duplicates() {
        let err = draft()
            .with_options(options(), CorrectAnswer::Multiple(vec![]))
            .validate()
            .unwrap_err();
        assert_eq!(err, SlideError::EmptyCorrectSet);

        let err = draft()
            .with_options(options(), CorrectAnswer::Multiple(vec![oid("a"), oid("a")]))
            .validate()
            .unwrap_err();
        assert_eq!(err, SlideError::DuplicateCorrectOption(oid("a")));
    }

    #[test]
    fn duplicate_option_ids_are_rejected() {
        let mut opts = options();
        opts.push(SlideOption::new(oid("a"), "Again", false));
        let err = draft()
            .with_options(opts, CorrectAnswer::Single(oid("a")))
            .validate()
            .unwrap_err();
        assert_eq!(err, SlideError::DuplicateOption(oid("a")));
    }

    #[test]
    fn slide_without_options_is_not_interactive() {
        let slide = draft().validate().unwrap();
        assert!(!slide.is_interactive());
    }

    #[test]
    fn serde_uses_camel_case_and_untagged_answers() {
        let json = serde_json::json!({
            "id": "s2",
            "type": "exit-check",
            "prompt": "Which are fruit?",
            "options": [
                {"id": "a", "text": "Apple", "isCorrect": true},
                {"id": "b", "text": "Brick"},
                {"id": "c", "text": "Cherry", "isCorrect": true}
            ],
            "correct": ["a", "c"],
            "timeLimit": 30
        });
        let slide: Slide = serde_json::from_value(json).unwrap();
        assert_eq!(slide.slide_type(), SlideType::ExitCheck);
        assert!(slide.is_multi_select());
        assert_eq!(slide.time_limit_secs(), Some(30));

        let back = serde_json::to_value(&slide).unwrap();
        assert_eq!(back["correct"], serde_json::json!(["a", "c"]));
        assert_eq!(back["type"], "exit-check");
    }

    #[test]
    fn deserializing_an_invalid_slide_fails() {
        let json = serde_json::json!({
            "id": "s3",
            "type": "accuracy-mcq",
            "prompt": "Q",
            "options": [{"id": "a", "text": "A"}],
            "correct": "b"
        });
        assert!(serde_json::from_value::<Slide>(json).is_err());
    }
}
