use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::SlideId;
use crate::model::slide::Slide;

/// Version marker written on every normalized lesson.
pub const LESSON_FORMAT_VERSION: &str = "2.0";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonSlidesError {
    #[error("lesson must contain at least one slide")]
    Empty,

    #[error("duplicate slide id: {0}")]
    DuplicateSlide(SlideId),

    #[error("scoring weights must be non-negative with a positive sum")]
    InvalidWeights,

    #[error("unknown CEFR level: {0}")]
    UnknownLevel(String),
}

//
// ─── CEFR LEVEL ────────────────────────────────────────────────────────────────
//

/// Common European Framework of Reference proficiency level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CefrLevel {
    #[default]
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl CefrLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
            CefrLevel::C2 => "C2",
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CefrLevel {
    type Err = LessonSlidesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A1" => Ok(CefrLevel::A1),
            "A2" => Ok(CefrLevel::A2),
            "B1" => Ok(CefrLevel::B1),
            "B2" => Ok(CefrLevel::B2),
            "C1" => Ok(CefrLevel::C1),
            "C2" => Ok(CefrLevel::C2),
            _ => Err(LessonSlidesError::UnknownLevel(s.to_string())),
        }
    }
}

impl TryFrom<String> for CefrLevel {
    type Error = LessonSlidesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CefrLevel> for String {
    fn from(level: CefrLevel) -> Self {
        level.as_str().to_string()
    }
}

//
// ─── SCORING WEIGHTS ───────────────────────────────────────────────────────────
//

#[derive(Deserialize)]
struct ScoringWeightsRepr {
    accuracy: f32,
    completion: f32,
}

/// Relative weight of accuracy versus completion in a lesson score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScoringWeightsRepr")]
pub struct ScoringWeights {
    accuracy: f32,
    completion: f32,
}

impl ScoringWeights {
    /// Create validated weights.
    ///
    /// # Errors
    ///
    /// Returns `LessonSlidesError::InvalidWeights` if either weight is negative
    /// or not finite, or both are zero.
    pub fn new(accuracy: f32, completion: f32) -> Result<Self, LessonSlidesError> {
        let valid = accuracy.is_finite()
            && completion.is_finite()
            && accuracy >= 0.0
            && completion >= 0.0
            && accuracy + completion > 0.0;
        if !valid {
            return Err(LessonSlidesError::InvalidWeights);
        }
        Ok(Self {
            accuracy,
            completion,
        })
    }

    #[must_use]
    pub fn accuracy(&self) -> f32 {
        self.accuracy
    }

    #[must_use]
    pub fn completion(&self) -> f32 {
        self.completion
    }

    /// Weighted average of two ratios in `[0, 1]`.
    #[must_use]
    pub fn score(&self, accuracy: f32, completion: f32) -> f32 {
        let total = self.accuracy + self.completion;
        if total <= 0.0 {
            return 0.0;
        }
        (accuracy * self.accuracy + completion * self.completion) / total
    }
}

impl TryFrom<ScoringWeightsRepr> for ScoringWeights {
    type Error = LessonSlidesError;

    fn try_from(repr: ScoringWeightsRepr) -> Result<Self, Self::Error> {
        Self::new(repr.accuracy, repr.completion)
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            accuracy: 0.7,
            completion: 0.3,
        }
    }
}

//
// ─── LESSON META ───────────────────────────────────────────────────────────────
//

/// Descriptive metadata carried alongside a slide sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonMeta {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub level: CefrLevel,
    #[serde(default = "default_number")]
    pub module_number: u32,
    #[serde(default = "default_number")]
    pub lesson_number: u32,
    #[serde(default)]
    pub target_skills: Vec<String>,
    #[serde(default)]
    pub scoring_weights: ScoringWeights,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub total_duration_minutes: u32,
}

fn default_version() -> String {
    LESSON_FORMAT_VERSION.to_string()
}

fn default_number() -> u32 {
    1
}

fn default_theme() -> String {
    "default".to_string()
}

impl LessonMeta {
    /// Metadata with the current format version and neutral defaults.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            title: title.into(),
            level: CefrLevel::default(),
            module_number: default_number(),
            lesson_number: default_number(),
            target_skills: Vec::new(),
            scoring_weights: ScoringWeights::default(),
            theme: default_theme(),
            total_duration_minutes: 0,
        }
    }
}

//
// ─── LESSON SLIDES ─────────────────────────────────────────────────────────────
//

#[derive(Deserialize)]
struct LessonSlidesRepr {
    #[serde(flatten)]
    meta: LessonMeta,
    slides: Vec<Slide>,
}

#[derive(Serialize)]
struct LessonSlidesReprRef<'a> {
    #[serde(flatten)]
    meta: &'a LessonMeta,
    slides: &'a [Slide],
}

/// An ordered, non-empty slide sequence plus its metadata.
///
/// Invariant: at least one slide, and slide ids are unique.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "LessonSlidesRepr")]
pub struct LessonSlides {
    meta: LessonMeta,
    slides: Vec<Slide>,
}

impl LessonSlides {
    /// Build a validated lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonSlidesError::Empty` for an empty sequence and
    /// `LessonSlidesError::DuplicateSlide` if two slides share an id.
    pub fn new(meta: LessonMeta, slides: Vec<Slide>) -> Result<Self, LessonSlidesError> {
        if slides.is_empty() {
            return Err(LessonSlidesError::Empty);
        }
        let mut seen = HashSet::with_capacity(slides.len());
        for slide in &slides {
            if !seen.insert(slide.id()) {
                return Err(LessonSlidesError::DuplicateSlide(slide.id().clone()));
            }
        }
        Ok(Self { meta, slides })
    }

    #[must_use]
    pub fn meta(&self) -> &LessonMeta {
        &self.meta
    }

    #[must_use]
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Always false for a constructed lesson; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    #[must_use]
    pub fn slide(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    #[must_use]
    pub fn position_of(&self, id: &SlideId) -> Option<usize> {
        self.slides.iter().position(|slide| slide.id() == id)
    }

    /// Number of slides that expect an answer.
    #[must_use]
    pub fn interactive_count(&self) -> usize {
        self.slides.iter().filter(|slide| slide.is_interactive()).count()
    }
}

impl TryFrom<LessonSlidesRepr> for LessonSlides {
    type Error = LessonSlidesError;

    fn try_from(repr: LessonSlidesRepr) -> Result<Self, Self::Error> {
        Self::new(repr.meta, repr.slides)
    }
}

impl Serialize for LessonSlides {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LessonSlidesReprRef {
            meta: &self.meta,
            slides: &self.slides,
        }
        .serialize(serializer)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::slide::{SlideDraft, SlideType};

    fn slide(id: &str) -> Slide {
        SlideDraft::new(SlideId::new(id).unwrap(), SlideType::WarmUp, "Hello")
            .validate()
            .unwrap()
    }

    #[test]
    fn empty_lesson_is_rejected() {
        let err = LessonSlides::new(LessonMeta::new("Empty"), vec![]).unwrap_err();
        assert_eq!(err, LessonSlidesError::Empty);
    }

    #[test]
    fn duplicate_slide_ids_are_rejected() {
        let err = LessonSlides::new(LessonMeta::new("Dup"), vec![slide("x"), slide("x")])
            .unwrap_err();
        assert_eq!(
            err,
            LessonSlidesError::DuplicateSlide(SlideId::new("x").unwrap())
        );
    }

    #[test]
    fn cefr_level_parses_case_insensitively() {
        assert_eq!("b2".parse::<CefrLevel>().unwrap(), CefrLevel::B2);
        assert!("D1".parse::<CefrLevel>().is_err());
    }

    #[test]
    fn weights_reject_zero_sum() {
        assert!(ScoringWeights::new(0.0, 0.0).is_err());
        assert!(ScoringWeights::new(-1.0, 2.0).is_err());
        let w = ScoringWeights::new(1.0, 1.0).unwrap();
        assert!((w.score(1.0, 0.0) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn lesson_round_trips_through_json_with_flat_meta() {
        let mut meta = LessonMeta::new("Greetings");
        meta.level = CefrLevel::A2;
        meta.target_skills = vec!["speaking".into()];
        let lesson = LessonSlides::new(meta, vec![slide("one"), slide("two")]).unwrap();

        let json = serde_json::to_value(&lesson).unwrap();
        assert_eq!(json["version"], LESSON_FORMAT_VERSION);
        assert_eq!(json["level"], "A2");
        assert_eq!(json["slides"].as_array().unwrap().len(), 2);

        let back: LessonSlides = serde_json::from_value(json).unwrap();
        assert_eq!(back, lesson);
    }

    #[test]
    fn deserializing_empty_slides_fails() {
        let json = serde_json::json!({"version": "2.0", "title": "T", "slides": []});
        assert!(serde_json::from_value::<LessonSlides>(json).is_err());
    }
}
