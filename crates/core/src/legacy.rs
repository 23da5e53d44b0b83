//! Conversion of loosely-shaped legacy slide records into `LessonSlides`.
//!
//! Legacy content arrives as JSON authored over several iterations of the
//! lesson editor. Nothing about its shape is guaranteed, so every field is read
//! as optional and replaced with a default when missing or malformed. The
//! conversion never fails: the worst case is a plain presentation slide with a
//! generated prompt.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::model::{
    CorrectAnswer, LessonMeta, LessonSlides, OptionId, Slide, SlideDraft, SlideId, SlideOption,
    SlideType,
};

/// Estimated length of a legacy slide that carries no time limit.
pub const LEGACY_MINUTES_PER_SLIDE: u32 = 2;

const PROMPT_KEYS: &[&str] = &["prompt", "title"];
const CONTENT_PROMPT_KEYS: &[&str] = &["title", "prompt", "question", "text"];
const TYPE_KEYS: &[&str] = &["type", "slideType", "slide_type"];
const INSTRUCTION_KEYS: &[&str] = &["instructions"];
const MEDIA_KEYS: &[&str] = &["media", "image", "imageUrl", "image_url"];
const CONTENT_MEDIA_KEYS: &[&str] = &["image", "imageUrl", "image_url", "media", "audio"];
const CORRECT_KEYS: &[&str] = &["correct", "correctAnswer", "correct_answer"];
const TIME_LIMIT_KEYS: &[&str] = &["timeLimit", "time_limit", "duration"];
const ALT_TEXT_KEYS: &[&str] = &["altText", "alt_text", "accessibility"];
const OPTION_TEXT_KEYS: &[&str] = &["text", "label", "value"];
const OPTION_FLAG_KEYS: &[&str] = &["isCorrect", "is_correct", "correct"];

//
// ─── PARSED INPUT ──────────────────────────────────────────────────────────────
//

/// Result of inspecting a raw record array.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyInput {
    Empty,
    /// The first record already was a normalized lesson.
    Normalized(LessonSlides),
    Legacy(Vec<LegacySlide>),
}

/// A single legacy record with every field optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacySlide {
    pub id: Option<String>,
    pub type_hint: Option<String>,
    pub prompt: Option<String>,
    pub instructions: Option<String>,
    pub media: Option<String>,
    pub options: Vec<LegacyOption>,
    pub correct: Vec<LegacyAnswerRef>,
    pub time_limit_secs: Option<u32>,
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyOption {
    pub id: Option<String>,
    pub text: String,
    pub flagged_correct: bool,
    /// Index in the authored options array, counting skipped entries.
    pub position: usize,
}

/// One entry of an explicit legacy answer field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyAnswerRef {
    Text(String),
    /// Numeric answers match an option id first and fall back to an index.
    Number(u64),
}

/// Convert raw legacy records into a normalized lesson.
///
/// Returns `None` when there is nothing to show, which callers render as an
/// empty state rather than an empty player.
#[must_use]
pub fn adapt_legacy_slides(records: &[Value], lesson_title: &str) -> Option<LessonSlides> {
    LegacyInput::parse(records).into_lesson(lesson_title)
}

impl LegacyInput {
    #[must_use]
    pub fn parse(records: &[Value]) -> Self {
        let Some(first) = records.first() else {
            return LegacyInput::Empty;
        };

        if let Some(obj) = first.as_object().filter(|obj| looks_normalized(obj)) {
            if let Ok(lesson) = serde_json::from_value::<LessonSlides>(first.clone()) {
                return LegacyInput::Normalized(lesson);
            }
            if let Some(nested) = obj.get("slides").and_then(Value::as_array) {
                return Self::from_records(nested);
            }
        }

        Self::from_records(records)
    }

    fn from_records(records: &[Value]) -> Self {
        if records.is_empty() {
            return LegacyInput::Empty;
        }
        LegacyInput::Legacy(records.iter().map(LegacySlide::from_value).collect())
    }

    /// Finish the conversion. `lesson_title` names legacy lessons and seeds
    /// fallback prompts; normalized lessons keep their own metadata.
    #[must_use]
    pub fn into_lesson(self, lesson_title: &str) -> Option<LessonSlides> {
        match self {
            LegacyInput::Empty => None,
            LegacyInput::Normalized(lesson) => Some(lesson),
            LegacyInput::Legacy(records) => build_lesson(records, lesson_title),
        }
    }
}

fn looks_normalized(obj: &Map<String, Value>) -> bool {
    obj.contains_key("version") || obj.get("slides").is_some_and(Value::is_array)
}

//
// ─── RECORD PARSING ────────────────────────────────────────────────────────────
//

impl LegacySlide {
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(obj) => Self::from_object(obj),
            Value::String(text) => Self {
                prompt: non_blank(text),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Self {
        let content = obj.get("content");
        let content_obj = content.and_then(Value::as_object);

        let prompt = text_field(obj, PROMPT_KEYS)
            .or_else(|| content_obj.and_then(|c| text_field(c, CONTENT_PROMPT_KEYS)))
            .or_else(|| content.and_then(Value::as_str).and_then(non_blank));

        let options = content_obj
            .and_then(|c| c.get("options"))
            .or_else(|| obj.get("options"))
            .and_then(Value::as_array)
            .map(|raw| {
                raw.iter()
                    .enumerate()
                    .filter_map(|(position, value)| LegacyOption::from_value(position, value))
                    .collect()
            })
            .unwrap_or_default();

        let correct = CORRECT_KEYS
            .iter()
            .find_map(|key| obj.get(*key).and_then(answer_refs))
            .or_else(|| {
                content_obj.and_then(|c| {
                    CORRECT_KEYS
                        .iter()
                        .find_map(|key| c.get(*key).and_then(answer_refs))
                })
            })
            .unwrap_or_default();

        Self {
            id: text_field(obj, &["id"]),
            type_hint: text_field(obj, TYPE_KEYS),
            prompt,
            instructions: text_field(obj, INSTRUCTION_KEYS)
                .or_else(|| content_obj.and_then(|c| text_field(c, INSTRUCTION_KEYS))),
            media: text_field(obj, MEDIA_KEYS)
                .or_else(|| content_obj.and_then(|c| text_field(c, CONTENT_MEDIA_KEYS))),
            options,
            correct,
            time_limit_secs: positive_u32(obj, TIME_LIMIT_KEYS)
                .or_else(|| content_obj.and_then(|c| positive_u32(c, TIME_LIMIT_KEYS))),
            alt_text: text_field(obj, ALT_TEXT_KEYS)
                .or_else(|| content_obj.and_then(|c| text_field(c, ALT_TEXT_KEYS))),
        }
    }
}

impl LegacyOption {
    fn from_value(position: usize, value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => non_blank(text).map(|text| Self {
                id: None,
                text,
                flagged_correct: false,
                position,
            }),
            Value::Number(n) => Some(Self {
                id: None,
                text: n.to_string(),
                flagged_correct: false,
                position,
            }),
            Value::Object(obj) => {
                let id = text_field(obj, &["id"]);
                let text = text_field(obj, OPTION_TEXT_KEYS).or_else(|| id.clone())?;
                let flagged_correct = OPTION_FLAG_KEYS
                    .iter()
                    .find_map(|key| obj.get(*key).and_then(Value::as_bool))
                    .unwrap_or(false);
                Some(Self {
                    id,
                    text,
                    flagged_correct,
                    position,
                })
            }
            _ => None,
        }
    }
}

fn answer_refs(value: &Value) -> Option<Vec<LegacyAnswerRef>> {
    let refs: Vec<LegacyAnswerRef> = match value {
        Value::Array(items) => items.iter().filter_map(answer_ref).collect(),
        other => answer_ref(other).into_iter().collect(),
    };
    (!refs.is_empty()).then_some(refs)
}

fn answer_ref(value: &Value) -> Option<LegacyAnswerRef> {
    match value {
        Value::String(text) => non_blank(text).map(LegacyAnswerRef::Text),
        Value::Number(n) => n.as_u64().map(LegacyAnswerRef::Number),
        _ => None,
    }
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(text) => non_blank(text),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn positive_u32(obj: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
    keys.iter().find_map(|key| {
        let raw = match obj.get(*key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(text) => text.trim().parse::<u64>().ok(),
            _ => None,
        }?;
        u32::try_from(raw).ok().filter(|secs| *secs > 0)
    })
}

//
// ─── TYPE MAPPING ──────────────────────────────────────────────────────────────
//

/// Map a legacy type label onto one of the canonical slide types.
///
/// Unknown or missing labels become `SlideType::TargetLanguage`.
#[must_use]
pub fn map_legacy_type(raw: Option<&str>) -> SlideType {
    let Some(raw) = raw else {
        return SlideType::TargetLanguage;
    };
    let key: String = raw
        .trim()
        .to_ascii_lowercase()
        .chars()
        .map(|ch| if ch == '_' || ch == ' ' { '-' } else { ch })
        .collect();

    if let Some(canonical) = SlideType::from_canonical(&key) {
        return canonical;
    }

    match key.as_str() {
        "vocabulary" | "presentation" | "grammar" | "reading" | "listening" | "content"
        | "text" | "image" | "video" => SlideType::TargetLanguage,
        "warmup" | "warm-up-activity" | "introduction" | "intro" | "icebreaker" => {
            SlideType::WarmUp
        }
        "sentence" | "sentence-building" | "word-order" | "drag-drop" | "fill-blank"
        | "fill-in-the-blank" => SlideType::SentenceBuilder,
        "quiz" | "multiple-choice" | "mcq" | "practice" | "exercise" | "question" => {
            SlideType::AccuracyMcq
        }
        "conversation" | "speaking" | "discussion" | "role-play" | "roleplay" | "dialogue" => {
            SlideType::CommunicativeTask
        }
        "review" | "summary" | "assessment" | "exit-ticket" | "wrap-up" => SlideType::ExitCheck,
        _ => SlideType::TargetLanguage,
    }
}

//
// ─── BUILDING ──────────────────────────────────────────────────────────────────
//

fn build_lesson(records: Vec<LegacySlide>, lesson_title: &str) -> Option<LessonSlides> {
    let title = lesson_title.trim();
    let mut used_ids = HashSet::with_capacity(records.len());
    let mut slides = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let slide_id = unique_slide_id(record.id.as_deref(), index, &mut used_ids);
        let prompt = record
            .prompt
            .clone()
            .unwrap_or_else(|| fallback_prompt(title, index));
        let slide_type = map_legacy_type(record.type_hint.as_deref());

        let slide = build_slide(record, slide_id.clone(), prompt.clone())
            .or_else(|_| SlideDraft::new(slide_id, slide_type, prompt).validate());
        if let Ok(slide) = slide {
            slides.push(slide);
        }
    }

    let mut meta = LessonMeta::new(title);
    meta.total_duration_minutes = estimate_minutes(&slides);
    LessonSlides::new(meta, slides).ok()
}

fn build_slide(
    record: LegacySlide,
    id: SlideId,
    prompt: String,
) -> Result<Slide, crate::model::SlideError> {
    let options = assign_option_ids(&record.options);
    let correct = resolve_correct(&record, &options);
    let options = options
        .into_iter()
        .map(|mut option| {
            option.is_correct = correct.as_ref().is_some_and(|c| c.contains(&option.id));
            option
        })
        .collect();

    SlideDraft {
        id,
        slide_type: map_legacy_type(record.type_hint.as_deref()),
        prompt,
        instructions: record.instructions,
        media: record.media,
        options,
        correct,
        time_limit_secs: record.time_limit_secs,
        accessibility_text: record.alt_text,
    }
    .validate()
}

fn fallback_prompt(title: &str, index: usize) -> String {
    if title.is_empty() {
        format!("Slide {}", index + 1)
    } else {
        format!("{title} (slide {})", index + 1)
    }
}

fn unique_slide_id(raw: Option<&str>, index: usize, used: &mut HashSet<SlideId>) -> SlideId {
    if let Some(id) = raw.and_then(|raw| SlideId::new(raw).ok()) {
        if used.insert(id.clone()) {
            return id;
        }
    }
    let base = format!("slide-{}", index + 1);
    let mut candidate = base.clone();
    let mut suffix = 2;
    loop {
        if let Ok(id) = SlideId::new(candidate.as_str()) {
            if used.insert(id.clone()) {
                return id;
            }
        }
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
}

/// Normalized options, index-aligned with `raw`.
fn assign_option_ids(raw: &[LegacyOption]) -> Vec<SlideOption> {
    let mut used: HashSet<OptionId> = HashSet::with_capacity(raw.len());
    let mut options = Vec::with_capacity(raw.len());

    for (index, legacy) in raw.iter().enumerate() {
        let authored = legacy
            .id
            .as_deref()
            .and_then(|id| OptionId::new(id).ok())
            .filter(|id| !used.contains(id));
        let id = authored.unwrap_or_else(|| generated_option_id(index, &used));
        used.insert(id.clone());
        options.push(SlideOption::new(id, legacy.text.clone(), legacy.flagged_correct));
    }

    options
}

fn generated_option_id(index: usize, used: &HashSet<OptionId>) -> OptionId {
    let mut candidate = u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map_or_else(|| format!("option-{}", index + 1), |i| char::from(b'a' + i).to_string());
    let mut suffix = 2;
    loop {
        if let Ok(id) = OptionId::new(candidate.as_str()) {
            if !used.contains(&id) {
                return id;
            }
        }
        candidate = format!("option-{}-{suffix}", index + 1);
        suffix += 1;
    }
}

fn resolve_correct(record: &LegacySlide, options: &[SlideOption]) -> Option<CorrectAnswer> {
    if options.is_empty() {
        return None;
    }

    let mut resolved: Vec<OptionId> = Vec::new();
    for answer in &record.correct {
        let Some(id) = resolve_ref(answer, &record.options, options) else {
            continue;
        };
        if !resolved.contains(&id) {
            resolved.push(id);
        }
    }

    if resolved.is_empty() {
        resolved = options
            .iter()
            .filter(|option| option.is_correct)
            .map(|option| option.id.clone())
            .collect();
    }

    match resolved.len() {
        0 => None,
        1 => resolved.pop().map(CorrectAnswer::Single),
        _ => Some(CorrectAnswer::Multiple(resolved)),
    }
}

/// Authored ids win, then option text; generated ids (`a`, `b`, ...) are a last
/// resort so a text answer like "a" never lands on a generated id by accident.
/// Numbers index the authored array, skipped entries included.
fn resolve_ref(
    answer: &LegacyAnswerRef,
    raw: &[LegacyOption],
    options: &[SlideOption],
) -> Option<OptionId> {
    let pick = |pos: usize| options.get(pos).map(|option| option.id.clone());
    let by_raw_id = |needle: &str| {
        raw.iter()
            .position(|legacy| legacy.id.as_deref().map(str::trim) == Some(needle))
            .and_then(pick)
    };

    match answer {
        LegacyAnswerRef::Text(text) => by_raw_id(text)
            .or_else(|| {
                options
                    .iter()
                    .position(|option| option.text.trim().eq_ignore_ascii_case(text))
                    .and_then(pick)
            })
            .or_else(|| {
                options
                    .iter()
                    .position(|option| option.id.as_str() == text)
                    .and_then(pick)
            }),
        LegacyAnswerRef::Number(n) => by_raw_id(&n.to_string()).or_else(|| {
            let position = usize::try_from(*n).ok()?;
            raw.iter()
                .position(|legacy| legacy.position == position)
                .and_then(pick)
        }),
    }
}

fn estimate_minutes(slides: &[Slide]) -> u32 {
    let limited: u32 = slides
        .iter()
        .filter_map(Slide::time_limit_secs)
        .fold(0_u32, u32::saturating_add);
    if limited > 0 {
        return limited.div_ceil(60);
    }
    let count = u32::try_from(slides.len()).unwrap_or(u32::MAX);
    count.saturating_mul(LEGACY_MINUTES_PER_SLIDE)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
