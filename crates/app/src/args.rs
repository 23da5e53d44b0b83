use std::fmt;
use std::path::PathBuf;

use lesson_core::model::{LearnerId, LessonId, PlayerSettingsDraft};

pub const DEFAULT_DB_URL: &str = "sqlite://lesson-progress.sqlite3";

#[derive(Debug, PartialEq)]
pub enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingFile,
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingFile => write!(f, "missing lesson file"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app convert <file> [--title <t>]");
    eprintln!("  app play    <file> [--db <sqlite_url>] [--learner <id>] [--lesson <id>]");
    eprintln!("                     [--title <t>] [--delay-ms <n>] [--pass-ratio <r>] [--no-auto-advance]");
    eprintln!();
    eprintln!("Defaults for play:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --learner 1 --lesson 1 --delay-ms 2000 --pass-ratio 0.75");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LESSON_DB_URL, LESSON_LEARNER_ID, LESSON_AUTO_ADVANCE_MS, LESSON_PASS_RATIO, RUST_LOG");
}

#[derive(Debug, PartialEq)]
pub enum Command {
    Convert(ConvertArgs),
    Play(PlayArgs),
    Help,
}

#[derive(Debug, PartialEq)]
pub struct ConvertArgs {
    pub file: PathBuf,
    pub title: Option<String>,
}

#[derive(Debug, PartialEq)]
pub struct PlayArgs {
    pub file: PathBuf,
    pub title: Option<String>,
    pub db_url: String,
    pub learner_id: LearnerId,
    pub lesson_id: LessonId,
    pub auto_advance: bool,
    pub delay_ms: Option<u64>,
    pub pass_ratio: Option<f32>,
}

impl PlayArgs {
    /// Unvalidated player settings from the layered configuration.
    #[must_use]
    pub fn settings_draft(&self) -> PlayerSettingsDraft {
        PlayerSettingsDraft {
            auto_advance: Some(self.auto_advance),
            auto_advance_delay_ms: self.delay_ms,
            pass_ratio: self.pass_ratio,
        }
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id(flag: &'static str, raw: &str) -> Result<u64, ArgsError> {
    raw.trim().parse().map_err(|_| ArgsError::InvalidId {
        flag,
        raw: raw.to_string(),
    })
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: &str) -> Result<T, ArgsError> {
    raw.trim().parse().map_err(|_| ArgsError::InvalidNumber {
        flag,
        raw: raw.to_string(),
    })
}

/// Parse the command line. Later layers win: defaults, then `env`, then flags.
///
/// # Errors
///
/// Returns `ArgsError` for unknown commands or flags, missing values, and
/// unparsable numbers, including those coming from the environment.
pub fn parse(
    argv: impl IntoIterator<Item = String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Command, ArgsError> {
    let mut args = argv.into_iter();
    let cmd = args.next().ok_or(ArgsError::MissingCommand)?;
    match cmd.as_str() {
        "convert" => parse_convert(&mut args).map(Command::Convert),
        "play" => parse_play(&mut args, &env).map(Command::Play),
        "--help" | "-h" | "help" => Ok(Command::Help),
        _ => Err(ArgsError::UnknownCommand(cmd)),
    }
}

fn parse_convert(args: &mut impl Iterator<Item = String>) -> Result<ConvertArgs, ArgsError> {
    let mut file = None;
    let mut title = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--title" => title = Some(require_value(args, "--title")?),
            _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
            _ if file.is_none() => file = Some(PathBuf::from(arg)),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(ConvertArgs {
        file: file.ok_or(ArgsError::MissingFile)?,
        title,
    })
}

fn parse_play(
    args: &mut impl Iterator<Item = String>,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<PlayArgs, ArgsError> {
    let mut db_url = env("LESSON_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.to_string());
    let mut learner = match env("LESSON_LEARNER_ID") {
        Some(raw) => parse_id("LESSON_LEARNER_ID", &raw)?,
        None => 1,
    };
    let mut delay_ms = env("LESSON_AUTO_ADVANCE_MS")
        .map(|raw| parse_number("LESSON_AUTO_ADVANCE_MS", &raw))
        .transpose()?;
    let mut pass_ratio = env("LESSON_PASS_RATIO")
        .map(|raw| parse_number("LESSON_PASS_RATIO", &raw))
        .transpose()?;
    let mut lesson = 1;
    let mut auto_advance = true;
    let mut title = None;
    let mut file = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                let value = require_value(args, "--db")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                db_url = value;
            }
            "--learner" => learner = parse_id("--learner", &require_value(args, "--learner")?)?,
            "--lesson" => lesson = parse_id("--lesson", &require_value(args, "--lesson")?)?,
            "--title" => title = Some(require_value(args, "--title")?),
            "--delay-ms" => {
                delay_ms = Some(parse_number("--delay-ms", &require_value(args, "--delay-ms")?)?);
            }
            "--pass-ratio" => {
                pass_ratio = Some(parse_number(
                    "--pass-ratio",
                    &require_value(args, "--pass-ratio")?,
                )?);
            }
            "--no-auto-advance" => auto_advance = false,
            _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
            _ if file.is_none() => file = Some(PathBuf::from(arg)),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }

    Ok(PlayArgs {
        file: file.ok_or(ArgsError::MissingFile)?,
        title,
        db_url: normalize_sqlite_url(&db_url),
        learner_id: LearnerId::new(learner),
        lesson_id: LessonId::new(lesson),
        auto_advance,
        delay_ms,
        pass_ratio,
    })
}

/// Turn a bare or relative path into an absolute `sqlite://` URL.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("sqlite::memory:") || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path = std::path::Path::new(trimmed.strip_prefix("sqlite:").unwrap_or(trimmed));
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn convert_takes_file_and_title() {
        let cmd = parse(argv(&["convert", "lesson.json", "--title", "Animals"]), no_env).unwrap();
        assert_eq!(
            cmd,
            Command::Convert(ConvertArgs {
                file: PathBuf::from("lesson.json"),
                title: Some("Animals".into()),
            })
        );
    }

    #[test]
    fn play_defaults() {
        let Command::Play(args) = parse(argv(&["play", "l.json"]), no_env).unwrap() else {
            panic!("expected play");
        };
        assert!(args.db_url.starts_with("sqlite://"));
        assert!(args.db_url.ends_with("lesson-progress.sqlite3"));
        assert_eq!(args.learner_id, LearnerId::new(1));
        assert!(args.auto_advance);
        let settings = args.settings_draft().validate().unwrap();
        assert_eq!(settings.auto_advance_delay().as_millis(), 2_000);
    }

    #[test]
    fn flags_override_environment() {
        let env = |key: &str| match key {
            "LESSON_LEARNER_ID" => Some("7".to_string()),
            "LESSON_AUTO_ADVANCE_MS" => Some("900".to_string()),
            "LESSON_DB_URL" => Some("sqlite::memory:".to_string()),
            _ => None,
        };
        let Command::Play(args) = parse(
            argv(&["play", "l.json", "--learner", "9", "--no-auto-advance"]),
            env,
        )
        .unwrap() else {
            panic!("expected play");
        };
        assert_eq!(args.learner_id, LearnerId::new(9));
        assert_eq!(args.delay_ms, Some(900));
        assert_eq!(args.db_url, "sqlite::memory:");
        assert!(!args.auto_advance);
    }

    #[test]
    fn reports_bad_input() {
        assert_eq!(
            parse(argv(&["play", "l.json", "--lesson", "x"]), no_env),
            Err(ArgsError::InvalidId {
                flag: "--lesson",
                raw: "x".into()
            })
        );
        assert_eq!(
            parse(argv(&["play", "--delay-ms"]), no_env),
            Err(ArgsError::MissingValue { flag: "--delay-ms" })
        );
        assert_eq!(parse(argv(&["play"]), no_env), Err(ArgsError::MissingFile));
        assert_eq!(
            parse(argv(&["dance"]), no_env),
            Err(ArgsError::UnknownCommand("dance".into()))
        );
    }
}
