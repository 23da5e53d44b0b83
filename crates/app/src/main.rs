use std::path::{Path, PathBuf};

use lesson_core::legacy::LegacyInput;
use serde_json::Value;
use services::LessonPlayer;
use storage::repository::Storage;
use storage::sqlite::SqliteInitError;
use thiserror::Error;

mod args;
mod logging;
mod play;

use args::{ArgsError, Command, ConvertArgs, PlayArgs};

const EMPTY_LESSON_MESSAGE: &str = "This lesson has no slides yet. Check back soon!";

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Args(#[from] ArgsError),
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid lesson JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Lesson(#[from] lesson_core::Error),
    #[error("storage: {0}")]
    Storage(#[from] SqliteInitError),
}

/// Read lesson content: a JSON array of slide records, or one lesson object.
async fn load_records(path: &Path) -> Result<Vec<Value>, AppError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AppError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let records = match serde_json::from_str::<Value>(&raw)? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    };
    Ok(records)
}

fn lesson_title(title: Option<&str>, file: &Path) -> String {
    title
        .map(str::to_string)
        .or_else(|| file.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

async fn convert(args: ConvertArgs) -> Result<(), AppError> {
    let records = load_records(&args.file).await?;
    let title = lesson_title(args.title.as_deref(), &args.file);
    match LegacyInput::parse(&records).into_lesson(&title) {
        Some(lesson) => println!("{}", serde_json::to_string_pretty(&lesson)?),
        None => println!("{EMPTY_LESSON_MESSAGE}"),
    }
    Ok(())
}

async fn play(args: PlayArgs) -> Result<(), AppError> {
    let settings = args
        .settings_draft()
        .validate()
        .map_err(lesson_core::Error::from)?;
    let records = load_records(&args.file).await?;
    let title = lesson_title(args.title.as_deref(), &args.file);

    let Some(player) =
        LessonPlayer::from_legacy(&records, &title, args.lesson_id, args.learner_id)
    else {
        println!("{EMPTY_LESSON_MESSAGE}");
        return Ok(());
    };
    let player = player.with_settings(settings);

    let storage = open_storage(&args.db_url).await;
    tracing::info!(db = %args.db_url, slides = player.lesson().len(), "starting lesson");

    play::run_lesson(player, &storage).await
}

/// Open + migrate SQLite here so core/services stay storage-agnostic.
///
/// A store that cannot be opened never blocks the lesson: progress is then
/// kept in memory for this session only.
async fn open_storage(db_url: &str) -> Storage {
    let opened = match prepare_sqlite_file(db_url) {
        Ok(()) => Storage::sqlite(db_url).await.map_err(AppError::from),
        Err(err) => Err(err),
    };
    opened.unwrap_or_else(|err| {
        tracing::warn!(db = %db_url, error = %err, "progress store unavailable, keeping results in memory");
        Storage::in_memory()
    })
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), AppError> {
    if db_url.starts_with("sqlite::memory:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

async fn run() -> Result<(), AppError> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cmd = args::parse(argv, |key| std::env::var(key).ok()).inspect_err(|e| {
        eprintln!("{e}");
        args::print_usage();
    })?;

    match cmd {
        Command::Help => {
            args::print_usage();
            Ok(())
        }
        Command::Convert(args) => convert(args).await,
        Command::Play(args) => play(args).await,
    }
}

#[tokio::main]
async fn main() {
    logging::init_logging();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
