use std::fmt::Write as _;
use std::sync::Arc;

use lesson_core::model::OptionId;
use services::{
    ActivityResultReporter, LessonPlayer, LessonProgress, Notice, NoticeKind, Notifier,
    ReportHandle,
};
use storage::repository::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::AppError;

/// Prints notices inline with the lesson.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let marker = match notice.kind {
            NoticeKind::Success => "+",
            NoticeKind::Encouragement => "~",
            NoticeKind::Warning => "!",
        };
        println!("[{marker}] {}", notice.message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Select(Vec<OptionId>),
    Submit,
    Next,
    Previous,
    Progress,
    Help,
    Quit,
    Nothing,
}

/// Parse one line typed by the learner. Anything that is not a command is a list of option ids.
#[must_use]
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "" => Input::Nothing,
        "s" | "submit" => Input::Submit,
        "n" | "next" => Input::Next,
        "p" | "prev" | "previous" => Input::Previous,
        "progress" => Input::Progress,
        "?" | "h" | "help" => Input::Help,
        "q" | "quit" | "exit" => Input::Quit,
        _ => Input::Select(
            line.split_whitespace()
                .filter_map(|raw| OptionId::new(raw).ok())
                .collect(),
        ),
    }
}

const INPUT_HELP: &str =
    "Type option ids to select (several for multi-answer), then: s=submit n=next p=previous progress q=quit";

/// Text shown for the slide the player is on.
#[must_use]
pub fn render_slide(player: &LessonPlayer) -> String {
    let Some(slide) = player.current_slide() else {
        return render_progress(&player.progress());
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "\n── Slide {}/{} [{}] ──",
        player.index() + 1,
        player.lesson().len(),
        slide.slide_type().as_str()
    );
    let _ = writeln!(out, "{}", slide.prompt());
    if let Some(instructions) = slide.instructions() {
        let _ = writeln!(out, "{instructions}");
    }
    if let Some(media) = slide.media() {
        let alt = slide.accessibility_text().unwrap_or("media");
        let _ = writeln!(out, "({alt}: {media})");
    }
    for option in slide.options() {
        let _ = writeln!(out, "  {}) {}", option.id, option.text);
    }
    if slide.is_multi_select() {
        let _ = writeln!(out, "Select every correct answer.");
    }
    if let Some(limit) = slide.time_limit_secs() {
        let _ = writeln!(out, "Suggested time: {limit}s");
    }
    out
}

#[must_use]
pub fn render_progress(progress: &LessonProgress) -> String {
    format!(
        "Progress: {:.0}% complete, {}/{} first-try correct, score {:.0}%{}",
        progress.percent_complete,
        progress.first_try_correct,
        progress.interactive_total,
        progress.weighted_score * 100.0,
        if progress.passed { ", passed" } else { "" },
    )
}

/// Run the interactive loop until the lesson ends, stdin closes, or the learner quits.
pub async fn run_lesson(mut player: LessonPlayer, storage: &Storage) -> Result<(), AppError> {
    let reporter = ActivityResultReporter::from_storage(storage, Arc::new(ConsoleNotifier));
    player = player.with_reporter(reporter);
    let Some(mut events) = player.take_events() else {
        return Ok(());
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reports: Vec<ReportHandle> = Vec::new();

    println!("{}", player.lesson().meta().title);
    println!("{INPUT_HELP}");
    print!("{}", render_slide(&player));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !apply_input(&mut player, parse_input(&line), &mut reports) {
                    break;
                }
            }
            Some(event) = events.recv() => {
                if player.handle_event(event) {
                    print!("{}", render_slide(&player));
                }
            }
        }

        if player.is_finished() {
            break;
        }
    }

    for report in reports {
        report.wait().await;
    }

    let progress = player.progress();
    println!("{}", render_progress(&progress));
    if player.can_unlock_next() {
        println!("Next lesson unlocked.");
    }
    tracing::info!(
        learner_id = %player.learner_id(),
        lesson_id = %player.lesson_id(),
        answers = player.results().len(),
        passed = progress.passed,
        "lesson session ended"
    );
    Ok(())
}

/// Returns false when the learner asked to quit.
fn apply_input(player: &mut LessonPlayer, input: Input, reports: &mut Vec<ReportHandle>) -> bool {
    let navigates = matches!(input, Input::Next | Input::Previous);
    let outcome = match input {
        Input::Nothing => Ok(()),
        Input::Quit => return false,
        Input::Help => {
            println!("{INPUT_HELP}");
            Ok(())
        }
        Input::Progress => {
            println!("{}", render_progress(&player.progress()));
            Ok(())
        }
        Input::Select(ids) => player.select_options(&ids),
        Input::Submit => match player.submit() {
            Ok(outcome) => {
                if outcome.auto_advance_scheduled {
                    println!("Moving on in a moment...");
                } else if outcome.is_correct() {
                    println!("Type n to continue.");
                }
                reports.extend(outcome.report);
                Ok(())
            }
            Err(err) => Err(err),
        },
        Input::Next => player.next(),
        Input::Previous => player.previous(),
    };

    match outcome {
        Ok(()) if navigates && !player.is_finished() => print!("{}", render_slide(player)),
        Ok(()) => {}
        Err(err) => println!("{err}"),
    }
    true
}
