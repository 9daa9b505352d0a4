//! Terminal front end for the read-aloud reader.
//!
//! Responsibilities here are intentionally minimal:
//! - Set up logging and load `conf/config.toml`.
//! - Wire the speech service, audio device and PDF extractor into a session.
//! - Translate typed commands into session commands and print the page.

use anyhow::{Context, Result};
use aura_reader::audio::RodioOutput;
use aura_reader::config::{AppConfig, config_path, load_config};
use aura_reader::session::{ReaderSession, ReaderSnapshot, ReadingSettingsPatch, SessionCommand};
use aura_reader::text_utils::preview;
use aura_reader::tts::{GeminiSettings, GeminiSynthesizer, Voice};
use aura_reader::{PlaybackController, PlaybackError, PlaybackOutcome, UnpdfExtractor};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const HELP: &str = "\
commands:
  open <path>      open a PDF or text file
  n, next          next page
  p, prev          previous page
  r, read          read the current page aloud
  s, stop          stop reading
  voice <name>     Kore, Puck, Charon, Fenrir or Zephyr
  font <12-32>     font size
  line <height>    1.2, 1.4, 1.6 or 2.0
  serif, sans      typeface
  close            close the book
  dismiss          clear the notification
  help             show this list
  q, quit          exit";

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let book_path = env::args().nth(1).map(PathBuf::from);
    let config = load_config(&config_path());
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        level = %config.log_level,
        voice = %config.voice,
        page_size = config.page_size,
        "Starting reader"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(run_reader(config, book_path))
}

/// Messages from background read-aloud tasks back to the input loop.
enum ReadAloudEvent {
    Failed(PlaybackError),
    Ended(PlaybackOutcome),
}

enum Input {
    Command(SessionCommand),
    Help,
    Quit,
}

async fn run_reader(config: AppConfig, book_path: Option<PathBuf>) -> Result<()> {
    let synthesizer = Arc::new(GeminiSynthesizer::new(GeminiSettings::from(&config)));
    let output = Arc::new(RodioOutput::spawn().context("Failed to open the audio output")?);
    let playback = Arc::new(
        PlaybackController::new(synthesizer, output)
            .with_timeout(Duration::from_secs(config.tts_timeout_secs)),
    );
    let extractor = Arc::new(UnpdfExtractor);
    let mut session = ReaderSession::from_config(&config, playback, extractor);

    if let Some(path) = book_path {
        let _ = session.open(&path);
    }
    render(&session.snapshot());
    println!("{HELP}");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ReadAloudEvent>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match parse_input(&line) {
                    Ok(Input::Quit) => break,
                    Ok(Input::Help) => println!("{HELP}"),
                    Ok(Input::Command(SessionCommand::ReadAloud)) => {
                        start_read_aloud(&session, events_tx.clone());
                    }
                    Ok(Input::Command(command)) => {
                        let event = session.apply_command(command).await;
                        info!(action = event.action, "Applied command");
                        render(&event.snapshot);
                    }
                    Err(message) => println!("{message}"),
                }
            }
            Some(event) = events_rx.recv() => match event {
                ReadAloudEvent::Failed(err) => {
                    session.record_playback_failure(&err);
                    render(&session.snapshot());
                }
                ReadAloudEvent::Ended(PlaybackOutcome::Finished) => println!("(finished reading)"),
                ReadAloudEvent::Ended(PlaybackOutcome::Stopped) => {}
            },
        }
    }

    session.close_book();
    info!("Reader exiting");
    Ok(())
}

/// Synthesis can take a while, so it runs off the input loop and `stop`
/// stays responsive.
fn start_read_aloud(session: &ReaderSession, events: mpsc::UnboundedSender<ReadAloudEvent>) {
    let Some(request) = session.begin_read_aloud() else {
        println!("(nothing to read)");
        return;
    };
    println!("(reading page {})", session.snapshot().page_number);
    tokio::spawn(async move {
        match request.run().await {
            Ok(completion) => {
                let outcome = completion.finished().await;
                let _ = events.send(ReadAloudEvent::Ended(outcome));
            }
            Err(err) => {
                let _ = events.send(ReadAloudEvent::Failed(err));
            }
        }
    });
}

fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(word, rest)| (word, rest.trim()))
        .unwrap_or((line, ""));

    let command = match word.to_ascii_lowercase().as_str() {
        "" => SessionCommand::GetSnapshot,
        "q" | "quit" | "exit" => return Ok(Input::Quit),
        "help" | "?" => return Ok(Input::Help),
        "open" if !rest.is_empty() => SessionCommand::Open {
            path: PathBuf::from(rest),
        },
        "open" => return Err("usage: open <path>".to_string()),
        "n" | "next" => SessionCommand::NextPage,
        "p" | "prev" => SessionCommand::PrevPage,
        "r" | "read" => SessionCommand::ReadAloud,
        "s" | "stop" => SessionCommand::StopReading,
        "close" => SessionCommand::CloseBook,
        "dismiss" => SessionCommand::DismissNotification,
        "voice" => settings(ReadingSettingsPatch {
            voice: Some(rest.parse::<Voice>()?),
            ..ReadingSettingsPatch::default()
        }),
        "font" => settings(ReadingSettingsPatch {
            font_size: Some(
                rest.parse()
                    .map_err(|_| format!("invalid font size '{rest}'"))?,
            ),
            ..ReadingSettingsPatch::default()
        }),
        "line" => settings(ReadingSettingsPatch {
            line_height: Some(
                rest.parse()
                    .map_err(|_| format!("invalid line height '{rest}'"))?,
            ),
            ..ReadingSettingsPatch::default()
        }),
        "serif" | "sans" => settings(ReadingSettingsPatch {
            serif: Some(word.eq_ignore_ascii_case("serif")),
            ..ReadingSettingsPatch::default()
        }),
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Input::Command(command))
}

fn settings(patch: ReadingSettingsPatch) -> SessionCommand {
    SessionCommand::ApplySettings { patch }
}

fn render(snapshot: &ReaderSnapshot) {
    println!();
    match &snapshot.title {
        Some(title) => {
            println!(
                "{} by {} [{}]",
                title,
                snapshot.author.as_deref().unwrap_or_default(),
                snapshot
                    .format
                    .map(|format| format.to_string())
                    .unwrap_or_default()
            );
            println!("Page {} of {}", snapshot.page_number, snapshot.total_pages);
            let settings = snapshot.settings;
            println!(
                "{} | {}px | line {} | {}{}",
                settings.voice,
                settings.font_size,
                settings.line_height,
                settings.typeface_label(),
                if snapshot.is_reading { " | reading" } else { "" }
            );
            println!("----");
            if snapshot.total_pages == 0 {
                println!("(this book has no pages)");
            } else {
                println!("{}", snapshot.page_text);
            }
            println!("----");
        }
        None => println!("No book open. Use 'open <path>' to load a PDF or text file."),
    }
    if let Some(message) = &snapshot.notification {
        println!("! {}", preview(message, 200));
    }
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> SessionCommand {
        match parse_input(line) {
            Ok(Input::Command(command)) => command,
            _ => panic!("expected a session command for {line:?}"),
        }
    }

    #[test]
    fn parses_navigation_and_playback_commands() {
        assert_eq!(command("n").action(), "reader_next_page");
        assert_eq!(command("PREV").action(), "reader_prev_page");
        assert_eq!(command(" read ").action(), "reader_read_aloud");
        assert_eq!(command("s").action(), "reader_stop_reading");
        assert_eq!(command("").action(), "reader_get_snapshot");
        assert!(matches!(parse_input("q"), Ok(Input::Quit)));
    }

    #[test]
    fn open_keeps_paths_with_spaces() {
        match command("open  My Books/novel.txt ") {
            SessionCommand::Open { path } => assert_eq!(path, PathBuf::from("My Books/novel.txt")),
            other => panic!("unexpected command {other:?}"),
        }
        assert!(parse_input("open").is_err());
    }

    #[test]
    fn settings_commands_build_patches() {
        match command("voice puck") {
            SessionCommand::ApplySettings { patch } => assert_eq!(patch.voice, Some(Voice::Puck)),
            other => panic!("unexpected command {other:?}"),
        }
        match command("sans") {
            SessionCommand::ApplySettings { patch } => assert_eq!(patch.serif, Some(false)),
            other => panic!("unexpected command {other:?}"),
        }
        assert!(parse_input("font large").is_err());
        assert!(parse_input("voice nobody").is_err());
        assert!(parse_input("jump 4").is_err());
    }
}
