//! Command line and interactive shell front end

use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{EditError, SelectionError};
use crate::notify::{Notification, NotificationLevel};
use crate::pipeline::{PipelineController, PipelineState};
use crate::selection::{Language, SubtitleFormat};
use crate::transcript::{FieldValue, SegmentField};

const SHELL_HELP: &str = "\
Commands:
  open <FILE> [FILE...]           select a media file (first one is used)
  language <CODE>                 set target language
  format <CODE>                   set output subtitle format
  translate on|off                toggle translation
  generate [--force]              upload and generate subtitles
  show                            print the transcript
  edit on|off                     enter or leave edit mode
  set <INDEX> start|end|text <V>  change one field of one segment
  save                            save edits and download the result
  download                        download the last output again
  status                          show selection and pipeline state
  languages | formats             list accepted codes
  help                            show this help
  quit                            leave the shell";

/// Build the argument parser
pub fn build_cli() -> Command {
    Command::new("subtitle-client")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Generate, edit and download subtitles for audio and video files")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file to load")
                .global(true),
        )
        .arg(
            Arg::new("backend")
                .short('b')
                .long("backend")
                .value_name("URL")
                .help("Backend origin, e.g. http://localhost:8000")
                .global(true),
        )
        .arg(
            Arg::new("download-dir")
                .short('o')
                .long("download-dir")
                .value_name("DIR")
                .help("Directory downloaded subtitle files are written to")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("generate")
                .about("Upload a file, generate subtitles and download them")
                .arg(
                    Arg::new("files")
                        .value_name("FILE")
                        .help("Media file; extra files are ignored")
                        .required(true)
                        .num_args(1..),
                )
                .arg(selection_arg("language", 'l', "CODE", "Target language code"))
                .arg(selection_arg("format", 'f', "CODE", "Output subtitle format"))
                .arg(
                    Arg::new("translate")
                        .short('t')
                        .long("translate")
                        .help("Translate subtitles to the target language")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("shell")
                .about("Interactive session for generating and editing subtitles")
                .arg(Arg::new("file").value_name("FILE").help("Media file to select on start")),
        )
        .subcommand(Command::new("languages").about("List target language codes"))
        .subcommand(Command::new("formats").about("List subtitle format codes"))
}

fn selection_arg(name: &'static str, short: char, value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .short(short)
        .long(name)
        .value_name(value_name)
        .help(help)
}

pub fn language_list() -> String {
    Language::ALL
        .iter()
        .map(|lang| format!("  {}  {}", lang.code(), lang.name()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_list() -> String {
    SubtitleFormat::ALL
        .iter()
        .map(|format| format!("  {}  {}", format.code(), format.name()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Shell input that could not be turned into a command
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0} (type `help`)")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// One line of shell input
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Open(Vec<PathBuf>),
    Language(Language),
    Format(SubtitleFormat),
    Translate(bool),
    Generate { force: bool },
    Show,
    Edit(bool),
    Set {
        index: usize,
        field: SegmentField,
        value: FieldValue,
    },
    Save,
    Download,
    Status,
    Languages,
    Formats,
    Help,
    Quit,
}

fn parse_switch(word: Option<&str>, usage: &'static str) -> Result<bool, CommandError> {
    match word.map(|w| w.to_ascii_lowercase()).as_deref() {
        Some("on" | "true" | "yes") => Ok(true),
        Some("off" | "false" | "no") => Ok(false),
        _ => Err(CommandError::Usage(usage)),
    }
}

impl ShellCommand {
    /// Parse one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let arg = rest.split_whitespace().next();

        let command = match word.to_ascii_lowercase().as_str() {
            "" => return Ok(None),
            "open" | "select" => {
                let paths: Vec<PathBuf> = rest.split_whitespace().map(PathBuf::from).collect();
                if paths.is_empty() {
                    return Err(CommandError::Usage("open <FILE> [FILE...]"));
                }
                ShellCommand::Open(paths)
            }
            "language" | "lang" => {
                ShellCommand::Language(arg.ok_or(CommandError::Usage("language <CODE>"))?.parse()?)
            }
            "format" => ShellCommand::Format(arg.ok_or(CommandError::Usage("format <CODE>"))?.parse()?),
            "translate" => ShellCommand::Translate(parse_switch(arg, "translate on|off")?),
            "generate" | "run" => ShellCommand::Generate {
                force: arg == Some("--force"),
            },
            "show" | "list" => ShellCommand::Show,
            "edit" => ShellCommand::Edit(parse_switch(arg, "edit on|off")?),
            "set" => {
                const USAGE: &str = "set <INDEX> start|end|text <VALUE>";
                let mut parts = rest.splitn(3, char::is_whitespace);
                let index = parts
                    .next()
                    .and_then(|i| i.parse::<usize>().ok())
                    .ok_or(CommandError::Usage(USAGE))?;
                let field: SegmentField = parts.next().ok_or(CommandError::Usage(USAGE))?.parse()?;
                let raw = parts.next().ok_or(CommandError::Usage(USAGE))?;
                ShellCommand::Set {
                    index,
                    field,
                    value: FieldValue::parse(field, raw)?,
                }
            }
            "save" => ShellCommand::Save,
            "download" => ShellCommand::Download,
            "status" => ShellCommand::Status,
            "languages" => ShellCommand::Languages,
            "formats" => ShellCommand::Formats,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" | "q" => ShellCommand::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Print progress to stderr whenever a run reports it
pub fn spawn_progress_reporter(mut rx: watch::Receiver<PipelineState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = 0;
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            if state.busy && state.progress != last {
                eprintln!("  {}% Complete", state.progress);
            }
            last = state.progress;
        }
    })
}

pub fn print_notifications(notifications: Vec<Notification>) {
    for notification in notifications {
        let marker = match notification.level {
            NotificationLevel::Success => "✔",
            NotificationLevel::Info => "ℹ",
            NotificationLevel::Warning => "!",
            NotificationLevel::Error => "✖",
        };
        println!("{} {}", marker, notification.message);
    }
}

fn print_status(controller: &PipelineController) {
    let state = controller.state();
    println!("Backend:   {}", controller.backend().origin());
    println!(
        "File:      {}",
        controller
            .selected_file()
            .map(|f| format!("{} ({})", f.name(), f.mime()))
            .unwrap_or_else(|| "none".to_string())
    );
    println!("Selection: {}", controller.selection().summary());
    println!(
        "Pipeline:  {} (editing: {}, segments: {}, unsaved edits: {})",
        state.phase,
        state.editing,
        controller.transcript().len(),
        controller.has_unsaved_edits()
    );
    if let Some(token) = controller.last_output() {
        println!("Output:    {}", token);
    }
    if let Some(path) = controller.last_download() {
        println!("Saved to:  {}", path.display());
    }
}

/// Execute one shell command. Returns false when the shell should exit.
pub async fn execute(controller: &mut PipelineController, command: ShellCommand) -> bool {
    match command {
        ShellCommand::Open(paths) => {
            let _ = controller.select_path(&paths).await;
        }
        ShellCommand::Language(language) => controller.set_target_language(language),
        ShellCommand::Format(format) => controller.set_output_format(format),
        ShellCommand::Translate(on) => controller.set_translate(on),
        ShellCommand::Generate { force } => {
            if controller.has_unsaved_edits() && !force {
                println!("Unsaved edits would be discarded. Save first or run `generate --force`.");
            } else if controller.run_generate().await.is_ok() {
                print!("{}", controller.render_transcript());
            }
        }
        ShellCommand::Show => print!("{}", controller.render_transcript()),
        ShellCommand::Edit(on) => {
            controller.set_editing(on);
            print!("{}", controller.render_transcript());
        }
        ShellCommand::Set { index, field, value } => match controller.edit_segment(index, field, value) {
            Ok(()) => {
                if let Some(segment) = controller.transcript().get(index) {
                    println!("#{} {} | {}", index, segment.time_range_label(), segment.text);
                }
            }
            Err(e) => println!("✖ {}", e),
        },
        ShellCommand::Save => {
            for issue in controller.transcript().timing_issues() {
                println!("! {}", issue);
            }
            let _ = controller.run_save().await;
        }
        ShellCommand::Download => {
            let _ = controller.download_latest().await;
        }
        ShellCommand::Status => print_status(controller),
        ShellCommand::Languages => println!("{}", language_list()),
        ShellCommand::Formats => println!("{}", format_list()),
        ShellCommand::Help => println!("{}", SHELL_HELP),
        ShellCommand::Quit => return false,
    }

    print_notifications(controller.take_notifications());
    true
}

/// Read commands from stdin until `quit` or end of input
pub async fn run_shell(controller: &mut PipelineController) -> Result<()> {
    let reporter = spawn_progress_reporter(controller.subscribe());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("Subtitle client connected to {}. Type `help` for commands.", controller.backend().origin());
    loop {
        stdout.write_all(b"subtitles> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ShellCommand::parse(&line) {
            Ok(Some(command)) => {
                debug!("Shell command: {:?}", command);
                if !execute(controller, command).await {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => println!("✖ {}", e),
        }
    }

    reporter.abort();
    Ok(())
}
