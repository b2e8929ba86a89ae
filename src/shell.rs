//! Interactive shell for a single user
//!
//! A small line-oriented loop over one [`UserData`]: `add`, `remove`,
//! `predict`, `view`, `trim`, `save`, `help`, `exit`. Nothing is saved unless
//! the user runs `save`.

use anyhow::{Context, Result};
use crossterm::{execute, style::{Color, Print, ResetColor, SetForegroundColor}};
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::Helper;
use std::io;

use crate::tracker::{Tracker, UserData};
use crate::types::ViewLength;

/// Commands offered for completion, with their help text
const COMMANDS: &[(&str, &str)] = &[
    ("add", "add <date>   Add a date (day/month/year, day-month-year, today, yesterday)"),
    ("remove", "remove       Remove previous date entry"),
    ("predict", "predict      Calculate and output prediction"),
    ("view", "view [n|all] Pretty print and list entries"),
    ("trim", "trim         Drop all but the most recent entries"),
    ("save", "save         Save changes to database"),
    ("help", "help         Show this list"),
    ("exit", "exit         Say bye"),
];

/// Completion and hints for command names
struct ShellHelper;

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let partial = &line[..pos];
        if partial.contains(' ') {
            return Ok((pos, Vec::new()));
        }

        let matches = COMMANDS
            .iter()
            .filter(|(name, _)| name.starts_with(partial))
            .map(|(name, _)| Pair {
                display: name.to_string(),
                replacement: name[partial.len()..].to_string(),
            })
            .collect();
        Ok((pos, matches))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if line.is_empty() || pos < line.len() || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|(name, _)| name.starts_with(line) && *name != line)
            .map(|(name, _)| name[line.len()..].to_string())
    }
}

impl Validator for ShellHelper {
    fn validate(&self, _ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}

impl Highlighter for ShellHelper {}

impl Helper for ShellHelper {}

/// What the loop should do after a line
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Output(String),
    Error(String),
    Exit,
}

/// Run one shell line against `data`
pub fn execute_line(data: &mut UserData, line: &str, default_view: ViewLength) -> Outcome {
    let line = line.trim();
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command.to_lowercase().as_str() {
        "add" if arg.is_empty() => Outcome::Error("Please specify a date.".to_string()),
        "add" => match data.add(arg) {
            Some(label) => Outcome::Output(format!("{} added.", label)),
            None => Outcome::Error("Invalid date format!".to_string()),
        },
        "remove" => {
            if data.remove_previous() {
                Outcome::Output("Last date entry removed.".to_string())
            } else {
                Outcome::Output("Nothing to remove for now!".to_string())
            }
        }
        "predict" => match data.predict() {
            Some(label) => Outcome::Output(label),
            None => Outcome::Output("Insufficient data for calculation!".to_string()),
        },
        "view" => {
            let length = if arg.is_empty() {
                default_view
            } else {
                match arg.parse::<ViewLength>() {
                    Ok(length) => length,
                    Err(msg) => return Outcome::Error(msg),
                }
            };
            match data.display(length) {
                Ok(Some(listing)) => Outcome::Output(listing),
                Ok(None) => Outcome::Output("Nothing to see for now!".to_string()),
                Err(e) => Outcome::Error(e.to_string()),
            }
        }
        "trim" => {
            if data.trim() {
                Outcome::Output("Old entries trimmed.".to_string())
            } else {
                Outcome::Output("Nothing to trim.".to_string())
            }
        }
        "save" => match data.save() {
            Ok(()) => Outcome::Output("Changes saved.".to_string()),
            Err(e) => Outcome::Error(format!("Save failed: {}", e)),
        },
        "help" | "?" => Outcome::Output(help_text()),
        "exit" | "quit" => Outcome::Exit,
        other => Outcome::Error(format!("Unknown command '{}'. Type help or ? to list commands.", other)),
    }
}

fn help_text() -> String {
    COMMANDS
        .iter()
        .map(|(_, help)| *help)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Start the interactive loop for `user`
pub fn run(tracker: &Tracker, user: &str, default_view: ViewLength) -> Result<()> {
    let mut data = tracker
        .open_user(user)
        .with_context(|| format!("Could not open profile for '{}'", user))?;

    let config = rustyline::Config::builder()
        .completion_type(rustyline::CompletionType::List)
        .edit_mode(rustyline::EditMode::Emacs)
        .auto_add_history(true)
        .build();

    let mut rl = rustyline::Editor::<ShellHelper, rustyline::history::DefaultHistory>::with_config(config)
        .context("Failed to initialize line editor")?;
    rl.set_helper(Some(ShellHelper));

    print_dim(&format!("Tracking for '{}'. Type help or ? to list commands.\n", user));

    loop {
        let line = match rl.readline("\n> ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(err) => return Err(err).context("Failed to read input"),
        };

        if line.trim().is_empty() {
            continue;
        }

        match execute_line(&mut data, &line, default_view) {
            Outcome::Output(text) => println!("{}", text),
            Outcome::Error(text) => print_error(&format!("{}\n", text)),
            Outcome::Exit => break,
        }
    }

    if data.has_unsaved_changes() {
        print_error("Unsaved changes were discarded. Use `save` before exiting to keep them.\n");
    }
    println!("Bye.");
    Ok(())
}

fn print_colored(text: &str, color: Color) {
    let _ = execute!(
        io::stdout(),
        SetForegroundColor(color),
        Print(text),
        ResetColor
    );
}

/// Print a dimmed line
fn print_dim(text: &str) {
    print_colored(text, Color::DarkGrey);
}

/// Print an error message
fn print_error(text: &str) {
    print_colored(text, Color::Red);
}
