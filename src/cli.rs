//! Command-line interface and REPL
//!
//! The REPL stands in for the UI: each command changes one widget and asks
//! the manager for an update message, exactly like a UI event handler would.

use crate::manager::WidgetStateManager;
use crate::state::WidgetValue;
use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Interval between simulated slider moves during a sweep (~60 Hz)
const SWEEP_STEP_MS: u64 = 16;

/// A parsed REPL command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Set a widget value and request an update
    Set { id: String, value: WidgetValue },
    /// Drag a float slider from 0.0 to 1.0 over `duration_ms`
    Sweep { id: String, duration_ms: u64 },
    /// Print the current registry contents
    Show,
    Help,
    Exit,
}

/// Errors produced while parsing a REPL line
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid {kind} value: {value}")]
    InvalidValue { kind: &'static str, value: String },
}

fn parse_bool(s: &str) -> Result<bool, CommandError> {
    match s {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        _ => Err(CommandError::InvalidValue {
            kind: "bool",
            value: s.to_string(),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(kind: &'static str, s: &str) -> Result<T, CommandError> {
    s.parse().map_err(|_| CommandError::InvalidValue {
        kind,
        value: s.to_string(),
    })
}

fn set(id: &str, value: WidgetValue) -> Command {
    Command::Set {
        id: id.to_string(),
        value,
    }
}

/// Parse one REPL line
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut parts = line.split_whitespace();
    let name = parts.next().ok_or(CommandError::Empty)?;
    let args: Vec<&str> = parts.collect();

    match (name, args.as_slice()) {
        ("exit" | "quit", _) => Ok(Command::Exit),
        ("help", _) => Ok(Command::Help),
        ("show", _) => Ok(Command::Show),
        ("trigger", [id]) => Ok(set(id, WidgetValue::Trigger(true))),
        ("trigger", [id, v]) => Ok(set(id, WidgetValue::Trigger(parse_bool(v)?))),
        ("trigger", _) => Err(CommandError::Usage("trigger <id> [true|false]")),
        ("bool", [id, v]) => Ok(set(id, WidgetValue::Bool(parse_bool(v)?))),
        ("bool", _) => Err(CommandError::Usage("bool <id> <true|false>")),
        ("int", [id, v]) => Ok(set(id, WidgetValue::Int(parse_num("int", v)?))),
        ("int", _) => Err(CommandError::Usage("int <id> <n>")),
        ("float", [id, v]) => Ok(set(id, WidgetValue::Float(parse_num("float", v)?))),
        ("float", _) => Err(CommandError::Usage("float <id> <x>")),
        ("string", [id, rest @ ..]) => Ok(set(id, WidgetValue::String(rest.join(" ")))),
        ("string", _) => Err(CommandError::Usage("string <id> <text...>")),
        ("floats", [id, rest @ ..]) => {
            let values = rest
                .iter()
                .map(|v| parse_num("float", v))
                .collect::<Result<Vec<f64>, _>>()?;
            Ok(set(id, WidgetValue::FloatArray(values.into())))
        }
        ("floats", _) => Err(CommandError::Usage("floats <id> <x> [y...]")),
        ("sweep", [id, ms]) => Ok(Command::Sweep {
            id: id.to_string(),
            duration_ms: parse_num("duration", ms)?,
        }),
        ("sweep", _) => Err(CommandError::Usage("sweep <id> <duration_ms>")),
        (other, _) => Err(CommandError::Unknown(other.to_string())),
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  trigger <id> [true|false]   press a button");
    println!("  bool <id> <true|false>      toggle a checkbox");
    println!("  int <id> <n>                set an integer input");
    println!("  float <id> <x>              move a slider");
    println!("  string <id> <text...>       type into a text input");
    println!("  floats <id> <x> [y...]      set a range slider");
    println!("  sweep <id> <duration_ms>    drag a slider from 0 to 1");
    println!("  show                        print current widget values");
    println!("  exit | quit                 leave");
}

fn print_registry(manager: &WidgetStateManager) {
    let mut widgets = manager.registry().snapshot().widgets;
    if widgets.is_empty() {
        println!("{}", "(no widgets set)".dimmed());
        return;
    }
    widgets.sort_by(|a, b| a.id.cmp(&b.id));
    for widget in widgets {
        println!(
            "  {} {} {:?}",
            widget.id.cyan(),
            widget.value.kind().to_string().yellow(),
            widget.value
        );
    }
}

/// Simulate a slider drag, one update every `SWEEP_STEP_MS`
fn sweep(manager: &mut WidgetStateManager, id: &str, duration_ms: u64) {
    let steps = (duration_ms / SWEEP_STEP_MS).max(1);
    let start = Instant::now();
    for step in 0..=steps {
        manager.set_float_value(id, step as f64 / steps as f64);
        manager.send_update_widgets_message();
        std::thread::sleep(Duration::from_millis(SWEEP_STEP_MS));
    }
    info!(
        "Sweep of {} done: {} updates requested in {:?}",
        id,
        steps + 1,
        start.elapsed()
    );
}

/// Run the REPL until `exit` or EOF
///
/// Blocking: run it on a blocking thread.
pub fn run_repl(manager: &mut WidgetStateManager) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    print_help();

    loop {
        let line = match rl.readline("relay> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = rl.add_history_entry(line.as_str()) {
            debug!("Failed to record history entry: {}", e);
        }

        match parse_command(&line) {
            Ok(Command::Exit) => break,
            Ok(Command::Help) => print_help(),
            Ok(Command::Show) => print_registry(manager),
            Ok(Command::Set { id, value }) => {
                debug!("Set {} = {:?}", id, value);
                manager.set_value(&id, value);
                manager.send_update_widgets_message();
            }
            Ok(Command::Sweep { id, duration_ms }) => sweep(manager, &id, duration_ms),
            Err(e) => println!("{} {}", "error:".red(), e),
        }
    }

    Ok(())
}
