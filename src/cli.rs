//! Interactive console commands.
//!
//! The REPL runs on the foreground thread and forwards commands to the task
//! that owns the engine; results are printed from there.

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;

/// Commands the REPL can send to the engine task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// List bindings with decoded input names
    Show,
    /// Dump session state
    State,
    /// Attach the console learner (raw signatures print instead of firing)
    Learn,
    /// Detach the learner
    Done,
    /// Write bindings back to the bindings file
    Save,
    /// Re-read the bindings file
    Reload,
    /// Shut down
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "show" => Some(Command::Show),
        "state" => Some(Command::State),
        "learn" => Some(Command::Learn),
        "done" => Some(Command::Done),
        "save" => Some(Command::Save),
        "reload" => Some(Command::Reload),
        "quit" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

fn print_help() {
    println!("{}", "Commands:".bold());
    println!("  show    - list bindings");
    println!("  state   - dump session state");
    println!("  learn   - print raw input signatures (dispatch paused)");
    println!("  done    - resume normal dispatch");
    println!("  save    - write bindings to disk");
    println!("  reload  - re-read the bindings file");
    println!("  quit    - exit");
}

/// Read commands until quit/EOF, forwarding them to the engine task.
pub fn run_repl(tx: mpsc::UnboundedSender<Command>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    print_help();

    loop {
        match rl.readline("deckctl> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);
                match parse_command(trimmed) {
                    Some(Command::Quit) => {
                        let _ = tx.send(Command::Quit);
                        break;
                    }
                    Some(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    None => {
                        println!("{} {}", "Unknown command:".red(), trimmed);
                        print_help();
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                let _ = tx.send(Command::Quit);
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
