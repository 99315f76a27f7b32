use std::io::BufRead;

use clap::Parser;
use kanal::Receiver;

use crate::events::Command;

pub enum Input {
    Line(String),
    Eof,
}

/// Read stdin on its own thread so the UI thread never blocks on it
pub fn spawn_stdin_reader() -> std::io::Result<Receiver<Input>> {
    let (tx, rx) = kanal::unbounded();
    std::thread::Builder::new()
        .name("deepdict-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Input::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to read stdin: {e}");
                        break;
                    }
                }
            }
            let _ = tx.send(Input::Eof);
        })?;
    Ok(rx)
}

/// What a line typed at the prompt asks for
#[derive(Debug, PartialEq, Eq)]
pub enum ReplAction {
    Run(Command),
    Cancel,
    Status,
    History,
    Help,
    Quit,
    Nothing,
}

#[derive(Parser)]
#[command(no_binary_name = true, disable_help_subcommand = true)]
struct ReplLine {
    #[command(subcommand)]
    command: Command,
}

/// A bare word is a lookup; `word | sentence` adds context
pub fn parse_line(line: &str) -> Result<ReplAction, clap::Error> {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let Some(first) = parts.next() else {
        return Ok(ReplAction::Nothing);
    };

    match first {
        "quit" | "exit" | ":q" => return Ok(ReplAction::Quit),
        "cancel" => return Ok(ReplAction::Cancel),
        "status" => return Ok(ReplAction::Status),
        "history" => return Ok(ReplAction::History),
        "help" | "?" => return Ok(ReplAction::Help),
        _ => {}
    }

    if let Some((word, sentence)) = line.split_once('|') {
        return Ok(ReplAction::Run(Command::Lookup {
            word: vec![word.trim().to_string()],
            context: vec![sentence.trim().to_string()],
        }));
    }

    match ReplLine::try_parse_from(line.split_whitespace()) {
        Ok(parsed) => Ok(ReplAction::Run(parsed.command)),
        Err(e) if e.kind() == clap::error::ErrorKind::InvalidSubcommand => {
            Ok(ReplAction::Run(Command::Lookup {
                word: vec![line.to_string()],
                context: Vec::new(),
            }))
        }
        Err(e) => Err(e),
    }
}

pub const HELP: &str = "\
lookup <word> [--context <sentence>]   or just type a word, or `word | sentence`
show <word>, search [term], delete <word>, languages
regenerate <word> [--yes], export <word> [--example 1:1], anki-info
set-languages [--target X] [--definition Y], validate-language <name>
clear-cache, cancel, status, history, quit";
