use std::fmt::Write as _;
use std::io::Write as _;

use deepdict_types::DictionaryEntry;

use crate::controller::AppController;
use crate::events::handle_command;
use crate::io::{HELP, Input, ReplAction, parse_line, spawn_stdin_reader};
use crate::state::Console;

/// Interactive loop. The calling thread is the UI thread: it reads typed
/// lines from the stdin thread and drains job results between them.
pub fn ui_loop(app: &AppController, console: &mut Console) -> anyhow::Result<()> {
    let input = spawn_stdin_reader()?;
    let languages = console.languages();
    println!(
        "deepdict: {} with definitions in {}. Type `help` for commands.",
        languages.target_language, languages.definition_language
    );
    prompt();

    let mut stdin_closed = false;
    loop {
        while let Ok(Some(input)) = input.try_recv() {
            let line = match input {
                Input::Line(line) => line,
                Input::Eof => {
                    stdin_closed = true;
                    break;
                }
            };

            match parse_line(&line) {
                Ok(ReplAction::Quit) => return Ok(()),
                Ok(ReplAction::Run(command)) => {
                    if let Err(e) = handle_command(console, command) {
                        console.say(format!("Error: {e:#}"));
                    }
                }
                Ok(ReplAction::Cancel) => {
                    let cancelled = app.cancel_all(console);
                    console.say(format!("Cancelled {cancelled} pending request(s)"));
                }
                Ok(ReplAction::Status) => console.say(app.status()),
                Ok(ReplAction::History) => {
                    for record in app.queue().history() {
                        let error = record.error.map(|e| format!(": {e}")).unwrap_or_default();
                        console.say(format!(
                            "{} {} {:?}{error}",
                            record.finished_at.format("%H:%M:%S"),
                            record.kind,
                            record.status
                        ));
                    }
                }
                Ok(ReplAction::Help) => console.say(HELP),
                Ok(ReplAction::Nothing) => {}
                Err(e) => console.say(e.to_string().trim_end().to_string()),
            }
            app.submit(console);
            flush(console);
            prompt();
        }

        app.pump(console);
        let printed = flush(console);
        if app.take_dirty() && !console.is_idle() {
            println!("{}", app.status());
        }
        if printed {
            prompt();
        }

        if stdin_closed && console.is_idle() {
            return Ok(());
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn flush(console: &mut Console) -> bool {
    let lines = console.take_lines();
    for line in &lines {
        println!("{line}");
    }
    !lines.is_empty()
}

/// Full entry, one meaning per numbered block
pub fn render_entry(entry: &DictionaryEntry) -> String {
    let mut out = String::new();
    let metadata = &entry.metadata;
    let _ = write!(out, "{}", entry.headword);
    if !entry.part_of_speech.is_empty() {
        let _ = write!(out, " ({})", entry.part_of_speech);
    }
    if !metadata.target_language.is_empty() {
        let _ = write!(
            out,
            "  [{} -> {}]",
            metadata.target_language, metadata.definition_language
        );
    }

    for (i, meaning) in entry.meanings.iter().enumerate() {
        let _ = write!(out, "\n  {}. {}", i + 1, meaning.definition);
        let grammar = [
            &meaning.grammar.noun_type,
            &meaning.grammar.verb_type,
            &meaning.grammar.comparison,
        ];
        let notes: Vec<&str> = grammar.into_iter().flatten().map(String::as_str).collect();
        if !notes.is_empty() {
            let _ = write!(out, " [{}]", notes.join("; "));
        }
        for example in &meaning.examples {
            let marker = if example.is_context { "*" } else { "-" };
            let _ = write!(out, "\n     {marker} {}", example.sentence);
            if !example.translation.is_empty() {
                let _ = write!(out, " = {}", example.translation);
            }
        }
    }

    if let Some(sentence) = &metadata.context_sentence {
        let _ = write!(out, "\n  context: {sentence}");
    }
    out
}

/// One line per entry for listings
pub fn render_summary(entry: &DictionaryEntry) -> String {
    let first = entry
        .meanings
        .first()
        .map(|m| m.definition.as_str())
        .unwrap_or("");
    format!(
        "{} [{} -> {}] {first}",
        entry.headword, entry.metadata.target_language, entry.metadata.definition_language
    )
}
