use clap::Subcommand;

use crate::state::{Console, LanguageSide, Task};

pub mod create_card;
pub mod library;
pub mod lookup;
pub mod regenerate;

/// Commands shared by the command line and the interactive prompt
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Look up a word or expression, generating an entry when needed
    Lookup {
        #[arg(required = true, num_args = 1..)]
        word: Vec<String>,
        /// Sentence the word was seen in
        #[arg(long, short, num_args = 1..)]
        context: Vec<String>,
    },
    /// Replace a stored entry with a freshly generated one
    Regenerate {
        #[arg(required = true, num_args = 1..)]
        headword: Vec<String>,
        /// Confirm that the stored entry may be deleted first
        #[arg(long)]
        yes: bool,
    },
    /// Print a stored entry
    Show {
        #[arg(required = true, num_args = 1..)]
        headword: Vec<String>,
    },
    /// List stored entries, newest first
    Search {
        term: Option<String>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Delete a stored entry under the current languages
    Delete {
        #[arg(required = true, num_args = 1..)]
        headword: Vec<String>,
    },
    /// Languages present in the dictionary
    Languages,
    /// Send a stored entry to Anki
    Export {
        #[arg(required = true, num_args = 1..)]
        headword: Vec<String>,
        /// Export a single example as `<meaning>:<example>`, both from 1
        #[arg(long)]
        example: Option<String>,
    },
    /// List Anki decks and note types and check the export settings
    AnkiInfo,
    /// Forget every cached lemma
    ClearCache,
    /// Change the target and/or definition language
    SetLanguages {
        #[arg(long, short)]
        target: Option<String>,
        #[arg(long, short)]
        definition: Option<String>,
    },
    /// Normalize a language name
    ValidateLanguage { name: String },
    /// Interactive prompt (default)
    Repl,
}

fn words(parts: &[String]) -> String {
    parts.join(" ")
}

/// Run a command on the UI thread. Queue work is left in the console's task
/// list for the controller to submit.
pub fn handle_command(console: &mut Console, command: Command) -> anyhow::Result<()> {
    tracing::debug!(?command, "Handling command");
    match command {
        Command::Lookup { word, context } => {
            let context = (!context.is_empty()).then(|| words(&context));
            lookup::start(console, &words(&word), context);
        }
        Command::Regenerate { headword, yes } => {
            regenerate::request(console, &words(&headword), yes);
        }
        Command::Show { headword } => library::show(console, &words(&headword))?,
        Command::Search { term, limit } => library::search(console, term, limit)?,
        Command::Delete { headword } => library::delete(console, &words(&headword))?,
        Command::Languages => library::languages(console)?,
        Command::Export { headword, example } => {
            create_card::export(console, &words(&headword), example.as_deref())?
        }
        Command::AnkiInfo => create_card::inspect(console)?,
        Command::ClearCache => library::clear_cache(console)?,
        Command::SetLanguages { target, definition } => {
            if target.is_none() && definition.is_none() {
                let languages = console.languages();
                console.say(format!(
                    "Learning {} with definitions in {}",
                    languages.target_language, languages.definition_language
                ));
            }
            for (name, side) in [
                (target, LanguageSide::Target),
                (definition, LanguageSide::Definition),
            ] {
                if let Some(name) = name {
                    console.push_task(Task::ValidateLanguage {
                        name,
                        apply_to: Some(side),
                    });
                }
            }
        }
        Command::ValidateLanguage { name } => {
            console.push_task(Task::ValidateLanguage {
                name,
                apply_to: None,
            });
        }
        Command::Repl => console.say("Already in interactive mode"),
    }
    Ok(())
}

/// Error callback shared by every job kind
pub fn job_failed(console: &mut Console, failure: deepdict_core::JobFailure) {
    console.job_finished();
    tracing::error!(job_id = %failure.job_id, kind = %failure.kind, "{}", failure.message);
    console.say(format!("Error: {failure}"));
    if failure.entry_lost {
        console.say("The stored entry was deleted and could not be replaced. Look it up again to recreate it.");
    }
}
