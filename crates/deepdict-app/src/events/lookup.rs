use deepdict_config::RecentLookup;
use deepdict_core::preprocess::{DefaultPreprocessor, Preprocessor};
use deepdict_store::EntryQuery;
use deepdict_types::{DictionaryEntry, EntryKey, LanguageSettings, SentenceContext};

use crate::state::{Console, Task};
use crate::ui::render_entry;

/// First step of a lookup: resolve the dictionary form
pub fn start(console: &mut Console, text: &str, context: Option<String>) {
    let word = DefaultPreprocessor.process(text);
    if word.is_empty() {
        console.say("Nothing to look up");
        return;
    }

    let context = context
        .map(|sentence| DefaultPreprocessor.process(&sentence))
        .filter(|sentence| !sentence.is_empty());

    tracing::info!(word = %word, with_context = context.is_some(), "Lookup started");
    console.push_task(Task::ResolveLemma {
        word,
        languages: console.languages(),
        context,
    });
}

/// Lemma job finished. Show a stored entry if the surface word or its lemma
/// already has one, otherwise queue generation for the lemma.
pub fn lemma_resolved(
    console: &mut Console,
    word: String,
    languages: LanguageSettings,
    context: Option<String>,
    lemma: String,
) {
    if lemma != word {
        console.say(format!("{word} -> {lemma}"));
    }

    let mut candidates = vec![word.as_str()];
    if lemma != word {
        candidates.push(lemma.as_str());
    }

    for candidate in candidates {
        let query = EntryQuery::from(&EntryKey::new(candidate, &languages));
        match console.store.get_entry(&query) {
            Ok(Some(entry)) => {
                tracing::debug!(headword = %candidate, "Entry already stored");
                show_entry(console, entry);
                return;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(headword = %candidate, "Entry pre-check failed: {e}"),
        }
    }

    let context = context.map(|sentence| SentenceContext::new(sentence, word.clone()));
    console.say(format!("Generating entry for '{lemma}'..."));
    console.push_task(Task::CreateEntry {
        headword: lemma,
        languages,
        context,
    });
}

/// An entry was created or regenerated
pub fn entry_ready(console: &mut Console, entry: DictionaryEntry) {
    show_entry(console, entry);
}

fn show_entry(console: &mut Console, entry: DictionaryEntry) {
    console.say(render_entry(&entry));

    let lookup = RecentLookup {
        headword: entry.headword.clone(),
        target_language: entry.metadata.target_language.clone(),
        definition_language: entry.metadata.definition_language.clone(),
    };
    if let Err(e) = console.profile.add_recent_lookup(lookup) {
        tracing::warn!("Could not record recent lookup: {e}");
    }
}
