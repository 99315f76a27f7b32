use anyhow::Context;
use deepdict_store::{EntryQuery, SearchQuery};
use deepdict_types::{DictionaryEntry, EntryKey, ValidatedLanguage};

use crate::state::{Console, LanguageSide};
use crate::ui::{render_entry, render_summary};

/// Entry for `headword` under the current languages, else under any
pub fn find_entry(console: &Console, headword: &str) -> anyhow::Result<Option<DictionaryEntry>> {
    let key = EntryKey::new(headword, &console.languages());
    if let Some(entry) = console.store.get_entry(&EntryQuery::from(&key))? {
        return Ok(Some(entry));
    }
    Ok(console.store.get_entry(&EntryQuery::headword(headword))?)
}

pub fn show(console: &mut Console, headword: &str) -> anyhow::Result<()> {
    match find_entry(console, headword)? {
        Some(entry) => console.say(render_entry(&entry)),
        None => console.say(format!("'{headword}' is not in the dictionary")),
    }
    Ok(())
}

pub fn search(console: &mut Console, term: Option<String>, limit: usize) -> anyhow::Result<()> {
    let query = SearchQuery {
        term,
        limit,
        ..SearchQuery::default()
    };
    let entries = console
        .store
        .search_entries(&query)
        .context("Search failed")?;

    if entries.is_empty() {
        console.say("No entries found");
    }
    for entry in &entries {
        console.say(render_summary(entry));
    }
    Ok(())
}

pub fn delete(console: &mut Console, headword: &str) -> anyhow::Result<()> {
    let key = EntryKey::new(headword, &console.languages());
    if console.store.delete_entry(&EntryQuery::from(&key))? {
        tracing::info!(headword = %headword, "Entry deleted");
        console.say(format!("Deleted {key}"));
    } else {
        console.say(format!("No stored entry for {key}"));
    }
    Ok(())
}

pub fn languages(console: &mut Console) -> anyhow::Result<()> {
    let summary = console.store.all_languages()?;
    let current = console.languages();
    console.say(format!(
        "Current: {} (definitions in {})",
        current.target_language, current.definition_language
    ));
    for (label, names) in [
        ("Target", &summary.target_languages),
        ("Source", &summary.source_languages),
        ("Definition", &summary.definition_languages),
    ] {
        let listed = if names.is_empty() {
            "-".to_string()
        } else {
            names.join(", ")
        };
        console.say(format!("{label} languages: {listed}"));
    }
    Ok(())
}

pub fn clear_cache(console: &mut Console) -> anyhow::Result<()> {
    let removed = console.store.clear_lemma_cache()?;
    console.say(format!("Cleared {removed} cached lemma(s)"));
    Ok(())
}

/// Language validation finished; optionally switch the profile to it
pub fn language_validated(
    console: &mut Console,
    apply_to: Option<LanguageSide>,
    language: ValidatedLanguage,
) {
    console.say(format!(
        "{} ({})",
        language.standardized_name, language.display_name
    ));

    let Some(side) = apply_to else {
        return;
    };
    let name = language.standardized_name.as_str();
    let result = match side {
        LanguageSide::Target => console.profile.update_languages(Some(name), None),
        LanguageSide::Definition => console.profile.update_languages(None, Some(name)),
    };
    match result {
        Ok(()) => {
            let languages = console.languages();
            tracing::info!(
                target_language = %languages.target_language,
                definition_language = %languages.definition_language,
                "Languages changed"
            );
            console.say(format!(
                "Learning {} with definitions in {}",
                languages.target_language, languages.definition_language
            ));
        }
        Err(e) => console.say(format!("Error: could not save languages: {e}")),
    }
}
