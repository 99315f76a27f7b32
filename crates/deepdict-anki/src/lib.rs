mod client;
mod mapping;

pub use client::AnkiConnectClient;
pub use mapping::{FieldMapper, extract};

use anyhow::{Context, Result, bail};
use deepdict_config::anki::AnkiConfig;
use deepdict_types::DictionaryEntry;

const APP_TAG: &str = "DeepDict";

/// Turn `entry` into a note under the configured deck and note type
pub async fn export_entry(
    client: &AnkiConnectClient,
    config: &AnkiConfig,
    entry: &DictionaryEntry,
) -> Result<u64> {
    let value = serde_json::to_value(entry).context("Failed to serialize entry")?;
    add_note(client, config, entry, &value).await
}

/// Export one example of one meaning.
///
/// The chosen pair is exposed to field mappings as `selected_meaning` and
/// `selected_example`, next to the usual entry paths.
pub async fn export_example(
    client: &AnkiConnectClient,
    config: &AnkiConfig,
    entry: &DictionaryEntry,
    meaning_index: usize,
    example_index: usize,
) -> Result<u64> {
    let value = selected_example(entry, meaning_index, example_index)?;
    add_note(client, config, entry, &value).await
}

async fn add_note(
    client: &AnkiConnectClient,
    config: &AnkiConfig,
    entry: &DictionaryEntry,
    value: &serde_json::Value,
) -> Result<u64> {
    let mapper = FieldMapper::new(config.field_mappings.clone(), config.empty_fields.clone());
    let fields = mapper.map(value)?;
    if fields.is_empty() {
        bail!("No note fields mapped for '{}'", entry.headword);
    }

    let tags = note_tags(&config.tags, entry);
    let note_id = client
        .add_note(&config.deck, &config.note_type, &fields, &tags)
        .await?;

    tracing::info!(
        headword = %entry.headword,
        deck = %config.deck,
        note_id,
        "Exported entry to Anki"
    );
    Ok(note_id)
}

/// Decks, note types and fields AnkiConnect reports for the export target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnkiSetup {
    pub decks: Vec<String>,
    pub note_types: Vec<String>,
    /// Fields of the configured note type; empty when it does not exist
    pub fields: Vec<String>,
}

impl AnkiSetup {
    /// Every way `config` disagrees with the collection
    pub fn problems(&self, config: &AnkiConfig) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.decks.contains(&config.deck) {
            problems.push(format!("Deck '{}' does not exist", config.deck));
        }
        if !self.note_types.contains(&config.note_type) {
            problems.push(format!("Note type '{}' does not exist", config.note_type));
            return problems;
        }
        for field in config.field_mappings.keys() {
            if !self.fields.contains(field) {
                problems.push(format!(
                    "Note type '{}' has no field '{field}'",
                    config.note_type
                ));
            }
        }
        problems
    }
}

/// Ask AnkiConnect what the configured deck and note type can be checked against
pub async fn inspect_setup(client: &AnkiConnectClient, config: &AnkiConfig) -> Result<AnkiSetup> {
    let version = client.version().await?;
    tracing::debug!(version, "AnkiConnect reachable");

    let decks = client.deck_names().await?;
    let note_types = client.model_names().await?;
    let fields = if note_types.contains(&config.note_type) {
        client.model_field_names(&config.note_type).await?
    } else {
        Vec::new()
    };

    Ok(AnkiSetup {
        decks,
        note_types,
        fields,
    })
}

fn selected_example(
    entry: &DictionaryEntry,
    meaning_index: usize,
    example_index: usize,
) -> Result<serde_json::Value> {
    let Some(meaning) = entry.meanings.get(meaning_index) else {
        bail!("'{}' has no meaning #{meaning_index}", entry.headword);
    };
    let Some(example) = meaning.examples.get(example_index) else {
        bail!(
            "Meaning #{meaning_index} of '{}' has no example #{example_index}",
            entry.headword
        );
    };

    let mut value = serde_json::to_value(entry).context("Failed to serialize entry")?;
    if let Some(object) = value.as_object_mut() {
        object.insert("selected_meaning".into(), serde_json::to_value(meaning)?);
        object.insert("selected_example".into(), serde_json::to_value(example)?);
        object.insert("meaning_index".into(), meaning_index.into());
        object.insert("example_index".into(), example_index.into());
    }
    Ok(value)
}

/// Configured tags plus language tags, without duplicates
fn note_tags(configured: &[String], entry: &DictionaryEntry) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(configured.len() + 3);
    let mut push = |tag: String| {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    };

    for tag in configured {
        push(tag.clone());
    }
    let metadata = &entry.metadata;
    if !metadata.source_language.is_empty() {
        push(format!("source:{}", metadata.source_language));
    }
    if !metadata.target_language.is_empty() {
        push(format!("target:{}", metadata.target_language));
    }
    push(APP_TAG.to_string());
    tags
}
