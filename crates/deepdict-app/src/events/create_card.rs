use anyhow::{Context, bail};
use deepdict_anki::AnkiConnectClient;

use crate::events::library::find_entry;
use crate::state::Console;

/// Send a stored entry (or one of its examples) to Anki
pub fn export(console: &mut Console, headword: &str, example: Option<&str>) -> anyhow::Result<()> {
    let config = console.profile.config().anki.clone();
    if !config.enabled {
        console.say("Anki integration disabled; set anki.enabled in the profile");
        return Ok(());
    }

    let Some(entry) = find_entry(console, headword)? else {
        console.say(format!("'{headword}' is not in the dictionary"));
        return Ok(());
    };
    let selection = example.map(parse_selection).transpose()?;

    let runtime = anki_runtime()?;
    let client = AnkiConnectClient::new(config.url.clone());

    let note_id = runtime.block_on(async {
        match selection {
            Some((meaning, example)) => {
                deepdict_anki::export_example(&client, &config, &entry, meaning, example).await
            }
            None => deepdict_anki::export_entry(&client, &config, &entry).await,
        }
    });

    match note_id {
        Ok(note_id) => console.say(format!(
            "Added '{}' to deck '{}' (note {note_id})",
            entry.headword, config.deck
        )),
        Err(e) => {
            tracing::error!("Failed to add card to Anki: {e:#}");
            console.say(format!("Error: {e:#}"));
        }
    }
    Ok(())
}

/// List what the Anki collection offers and check the profile against it
pub fn inspect(console: &mut Console) -> anyhow::Result<()> {
    let config = console.profile.config().anki.clone();
    let client = AnkiConnectClient::new(config.url.clone());
    let setup = anki_runtime()?.block_on(deepdict_anki::inspect_setup(&client, &config));

    let setup = match setup {
        Ok(setup) => setup,
        Err(e) => {
            tracing::warn!("AnkiConnect unavailable at {}: {e:#}", config.url);
            console.say(format!("Error: {e:#}"));
            return Ok(());
        }
    };

    console.say(format!("Decks: {}", setup.decks.join(", ")));
    console.say(format!("Note types: {}", setup.note_types.join(", ")));
    if !setup.fields.is_empty() {
        console.say(format!(
            "Fields of '{}': {}",
            config.note_type,
            setup.fields.join(", ")
        ));
    }
    let problems = setup.problems(&config);
    if problems.is_empty() {
        console.say(format!(
            "Exports go to '{}' as '{}'",
            config.deck, config.note_type
        ));
    }
    for problem in problems {
        console.say(format!("Warning: {problem}"));
    }
    if !config.enabled {
        console.say("Anki integration disabled; set anki.enabled in the profile");
    }
    Ok(())
}

/// AnkiConnect is local and answers quickly, so calls block the UI thread
fn anki_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start Anki runtime")
}

/// `2:1` -> second meaning, first example, as zero-based indices
fn parse_selection(raw: &str) -> anyhow::Result<(usize, usize)> {
    let Some((meaning, example)) = raw.split_once(':') else {
        bail!("Expected <meaning>:<example>, got '{raw}'");
    };
    let index = |part: &str| -> anyhow::Result<usize> {
        let n: usize = part
            .trim()
            .parse()
            .with_context(|| format!("'{part}' is not a number"))?;
        n.checked_sub(1)
            .with_context(|| format!("Numbering starts at 1, got '{part}'"))
    };
    Ok((index(meaning)?, index(example)?))
}
