use deepdict_config::RegenerateStrategy;
use deepdict_core::preprocess::{DefaultPreprocessor, Preprocessor};
use deepdict_store::EntryQuery;
use deepdict_types::EntryKey;
use uuid::Uuid;

use crate::state::{Console, Task};

/// Queue regeneration of a stored entry. Under the delete-first strategy a
/// failed regeneration loses the entry, so it only runs once confirmed.
pub fn request(console: &mut Console, headword: &str, confirmed: bool) {
    let headword = DefaultPreprocessor.process(headword);
    let key = EntryKey::new(headword, &console.languages());

    match console.store.get_entry(&EntryQuery::from(&key)) {
        Ok(Some(_)) => {}
        Ok(None) => {
            console.say(format!("No stored entry for {key}"));
            return;
        }
        Err(e) => {
            console.say(format!("Error: {e}"));
            return;
        }
    }

    let strategy = console.profile.config().queue.regenerate_strategy;
    if !confirmed && strategy == RegenerateStrategy::DeleteFirst {
        console.say(format!(
            "Regenerating deletes '{}' before the new entry exists; if generation fails it is gone. Repeat with --yes to continue.",
            key.headword
        ));
        return;
    }

    console.say(format!("Regenerating '{}'...", key.headword));
    console.push_task(Task::Regenerate { key });
}

/// Nudges the model away from its previous answer
pub fn variation_seed() -> u32 {
    (Uuid::new_v4().as_u128() % 9000) as u32 + 1000
}
