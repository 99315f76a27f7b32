pub mod entry;
pub mod language;

pub use entry::{DictionaryEntry, EntryKey, EntryMetadata, Example, GrammarAttributes, Meaning};
pub use language::{LanguageSettings, SentenceContext, ValidatedLanguage};
