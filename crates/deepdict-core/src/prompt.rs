use std::fs;
use std::path::Path;

use deepdict_types::LanguageSettings;

/// Prompt templates. Placeholders are written `[NAME]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Lemma,
    LemmaWithContext,
    Entry,
    EntryWithContext,
    LanguageValidation,
}

impl PromptKind {
    const ALL: [PromptKind; 5] = [
        PromptKind::Lemma,
        PromptKind::LemmaWithContext,
        PromptKind::Entry,
        PromptKind::EntryWithContext,
        PromptKind::LanguageValidation,
    ];

    /// Override file name inside the prompts directory
    pub fn file_name(self) -> &'static str {
        match self {
            PromptKind::Lemma => "lemma_prompt.txt",
            PromptKind::LemmaWithContext => "lemma_context_prompt.txt",
            PromptKind::Entry => "prompt.txt",
            PromptKind::EntryWithContext => "prompt_with_context.txt",
            PromptKind::LanguageValidation => "language_validation_prompt.txt",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn builtin(self) -> String {
        match self {
            PromptKind::Lemma => LEMMA.to_string(),
            PromptKind::LemmaWithContext => LEMMA_WITH_CONTEXT.to_string(),
            PromptKind::Entry => format!("{ENTRY}{ENTRY_SHAPE}"),
            PromptKind::EntryWithContext => format!("{ENTRY_WITH_CONTEXT}{ENTRY_SHAPE}"),
            PromptKind::LanguageValidation => LANGUAGE_VALIDATION.to_string(),
        }
    }
}

const LEMMA: &str = "Give the dictionary form (lemma) of the [TARGET_LANGUAGE] word or \
expression \"[TARGET_WORD]\". Keep multi-word expressions together. Reply with the \
lemma only, without quotes, explanation or punctuation.";

const LEMMA_WITH_CONTEXT: &str = "The [TARGET_LANGUAGE] word or expression \
\"[TARGET_WORD]\" appears in this sentence:\n\n[SENTENCE_CONTEXT]\n\nGive the dictionary \
form (lemma) that fits this usage. Keep multi-word expressions together. Reply with the \
lemma only, without quotes, explanation or punctuation.";

const ENTRY_SHAPE: &str = r#"Respond with a single JSON object and nothing else:
{
  "headword": "...",
  "part_of_speech": "...",
  "meanings": [
    {
      "definition": "...",
      "noun_type": "... (nouns only, optional)",
      "verb_type": "... (verbs only, optional)",
      "comparison": "... (adjectives and adverbs only, optional)",
      "examples": [{"sentence": "...", "translation": "..."}]
    }
  ],
  "metadata": {
    "source_language": "[SOURCE_LANGUAGE]",
    "target_language": "[TARGET_LANGUAGE]",
    "definition_language": "[DEFINITION_LANGUAGE]"
  }
}"#;

const ENTRY: &str = "You write entries for a learner's [TARGET_LANGUAGE] dictionary. \
The learner speaks [SOURCE_LANGUAGE]. For the word the user sends, write definitions in \
[DEFINITION_LANGUAGE], give the grammatical details, and add example sentences in \
[TARGET_LANGUAGE] with [SOURCE_LANGUAGE] translations.\n\n";

const ENTRY_WITH_CONTEXT: &str = "You write entries for a learner's [TARGET_LANGUAGE] \
dictionary. The learner speaks [SOURCE_LANGUAGE] and met \"[TARGET_WORD]\" in this \
sentence:\n\n[SENTENCE_CONTEXT]\n\nWrite definitions in [DEFINITION_LANGUAGE], list the \
meaning used in that sentence first, give the grammatical details, and add example \
sentences in [TARGET_LANGUAGE] with [SOURCE_LANGUAGE] translations. Include the \
sentence above as an example of the first meaning and mark it with \"is_context\": true.\n\n";

const LANGUAGE_VALIDATION: &str = r#"Identify the language the user means by "[INPUT_LANGUAGE]".
Respond with a single JSON object and nothing else:
{"standardized_name": "<English name of the language>", "display_name": "<name to show the user>"}"#;

/// The prompt set in use, with any file overrides already read
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    templates: [String; 5],
}

impl PromptTemplates {
    pub fn builtin() -> Self {
        Self {
            templates: PromptKind::ALL.map(PromptKind::builtin),
        }
    }

    /// Built-in prompts, replaced by any `<name>.txt` present in `dir`
    pub fn load(dir: Option<&Path>) -> Self {
        let mut prompts = Self::builtin();
        let Some(dir) = dir else {
            return prompts;
        };

        for kind in PromptKind::ALL {
            let path = dir.join(kind.file_name());
            match fs::read_to_string(&path) {
                Ok(text) => {
                    tracing::info!("Using prompt override {}", path.display());
                    prompts.templates[kind.index()] = text;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Could not read prompt {}: {}", path.display(), e);
                }
            }
        }

        prompts
    }

    pub fn template(&self, kind: PromptKind) -> &str {
        &self.templates[kind.index()]
    }

    pub fn render(&self, kind: PromptKind, vars: &PromptVars<'_>) -> String {
        vars.apply(self.template(kind))
    }
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Values substituted into a template
#[derive(Debug, Default)]
pub struct PromptVars<'a> {
    vars: Vec<(&'static str, &'a str)>,
}

impl<'a> PromptVars<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn languages(mut self, languages: &'a LanguageSettings) -> Self {
        self.vars.push(("TARGET_LANGUAGE", &languages.target_language));
        self.vars.push(("SOURCE_LANGUAGE", &languages.source_language));
        self.vars
            .push(("DEFINITION_LANGUAGE", &languages.definition_language));
        self
    }

    pub fn set(mut self, name: &'static str, value: &'a str) -> Self {
        self.vars.push((name, value));
        self
    }

    fn apply(&self, template: &str) -> String {
        let mut text = template.to_string();
        for (name, value) in &self.vars {
            text = text.replace(&format!("[{name}]"), value);
        }

        if let Some(missing) = unresolved_placeholder(&text) {
            tracing::warn!("Prompt placeholder [{}] has no value", missing);
        }

        text
    }
}

fn unresolved_placeholder(text: &str) -> Option<&str> {
    let mut rest = text;
    while let Some(start) = rest.find('[') {
        let after = &rest[start + 1..];
        let Some(end) = after.find(']') else {
            return None;
        };
        let name = &after[..end];
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            return Some(name);
        }
        rest = &after[end + 1..];
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_languages_and_word() {
        let prompts = PromptTemplates::builtin();
        let languages = LanguageSettings::new("Czech", "English");
        let vars = PromptVars::new()
            .languages(&languages)
            .set("TARGET_WORD", "běžel");

        let text = prompts.render(PromptKind::Lemma, &vars);
        assert!(text.contains("Czech word or expression \"běžel\""));
        assert_eq!(unresolved_placeholder(&text), None);

        let text = prompts.render(PromptKind::Entry, &vars);
        assert!(text.contains("\"definition_language\": \"English\""));
        assert_eq!(unresolved_placeholder(&text), None);
    }

    #[test]
    fn test_unresolved_placeholder() {
        assert_eq!(unresolved_placeholder("a [TARGET_WORD] b"), Some("TARGET_WORD"));
        assert_eq!(unresolved_placeholder("[{\"json\": 1}] [x]"), None);
    }

    #[test]
    fn test_directory_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lemma_prompt.txt"), "Lemma of [TARGET_WORD]?").unwrap();

        let prompts = PromptTemplates::load(Some(dir.path()));
        let vars = PromptVars::new().set("TARGET_WORD", "psa");
        assert_eq!(prompts.render(PromptKind::Lemma, &vars), "Lemma of psa?");
        assert_eq!(
            prompts.template(PromptKind::Entry),
            PromptTemplates::builtin().template(PromptKind::Entry)
        );
    }
}
