use unicode_normalization::UnicodeNormalization;

pub trait Preprocessor {
    /// Canonical form of a looked-up word: trimmed, NFC, single spaces
    fn process(&self, text: &str) -> String {
        let text = text.trim();

        if text.is_empty() {
            return String::new();
        }

        let text: String = text.nfc().collect();

        // Multi-word expressions keep their words, newlines and runs of
        // whitespace collapse to one space
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

pub struct DefaultPreprocessor;
impl Preprocessor for DefaultPreprocessor {}
