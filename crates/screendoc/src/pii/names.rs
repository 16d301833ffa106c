use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NameRecognitionError {
    #[error("Name recogniser is not loaded")]
    Unavailable,

    #[error("Name recognition failed: {0}")]
    Failed(String),
}

/// Finds person names in free text.
///
/// Name detection is best effort: callers treat an error as "no names" and
/// keep the other categories.
pub trait NameRecognizer: Send + Sync {
    /// Returns the byte spans of every person name found in `text`.
    fn recognize(&self, text: &str) -> Result<Vec<(usize, usize)>, NameRecognitionError>;

    fn name(&self) -> &str;
}

/// Recognises "Given Family" pairs whose first word appears in a lexicon of
/// given names.
pub struct LexiconNameRecognizer {
    given_names: HashSet<String>,
}

impl LexiconNameRecognizer {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let given_names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty() && !n.starts_with('#'))
            .collect();

        Self { given_names }
    }

    /// Loads a lexicon file with one given name per line. Blank lines and
    /// `#` comments are skipped.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_names(content.lines()))
    }

    pub fn len(&self) -> usize {
        self.given_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.given_names.is_empty()
    }

    fn is_capitalised(word: &str) -> bool {
        let mut chars = word.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
            && chars.any(|c| c.is_ascii_lowercase())
    }
}

impl NameRecognizer for LexiconNameRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<(usize, usize)>, NameRecognitionError> {
        let words = words(text);
        let mut spans = Vec::new();

        let mut i = 0;
        while i + 1 < words.len() {
            let ((gs, ge), (fs, fe)) = (words[i], words[i + 1]);
            let gap = &text[ge..fs];
            let is_pair = !gap.is_empty() && gap.chars().all(|c| c == ' ' || c == '\t');
            let given = &text[gs..ge];

            if is_pair
                && Self::is_capitalised(given)
                && Self::is_capitalised(&text[fs..fe])
                && self.given_names.contains(&given.to_lowercase())
            {
                spans.push((gs, fe));
                i += 2;
            } else {
                i += 1;
            }
        }

        Ok(spans)
    }

    fn name(&self) -> &str {
        "lexicon"
    }
}

/// Byte spans of ASCII words; apostrophes and hyphens continue a word.
fn words(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        match start {
            None if c.is_ascii_alphabetic() => start = Some(i),
            Some(_) if c.is_ascii_alphabetic() || c == '\'' || c == '-' => {}
            Some(s) => {
                spans.push((s, i));
                start = c.is_ascii_alphabetic().then_some(i);
            }
            None => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }

    spans
}

/// Loads the configured recogniser. A missing path or unreadable file leaves
/// name detection unavailable.
pub fn load_recognizer(lexicon: Option<&str>) -> Option<Arc<dyn NameRecognizer>> {
    let Some(path) = lexicon else {
        info!("No name lexicon configured; person_name detection unavailable");
        return None;
    };

    match LexiconNameRecognizer::load(Path::new(path)) {
        Ok(recognizer) if recognizer.is_empty() => {
            warn!("Name lexicon '{}' is empty; person_name detection unavailable", path);
            None
        }
        Ok(recognizer) => {
            info!("Loaded name lexicon with {} given names", recognizer.len());
            Some(Arc::new(recognizer))
        }
        Err(e) => {
            warn!("Failed to load name lexicon '{}': {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn recognizer() -> LexiconNameRecognizer {
        LexiconNameRecognizer::from_names(["alice", "Bob", "# comment", ""])
    }

    fn found<'a>(r: &LexiconNameRecognizer, text: &'a str) -> Vec<&'a str> {
        r.recognize(text)
            .unwrap()
            .into_iter()
            .map(|(s, e)| &text[s..e])
            .collect()
    }

    #[test]
    fn test_lexicon_ignores_comments_and_blanks() {
        assert_eq!(recognizer().len(), 2);
    }

    #[test]
    fn test_recognizes_given_family_pair() {
        let r = recognizer();
        assert_eq!(found(&r, "Signed in as Alice Johnson today"), vec!["Alice Johnson"]);
        assert_eq!(found(&r, "Hello Bob O'Neil"), vec!["Bob O'Neil"]);
    }

    #[test]
    fn test_requires_capitalised_family_name() {
        let r = recognizer();
        assert!(found(&r, "Alice went home").is_empty());
        assert!(found(&r, "alice Johnson").is_empty());
    }

    #[test]
    fn test_unknown_given_name_ignored() {
        assert!(found(&recognizer(), "Welcome Carol Smith").is_empty());
    }

    #[test]
    fn test_pair_does_not_span_lines_or_punctuation() {
        let r = recognizer();
        assert!(found(&r, "Alice\nJohnson").is_empty());
        assert!(found(&r, "Alice, Johnson").is_empty());
    }

    #[test]
    fn test_multiple_names() {
        let r = recognizer();
        assert_eq!(
            found(&r, "Alice Johnson and Bob Marley"),
            vec!["Alice Johnson", "Bob Marley"]
        );
    }

    #[test]
    fn test_load_recognizer_missing_file() {
        assert!(load_recognizer(Some("/nonexistent/names.txt")).is_none());
        assert!(load_recognizer(None).is_none());
    }

    #[test]
    fn test_load_recognizer_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "alice\nbob").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let recognizer = load_recognizer(Some(&path)).unwrap();
        assert_eq!(recognizer.name(), "lexicon");
    }
}
