//! Keyword Set
//!
//! Immutable, ordered set of ABAP reserved words. Loaded once at startup from
//! the embedded TOML asset and injected into the caser; never reloaded at
//! match time.

use serde::Deserialize;

/// On-disk shape of a keyword asset file
#[derive(Debug, Deserialize)]
pub struct KeywordFile {
    pub language: String,
    pub keywords: Vec<String>,
}

/// An ordered keyword set, sorted by descending length.
///
/// The longest-first ordering is a documented invariant: the caser joins
/// these words into a regex alternation, and alternation tries branches
/// left to right, so `ENDFORM` must appear before `END` or it would never
/// match at positions where both could.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    words: Vec<String>,
}

impl KeywordSet {
    /// Build a set from arbitrary words, normalizing to uppercase and
    /// sorting longest-first. Useful for tests with synthetic keyword lists.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_uppercase())
            .filter(|w| !w.is_empty())
            .collect();
        words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        words.dedup();
        Self { words }
    }

    /// Load the embedded ABAP keyword asset.
    pub fn load_embedded() -> Self {
        let embedded_toml = include_str!("../resources/keywords/abap.toml");

        match toml::from_str::<KeywordFile>(embedded_toml) {
            Ok(file) => {
                log::debug!("Loaded {} '{}' keywords", file.keywords.len(), file.language);
                Self::from_words(file.keywords)
            }
            Err(e) => {
                // Fallback to a minimal set if the asset fails to parse
                log::warn!("Failed to parse embedded keyword asset: {e}. Using minimal fallback.");
                Self::minimal_fallback()
            }
        }
    }

    fn minimal_fallback() -> Self {
        Self::from_words(["SELECT", "FROM", "WHERE", "DATA", "IF", "ENDIF"])
    }

    /// Words in matching-priority order (longest first).
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_words_sorts_longest_first() {
        let set = KeywordSet::from_words(["END", "ENDFORM", "IF"]);
        assert_eq!(set.words(), &["ENDFORM", "END", "IF"]);
    }

    #[test]
    fn test_from_words_normalizes_and_dedupes() {
        let set = KeywordSet::from_words(["select", "SELECT", " from ", ""]);
        assert_eq!(set.words(), &["SELECT", "FROM"]);
    }

    #[test]
    fn test_embedded_asset_loads() {
        let set = KeywordSet::load_embedded();
        assert!(set.len() > 100);
        assert!(set.words().iter().any(|w| w == "ENDFORM"));

        // Longest-first holds across the whole asset
        let endform = set.words().iter().position(|w| w == "ENDFORM").unwrap();
        let end = set.words().iter().position(|w| w == "END").unwrap();
        assert!(endform < end);
    }
}
