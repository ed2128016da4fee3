//! Translation provider seam.
//!
//! A provider turns one text into another language. Network access, rate
//! limiting and retries live behind this trait, outside the transcoder.

use crate::error::Result;
use std::collections::HashMap;

/// An external capability that translates a single text.
pub trait TranslationProvider {
    /// Translate `text` into `target_lang`, optionally hinting the source language.
    fn translate(&self, text: &str, target_lang: &str, source_lang: Option<&str>) -> Result<String>;
}

impl<F> TranslationProvider for F
where
    F: Fn(&str, &str, Option<&str>) -> Result<String>,
{
    fn translate(&self, text: &str, target_lang: &str, source_lang: Option<&str>) -> Result<String> {
        self(text, target_lang, source_lang)
    }
}

/// A fixed in-memory dictionary keyed by language, then original text.
///
/// Useful for offline runs and tests. Unknown texts are a provider error.
#[derive(Debug, Clone, Default)]
pub struct DictionaryProvider {
    entries: HashMap<String, HashMap<String, String>>,
}

impl DictionaryProvider {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a translation for a language.
    pub fn with_entry(
        mut self,
        language: impl Into<String>,
        original: impl Into<String>,
        translated: impl Into<String>,
    ) -> Self {
        self.entries
            .entry(language.into())
            .or_default()
            .insert(original.into(), translated.into());
        self
    }
}

impl TranslationProvider for DictionaryProvider {
    fn translate(&self, text: &str, target_lang: &str, _source_lang: Option<&str>) -> Result<String> {
        self.entries
            .get(target_lang)
            .and_then(|entries| entries.get(text))
            .cloned()
            .ok_or_else(|| {
                crate::Error::Provider(format!("no {} entry for {:?}", target_lang, text))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_dictionary_provider() {
        let provider = DictionaryProvider::new().with_entry("fr", "Hello", "Bonjour");
        assert_eq!(provider.translate("Hello", "fr", None).unwrap(), "Bonjour");
        assert!(matches!(
            provider.translate("Hello", "de", None),
            Err(Error::Provider(_))
        ));
    }

    #[test]
    fn test_closure_provider() {
        let upper = |text: &str, _: &str, _: Option<&str>| -> Result<String> { Ok(text.to_uppercase()) };
        assert_eq!(upper.translate("hi", "xx", Some("en")).unwrap(), "HI");
    }
}
