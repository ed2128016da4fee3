//! Bulk translation sets: slide id → language → original text → translation.

use crate::provider::TranslationProvider;
use crate::types::Slide;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Translations for one slide in one language, keyed by original text.
pub type TextMap = BTreeMap<String, String>;

/// Externally supplied translations for a whole package.
///
/// Serializes as `{ "slide1": { "fr": { "Hello": "Bonjour" } } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationSet {
    slides: BTreeMap<String, BTreeMap<String, TextMap>>,
}

impl TranslationSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one translation.
    pub fn insert(
        &mut self,
        slide_id: impl Into<String>,
        language: impl Into<String>,
        original: impl Into<String>,
        translated: impl Into<String>,
    ) {
        self.slides
            .entry(slide_id.into())
            .or_default()
            .entry(language.into())
            .or_default()
            .insert(original.into(), translated.into());
    }

    /// Builder-style [`TranslationSet::insert`].
    pub fn with(
        mut self,
        slide_id: impl Into<String>,
        language: impl Into<String>,
        original: impl Into<String>,
        translated: impl Into<String>,
    ) -> Self {
        self.insert(slide_id, language, original, translated);
        self
    }

    /// Translations for a slide in a language, if any were supplied.
    pub fn entries(&self, slide_id: &str, language: &str) -> Option<&TextMap> {
        self.slides
            .get(slide_id)
            .and_then(|languages| languages.get(language))
            .filter(|entries| !entries.is_empty())
    }

    /// All languages that appear anywhere in the set.
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self
            .slides
            .values()
            .flat_map(|l| l.keys().cloned())
            .collect();
        languages.sort();
        languages.dedup();
        languages
    }

    /// Whether the set holds no translations.
    pub fn is_empty(&self) -> bool {
        self.slides
            .values()
            .all(|languages| languages.values().all(|entries| entries.is_empty()))
    }

    /// Build an identity set mapping every extracted text to itself.
    ///
    /// Intended as an authoring template for human translators.
    pub fn template(slides: &[Slide], languages: &[String]) -> Self {
        let mut set = Self::new();
        for slide in slides {
            for element in &slide.text_elements {
                for language in languages {
                    set.insert(
                        slide.id.as_str(),
                        language.as_str(),
                        element.original_text.as_str(),
                        element.original_text.as_str(),
                    );
                }
            }
        }
        set
    }

    /// Build a set by asking a provider for every unique text per slide.
    ///
    /// The provider is asked once per distinct (slide, language, text), whether
    /// or not the call succeeds.
    ///
    /// Provider failures are logged and leave the text out of the set, so the
    /// affected elements end up unresolved rather than failing the run.
    pub fn populate<P: TranslationProvider + ?Sized>(
        slides: &[Slide],
        provider: &P,
        languages: &[String],
        source_lang: Option<&str>,
    ) -> Self {
        let mut set = Self::new();
        for slide in slides {
            for language in languages {
                let mut attempted: HashSet<&str> = HashSet::new();
                for element in &slide.text_elements {
                    let original = element.original_text.as_str();
                    if !attempted.insert(original) {
                        continue;
                    }

                    match provider.translate(original, language, source_lang) {
                        Ok(translated) => {
                            set.insert(slide.id.as_str(), language.as_str(), original, translated)
                        }
                        Err(e) => {
                            log::warn!(
                                "{}: provider could not translate {:?} to {}: {}",
                                slide.id,
                                original,
                                language,
                                e
                            );
                        }
                    }
                }
            }
        }
        set
    }
}
