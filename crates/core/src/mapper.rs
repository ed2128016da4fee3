//! Translation mapping: find the translation for an extracted element.
//!
//! Strategies are tried in order and the first hit wins:
//!
//! 1. exact match on the original text
//! 2. case-insensitive match (NFC, lowercase, collapsed whitespace)
//! 3. substring match in either direction, preferring the longest key
//! 4. the slide's only entry, when it has exactly one
//!
//! The last strategy is a lossy heuristic: a slide/language with a single
//! translation applies it to every element the other strategies missed.
//! It can be disabled with [`TranslationMapper::with_sole_entry_fallback`].

use crate::text::comparison_key;
use crate::translation_set::TranslationSet;
use crate::types::{Slide, TextElement, Warning};
use serde::{Deserialize, Serialize};

/// Which strategy produced a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Exact,
    CaseInsensitive,
    Substring,
    SoleEntry,
}

/// A resolved translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub text: &'a str,
    pub strategy: MatchStrategy,
}

/// Resolves translations for text elements from a [`TranslationSet`].
#[derive(Debug, Clone)]
pub struct TranslationMapper {
    sole_entry_fallback: bool,
}

impl Default for TranslationMapper {
    fn default() -> Self {
        Self {
            sole_entry_fallback: true,
        }
    }
}

impl TranslationMapper {
    /// Create a mapper with every strategy enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the single-entry last-resort fallback.
    pub fn with_sole_entry_fallback(mut self, enabled: bool) -> Self {
        self.sole_entry_fallback = enabled;
        self
    }

    /// Resolve a translation for one element, or `None` if unresolved.
    pub fn resolve<'a>(
        &self,
        element: &TextElement,
        set: &'a TranslationSet,
        slide_id: &str,
        language: &str,
    ) -> Option<Resolution<'a>> {
        let entries = set.entries(slide_id, language)?;
        let original = element.original_text.as_str();

        if let Some(text) = entries.get(original) {
            return Some(Resolution {
                text,
                strategy: MatchStrategy::Exact,
            });
        }

        let key = comparison_key(original);
        if let Some((_, text)) = entries.iter().find(|(k, _)| comparison_key(k) == key) {
            return Some(Resolution {
                text,
                strategy: MatchStrategy::CaseInsensitive,
            });
        }

        // Strict `>` keeps the first of equally long keys in map order.
        let mut best: Option<(&String, &String)> = None;
        for (k, v) in entries {
            if k.trim().is_empty() {
                continue;
            }
            let overlaps = original.contains(k.as_str()) || k.contains(original);
            if overlaps && best.map_or(true, |(b, _)| k.len() > b.len()) {
                best = Some((k, v));
            }
        }
        if let Some((_, text)) = best {
            return Some(Resolution {
                text,
                strategy: MatchStrategy::Substring,
            });
        }

        if self.sole_entry_fallback && entries.len() == 1 {
            let (only_key, text) = entries.iter().next()?;
            log::warn!(
                "{}/{}: applying sole translation for {:?} to unmatched text {:?}",
                slide_id,
                language,
                only_key,
                original
            );
            return Some(Resolution {
                text,
                strategy: MatchStrategy::SoleEntry,
            });
        }

        None
    }

    /// Resolve every element of a slide, recording the results on the elements.
    ///
    /// Returns one [`Warning::Untranslated`] per unresolved element.
    pub fn apply(&self, slide: &mut Slide, set: &TranslationSet, language: &str) -> Vec<Warning> {
        let mut warnings = Vec::new();
        let slide_id = slide.id.clone();

        for element in &mut slide.text_elements {
            match self.resolve(element, set, &slide_id, language) {
                Some(resolution) => {
                    log::debug!(
                        "{}: {} resolved by {:?}",
                        slide_id,
                        element.id,
                        resolution.strategy
                    );
                    element.translated_text = Some(resolution.text.to_string());
                    element.is_translated = true;
                }
                None => {
                    element.translated_text = None;
                    element.is_translated = false;
                    warnings.push(Warning::Untranslated {
                        slide_id: slide_id.clone(),
                        element_id: element.id.clone(),
                    });
                }
            }
        }

        warnings
    }
}
