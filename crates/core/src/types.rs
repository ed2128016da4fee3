//! Domain types for representing slides, their text and translation results.

use serde::{Deserialize, Serialize};

/// A single slide part of a presentation package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    /// 0-based position in physical slide order.
    pub index: usize,

    /// Identifier derived from the part name, e.g. `slide3`.
    pub id: String,

    /// Path of the slide part inside the package.
    pub part_name: String,

    /// XML as loaded from the package.
    #[serde(skip)]
    pub original_xml: String,

    /// XML after translated text was substituted, if any substitution happened.
    #[serde(skip)]
    pub modified_xml: Option<String>,

    /// Text elements in document order.
    pub text_elements: Vec<TextElement>,
}

impl Slide {
    /// Create a new slide with no extracted text.
    pub fn new(
        index: usize,
        id: impl Into<String>,
        part_name: impl Into<String>,
        original_xml: impl Into<String>,
    ) -> Self {
        Self {
            index,
            id: id.into(),
            part_name: part_name.into(),
            original_xml: original_xml.into(),
            modified_xml: None,
            text_elements: Vec::new(),
        }
    }

    /// The XML that should be written for this slide.
    pub fn output_xml(&self) -> &str {
        self.modified_xml.as_deref().unwrap_or(&self.original_xml)
    }

    /// Number of elements marked as translated.
    pub fn translated_count(&self) -> usize {
        self.text_elements.iter().filter(|e| e.is_translated).count()
    }

    /// Drop all translation state, returning the slide to its extracted form.
    pub fn reset_translations(&mut self) {
        self.modified_xml = None;
        for element in &mut self.text_elements {
            element.translated_text = None;
            element.is_translated = false;
        }
    }
}

/// The role a piece of text plays on its slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementType {
    /// Slide or section title.
    Title,
    /// Body text forming a whole paragraph.
    Paragraph,
    /// One of several runs sharing a paragraph.
    TextRun,
    /// Text attached directly to a shape outside any paragraph.
    Shape,
}

/// Best-effort run formatting captured alongside a text element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleInfo {
    pub font_family: Option<String>,
    /// Size in points.
    pub font_size: Option<f32>,
    /// Hex RGB color such as `FF0000`.
    pub color: Option<String>,
    pub bold: bool,
    pub italic: bool,
}

impl StyleInfo {
    /// Whether no style attribute was found at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A displayable text fragment found in a slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextElement {
    /// Unique within the slide; derived from slide id and discovery order.
    pub id: String,

    /// Whitespace-trimmed, never empty.
    pub original_text: String,

    pub element_type: ElementType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_info: Option<StyleInfo>,

    /// Local name of the text-leaf tag the text was read from (`t` for DrawingML).
    pub source_tag: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,

    #[serde(default)]
    pub is_translated: bool,
}

impl TextElement {
    /// Create an untranslated text element.
    pub fn new(
        id: impl Into<String>,
        original_text: impl Into<String>,
        element_type: ElementType,
        source_tag: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            original_text: original_text.into(),
            element_type,
            style_info: None,
            source_tag: source_tag.into(),
            translated_text: None,
            is_translated: false,
        }
    }

    /// Attach style information, ignoring it when nothing was captured.
    pub fn with_style(mut self, style: StyleInfo) -> Self {
        self.style_info = (!style.is_empty()).then_some(style);
        self
    }
}

/// Summary numbers for one translation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationStats {
    pub slide_count: usize,
    pub text_element_count: usize,
    pub translated_count: usize,
    /// Fraction of text elements translated, from 0.0 to 1.0.
    pub translation_rate: f64,
}

impl TranslationStats {
    /// Compute statistics over a set of slides.
    pub fn from_slides(slides: &[Slide]) -> Self {
        let text_element_count: usize = slides.iter().map(|s| s.text_elements.len()).sum();
        let translated_count: usize = slides.iter().map(Slide::translated_count).sum();
        let translation_rate = if text_element_count == 0 {
            0.0
        } else {
            translated_count as f64 / text_element_count as f64
        };

        Self {
            slide_count: slides.len(),
            text_element_count,
            translated_count,
            translation_rate,
        }
    }
}

/// Non-fatal problems encountered during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A slide's XML could not be parsed; it was left untouched.
    ExtractionFailed { slide_id: String, message: String },

    /// No translation could be resolved for an element.
    Untranslated { slide_id: String, element_id: String },

    /// A translation was resolved but no rewrite location was found.
    UnresolvedSubstitution {
        slide_id: String,
        element_id: String,
        original_text: String,
    },

    /// Nothing at all was translated; the output mirrors the input.
    NothingTranslated,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::ExtractionFailed { slide_id, message } => {
                write!(f, "{}: skipped, {}", slide_id, message)
            }
            Warning::Untranslated {
                slide_id,
                element_id,
            } => write!(f, "{}: no translation for {}", slide_id, element_id),
            Warning::UnresolvedSubstitution {
                slide_id,
                element_id,
                original_text,
            } => write!(
                f,
                "{}: could not place translation for {} ({:?})",
                slide_id, element_id, original_text
            ),
            Warning::NothingTranslated => write!(f, "no text was translated"),
        }
    }
}

/// A translated package ready to hand to the caller.
#[derive(Debug, Clone)]
pub struct GeneratedPackage {
    /// Target language code of this run.
    pub language: String,
    /// Serialized package archive.
    pub bytes: Vec<u8>,
    pub stats: TranslationStats,
    pub warnings: Vec<Warning>,
}
