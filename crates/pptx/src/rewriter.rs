//! Slide XML rewriting: put translated text in place of the original.
//!
//! All substitutions for a slide work from its original XML. Translated
//! text is never searched again, so a translation that happens to equal
//! another element's original stays as written. For each distinct original
//! text, strategies are tried in order until one places it:
//!
//! 1. [`RewriteStrategy::TextLeaf`]: stream the slide through a namespace-aware
//!    reader/writer and replace the content of every text leaf whose trimmed
//!    text equals the original. All other events are written back untouched.
//! 2. [`RewriteStrategy::TagContent`]: replace the escaped original when it is
//!    the whole content between any closing `>` and the next `</`.
//! 3. [`RewriteStrategy::Substring`]: replace the escaped original anywhere in
//!    character data outside of markup.
//!
//! Every strategy replaces all occurrences it finds. Results of the
//! pattern-based strategies are only accepted if the document stays
//! well-formed.

use crate::xml::{check_well_formed, is_drawingml};
use deck_core::text::{escape_xml, escaped_forms, split_padding};
use deck_core::{Slide, TextElement, Warning};
use quick_xml::events::Event;
use quick_xml::reader::NsReader;
use quick_xml::Writer;
use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;

/// Which rewrite strategy placed a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStrategy {
    TextLeaf,
    TagContent,
    Substring,
}

/// Substitutes translated text into slide XML.
pub struct XmlRewriter;

impl XmlRewriter {
    /// Create a new rewriter.
    pub fn new() -> Self {
        Self
    }

    /// Rewrite a slide from its original XML and its translated elements.
    ///
    /// Sets `modified_xml` when at least one substitution happened. Elements
    /// whose translation could not be placed are unmarked and reported.
    pub fn rewrite(&self, slide: &mut Slide) -> Vec<Warning> {
        let mut targets: Vec<Target> = Vec::new();
        for element in &slide.text_elements {
            if !element.is_translated {
                continue;
            }
            let Some(translated) = element.translated_text.as_deref() else {
                continue;
            };
            if translated == element.original_text || targets.iter().any(|t| t.original == element.original_text) {
                continue;
            }
            targets.push(Target::new(element, translated));
        }

        let mut draft = Draft::new(&slide.original_xml);
        let by_leaf = draft.place_leaves(&targets);
        let mut unresolved: HashSet<&str> = HashSet::new();

        for target in &targets {
            if by_leaf.contains(&target.original) {
                log::debug!("{}: {:?} placed by {:?}", slide.id, target.original, RewriteStrategy::TextLeaf);
                continue;
            }
            match draft.place_fallback(target) {
                Some(strategy) => {
                    log::debug!("{}: {:?} placed by {:?}", slide.id, target.original, strategy);
                }
                None => {
                    unresolved.insert(target.original.as_str());
                }
            }
        }

        let mut warnings = Vec::new();
        for element in slide.text_elements.iter_mut() {
            if !element.is_translated || !unresolved.contains(element.original_text.as_str()) {
                continue;
            }
            log::warn!(
                "{}: no location found for translation of {} ({:?})",
                slide.id,
                element.id,
                element.original_text
            );
            element.is_translated = false;
            warnings.push(Warning::UnresolvedSubstitution {
                slide_id: slide.id.clone(),
                element_id: element.id.clone(),
                original_text: element.original_text.clone(),
            });
        }

        slide.modified_xml = draft.is_changed().then(|| draft.to_xml());
        warnings
    }

    /// Place a single translation; return the new document and the strategy used.
    pub fn substitute(
        &self,
        xml: &str,
        element: &TextElement,
        translated: &str,
    ) -> Option<(String, RewriteStrategy)> {
        let target = Target::new(element, translated);
        let mut draft = Draft::new(xml);

        if !draft.place_leaves(std::slice::from_ref(&target)).is_empty() {
            return Some((draft.to_xml(), RewriteStrategy::TextLeaf));
        }
        draft.place_fallback(&target).map(|strategy| (draft.to_xml(), strategy))
    }
}

impl Default for XmlRewriter {
    fn default() -> Self {
        Self::new()
    }
}

/// One distinct original text and what replaces it.
struct Target {
    original: String,
    translated: String,
    leaf_tag: String,
}

impl Target {
    fn new(element: &TextElement, translated: &str) -> Self {
        Self {
            original: element.original_text.clone(),
            translated: translated.to_string(),
            leaf_tag: element.source_tag.clone(),
        }
    }
}

/// A piece of the output document.
#[derive(Debug, Clone)]
enum Segment {
    /// Source markup and text, still open to matching.
    Raw(String),
    /// Escaped translated text, never matched again.
    Placed(String),
}

/// The slide document being rewritten, split into raw and placed segments.
///
/// Every raw segment starts outside of markup.
struct Draft {
    segments: Vec<Segment>,
}

impl Draft {
    fn new(xml: &str) -> Self {
        Self {
            segments: vec![Segment::Raw(xml.to_string())],
        }
    }

    fn is_changed(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Placed(_)))
    }

    fn to_xml(&self) -> String {
        join(&self.segments)
    }

    /// Replace matching text leaves for all targets in one pass.
    ///
    /// Must run before any fallback. Returns the originals that were placed.
    fn place_leaves(&mut self, targets: &[Target]) -> HashSet<String> {
        let xml = match self.segments.as_slice() {
            [Segment::Raw(xml)] => xml,
            _ => return HashSet::new(),
        };
        match split_leaves(xml, targets) {
            Some((segments, placed)) if !placed.is_empty() => {
                self.segments = segments;
                placed
            }
            _ => HashSet::new(),
        }
    }

    /// Try the pattern-based strategies for one target.
    fn place_fallback(&mut self, target: &Target) -> Option<RewriteStrategy> {
        let escaped_translated = escape_xml(&target.translated).into_owned();
        let forms = escaped_forms(&target.original);

        for form in &forms {
            if self.place_matches(|raw| tag_content_matches(raw, form), &escaped_translated) {
                return Some(RewriteStrategy::TagContent);
            }
        }
        for form in &forms {
            if self.place_matches(|raw| character_data_matches(raw, form), &escaped_translated) {
                return Some(RewriteStrategy::Substring);
            }
        }
        None
    }

    /// Replace every match found in raw segments, keeping the result only if
    /// something matched and the document is still well-formed.
    fn place_matches<F>(&mut self, find: F, replacement: &str) -> bool
    where
        F: Fn(&str) -> Vec<Range<usize>>,
    {
        let mut next = Vec::with_capacity(self.segments.len() + 2);
        let mut hits = 0usize;

        for segment in &self.segments {
            let raw = match segment {
                Segment::Raw(raw) => raw,
                placed => {
                    next.push(placed.clone());
                    continue;
                }
            };
            let mut last = 0;
            for range in find(raw) {
                push_raw(&mut next, &raw[last..range.start]);
                next.push(Segment::Placed(replacement.to_string()));
                last = range.end;
                hits += 1;
            }
            push_raw(&mut next, &raw[last..]);
        }

        if hits == 0 {
            return false;
        }
        if let Err(e) = check_well_formed(&join(&next)) {
            log::debug!("rejected rewrite producing malformed XML: {}", e);
            return false;
        }
        self.segments = next;
        true
    }
}

fn push_raw(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Raw(text.to_string()));
    }
}

fn join(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| match s {
            Segment::Raw(text) | Segment::Placed(text) => text.as_str(),
        })
        .collect()
}

/// Stream the document and cut it around every DrawingML text leaf whose
/// trimmed text is one of the targets' originals.
///
/// Leading and trailing whitespace of the leaf is kept around the new text.
fn split_leaves(xml: &str, targets: &[Target]) -> Option<(Vec<Segment>, HashSet<String>)> {
    let mut reader = NsReader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut segments = Vec::new();
    let mut placed = HashSet::new();
    let mut leaf: Option<Vec<Event<'_>>> = None;

    loop {
        let (drawingml, event) = match reader.read_resolved_event() {
            Ok((ns, event)) => (is_drawingml(&ns), event),
            Err(e) => {
                log::debug!("leaf rewrite stopped at {}: {}", reader.buffer_position(), e);
                return None;
            }
        };

        if let Some(mut inner) = leaf.take() {
            match event {
                Event::Text(_) | Event::CData(_) => {
                    inner.push(event);
                    leaf = Some(inner);
                }
                Event::End(_) => {
                    let text = leaf_text(&inner);
                    let target = text
                        .as_deref()
                        .and_then(|text| targets.iter().find(|t| t.original == text.trim()));
                    match (text.as_deref(), target) {
                        (Some(text), Some(target)) => {
                            flush(&mut writer, &mut segments)?;
                            let (lead, _, trail) = split_padding(text);
                            segments.push(Segment::Placed(format!(
                                "{}{}{}",
                                lead,
                                escape_xml(&target.translated),
                                trail
                            )));
                            placed.insert(target.original.clone());
                        }
                        _ => {
                            for inner_event in inner {
                                writer.write_event(inner_event).ok()?;
                            }
                        }
                    }
                    writer.write_event(event).ok()?;
                }
                other => {
                    // Nested markup inside a text leaf: leave it alone.
                    for inner_event in inner {
                        writer.write_event(inner_event).ok()?;
                    }
                    writer.write_event(other).ok()?;
                }
            }
            continue;
        }

        match event {
            Event::Eof => break,
            Event::Start(ref e)
                if drawingml && targets.iter().any(|t| t.leaf_tag.as_bytes() == e.local_name().as_ref()) =>
            {
                writer.write_event(event.clone()).ok()?;
                leaf = Some(Vec::new());
            }
            other => writer.write_event(other).ok()?,
        }
    }

    flush(&mut writer, &mut segments)?;
    Some((segments, placed))
}

/// Move everything written so far into a raw segment.
fn flush(writer: &mut Writer<Vec<u8>>, segments: &mut Vec<Segment>) -> Option<()> {
    let bytes = std::mem::take(writer.get_mut());
    push_raw(segments, &String::from_utf8(bytes).ok()?);
    Some(())
}

/// Unescaped text content of buffered leaf events.
fn leaf_text(events: &[Event<'_>]) -> Option<String> {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) => text.push_str(&t.unescape().ok()?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(c)),
            _ => {}
        }
    }
    Some(text)
}

/// Spans of escaped text that forms the whole content between two tags.
fn tag_content_matches(raw: &str, escaped_original: &str) -> Vec<Range<usize>> {
    let pattern = format!(r">\s*({})\s*</", regex::escape(escaped_original));
    let Ok(regex) = Regex::new(&pattern) else {
        return Vec::new();
    };
    regex
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1).map(|m| m.range()))
        .collect()
}

/// Spans of escaped text in character data, never inside markup.
fn character_data_matches(raw: &str, escaped_original: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    if escaped_original.is_empty() {
        return ranges;
    }

    let mut pos = 0;
    while pos < raw.len() {
        let text_end = raw[pos..].find('<').map_or(raw.len(), |i| pos + i);
        ranges.extend(
            raw[pos..text_end]
                .match_indices(escaped_original)
                .map(|(i, m)| pos + i..pos + i + m.len()),
        );
        pos = raw[text_end..].find('>').map_or(raw.len(), |i| text_end + i + 1);
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::TextExtractor;
    use crate::test_support::{slide_with_shapes, slide_xml};
    use deck_core::ElementType;

    fn translated_slide(xml: String, pairs: &[(&str, &str)]) -> Slide {
        let mut slide = Slide::new(0, "slide1", "ppt/slides/slide1.xml", xml);
        slide.text_elements = TextExtractor::new()
            .extract_elements("slide1", &slide.original_xml)
            .unwrap();
        for element in &mut slide.text_elements {
            if let Some((_, t)) = pairs.iter().find(|(o, _)| *o == element.original_text) {
                element.translated_text = Some(t.to_string());
                element.is_translated = true;
            }
        }
        slide
    }

    #[test]
    fn test_replaces_leaf_and_keeps_markup() {
        let xml = slide_xml(&[("Title 1", &["Hello"]), ("Body 2", &["Goodbye"])]);
        let mut slide = translated_slide(xml.clone(), &[("Hello", "Bonjour")]);

        let warnings = XmlRewriter::new().rewrite(&mut slide);

        assert!(warnings.is_empty());
        let out = slide.modified_xml.as_deref().unwrap();
        assert!(check_well_formed(out).is_ok());
        assert_eq!(out, xml.replace("<a:t>Hello</a:t>", "<a:t>Bonjour</a:t>"));
    }

    #[test]
    fn test_replaces_all_duplicates() {
        let xml = slide_xml(&[("Title 1", &["Welcome"]), ("Body 2", &["Welcome"])]);
        let mut slide = translated_slide(xml, &[("Welcome", "Willkommen")]);

        let warnings = XmlRewriter::new().rewrite(&mut slide);

        assert!(warnings.is_empty());
        let out = slide.modified_xml.as_deref().unwrap();
        assert_eq!(out.matches("<a:t>Willkommen</a:t>").count(), 2);
        assert!(!out.contains("Welcome"));
        assert!(slide.text_elements.iter().all(|e| e.is_translated));
    }

    #[test]
    fn test_escapes_translation_and_matches_escaped_original() {
        let xml = slide_xml(&[("Body", &["Fish & Chips"])]);
        let mut slide = translated_slide(xml, &[("Fish & Chips", "Poisson & <frites>")]);

        XmlRewriter::new().rewrite(&mut slide);

        let out = slide.modified_xml.as_deref().unwrap();
        assert!(out.contains("<a:t>Poisson &amp; &lt;frites&gt;</a:t>"));
        assert!(check_well_formed(out).is_ok());
    }

    #[test]
    fn test_keeps_leaf_padding() {
        let xml = slide_with_shapes(
            r#"<p:sp><p:txBody><a:p><a:r><a:t xml:space="preserve"> Hello </a:t></a:r></a:p></p:txBody></p:sp>"#,
        );
        let mut slide = translated_slide(xml, &[("Hello", "Hallo")]);

        XmlRewriter::new().rewrite(&mut slide);

        assert!(slide
            .modified_xml
            .unwrap()
            .contains(r#"<a:t xml:space="preserve"> Hallo </a:t>"#));
    }

    #[test]
    fn test_untranslated_text_is_untouched() {
        let xml = slide_xml(&[("Body", &["Keep me", "Change me"])]);
        let mut slide = translated_slide(xml, &[("Change me", "Changed")]);

        XmlRewriter::new().rewrite(&mut slide);

        let out = slide.modified_xml.unwrap();
        assert!(out.contains("<a:t>Keep me</a:t>"));
        assert!(out.contains("<a:t>Changed</a:t>"));
    }

    #[test]
    fn test_no_translations_leaves_slide_unmodified() {
        let xml = slide_xml(&[]);
        let mut slide = translated_slide(xml.clone(), &[]);

        let warnings = XmlRewriter::new().rewrite(&mut slide);

        assert!(warnings.is_empty());
        assert!(slide.modified_xml.is_none());
        assert_eq!(slide.output_xml(), xml);
    }

    #[test]
    fn test_identity_translation_counts_without_rewrite() {
        let xml = slide_xml(&[("Body", &["OK"])]);
        let mut slide = translated_slide(xml, &[("OK", "OK")]);

        XmlRewriter::new().rewrite(&mut slide);

        assert!(slide.modified_xml.is_none());
        assert!(slide.text_elements[0].is_translated);
    }

    #[test]
    fn test_unplaceable_translation_is_reported() {
        let xml = slide_xml(&[("Body", &["Present"])]);
        let mut slide = translated_slide(xml, &[("Present", "Présent")]);
        slide.text_elements.push({
            let mut ghost = TextElement::new("slide1_text_9", "Absent", ElementType::Paragraph, "t");
            ghost.translated_text = Some("Abwesend".into());
            ghost.is_translated = true;
            ghost
        });

        let warnings = XmlRewriter::new().rewrite(&mut slide);

        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            Warning::UnresolvedSubstitution { element_id, .. } if element_id == "slide1_text_9"
        ));
        assert!(!slide.text_elements[1].is_translated);
        assert!(slide.modified_xml.unwrap().contains("Présent"));
    }

    fn leaf_count(xml: &str, text: &str) -> usize {
        xml.matches(&format!("<a:t>{}</a:t>", text)).count()
    }

    #[test]
    fn test_swapped_translations_each_land_once() {
        let xml = slide_xml(&[("Body", &["Yes", "No"])]);
        let mut slide = translated_slide(xml, &[("Yes", "No"), ("No", "Yes")]);

        let warnings = XmlRewriter::new().rewrite(&mut slide);

        assert!(warnings.is_empty());
        let out = slide.modified_xml.as_deref().unwrap();
        assert_eq!(leaf_count(out, "Yes"), 1);
        assert_eq!(leaf_count(out, "No"), 1);
        assert!(out.find("<a:t>No</a:t>").unwrap() < out.find("<a:t>Yes</a:t>").unwrap());
    }

    #[test]
    fn test_translation_equal_to_other_original_is_not_chained() {
        let xml = slide_xml(&[("Title 1", &["Cat"]), ("Body 2", &["Chat"])]);
        let mut slide = translated_slide(xml, &[("Cat", "Chat"), ("Chat", "Discussion")]);

        XmlRewriter::new().rewrite(&mut slide);

        let out = slide.modified_xml.as_deref().unwrap();
        assert_eq!(leaf_count(out, "Chat"), 1);
        assert_eq!(leaf_count(out, "Discussion"), 1);
        assert!(!out.contains("Cat"));
        assert!(out.find("<a:t>Chat</a:t>").unwrap() < out.find("<a:t>Discussion</a:t>").unwrap());
    }

    #[test]
    fn test_fallback_does_not_touch_placed_leaves() {
        let xml = r#"<root xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:t>Cat</a:t><label>Chat</label></root>"#;
        let mut slide = Slide::new(0, "slide1", "ppt/slides/slide1.xml", xml);
        for (i, (original, translated)) in [("Cat", "Chat"), ("Chat", "Discussion")].iter().enumerate() {
            let mut element = TextElement::new(format!("slide1_text_{}", i), *original, ElementType::Paragraph, "t");
            element.translated_text = Some(translated.to_string());
            element.is_translated = true;
            slide.text_elements.push(element);
        }

        let warnings = XmlRewriter::new().rewrite(&mut slide);

        assert!(warnings.is_empty());
        assert_eq!(
            slide.modified_xml.as_deref().unwrap(),
            r#"<root xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:t>Chat</a:t><label>Discussion</label></root>"#
        );
    }

    #[test]
    fn test_substring_fallbacks_do_not_chain() {
        let xml = r#"<root><label>red and blue</label></root>"#;
        let mut slide = Slide::new(0, "slide1", "ppt/slides/slide1.xml", xml);
        for (i, (original, translated)) in [("red", "blue"), ("blue", "green")].iter().enumerate() {
            let mut element = TextElement::new(format!("slide1_text_{}", i), *original, ElementType::Paragraph, "t");
            element.translated_text = Some(translated.to_string());
            element.is_translated = true;
            slide.text_elements.push(element);
        }

        XmlRewriter::new().rewrite(&mut slide);

        assert_eq!(
            slide.modified_xml.as_deref().unwrap(),
            "<root><label>blue and green</label></root>"
        );
    }

    #[test]
    fn test_tag_content_fallback_for_other_tags() {
        let xml = r#"<root><label>Menu</label></root>"#;
        let element = TextElement::new("x", "Menu", ElementType::Shape, "t");

        let (out, strategy) = XmlRewriter::new().substitute(xml, &element, "Menü").unwrap();

        assert_eq!(strategy, RewriteStrategy::TagContent);
        assert_eq!(out, "<root><label>Menü</label></root>");
    }

    #[test]
    fn test_substring_fallback_skips_markup() {
        let xml = r#"<root><label name="Menu">Main Menu here</label></root>"#;
        let element = TextElement::new("x", "Menu", ElementType::Shape, "t");

        let (out, strategy) = XmlRewriter::new().substitute(xml, &element, "Menü").unwrap();

        assert_eq!(strategy, RewriteStrategy::Substring);
        assert_eq!(out, r#"<root><label name="Menu">Main Menü here</label></root>"#);
    }

    #[test]
    fn test_fallback_matches_unescaped_apostrophe() {
        let xml = r#"<root><label>It's</label></root>"#;
        let element = TextElement::new("x", "It's", ElementType::Shape, "t");

        let (out, _) = XmlRewriter::new().substitute(xml, &element, "C'est").unwrap();

        assert_eq!(out, "<root><label>C&apos;est</label></root>");
    }
}
