//! Text extraction from slide XML.
//!
//! Walks each slide part with a namespace-aware reader and records every
//! non-empty DrawingML text leaf (`a:t`), whether it sits in a plain run, a
//! field or directly in a paragraph. Element types come from the enclosing
//! shape's name or placeholder type, falling back to paragraph structure.

use crate::package::Package;
use crate::xml::{is_drawingml, local_name, TEXT_LEAF};
use deck_core::{ElementType, Error, Result, StyleInfo, TextElement, Warning};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::NsReader;

/// Extracts ordered text elements from slide parts.
pub struct TextExtractor;

impl TextExtractor {
    /// Create a new text extractor.
    pub fn new() -> Self {
        Self
    }

    /// Populate the text elements of every slide in the package.
    ///
    /// A slide whose XML cannot be parsed is left without text elements and
    /// reported as a warning; the remaining slides are still processed.
    pub fn extract(&self, package: &mut Package) -> Vec<Warning> {
        let mut warnings = Vec::new();

        for slide in package.slides_mut() {
            match self.extract_elements(&slide.id, &slide.original_xml) {
                Ok(elements) => {
                    log::debug!("{}: extracted {} text elements", slide.id, elements.len());
                    slide.text_elements = elements;
                }
                Err(e) => {
                    log::warn!("{} (slide skipped)", e);
                    slide.text_elements.clear();
                    let message = match e {
                        Error::Extraction { message, .. } => message,
                        other => other.to_string(),
                    };
                    warnings.push(Warning::ExtractionFailed {
                        slide_id: slide.id.clone(),
                        message,
                    });
                }
            }
        }

        warnings
    }

    /// Extract text elements from a single slide's XML, in document order.
    pub fn extract_elements(&self, slide_id: &str, xml: &str) -> Result<Vec<TextElement>> {
        let mut reader = NsReader::from_str(xml);
        let mut walk = SlideWalk::new(slide_id);

        loop {
            let (drawingml, event) = match reader.read_resolved_event() {
                Ok((ns, event)) => (is_drawingml(&ns), event),
                Err(e) => {
                    return Err(walk.error(format!(
                        "at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
            };

            match event {
                Event::Start(ref e) => walk.open(e, drawingml, false)?,
                Event::Empty(ref e) => walk.open(e, drawingml, true)?,
                Event::End(_) => walk.close()?,
                Event::Text(ref e) if walk.in_leaf() => {
                    let text = e.unescape().map_err(|err| walk.error(err.to_string()))?;
                    walk.push_text(&text);
                }
                Event::CData(ref e) if walk.in_leaf() => {
                    walk.push_text(&String::from_utf8_lossy(e));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        walk.finish()
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// An element currently open in the walk.
#[derive(Debug)]
struct OpenElement {
    name: Vec<u8>,
    drawingml: bool,
}

/// Metadata of an enclosing shape.
#[derive(Debug, Default)]
struct ShapeContext {
    name: String,
    placeholder: Option<String>,
}

impl ShapeContext {
    /// Element type implied by the shape itself, if any.
    fn hint(&self) -> Option<ElementType> {
        let name = self.name.to_lowercase();
        if name.contains("subtitle") {
            return Some(ElementType::Paragraph);
        }
        if name.contains("title") || name.contains("heading") {
            return Some(ElementType::Title);
        }
        if name.contains("content") || name.contains("body") {
            return Some(ElementType::Paragraph);
        }

        match self.placeholder.as_deref() {
            Some("title" | "ctrTitle") => Some(ElementType::Title),
            Some("subTitle" | "body") => Some(ElementType::Paragraph),
            _ => None,
        }
    }
}

/// A text leaf waiting for its paragraph to close.
#[derive(Debug)]
struct PendingLeaf {
    text: String,
    style: StyleInfo,
    in_field: bool,
}

/// Walk state for one slide.
struct SlideWalk<'a> {
    slide_id: &'a str,
    stack: Vec<OpenElement>,
    shapes: Vec<ShapeContext>,
    paragraph: Option<Vec<PendingLeaf>>,
    run_style: StyleInfo,
    in_field: bool,
    leaf: Option<String>,
    elements: Vec<TextElement>,
}

impl<'a> SlideWalk<'a> {
    fn new(slide_id: &'a str) -> Self {
        Self {
            slide_id,
            stack: Vec::new(),
            shapes: Vec::new(),
            paragraph: None,
            run_style: StyleInfo::default(),
            in_field: false,
            leaf: None,
            elements: Vec::new(),
        }
    }

    fn error(&self, message: String) -> Error {
        Error::Extraction {
            slide_id: self.slide_id.to_string(),
            message,
        }
    }

    fn in_leaf(&self) -> bool {
        self.leaf.is_some()
    }

    fn push_text(&mut self, text: &str) {
        if let Some(leaf) = self.leaf.as_mut() {
            leaf.push_str(text);
        }
    }

    fn inside(&self, name: &[u8]) -> bool {
        self.stack.iter().any(|e| e.drawingml && e.name == name)
    }

    fn parent_is(&self, name: &[u8]) -> bool {
        self.stack
            .last()
            .is_some_and(|e| e.drawingml && e.name == name)
    }

    fn open(&mut self, e: &BytesStart<'_>, drawingml: bool, empty: bool) -> Result<()> {
        let name = local_name(e.name().as_ref()).to_vec();

        match (drawingml, name.as_slice()) {
            (false, b"sp" | b"pic" | b"graphicFrame" | b"grpSp" | b"cxnSp") => {
                self.shapes.push(ShapeContext::default());
            }
            (false, b"cNvPr") => {
                if let Some(shape) = self.shapes.last_mut() {
                    if shape.name.is_empty() {
                        shape.name = attr_value(e, b"name").unwrap_or_default();
                    }
                }
            }
            (false, b"ph") => {
                if let Some(shape) = self.shapes.last_mut() {
                    shape.placeholder = attr_value(e, b"type");
                }
            }
            (true, b"p") => self.paragraph = Some(Vec::new()),
            (true, b"r") => {
                self.run_style = StyleInfo::default();
                self.in_field = false;
            }
            (true, b"fld") => {
                self.run_style = StyleInfo::default();
                self.in_field = true;
            }
            (true, b"rPr") => apply_run_properties(&mut self.run_style, e),
            (true, b"latin") if self.inside(b"rPr") => {
                self.run_style.font_family = attr_value(e, b"typeface");
            }
            (true, b"srgbClr") if self.inside(b"rPr") && self.parent_is(b"solidFill") => {
                self.run_style.color = attr_value(e, b"val");
            }
            (true, leaf) if leaf == TEXT_LEAF.as_bytes() => self.leaf = Some(String::new()),
            _ => {}
        }

        if empty {
            self.on_close(&name, drawingml);
        } else {
            self.stack.push(OpenElement { name, drawingml });
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let element = self
            .stack
            .pop()
            .ok_or_else(|| self.error("closing tag without opening tag".to_string()))?;
        self.on_close(&element.name, element.drawingml);
        Ok(())
    }

    fn on_close(&mut self, name: &[u8], drawingml: bool) {
        match (drawingml, name) {
            (false, b"sp" | b"pic" | b"graphicFrame" | b"grpSp" | b"cxnSp") => {
                self.shapes.pop();
            }
            (true, b"p") => {
                if let Some(leaves) = self.paragraph.take() {
                    let several = leaves.len() > 1;
                    for leaf in leaves {
                        let structural = if leaf.in_field || several {
                            ElementType::TextRun
                        } else {
                            ElementType::Paragraph
                        };
                        self.emit(leaf, structural);
                    }
                }
            }
            (true, b"fld") => self.in_field = false,
            (true, leaf) if leaf == TEXT_LEAF.as_bytes() => {
                let Some(text) = self.leaf.take() else {
                    return;
                };
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return;
                }

                let pending = PendingLeaf {
                    text: trimmed.to_string(),
                    style: self.run_style.clone(),
                    in_field: self.in_field,
                };
                match self.paragraph.as_mut() {
                    Some(leaves) => leaves.push(pending),
                    None => self.emit(pending, ElementType::Shape),
                }
            }
            _ => {}
        }
    }

    fn emit(&mut self, leaf: PendingLeaf, structural: ElementType) {
        let element_type = self
            .shapes
            .last()
            .and_then(ShapeContext::hint)
            .unwrap_or(structural);
        let id = format!("{}_text_{}", self.slide_id, self.elements.len());
        self.elements
            .push(TextElement::new(id, leaf.text, element_type, TEXT_LEAF).with_style(leaf.style));
    }

    fn finish(self) -> Result<Vec<TextElement>> {
        if !self.stack.is_empty() {
            return Err(self.error(format!(
                "{} element(s) left open at end of document",
                self.stack.len()
            )));
        }
        Ok(self.elements)
    }
}

/// Read run-level formatting attributes from an `a:rPr` element.
fn apply_run_properties(style: &mut StyleInfo, e: &BytesStart<'_>) {
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value);
        match attr.key.as_ref() {
            b"sz" => {
                // Hundredths of a point.
                if let Ok(size) = value.parse::<f32>() {
                    style.font_size = Some(size / 100.0);
                }
            }
            b"b" => style.bold = is_true(&value),
            b"i" => style.italic = is_true(&value),
            _ => {}
        }
    }
}

fn is_true(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned())
        })
}
