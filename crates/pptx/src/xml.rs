//! Shared XML helpers for slide parts.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::Reader;

/// DrawingML main namespace, home of paragraphs, runs and text leaves.
pub const DRAWINGML_NS: &[u8] = b"http://schemas.openxmlformats.org/drawingml/2006/main";

/// Local name of the DrawingML text-leaf element (`a:t`).
pub const TEXT_LEAF: &str = "t";

/// Whether a resolved namespace is the DrawingML namespace.
pub fn is_drawingml(ns: &ResolveResult<'_>) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == DRAWINGML_NS)
}

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Check that a document parses and every element is closed.
pub fn check_well_formed(xml: &str) -> std::result::Result<(), String> {
    let mut reader = Reader::from_str(xml);
    let mut depth: usize = 0;

    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "closing tag without opening tag".to_string())?;
            }
            Ok(Event::Text(e)) => {
                e.unescape()
                    .map_err(|e| format!("bad text at {}: {}", reader.buffer_position(), e))?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("at position {}: {}", reader.buffer_position(), e)),
            _ => {}
        }
    }

    if depth == 0 {
        Ok(())
    } else {
        Err(format!("{} element(s) left open at end of document", depth))
    }
}

/// Find the main document part named by a package relationships part.
///
/// Matches the `officeDocument` relationship type in both its transitional
/// and strict spellings. The returned part name has no leading `/`.
pub fn office_document_target(rels: &str) -> Option<String> {
    let mut reader = Reader::from_str(rels);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if local_name(e.name().as_ref()) == b"Relationship" => {
                let mut rel_type = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Type" => rel_type = attr.unescape_value().ok().map(|v| v.into_owned()),
                        b"Target" => target = attr.unescape_value().ok().map(|v| v.into_owned()),
                        _ => {}
                    }
                }
                if rel_type.is_some_and(|t| t.ends_with("/officeDocument")) {
                    return target.map(|t| t.trim_start_matches('/').to_string());
                }
            }
            Ok(Event::Eof) => return None,
            Err(e) => {
                log::debug!("relationships part stopped parsing: {}", e);
                return None;
            }
            _ => {}
        }
    }
}

/// The file stem of a slide part, e.g. `slide3` for `ppt/slides/slide3.xml`.
pub fn slide_stem(part_name: &str) -> Option<&str> {
    slide_number(part_name)?;
    part_name.strip_prefix("ppt/slides/")?.strip_suffix(".xml")
}

/// Extract a slide number from a part name like `ppt/slides/slide3.xml`.
///
/// Returns `None` for anything that is not a slide part, including the
/// per-slide relationship parts under `ppt/slides/_rels/`.
pub fn slide_number(part_name: &str) -> Option<usize> {
    let file = part_name.strip_prefix("ppt/slides/")?;
    let digits = file.strip_prefix("slide")?.strip_suffix(".xml")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
