//! Package loading: open a `.pptx` archive and index its parts.
//!
//! Only slide parts are decoded up front. Every other part stays compressed
//! inside the retained source bytes and is read lazily, or raw-copied when
//! the package is reassembled.

use crate::xml::{office_document_target, slide_number, slide_stem};
use deck_core::{Error, Result, Slide};
use std::io::{Cursor, Read};
use std::sync::Arc;
use zip::ZipArchive;

/// Content-types manifest.
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
/// Package-level relationships.
pub const ROOT_RELS_PART: &str = "_rels/.rels";
/// Main presentation part used when the package relationships name none.
pub const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// The role of a part within the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    ContentTypes,
    Relationships,
    Presentation,
    Slide,
    Directory,
    Other,
}

impl PartKind {
    fn classify(name: &str, is_dir: bool) -> Self {
        if is_dir {
            Self::Directory
        } else if name == CONTENT_TYPES_PART {
            Self::ContentTypes
        } else if name.ends_with(".rels") {
            Self::Relationships
        } else if slide_number(name).is_some() {
            Self::Slide
        } else {
            Self::Other
        }
    }
}

/// Index entry for one archive member.
#[derive(Debug, Clone)]
pub struct PartEntry {
    pub name: String,
    pub kind: PartKind,
    /// Uncompressed size in bytes.
    pub size: u64,
    pub compressed_size: u64,
}

/// A loaded presentation package.
///
/// Cloning is a deep copy of all slide state; the source archive bytes are
/// immutable and shared.
#[derive(Debug, Clone)]
pub struct Package {
    source: Arc<[u8]>,
    parts: Vec<PartEntry>,
    presentation_part: String,
    slides: Vec<Slide>,
}

impl Package {
    /// Load a package from raw archive bytes.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        PackageLoader::new().load(bytes)
    }

    /// The original archive bytes.
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Size of the original archive in bytes.
    pub fn source_len(&self) -> usize {
        self.source.len()
    }

    /// All parts in archive order.
    pub fn parts(&self) -> &[PartEntry] {
        &self.parts
    }

    /// Name of the main presentation part.
    pub fn presentation_part(&self) -> &str {
        &self.presentation_part
    }

    /// Look up a part by name.
    pub fn part(&self, name: &str) -> Option<&PartEntry> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Read and decompress a part on demand.
    pub fn read_part(&self, name: &str) -> Result<Vec<u8>> {
        let mut archive = ZipArchive::new(Cursor::new(&self.source[..]))
            .map_err(|e| Error::PackageLoad(format!("Failed to open ZIP: {}", e)))?;
        read_entry(&mut archive, name)
    }

    /// Slides in physical order.
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slides_mut(&mut self) -> &mut [Slide] {
        &mut self.slides
    }

    /// Look up a slide by id, e.g. `slide2`.
    pub fn slide(&self, id: &str) -> Option<&Slide> {
        self.slides.iter().find(|s| s.id == id)
    }
}

/// Opens package archives and validates their minimal structure.
pub struct PackageLoader;

impl PackageLoader {
    /// Create a new package loader.
    pub fn new() -> Self {
        Self
    }

    /// Open an archive, check required parts and read the slide parts.
    pub fn load(&self, bytes: &[u8]) -> Result<Package> {
        let source: Arc<[u8]> = Arc::from(bytes);
        let (parts, presentation_part, slides) = self.index(&source)?;

        Ok(Package {
            source,
            parts,
            presentation_part,
            slides,
        })
    }

    fn index(&self, source: &[u8]) -> Result<(Vec<PartEntry>, String, Vec<Slide>)> {
        let mut archive = ZipArchive::new(Cursor::new(source))
            .map_err(|e| Error::PackageLoad(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let file = archive
                .by_index_raw(i)
                .map_err(|e| Error::PackageLoad(format!("Failed to read entry {}: {}", i, e)))?;
            let name = file.name().to_string();
            parts.push(PartEntry {
                kind: PartKind::classify(&name, file.is_dir()),
                size: file.size(),
                compressed_size: file.compressed_size(),
                name,
            });
        }
        log::debug!("Indexed {} parts", parts.len());

        for required in [CONTENT_TYPES_PART, ROOT_RELS_PART] {
            if !parts.iter().any(|p| p.name == required) {
                return Err(Error::MissingPart(required.to_string()));
            }
        }

        let root_rels = read_entry(&mut archive, ROOT_RELS_PART)?;
        let presentation_part = match office_document_target(&String::from_utf8_lossy(&root_rels)) {
            Some(target) => target,
            None => {
                log::warn!("{} names no officeDocument part, assuming {}", ROOT_RELS_PART, PRESENTATION_PART);
                PRESENTATION_PART.to_string()
            }
        };
        match parts.iter_mut().find(|p| p.name == presentation_part) {
            Some(part) => part.kind = PartKind::Presentation,
            None => return Err(Error::MissingPart(presentation_part)),
        }
        log::debug!("Main document part is {}", presentation_part);

        let mut slide_parts: Vec<(usize, &str)> = parts
            .iter()
            .filter(|p| p.kind == PartKind::Slide)
            .filter_map(|p| slide_number(&p.name).map(|n| (n, p.name.as_str())))
            .collect();
        if slide_parts.is_empty() {
            return Err(Error::MissingPart("ppt/slides/slide1.xml".to_string()));
        }
        slide_parts.sort();

        let mut slides = Vec::with_capacity(slide_parts.len());
        for (index, (number, name)) in slide_parts.iter().enumerate() {
            if index > 0 && slide_parts[index - 1].0 == *number {
                log::warn!(
                    "{} and {} share slide number {}, ids follow the part names",
                    slide_parts[index - 1].1,
                    name,
                    number
                );
            } else if *number != index + 1 {
                log::warn!(
                    "Slide numbering is not contiguous: {} is at position {}",
                    name,
                    index + 1
                );
            }

            let bytes = read_entry(&mut archive, name)?;
            let xml = match String::from_utf8(bytes) {
                Ok(xml) => xml,
                Err(e) => {
                    log::warn!("{} is not valid UTF-8, decoding lossily", name);
                    String::from_utf8_lossy(e.as_bytes()).into_owned()
                }
            };
            let id = slide_stem(name).map_or_else(|| format!("slide{}", number), str::to_string);
            slides.push(Slide::new(index, id, *name, xml));
        }

        Ok((parts, presentation_part, slides))
    }
}

impl Default for PackageLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a file from the ZIP archive.
fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, path: &str) -> Result<Vec<u8>> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| Error::PackageLoad(format!("File not found in archive '{}': {}", path, e)))?;

    let mut content = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut content)
        .map_err(|e| Error::PackageLoad(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}
