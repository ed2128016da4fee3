//! PPTX (Office Open XML) transcoder for presentation translation.
//!
//! Loads .pptx packages (ZIP archives of XML parts), extracts slide text,
//! substitutes translations into the slide XML and reassembles a package in
//! which every other part is copied through byte for byte.

pub mod assembler;
pub mod extractor;
pub mod package;
pub mod rewriter;
pub mod transcoder;
pub mod xml;

#[cfg(test)]
pub(crate) mod test_support;

pub use assembler::PackageAssembler;
pub use extractor::TextExtractor;
pub use package::{Package, PackageLoader, PartEntry, PartKind};
pub use rewriter::{RewriteStrategy, XmlRewriter};
pub use transcoder::{LanguageOutcome, TranscodeOptions, Transcoder};
