//! Package assembly: write a new archive from a (partly) rewritten package.

use crate::package::Package;
use deck_core::{Error, GeneratedPackage, Result, TranslationStats, Warning};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Default deflate level for rewritten parts.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 6;

/// Smallest output/input size ratio accepted when text was translated.
pub const DEFAULT_MIN_OUTPUT_RATIO: f64 = 0.10;

/// Emits output archives.
///
/// Parts that were not rewritten, slides included, are raw-copied from the
/// source archive without being decompressed. Rewritten slides are deflated
/// and written under their original names, in original archive order.
#[derive(Debug, Clone)]
pub struct PackageAssembler {
    compression_level: i32,
    min_output_ratio: f64,
}

impl Default for PackageAssembler {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            min_output_ratio: DEFAULT_MIN_OUTPUT_RATIO,
        }
    }
}

impl PackageAssembler {
    /// Create an assembler with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deflate level (0-9) used for rewritten slides.
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level.clamp(0, 9);
        self
    }

    /// Set the minimum output/input size ratio.
    pub fn with_min_output_ratio(mut self, ratio: f64) -> Self {
        self.min_output_ratio = ratio.max(0.0);
        self
    }

    /// Assemble the package for one language.
    pub fn assemble(&self, package: &Package, language: &str) -> Result<GeneratedPackage> {
        let stats = TranslationStats::from_slides(package.slides());
        let bytes = self.write_archive(package)?;

        check_output_size(
            package.source_len(),
            bytes.len(),
            stats.translated_count,
            self.min_output_ratio,
        )?;
        verify_archive(&bytes, package.parts().len())?;

        let mut warnings = Vec::new();
        if stats.translated_count == 0 {
            log::warn!("{}: no text was translated, output mirrors the input", language);
            warnings.push(Warning::NothingTranslated);
        }

        log::info!(
            "{}: assembled {} bytes, {}/{} elements translated",
            language,
            bytes.len(),
            stats.translated_count,
            stats.text_element_count
        );

        Ok(GeneratedPackage {
            language: language.to_string(),
            bytes,
            stats,
            warnings,
        })
    }

    fn write_archive(&self, package: &Package) -> Result<Vec<u8>> {
        let rewritten: HashMap<&str, &str> = package
            .slides()
            .iter()
            .filter_map(|s| s.modified_xml.as_deref().map(|xml| (s.part_name.as_str(), xml)))
            .collect();

        let mut archive = ZipArchive::new(Cursor::new(package.source()))
            .map_err(|e| Error::Generation(format!("Failed to reopen source archive: {}", e)))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(package.source_len())));
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level));

        for i in 0..archive.len() {
            let file = archive
                .by_index_raw(i)
                .map_err(|e| Error::Generation(format!("Failed to read entry {}: {}", i, e)))?;
            let name = file.name().to_string();

            match rewritten.get(name.as_str()) {
                Some(xml) => {
                    drop(file);
                    writer
                        .start_file(name.as_str(), options)
                        .map_err(|e| Error::Generation(format!("Failed to start '{}': {}", name, e)))?;
                    writer
                        .write_all(xml.as_bytes())
                        .map_err(|e| Error::Generation(format!("Failed to write '{}': {}", name, e)))?;
                }
                None => {
                    writer
                        .raw_copy_file(file)
                        .map_err(|e| Error::Generation(format!("Failed to copy '{}': {}", name, e)))?;
                }
            }
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::Generation(format!("Failed to finish archive: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

/// Reject implausibly small output when something was translated.
pub fn check_output_size(
    input_len: usize,
    output_len: usize,
    translated_count: usize,
    min_ratio: f64,
) -> Result<()> {
    if translated_count == 0 || input_len == 0 {
        return Ok(());
    }

    let ratio = output_len as f64 / input_len as f64;
    if ratio < min_ratio {
        return Err(Error::Generation(format!(
            "output is {} bytes, {:.1}% of the {} byte input (minimum {:.1}%)",
            output_len,
            ratio * 100.0,
            input_len,
            min_ratio * 100.0
        )));
    }
    Ok(())
}

/// Reopen the output and check that no member went missing.
fn verify_archive(bytes: &[u8], expected_parts: usize) -> Result<()> {
    let archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Generation(format!("Output is not a readable archive: {}", e)))?;
    if archive.len() != expected_parts {
        return Err(Error::Generation(format!(
            "Output has {} parts, expected {}",
            archive.len(),
            expected_parts
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{read_all_parts, slide_xml, PackageBuilder};

    fn package() -> (Vec<u8>, Package) {
        let bytes = PackageBuilder::new()
            .slide(slide_xml(&[("Title 1", &["Hello"])]))
            .slide(slide_xml(&[("Title 1", &["Second"])]))
            .build();
        let package = Package::load(&bytes).unwrap();
        (bytes, package)
    }

    #[test]
    fn test_untouched_package_is_identical_part_for_part() {
        let (bytes, package) = package();

        let generated = PackageAssembler::new().assemble(&package, "fr").unwrap();

        assert_eq!(read_all_parts(&generated.bytes), read_all_parts(&bytes));
        assert_eq!(generated.warnings, vec![Warning::NothingTranslated]);
        assert_eq!(generated.language, "fr");
    }

    #[test]
    fn test_rewritten_slide_replaced_in_place() {
        let (bytes, mut package) = package();
        let replacement = package.slides()[0].original_xml.replace("Hello", "Bonjour");
        package.slides_mut()[0].modified_xml = Some(replacement.clone());

        let generated = PackageAssembler::new().assemble(&package, "fr").unwrap();

        let before = read_all_parts(&bytes);
        let after = read_all_parts(&generated.bytes);
        assert_eq!(
            before.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            after.iter().map(|(n, _)| n).collect::<Vec<_>>()
        );
        for ((name, old), (_, new)) in before.iter().zip(&after) {
            if name == "ppt/slides/slide1.xml" {
                assert_eq!(new, replacement.as_bytes());
            } else {
                assert_eq!(old, new, "{} changed", name);
            }
        }
    }

    #[test]
    fn test_size_check() {
        assert!(check_output_size(1000, 50, 3, 0.10).is_err());
        assert!(check_output_size(1000, 100, 3, 0.10).is_ok());
        assert!(check_output_size(1000, 50, 0, 0.10).is_ok());
        assert!(matches!(
            check_output_size(1000, 99, 1, 0.10),
            Err(Error::Generation(_))
        ));
    }

    #[test]
    fn test_size_check_applied_on_assembly() {
        let (_, mut package) = package();
        package.slides_mut()[0].text_elements.push({
            let mut e = deck_core::TextElement::new("slide1_text_0", "Hello", deck_core::ElementType::Title, "t");
            e.is_translated = true;
            e
        });

        let err = PackageAssembler::new()
            .with_min_output_ratio(50.0)
            .assemble(&package, "fr")
            .unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }
}
