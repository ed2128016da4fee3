//! Per-package translation pipeline.
//!
//! A [`Transcoder`] is created for one input package: it loads and extracts
//! once, then runs mapping, rewriting and assembly for each target language
//! on a deep copy of the extracted package, so no state leaks between runs.

use crate::assembler::{PackageAssembler, DEFAULT_COMPRESSION_LEVEL, DEFAULT_MIN_OUTPUT_RATIO};
use crate::extractor::TextExtractor;
use crate::package::{Package, PackageLoader};
use crate::rewriter::XmlRewriter;
use deck_core::{
    Error, GeneratedPackage, Result, Slide, TranslationMapper, TranslationProvider, TranslationSet,
    TranslationStats, Warning,
};

/// Options for a translation job.
#[derive(Debug, Clone)]
pub struct TranscodeOptions {
    /// Deflate level for rewritten slide parts.
    pub compression_level: i32,
    /// Minimum output/input size ratio when anything was translated.
    pub min_output_ratio: f64,
    /// Whether a slide's only translation may be applied to unmatched text.
    pub sole_entry_fallback: bool,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            min_output_ratio: DEFAULT_MIN_OUTPUT_RATIO,
            sole_entry_fallback: true,
        }
    }
}

impl TranscodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_min_output_ratio(mut self, ratio: f64) -> Self {
        self.min_output_ratio = ratio;
        self
    }

    pub fn with_sole_entry_fallback(mut self, enabled: bool) -> Self {
        self.sole_entry_fallback = enabled;
        self
    }
}

/// The result of one language run.
#[derive(Debug)]
pub struct LanguageOutcome {
    pub language: String,
    pub result: Result<GeneratedPackage>,
}

/// Translates one loaded package into any number of languages.
pub struct Transcoder {
    package: Package,
    extraction_warnings: Vec<Warning>,
    options: TranscodeOptions,
}

impl Transcoder {
    /// Load and extract a package with default options.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        Self::with_options(bytes, TranscodeOptions::default())
    }

    /// Load and extract a package.
    pub fn with_options(bytes: &[u8], options: TranscodeOptions) -> Result<Self> {
        let mut package = PackageLoader::new().load(bytes)?;
        let extraction_warnings = TextExtractor::new().extract(&mut package);

        Ok(Self {
            package,
            extraction_warnings,
            options,
        })
    }

    /// The extracted package, before any translation.
    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn slides(&self) -> &[Slide] {
        self.package.slides()
    }

    /// Slides that failed to parse during extraction.
    pub fn extraction_warnings(&self) -> &[Warning] {
        &self.extraction_warnings
    }

    /// Statistics of the extracted package (nothing translated yet).
    pub fn stats(&self) -> TranslationStats {
        TranslationStats::from_slides(self.package.slides())
    }

    /// Translate the package into one language.
    pub fn translate(&self, set: &TranslationSet, language: &str) -> Result<GeneratedPackage> {
        let mut package = self.package.clone();
        let mut warnings = self.extraction_warnings.clone();

        let mapper = TranslationMapper::new().with_sole_entry_fallback(self.options.sole_entry_fallback);
        let rewriter = XmlRewriter::new();

        for slide in package.slides_mut() {
            slide.reset_translations();
            warnings.extend(mapper.apply(slide, set, language));
            warnings.extend(rewriter.rewrite(slide));
        }

        let mut generated = PackageAssembler::new()
            .with_compression_level(self.options.compression_level)
            .with_min_output_ratio(self.options.min_output_ratio)
            .assemble(&package, language)?;

        warnings.append(&mut generated.warnings);
        generated.warnings = warnings;
        Ok(generated)
    }

    /// Translate into several languages, one independent run each.
    ///
    /// A failing language does not stop the others. Fails only when every
    /// language failed.
    pub fn translate_all(&self, set: &TranslationSet, languages: &[String]) -> Result<Vec<LanguageOutcome>> {
        let outcomes: Vec<LanguageOutcome> = languages
            .iter()
            .map(|language| {
                let result = self.translate(set, language);
                if let Err(e) = &result {
                    log::warn!("{}: translation run failed: {}", language, e);
                }
                LanguageOutcome {
                    language: language.clone(),
                    result,
                }
            })
            .collect();

        if !outcomes.is_empty() && outcomes.iter().all(|o| o.result.is_err()) {
            return Err(Error::AllLanguagesFailed(outcomes.len()));
        }
        Ok(outcomes)
    }

    /// Build a translation set with a provider, then translate into each language.
    pub fn translate_with_provider<P: TranslationProvider + ?Sized>(
        &self,
        provider: &P,
        languages: &[String],
        source_lang: Option<&str>,
    ) -> Result<Vec<LanguageOutcome>> {
        let set = TranslationSet::populate(self.package.slides(), provider, languages, source_lang);
        self.translate_all(&set, languages)
    }
}
