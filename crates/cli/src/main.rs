//! CLI tool for translating the text of PowerPoint files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deck_core::{Slide, TranslationSet, TranslationStats};
use deck_pptx::{LanguageOutcome, TranscodeOptions, Transcoder};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// Extract, template and translate the slide text of .pptx files.
#[derive(Parser, Debug)]
#[command(name = "deck-translate")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the text elements of a presentation as JSON
    Extract {
        /// Input PowerPoint file (.pptx)
        input: PathBuf,
    },

    /// Write a translation set mapping every text to itself, ready to fill in
    Template {
        /// Input PowerPoint file (.pptx)
        input: PathBuf,

        /// Target language code (repeatable)
        #[arg(short, long = "lang", required = true)]
        languages: Vec<String>,

        /// Output JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Translate a presentation using a JSON translation set
    Translate {
        /// Input PowerPoint file (.pptx)
        input: PathBuf,

        /// Translation set JSON: { "slide1": { "fr": { "Hello": "Bonjour" } } }
        #[arg(short, long)]
        set: PathBuf,

        /// Target language code (repeatable; default: every language in the set)
        #[arg(short, long = "lang")]
        languages: Vec<String>,

        /// Output directory (default: same as input file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Deflate level for rewritten slides (0-9)
        #[arg(long, default_value = "6")]
        compression_level: i32,

        /// Fail a language if its output is smaller than this fraction of the input
        #[arg(long, default_value = "0.1")]
        min_output_ratio: f64,

        /// Do not apply a slide's only translation to otherwise unmatched text
        #[arg(long)]
        no_sole_entry_fallback: bool,
    },
}

/// JSON report printed by `extract`.
#[derive(Serialize)]
struct ExtractReport<'a> {
    stats: TranslationStats,
    slides: &'a [Slide],
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match &args.command {
        Command::Extract { input } => {
            let transcoder = open(input, TranscodeOptions::default())?;
            let report = ExtractReport {
                stats: transcoder.stats(),
                slides: transcoder.slides(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Template {
            input,
            languages,
            output,
        } => {
            let transcoder = open(input, TranscodeOptions::default())?;
            let set = TranslationSet::template(transcoder.slides(), languages);
            let json = serde_json::to_string_pretty(&set)?;
            match output {
                Some(path) => write_output(path, json.as_bytes())?,
                None => println!("{}", json),
            }
        }
        Command::Translate {
            input,
            set,
            languages,
            output,
            compression_level,
            min_output_ratio,
            no_sole_entry_fallback,
        } => {
            let options = TranscodeOptions::new()
                .with_compression_level(*compression_level)
                .with_min_output_ratio(*min_output_ratio)
                .with_sole_entry_fallback(!no_sole_entry_fallback);
            translate(input, set, languages, output.as_ref(), options, args.verbose)?;
        }
    }

    Ok(())
}

/// Read and open a presentation.
fn open(input_path: &Path, options: TranscodeOptions) -> Result<Transcoder> {
    let bytes = std::fs::read(input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;
    log::debug!("Read {} bytes from {}", bytes.len(), input_path.display());

    Transcoder::with_options(&bytes, options)
        .with_context(|| format!("Failed to load {}", input_path.display()))
}

/// Translate a presentation into every requested language.
fn translate(
    input_path: &Path,
    set_path: &Path,
    languages: &[String],
    output_dir: Option<&PathBuf>,
    options: TranscodeOptions,
    verbose: bool,
) -> Result<()> {
    let file = File::open(set_path)
        .with_context(|| format!("Failed to open {}", set_path.display()))?;
    let set: TranslationSet = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse translation set {}", set_path.display()))?;

    let languages = if languages.is_empty() {
        set.languages()
    } else {
        languages.to_vec()
    };
    if languages.is_empty() {
        anyhow::bail!("No target languages given and none found in {}", set_path.display());
    }

    let transcoder = open(input_path, options)?;
    if verbose {
        eprintln!("Processing: {}", input_path.display());
        eprintln!("  Found {} slides", transcoder.slides().len());
    }

    let outcomes = transcoder.translate_all(&set, &languages)?;
    let unwritten = save_outcomes(input_path, output_dir, outcomes, verbose);
    if unwritten > 0 {
        anyhow::bail!("{} translated output(s) could not be written", unwritten);
    }

    Ok(())
}

/// Write each successful language and report the rest.
///
/// A language whose output cannot be written does not stop the others.
/// Returns how many successful languages could not be written.
fn save_outcomes(
    input_path: &Path,
    output_dir: Option<&PathBuf>,
    outcomes: Vec<LanguageOutcome>,
    verbose: bool,
) -> usize {
    let mut unwritten = 0;

    for outcome in outcomes {
        let generated = match outcome.result {
            Ok(generated) => generated,
            Err(e) => {
                eprintln!("{}: failed: {}", outcome.language, e);
                continue;
            }
        };

        let output_path = match get_output_path(input_path, output_dir, &generated.language)
            .and_then(|path| write_output(&path, &generated.bytes).map(|()| path))
        {
            Ok(path) => path,
            Err(e) => {
                eprintln!("{}: failed to save: {:#}", generated.language, e);
                unwritten += 1;
                continue;
            }
        };

        let stats = generated.stats;
        eprintln!(
            "{}: {}/{} elements translated ({:.0}%) -> {}",
            generated.language,
            stats.translated_count,
            stats.text_element_count,
            stats.translation_rate * 100.0,
            output_path.display()
        );
        if verbose {
            for warning in &generated.warnings {
                eprintln!("  warning: {}", warning);
            }
        } else if !generated.warnings.is_empty() {
            eprintln!("  {} warning(s), use --verbose to list", generated.warnings.len());
        }
    }

    unwritten
}

/// Determine the output path for one language of a processed file.
fn get_output_path(input_path: &Path, output_dir: Option<&PathBuf>, language: &str) -> Result<PathBuf> {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let output_filename = format!("{}.{}.pptx", stem, language);

    let output_path = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(output_filename)
        }
        None => {
            if let Some(parent) = input_path.parent() {
                parent.join(output_filename)
            } else {
                PathBuf::from(output_filename)
            }
        }
    };

    Ok(output_path)
}

/// Write output to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
