//! Error types for presentation translation.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while transcoding a presentation package.
///
/// Slide-level and element-level problems are not errors; they are
/// reported as [`crate::Warning`] values alongside a successful result.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The input is not a readable package archive.
    #[error("Failed to load package: {0}")]
    PackageLoad(String),

    /// A part every presentation package must contain is absent.
    #[error("Required part missing from package: {0}")]
    MissingPart(String),

    /// A slide's XML could not be parsed.
    #[error("Text extraction error in {slide_id}: {message}")]
    Extraction { slide_id: String, message: String },

    /// The output package could not be produced, or failed its sanity check.
    #[error("Package generation error: {0}")]
    Generation(String),

    /// A translation provider failed to translate a text.
    #[error("Translation provider error: {0}")]
    Provider(String),

    /// Every requested language run failed.
    #[error("All {0} language runs failed")]
    AllLanguagesFailed(usize),
}

impl Error {
    /// Whether this error means the input package itself is unusable.
    pub fn is_package_load(&self) -> bool {
        matches!(self, Error::PackageLoad(_) | Error::MissingPart(_))
    }
}
