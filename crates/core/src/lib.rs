//! Core domain types, translation sets and the translation matching policy
//! for presentation translation.

pub mod error;
pub mod mapper;
pub mod provider;
pub mod text;
pub mod translation_set;
pub mod types;

pub use error::{Error, Result};
pub use mapper::{MatchStrategy, Resolution, TranslationMapper};
pub use provider::{DictionaryProvider, TranslationProvider};
pub use translation_set::{TextMap, TranslationSet};
pub use types::{
    ElementType, GeneratedPackage, Slide, StyleInfo, TextElement, TranslationStats, Warning,
};
