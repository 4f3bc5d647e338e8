//! Reconcile bibliographic records from heterogeneous raw providers into one canonical schema.
//!
//! `biblink` takes raw records exported by citation indexes (Web of Science, SciELO, Scopus),
//! normalizes them into canonical documents, authors, institutions and sources, finds the
//! same work across providers even when the DOI is missing, links the sub-entities to what
//! is already persisted and writes the unified view into a document store.
//!
//! # Key Features
//!
//! - **Format normalizers** for tagged Web of Science/SciELO records and Scopus exports,
//!   tolerant to missing or malformed fields
//! - **Similarity matching** on a (title, source, year) fingerprint with deterministic
//!   tie-breaking and at-most-once consumption of candidates
//! - **Linking** of authors, institutions and sources by identifier or fuzzy name
//! - **Batch orchestration**, sequential or on a thread pool, with a per-record status report
//!
//! # Basic Usage
//!
//! ```rust
//! use biblink::pipeline::{Input, Pipeline};
//! use biblink::store::MemoryStore;
//! use biblink::{EtlConfig, RawRecord};
//!
//! let store = MemoryStore::new();
//! store.add_raw(
//!     "wos",
//!     "WOS:0001",
//!     RawRecord::from_pairs([("TI", "Sample Title"), ("PY", "2020"), ("DI", "10.1000/xyz")]),
//! );
//!
//! let pipeline = Pipeline::new(store, EtlConfig::default()).unwrap();
//! let report = pipeline.run(&[Input::Doi("10.1000/xyz".to_string())]);
//! assert_eq!(report.successes().count(), 1);
//! ```
//!
//! # Error Handling
//!
//! Field-level problems never fail a record: malformed scalars are logged with
//! [`tracing`] and left at their defaults. Record-level failures surface as [`EtlError`]
//! and are collected into the run report instead of aborting the batch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "csv")]
extern crate csv as csv_crate;

pub mod config;
#[cfg(feature = "csv")]
pub mod csv;
pub mod link;
pub mod matcher;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod pool;
pub mod raw;
pub mod scopus;
pub mod store;
pub mod vocab;
pub mod wos;
mod regex;
mod utils;

// Reexports
pub use config::EtlConfig;
pub use normalize::{Format, NormalizedRecord, Normalizer};
pub use pool::Fingerprint;
pub use raw::{RawRecord, RawValue};

/// A specialized Result type for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Identifier of an entity persisted in a [`store::DocumentStore`].
pub type EntityId = String;

/// Errors raised at record or run level.
///
/// Field-level parse problems are not represented here; normalizers recover from
/// those locally.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    InvalidFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field value: {field} - {message}")]
    InvalidFieldValue { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("No raw record found: {0}")]
    NotFound(String),

    #[error("Raw record already merged in this run: {0}")]
    AlreadyMerged(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Error: {0}")]
    Other(String),
}

#[cfg(feature = "csv")]
impl From<csv_crate::Error> for EtlError {
    fn from(err: csv_crate::Error) -> Self {
        EtlError::InvalidFormat(err.to_string())
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        EtlError::InvalidFormat(err.to_string())
    }
}

impl From<toml::de::Error> for EtlError {
    fn from(err: toml::de::Error) -> Self {
        EtlError::Config(err.to_string())
    }
}

/// An identifier issued by an external system (DOI, provider record id, ORCID, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalId {
    /// Issuer of the identifier, e.g. `doi`, `orcid`, `wos`
    pub source: String,
    pub id: String,
}

impl ExternalId {
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            id: id.into(),
        }
    }
}

/// Provenance entry recording that a raw provider record was merged into a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCheck {
    pub source: String,
    pub id: String,
    /// Unix timestamp (seconds) of the merge
    pub ts: i64,
}

/// Resolved authorship of a persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAuthor {
    pub id: EntityId,
    pub affiliations: Vec<EntityId>,
}

/// Canonical representation of a scholarly work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unix timestamp (seconds) of the last normalization
    pub updated: i64,
    /// Raw provenances merged into this document, in merge order
    pub source_checked: Vec<SourceCheck>,
    pub publication_type: String,
    pub title: String,
    pub subtitle: String,
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub start_page: Option<u32>,
    pub end_page: Option<u32>,
    pub volume: Option<u32>,
    pub issue: Option<u32>,
    pub date_published: Option<i64>,
    pub year_published: Option<i32>,
    /// ISO 639-1 codes
    pub languages: Vec<String>,
    pub references_count: Option<u32>,
    pub citations_count: Option<u32>,
    pub funding_details: String,
    pub is_open_access: Option<bool>,
    pub external_ids: Vec<ExternalId>,
    pub urls: Vec<String>,
    pub author_count: Option<usize>,
    /// Filled when the document is persisted
    pub authors: Vec<DocumentAuthor>,
    /// Filled when the document is persisted
    pub source_id: Option<EntityId>,
}

impl Document {
    /// Adds an external id unless the same source+id pair is already present.
    ///
    /// Returns `true` if the id was added.
    pub fn add_external_id(&mut self, ext: ExternalId) -> bool {
        if self.external_ids.contains(&ext) {
            return false;
        }
        self.external_ids.push(ext);
        true
    }

    /// Appends a provenance entry unless one already exists for the same source+id pair.
    ///
    /// Returns `true` if the entry was appended.
    pub fn add_source_check(&mut self, source: &str, id: &str, ts: i64) -> bool {
        if self
            .source_checked
            .iter()
            .any(|check| check.source == source && check.id == id)
        {
            return false;
        }
        self.source_checked.push(SourceCheck {
            source: source.to_string(),
            id: id.to_string(),
            ts,
        });
        true
    }

    /// The DOI among the external ids, if any.
    pub fn doi(&self) -> Option<&str> {
        self.external_ids
            .iter()
            .find(|ext| ext.source == "doi")
            .map(|ext| ext.id.as_str())
    }
}

/// Canonical author of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub first_names: String,
    pub last_names: String,
    pub initials: String,
    pub full_name: String,
    /// Raw name strings this author appeared under
    pub aliases: Vec<String>,
    pub external_ids: Vec<ExternalId>,
    pub corresponding: bool,
    pub corresponding_address: String,
    pub corresponding_email: String,
    /// Filled when the author is persisted
    pub affiliations: Vec<EntityId>,
}

impl Author {
    /// The author's name in `"Last, First"` form, used for fuzzy id matching.
    pub fn last_first(&self) -> String {
        format!("{}, {}", self.last_names, self.first_names)
    }
}

/// Canonical institution an author is affiliated with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub name: String,
    /// ISO 3166-1 alpha-2 code, empty when unresolved
    pub country: String,
    /// Raw author names listed against this affiliation
    pub author_aliases: Vec<String>,
}

/// Kind of a serial identifier of a [`Source`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialKind {
    Pissn,
    Eissn,
    Isbn,
}

impl SerialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SerialKind::Pissn => "pissn",
            SerialKind::Eissn => "eissn",
            SerialKind::Isbn => "isbn",
        }
    }
}

/// Serial identifier with hyphens stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Serial {
    pub kind: SerialKind,
    pub value: String,
}

/// Abbreviated title of a [`Source`], e.g. `char` (J9) or `iso` (JI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abbreviation {
    pub kind: String,
    pub value: String,
}

/// Container publication: journal, book, series or patent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub source_type: String,
    pub serials: Vec<Serial>,
    pub abbreviations: Vec<Abbreviation>,
    pub publisher: String,
    pub country: String,
    pub subjects: Vec<String>,
}

impl Source {
    /// Adds a serial unless it is empty or already present.
    pub fn add_serial(&mut self, kind: SerialKind, value: String) {
        if value.is_empty() {
            return;
        }
        let serial = Serial { kind, value };
        if !self.serials.contains(&serial) {
            self.serials.push(serial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = EtlError::InvalidFormat("Invalid line".to_string());
        assert_eq!(error.to_string(), "Parse error: Invalid line");
        let error = EtlError::UnknownProvider("lens".to_string());
        assert_eq!(error.to_string(), "Unknown provider: lens");
    }

    #[test]
    fn test_source_check_is_not_duplicated() {
        let mut doc = Document::default();
        assert!(doc.add_source_check("wos", "1", 10));
        assert!(!doc.add_source_check("wos", "1", 20));
        assert!(doc.add_source_check("wos", "2", 20));
        assert!(doc.add_source_check("scopus", "1", 20));
        assert_eq!(doc.source_checked.len(), 3);
        assert_eq!(doc.source_checked[0].ts, 10);
    }

    #[test]
    fn test_external_ids_unique() {
        let mut doc = Document::default();
        assert!(doc.add_external_id(ExternalId::new("doi", "10.1/a")));
        assert!(!doc.add_external_id(ExternalId::new("doi", "10.1/a")));
        assert_eq!(doc.doi(), Some("10.1/a"));
    }

    #[test]
    fn test_author_last_first() {
        let author = Author {
            first_names: "John".to_string(),
            last_names: "Smith".to_string(),
            ..Default::default()
        };
        assert_eq!(author.last_first(), "Smith, John");
    }
}
