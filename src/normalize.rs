//! Normalization of raw provider records into the canonical schema.
//!
//! Every raw format implements [`Normalizer`], which splits one [`RawRecord`] into a
//! [`Document`], its authors, their institutions and the containing [`Source`].
//! Normalizers never fail a record: missing fields fall back to defaults and
//! malformed scalars are logged and skipped.
//!
//! # Example
//!
//! ```
//! use biblink::normalize::{Format, Normalizer};
//! use biblink::config::NormalizerConfig;
//! use biblink::RawRecord;
//!
//! let raw = RawRecord::from_pairs([("DT", "Article"), ("TI", "Sample Title"), ("AU", "Smith, J")]);
//! let normalizer = Format::Wos.normalizer("wos", &NormalizerConfig::default());
//! let record = normalizer.parse_one(&raw);
//! assert_eq!(record.document.title, "Sample Title");
//! assert!(record.author_institutions[0].author.corresponding);
//! ```

use crate::config::NormalizerConfig;
use crate::pool::Fingerprint;
use crate::raw::RawRecord;
use crate::scopus::ScopusNormalizer;
use crate::scopus::tags::ScopusField;
use crate::utils::normalize_text;
use crate::wos::WosNormalizer;
use crate::wos::tags::WosTag;
use crate::{Author, Document, Institution, Source};
use serde::{Deserialize, Serialize};

/// Raw formats with a normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Web of Science tagged records, also used by SciELO
    Wos,
    /// Scopus CSV/JSON exports keyed by column name
    Scopus,
}

impl Format {
    /// Builds the normalizer for records of this format coming from `provider`.
    pub fn normalizer(self, provider: &str, config: &NormalizerConfig) -> Box<dyn Normalizer> {
        match self {
            Format::Wos => Box::new(WosNormalizer::new(provider).with_config(config.clone())),
            Format::Scopus => Box::new(ScopusNormalizer::new(provider)),
        }
    }

    /// Whether the normalizer of this format reads the given field code.
    pub fn knows_field(self, code: &str) -> bool {
        match self {
            Format::Wos => WosTag::from_tag(code).is_some(),
            Format::Scopus => ScopusField::from_column(code).is_some(),
        }
    }

    /// Field codes of a record that the normalizer of this format ignores.
    pub fn unread_fields(self, raw: &RawRecord) -> Vec<&str> {
        raw.codes().filter(|code| !self.knows_field(code)).collect()
    }
}

/// Converts one raw record of a given format into canonical sub-entities.
pub trait Normalizer: Send + Sync {
    /// Name of the provider whose records this normalizer reads.
    fn provider(&self) -> &str;

    fn parse_document(&self, raw: &RawRecord) -> Document;

    fn parse_authors(&self, raw: &RawRecord) -> Vec<Author>;

    fn parse_institutions(&self, raw: &RawRecord) -> Vec<Institution>;

    fn parse_source(&self, raw: &RawRecord) -> Source;

    /// Parses every sub-entity and pairs authors with their institutions.
    fn parse_one(&self, raw: &RawRecord) -> NormalizedRecord {
        let authors = self.parse_authors(raw);
        let institutions = self.parse_institutions(raw);
        NormalizedRecord {
            provider: self.provider().to_string(),
            document: self.parse_document(raw),
            author_institutions: pair_authors_institutions(authors, &institutions),
            source: self.parse_source(raw),
        }
    }

    /// Normalized DOI of a raw record.
    fn doi(&self, raw: &RawRecord) -> Option<String> {
        self.parse_document(raw).doi().map(String::from)
    }

    /// The (title, source, year) fingerprint of a raw record.
    fn fingerprint(&self, raw: &RawRecord) -> Fingerprint {
        let document = self.parse_document(raw);
        Fingerprint {
            title: document.title,
            source: self.parse_source(raw).title,
            year: document.year_published,
        }
    }
}

/// An author together with the institutions listed against them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorAffiliation {
    pub author: Author,
    pub institutions: Vec<Institution>,
}

/// Canonical sub-entities of one raw record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub provider: String,
    pub document: Document,
    pub author_institutions: Vec<AuthorAffiliation>,
    pub source: Source,
}

/// Associates each author with the institutions whose author aliases name them.
///
/// Aliases are compared after [`normalize_text`], so case and punctuation differences
/// between the author list and the affiliation blocks do not matter.
pub fn pair_authors_institutions(
    authors: Vec<Author>,
    institutions: &[Institution],
) -> Vec<AuthorAffiliation> {
    authors
        .into_iter()
        .map(|author| {
            let keys: Vec<String> = author
                .aliases
                .iter()
                .map(|alias| normalize_text(alias))
                .filter(|key| !key.is_empty())
                .collect();
            let institutions = institutions
                .iter()
                .filter(|inst| {
                    inst.author_aliases
                        .iter()
                        .any(|alias| keys.contains(&normalize_text(alias)))
                })
                .cloned()
                .collect();
            AuthorAffiliation {
                author,
                institutions,
            }
        })
        .collect()
}
