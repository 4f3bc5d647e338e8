//! Scopus export normalizer.
//!
//! Handles both author list styles found in Scopus exports: the older
//! `"Smith J., Doe A."` form and the newer `"Smith, J.; Doe, A."` form.
//!
//! # Example
//!
//! ```
//! use biblink::normalize::Normalizer;
//! use biblink::scopus::ScopusNormalizer;
//! use biblink::RawRecord;
//!
//! let raw = RawRecord::from_pairs([
//!     ("Title", "A Study"),
//!     ("Year", "2019"),
//!     ("Source title", "Nature"),
//!     ("Authors", "Smith J., Doe A."),
//!     ("Authors with affiliations", "Smith J., Univ X, London, United Kingdom; Doe A., Univ Y, Bogota, Colombia"),
//! ]);
//!
//! let record = ScopusNormalizer::new("scopus").parse_one(&raw);
//! assert_eq!(record.document.year_published, Some(2019));
//! assert_eq!(record.author_institutions[1].institutions[0].country, "CO");
//! ```

pub mod tags;

use crate::normalize::Normalizer;
use crate::raw::RawRecord;
use crate::scopus::tags::ScopusField;
use crate::utils::{format_doi, initials, normalize_text, parse_author_name, strip_serial, title_case};
use crate::vocab::{language_code, resolve_country};
use crate::{Abbreviation, Author, Document, ExternalId, Institution, SerialKind, Source};
use chrono::{TimeZone, Utc};
use tracing::warn;

const NO_AUTHOR: &str = "[No author name available]";
const NO_ABSTRACT: &str = "[No abstract available]";

/// Normalizer for Scopus export records.
#[derive(Debug, Clone)]
pub struct ScopusNormalizer {
    provider: String,
}

/// One entry of the `Authors` column.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AuthorEntry {
    alias: String,
    last: String,
    first: String,
}

impl ScopusNormalizer {
    #[must_use]
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
        }
    }

    /// Whether the export uses the `"Last, I.; Last, I."` author style.
    ///
    /// A single author has no `;`, so `"Smith, J."` is told apart from the older
    /// `"Smith J., Doe A."` style by the author id count, or else by the text after the
    /// first comma being given names only.
    fn semicolon_style(raw: &RawRecord) -> bool {
        let Some(authors) = raw.field(ScopusField::Authors) else {
            return false;
        };
        if authors.contains(';') {
            return true;
        }
        let Some((_, rest)) = authors.split_once(", ") else {
            return false;
        };
        let ids = raw.split(ScopusField::AuthorIds, ";");
        if !ids.is_empty() {
            return ids.len() == 1;
        }
        !rest.contains(", ")
            && (!rest.trim().contains(' ') || rest.split_whitespace().all(|token| token.ends_with('.')))
    }

    fn author_entries(raw: &RawRecord) -> Vec<AuthorEntry> {
        let Some(authors) = raw.field(ScopusField::Authors) else {
            return Vec::new();
        };
        if authors.trim() == NO_AUTHOR {
            return Vec::new();
        }

        if Self::semicolon_style(raw) {
            authors
                .split(';')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(|alias| {
                    let (last, first) = parse_author_name(alias);
                    AuthorEntry {
                        alias: alias.to_string(),
                        last,
                        first: first.replace('.', " ").trim().to_string(),
                    }
                })
                .collect()
        } else {
            authors
                .split(", ")
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(|alias| {
                    let (last, first) = match alias.rsplit_once(' ') {
                        Some((last, initials)) => (last.to_string(), initials.replace('.', " ")),
                        None => (alias.to_string(), String::new()),
                    };
                    AuthorEntry {
                        alias: alias.to_string(),
                        last,
                        first: first.trim().to_string(),
                    }
                })
                .collect()
        }
    }

    /// Splits the correspondence address into `(name, address, email)`.
    fn correspondence(raw: &RawRecord) -> Option<(String, String, String)> {
        let text = raw.field(ScopusField::CorrespondenceAddress)?;
        let mut parts = text.split(';').map(str::trim).filter(|p| !p.is_empty());
        let name = parts.next()?.to_string();
        let mut address = Vec::new();
        let mut email = String::new();
        for part in parts {
            match part.strip_prefix("email:") {
                Some(value) => email = value.trim().to_string(),
                None => address.push(part),
            }
        }
        Some((name, address.join("; "), email))
    }
}

impl Normalizer for ScopusNormalizer {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn parse_document(&self, raw: &RawRecord) -> Document {
        let mut languages = Vec::new();
        for token in raw.split(ScopusField::Language, ";") {
            match language_code(&token) {
                Some("") => {}
                Some(code) => {
                    if !languages.iter().any(|l| l == code) {
                        languages.push(code.to_string());
                    }
                }
                None => warn!(field = "Language", token = %token, "unknown language"),
            }
        }

        let mut keywords = raw.split(ScopusField::AuthorKeywords, ";");
        for keyword in raw.split(ScopusField::IndexKeywords, ";") {
            if !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }

        let abstract_text = raw
            .field(ScopusField::Abstract)
            .filter(|text| text.trim() != NO_ABSTRACT)
            .map(|text| text.trim().to_string())
            .unwrap_or_default();

        let year_published: Option<i32> = raw.parse(ScopusField::Year);
        let author_count = Self::author_entries(raw).len();

        let mut document = Document {
            updated: Utc::now().timestamp(),
            publication_type: raw
                .field_or_default(ScopusField::DocumentType)
                .trim()
                .to_lowercase(),
            title: raw.field_or_default(ScopusField::Title).trim().to_string(),
            abstract_text,
            keywords,
            start_page: raw.parse(ScopusField::PageStart),
            end_page: raw.parse(ScopusField::PageEnd),
            volume: raw.parse(ScopusField::Volume),
            issue: raw.parse(ScopusField::Issue),
            date_published: year_published.and_then(|year| {
                Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
                    .single()
                    .map(|date| date.timestamp())
            }),
            year_published,
            languages,
            citations_count: raw.parse(ScopusField::CitedBy),
            is_open_access: raw.field(ScopusField::OpenAccess).map(|_| true),
            urls: raw
                .field(ScopusField::Link)
                .map(|link| vec![link.trim().to_string()])
                .unwrap_or_default(),
            author_count: (author_count > 0).then_some(author_count),
            ..Default::default()
        };

        if let Some(doi) = raw.field(ScopusField::Doi).and_then(|d| format_doi(&d)) {
            document.add_external_id(ExternalId::new("doi", doi));
        }
        if let Some(eid) = raw.field(ScopusField::Eid) {
            document.add_external_id(ExternalId::new(self.provider.as_str(), eid.trim()));
        }

        document
    }

    fn parse_authors(&self, raw: &RawRecord) -> Vec<Author> {
        let entries = Self::author_entries(raw);
        let ids = raw.split(ScopusField::AuthorIds, ";");
        if !ids.is_empty() && ids.len() != entries.len() {
            warn!(
                provider = %self.provider,
                authors = entries.len(),
                ids = ids.len(),
                "author id list does not line up with author list"
            );
        }
        let correspondence = Self::correspondence(raw);
        let sole_author = entries.len() == 1;

        entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let last_names = title_case(&entry.last);
                let first_names = entry.first.clone();
                let mut author = Author {
                    initials: initials(&first_names),
                    full_name: format!("{first_names} {last_names}").trim().to_string(),
                    first_names,
                    last_names,
                    aliases: vec![entry.alias.clone()],
                    ..Default::default()
                };

                if let Some(id) = ids.get(index) {
                    author.external_ids.push(ExternalId::new("scopus", id.clone()));
                }

                let named = correspondence
                    .as_ref()
                    .is_some_and(|(name, _, _)| normalize_text(name) == normalize_text(&entry.alias));
                if sole_author || named {
                    author.corresponding = true;
                    if let Some((_, address, email)) = &correspondence {
                        author.corresponding_address = address.clone();
                        author.corresponding_email = email.clone();
                    }
                }
                author
            })
            .collect()
    }

    fn parse_institutions(&self, raw: &RawRecord) -> Vec<Institution> {
        // Each entry repeats the author name before the affiliation.
        let name_segments = if Self::semicolon_style(raw) { 2 } else { 1 };

        raw.split(ScopusField::AuthorsWithAffiliations, "; ")
            .into_iter()
            .filter_map(|entry| {
                let segments: Vec<&str> = entry.split(", ").map(str::trim).collect();
                if segments.len() <= name_segments {
                    warn!(field = "Authors with affiliations", entry = %entry, "affiliation without institution");
                    return None;
                }
                let alias = segments[..name_segments].join(", ");
                let name = segments[name_segments].to_string();
                let country = segments
                    .last()
                    .map(|last| resolve_country(last))
                    .unwrap_or("");
                Some(Institution {
                    name,
                    country: country.to_string(),
                    author_aliases: vec![alias],
                })
            })
            .collect()
    }

    fn parse_source(&self, raw: &RawRecord) -> Source {
        let document_type = raw.field_or_default(ScopusField::DocumentType);
        let source_type = match document_type.trim() {
            "Book" | "Book Chapter" => "book",
            "Conference Paper" | "Conference Review" => "conference",
            "" => "",
            _ => "journal",
        };

        let mut source = Source {
            title: raw.field_or_default(ScopusField::SourceTitle).trim().to_string(),
            source_type: source_type.to_string(),
            publisher: raw.field_or_default(ScopusField::Publisher).trim().to_string(),
            ..Default::default()
        };

        if let Some(issn) = raw.field(ScopusField::Issn) {
            source.add_serial(SerialKind::Pissn, strip_serial(&issn));
        }
        for isbn in raw.split(ScopusField::Isbn, ";") {
            source.add_serial(SerialKind::Isbn, strip_serial(&isbn));
        }
        if let Some(abbreviation) = raw.field(ScopusField::AbbreviatedSourceTitle) {
            source.abbreviations.push(Abbreviation {
                kind: "iso".to_string(),
                value: abbreviation.trim().to_string(),
            });
        }

        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn normalizer() -> ScopusNormalizer {
        ScopusNormalizer::new("scopus")
    }

    fn sample() -> RawRecord {
        RawRecord::from_pairs([
            ("Title", "A Study"),
            ("Year", "2019"),
            ("Source title", "Nature"),
            ("Volume", "571"),
            ("Issue", "7763"),
            ("Page start", "95"),
            ("Page end", "98"),
            ("Cited by", "12"),
            ("DOI", "10.1038/S41586-019-1335-8"),
            ("Link", "https://www.scopus.com/inward/record.uri?eid=2-s2.0-1"),
            ("Abstract", "[No abstract available]"),
            ("Author Keywords", "fuzzy; matching"),
            ("Index Keywords", "matching; linkage"),
            ("Language of Original Document", "English; Spanish"),
            ("Document Type", "Article"),
            ("EID", "2-s2.0-1"),
            ("Authors", "Smith J., Doe A."),
            ("Author(s) ID", "57190000001;57190000002;"),
            (
                "Authors with affiliations",
                "Smith J., Univ X, London, United Kingdom; Doe A., Univ Y, Bogota, Colombia",
            ),
            ("Correspondence Address", "Doe A.; Univ Y, Bogota, Colombia; email: doe@y.edu.co"),
            ("Publisher", "Nature Research"),
            ("ISSN", "00280836"),
            ("Abbreviated Source Title", "Nature"),
            ("Open Access", "All Open Access; Green Open Access"),
        ])
    }

    #[test]
    fn test_document() {
        let document = normalizer().parse_document(&sample());
        assert_eq!(document.title, "A Study");
        assert_eq!(document.publication_type, "article");
        assert_eq!(document.year_published, Some(2019));
        assert_eq!(document.volume, Some(571));
        assert_eq!(document.start_page, Some(95));
        assert_eq!(document.citations_count, Some(12));
        assert_eq!(document.abstract_text, "");
        assert_eq!(document.keywords, vec!["fuzzy", "matching", "linkage"]);
        assert_eq!(document.languages, vec!["en", "es"]);
        assert_eq!(document.author_count, Some(2));
        assert_eq!(document.is_open_access, Some(true));
        assert_eq!(document.doi(), Some("10.1038/s41586-019-1335-8"));
        assert!(document.external_ids.contains(&ExternalId::new("scopus", "2-s2.0-1")));
    }

    #[test]
    fn test_authors() {
        let authors = normalizer().parse_authors(&sample());
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[0].full_name, "J Smith");
        assert_eq!(authors[0].external_ids, vec![ExternalId::new("scopus", "57190000001")]);
        assert!(!authors[0].corresponding);
        assert!(authors[1].corresponding);
        assert_eq!(authors[1].corresponding_email, "doe@y.edu.co");
        assert_eq!(authors[1].corresponding_address, "Univ Y, Bogota, Colombia");
    }

    #[test]
    fn test_semicolon_author_style() {
        let raw = RawRecord::from_pairs([
            ("Authors", "Smith, J.; Doe, A.B."),
            ("Authors with affiliations", "Smith, J., Univ X, London, United Kingdom; Doe, A.B., Univ Y, Bogota, Colombia"),
        ]);
        let record = normalizer().parse_one(&raw);
        let author = &record.author_institutions[1].author;
        assert_eq!(author.last_names, "Doe");
        assert_eq!(author.initials, "AB");
        assert_eq!(record.author_institutions[0].institutions[0].name, "Univ X");
        assert_eq!(record.author_institutions[1].institutions[0].country, "CO");
    }

    #[rstest]
    #[case(&[("Authors", "Smith, J.")])]
    #[case(&[("Authors", "Smith, John")])]
    #[case(&[("Authors", "Smith, J. A.")])]
    #[case(&[("Authors", "Smith, J"), ("Author(s) ID", "57190000001;")])]
    fn test_single_author_semicolon_style(#[case] pairs: &[(&str, &str)]) {
        let mut pairs = pairs.to_vec();
        pairs.push(("Authors with affiliations", "Smith, J., Univ X, Medellin, Colombia"));
        let raw = RawRecord::from_pairs(pairs);

        let authors = normalizer().parse_authors(&raw);
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].last_names, "Smith");
        assert!(authors[0].corresponding);
        assert_eq!(normalizer().parse_document(&raw).author_count, Some(1));

        let institutions = normalizer().parse_institutions(&raw);
        assert_eq!(institutions.len(), 1);
        assert_eq!(institutions[0].name, "Univ X");
        assert_eq!(institutions[0].country, "CO");
    }

    #[test]
    fn test_two_authors_older_style_without_semicolon() {
        let raw = RawRecord::from_pairs([("Authors", "Smith J., Doe A.")]);
        assert_eq!(normalizer().parse_authors(&raw).len(), 2);
        let raw = RawRecord::from_pairs([("Authors", "Smith J., Doe"), ("Author(s) ID", "1;2")]);
        assert_eq!(normalizer().parse_authors(&raw).len(), 2);
    }

    #[test]
    fn test_institutions_paired() {
        let record = normalizer().parse_one(&sample());
        assert_eq!(record.author_institutions[0].institutions[0].name, "Univ X");
        assert_eq!(record.author_institutions[0].institutions[0].country, "GB");
        assert_eq!(record.author_institutions[1].institutions[0].name, "Univ Y");
    }

    #[test]
    fn test_source() {
        let source = normalizer().parse_source(&sample());
        assert_eq!(source.title, "Nature");
        assert_eq!(source.source_type, "journal");
        assert_eq!(source.serials.len(), 1);
        assert_eq!(source.serials[0].value, "00280836");
        assert_eq!(source.abbreviations[0].kind, "iso");

        let chapter = RawRecord::from_pairs([("Document Type", "Book Chapter"), ("ISBN", "978-3-16-148410-0; 9783161484101")]);
        let source = normalizer().parse_source(&chapter);
        assert_eq!(source.source_type, "book");
        assert_eq!(source.serials.len(), 2);
    }

    #[test]
    fn test_missing_fields() {
        let raw = RawRecord::from_pairs([("Authors", "[No author name available]"), ("Volume", "n/a")]);
        let normalizer = normalizer();
        let document = normalizer.parse_document(&raw);
        assert_eq!(document.author_count, None);
        assert_eq!(document.volume, None);
        assert!(normalizer.parse_authors(&raw).is_empty());
        assert!(normalizer.parse_institutions(&raw).is_empty());
    }
}
