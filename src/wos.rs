//! Web of Science tagged-format normalizer.
//!
//! Reads records keyed by the two-letter WoS field tags. SciELO Citation Index exports
//! use the same tags, so one normalizer serves both providers; the provider name only
//! changes the issuer of the accession-number id.
//!
//! # Example
//!
//! ```
//! use biblink::normalize::Normalizer;
//! use biblink::wos::WosNormalizer;
//! use biblink::RawRecord;
//!
//! let raw = RawRecord::from_pairs([
//!     ("PT", "J"),
//!     ("DT", "Article"),
//!     ("TI", "Sample Title"),
//!     ("AF", "Smith, John\nDoe, Jane"),
//!     ("C1", "[Smith, John; Doe, Jane] Univ X, ENGLAND"),
//! ]);
//!
//! let normalizer = WosNormalizer::new("wos");
//! let record = normalizer.parse_one(&raw);
//! assert_eq!(record.document.publication_type, "article");
//! assert_eq!(record.author_institutions.len(), 2);
//! assert_eq!(record.author_institutions[1].institutions[0].country, "GB");
//! ```

pub mod affiliation;
pub mod tags;

use crate::config::NormalizerConfig;
use crate::normalize::Normalizer;
use crate::raw::RawRecord;
use crate::utils::{
    format_doi, initials, normalize_text, parse_author_name, partial_ratio, strip_serial, title_case,
};
use crate::vocab::language_code;
use crate::wos::affiliation::parse_address_blocks;
use crate::wos::tags::{WosPublicationType, WosTag};
use crate::{Abbreviation, Author, Document, ExternalId, Institution, SerialKind, Source};
use chrono::{TimeZone, Utc};
use tracing::{debug, warn};

/// Normalizer for Web of Science and SciELO tagged records.
#[derive(Debug, Clone)]
pub struct WosNormalizer {
    provider: String,
    config: NormalizerConfig,
}

impl WosNormalizer {
    #[must_use]
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            config: NormalizerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: NormalizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Raw author lines, full names preferred over the short `AU` form.
    fn author_lines(raw: &RawRecord) -> Vec<String> {
        let full = raw.lines(WosTag::AuthorFullName);
        if !full.is_empty() {
            return full;
        }
        raw.lines(WosTag::Author)
            .into_iter()
            .map(|line| line.to_lowercase())
            .collect()
    }

    /// `(name, id)` entries of a researcher-id field.
    fn id_candidates(raw: &RawRecord, tag: WosTag, separator: &str) -> Vec<(String, String)> {
        raw.split(tag, separator)
            .into_iter()
            .filter_map(|entry| match entry.split_once('/') {
                Some((name, id)) if !name.trim().is_empty() && !id.trim().is_empty() => {
                    Some((name.trim().to_string(), id.trim().to_string()))
                }
                _ => {
                    warn!(field = tag.as_tag(), entry = %entry, "malformed researcher id entry");
                    None
                }
            })
            .collect()
    }

    fn attach_id(&self, author: &mut Author, source: &str, candidates: &[(String, String)]) {
        let name = author.last_first();
        if let Some((_, id)) = candidates
            .iter()
            .find(|(candidate, _)| partial_ratio(candidate, &name) >= self.config.id_match_threshold)
        {
            author.external_ids.push(ExternalId::new(source, id.clone()));
        }
    }
}

impl Normalizer for WosNormalizer {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn parse_document(&self, raw: &RawRecord) -> Document {
        let publication_code = raw
            .field(WosTag::PublicationType)
            .and_then(|code| WosPublicationType::from_code(&code));

        let publication_type = match publication_code {
            Some(WosPublicationType::Journal) | None => raw
                .field_or_default(WosTag::DocumentType)
                .trim()
                .to_lowercase(),
            Some(other) => other.source_type().to_string(),
        };

        let author_count = match publication_code {
            Some(WosPublicationType::Book) => {
                let book_authors = raw.lines(WosTag::BookAuthor);
                if book_authors.is_empty() {
                    raw.lines(WosTag::Author).len()
                } else {
                    book_authors.len()
                }
            }
            _ => raw.lines(WosTag::Author).len(),
        };

        let mut languages = Vec::new();
        for token in raw.lines(WosTag::Language) {
            match language_code(&token) {
                Some("") => {}
                Some(code) => {
                    if !languages.iter().any(|l| l == code) {
                        languages.push(code.to_string());
                    }
                }
                None => warn!(field = "LA", token = %token, "unknown language"),
            }
        }

        let year_published: Option<i32> = raw.parse(WosTag::PublicationYear);
        let date_published = year_published.and_then(|year| {
            Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
                .single()
                .map(|date| date.timestamp())
        });

        let mut keywords = raw.split(WosTag::AuthorKeywords, "; ");
        for keyword in raw.split(WosTag::KeywordsPlus, "; ") {
            if !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }

        let mut document = Document {
            updated: Utc::now().timestamp(),
            publication_type,
            title: raw.field_or_default(WosTag::Title).trim().to_string(),
            abstract_text: raw.field_or_default(WosTag::Abstract).trim().to_string(),
            keywords,
            start_page: raw.parse(WosTag::BeginningPage),
            end_page: raw.parse(WosTag::EndingPage),
            volume: raw.parse(WosTag::Volume),
            issue: raw.parse(WosTag::Issue),
            date_published,
            year_published,
            languages,
            references_count: raw.parse(WosTag::ReferenceCount),
            citations_count: raw.parse(WosTag::TimesCited),
            funding_details: raw.field_or_default(WosTag::Funding).trim().to_string(),
            is_open_access: raw.field(WosTag::OpenAccess).map(|_| true),
            author_count: (author_count > 0).then_some(author_count),
            ..Default::default()
        };

        if let Some(doi) = raw.field(WosTag::Doi).and_then(|d| format_doi(&d)) {
            document.add_external_id(ExternalId::new("doi", doi));
        }
        if let Some(doi) = raw.field(WosTag::BookDoi).and_then(|d| format_doi(&d)) {
            document.add_external_id(ExternalId::new("book_doi", doi));
        }
        if let Some(accession) = raw.field(WosTag::AccessionNumber) {
            let id = accession
                .split_once(':')
                .map_or(&*accession, |(_, id)| id)
                .trim();
            if !id.is_empty() {
                document.add_external_id(ExternalId::new(self.provider.as_str(), id));
            }
        }

        document
    }

    fn parse_authors(&self, raw: &RawRecord) -> Vec<Author> {
        let full_lines = Self::author_lines(raw);
        let short_lines = raw.lines(WosTag::Author);
        let researcher_ids = Self::id_candidates(raw, WosTag::ResearcherId, "; ");
        let orcids = Self::id_candidates(raw, WosTag::Orcid, ";");

        let reprint = raw.field_or_default(WosTag::ReprintAddress);
        let corresponding_last = normalize_text(reprint.split(',').next().unwrap_or(""));
        let corresponding_address = reprint
            .split_once("), ")
            .map(|(_, address)| address.trim().to_string())
            .unwrap_or_default();
        let corresponding_email = raw
            .split(WosTag::Email, ";")
            .into_iter()
            .next()
            .unwrap_or_default();

        let sole_author = full_lines.len() == 1;
        let mut authors = Vec::with_capacity(full_lines.len());
        for (index, line) in full_lines.iter().enumerate() {
            let (last, first) = parse_author_name(line);
            let last_names = title_case(&last);
            let first_names = title_case(&first);
            let full_name = format!("{first_names} {last_names}").trim().to_string();

            let mut aliases = vec![line.clone()];
            if let Some(short) = short_lines.get(index) {
                if !aliases.contains(short) {
                    aliases.push(short.clone());
                }
            }

            let mut author = Author {
                initials: initials(&first_names),
                first_names,
                last_names,
                full_name,
                aliases,
                ..Default::default()
            };

            let named_in_reprint = !corresponding_last.is_empty()
                && reprint_names_author(&author.last_names, &corresponding_last);
            if sole_author || named_in_reprint {
                author.corresponding = true;
                author.corresponding_address = corresponding_address.clone();
                author.corresponding_email = corresponding_email.clone();
            }

            self.attach_id(&mut author, "researcherid", &researcher_ids);
            self.attach_id(&mut author, "orcid", &orcids);
            authors.push(author);
        }

        debug!(provider = %self.provider, count = authors.len(), "parsed authors");
        authors
    }

    fn parse_institutions(&self, raw: &RawRecord) -> Vec<Institution> {
        let Some(c1) = raw.field(WosTag::AuthorAddress) else {
            return Vec::new();
        };
        let author_lines = Self::author_lines(raw);
        let sole_author = match author_lines.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };

        parse_address_blocks(&c1)
            .into_iter()
            .filter(|block| !block.institution_name().is_empty())
            .map(|block| {
                let author_aliases = if block.authors.is_empty() {
                    sole_author.iter().cloned().collect()
                } else {
                    block.authors.clone()
                };
                Institution {
                    name: block.institution_name().to_string(),
                    country: block.country_code().to_string(),
                    author_aliases,
                }
            })
            .collect()
    }

    fn parse_source(&self, raw: &RawRecord) -> Source {
        let mut source = Source {
            title: raw.field_or_default(WosTag::SourceTitle).trim().to_string(),
            source_type: raw
                .field(WosTag::PublicationType)
                .and_then(|code| WosPublicationType::from_code(&code))
                .map(|kind| kind.source_type().to_string())
                .unwrap_or_default(),
            publisher: raw.field_or_default(WosTag::Publisher).trim().to_string(),
            subjects: raw.split(WosTag::Categories, "; "),
            ..Default::default()
        };

        let serials = [
            (WosTag::Issn, SerialKind::Pissn),
            (WosTag::Eissn, SerialKind::Eissn),
            (WosTag::Isbn, SerialKind::Isbn),
        ];
        for (tag, kind) in serials {
            if let Some(value) = raw.field(tag) {
                source.add_serial(kind, strip_serial(&value));
            }
        }

        let abbreviations = [
            (WosTag::SourceAbbreviation, "char"),
            (WosTag::IsoSourceAbbreviation, "iso"),
        ];
        for (tag, kind) in abbreviations {
            if let Some(value) = raw.field(tag) {
                source.abbreviations.push(Abbreviation {
                    kind: kind.to_string(),
                    value: value.trim().to_string(),
                });
            }
        }

        source
    }
}

/// Whether the normalized reprint last name is the author's last name or one of its parts.
fn reprint_names_author(last_names: &str, reprint_last: &str) -> bool {
    normalize_text(last_names) == reprint_last
        || last_names
            .split(|c: char| c.is_whitespace() || c == '-')
            .any(|part| normalize_text(part) == reprint_last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalizer() -> WosNormalizer {
        WosNormalizer::new("wos")
    }

    #[test]
    fn test_sole_author_article() {
        let raw = RawRecord::from_pairs([
            ("DT", "ART"),
            ("TI", "Sample Title"),
            ("PY", "2020"),
            ("AU", "Smith, J"),
        ]);
        let normalizer = normalizer();

        let document = normalizer.parse_document(&raw);
        assert_eq!(document.publication_type, "art");
        assert_eq!(document.title, "Sample Title");
        assert_eq!(document.year_published, Some(2020));
        assert_eq!(document.author_count, Some(1));
        assert_eq!(document.date_published, Some(1577836800));

        let authors = normalizer.parse_authors(&raw);
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].full_name, "J Smith");
        assert_eq!(authors[0].last_names, "Smith");
        assert_eq!(authors[0].initials, "J");
        assert!(authors[0].corresponding);
    }

    #[test]
    fn test_bracketed_affiliation() {
        let raw = RawRecord::from_pairs([
            ("AU", "Smith, J\nDoe, A"),
            ("C1", "[Smith, J] Univ X, ENGLAND"),
        ]);
        let institutions = normalizer().parse_institutions(&raw);
        assert_eq!(
            institutions,
            vec![Institution {
                name: "Univ X".to_string(),
                country: "GB".to_string(),
                author_aliases: vec!["Smith, J".to_string()],
            }]
        );

        let record = normalizer().parse_one(&raw);
        assert_eq!(record.author_institutions[0].institutions.len(), 1);
        assert!(record.author_institutions[1].institutions.is_empty());
    }

    #[test]
    fn test_implicit_sole_author_affiliation() {
        let raw = RawRecord::from_pairs([
            ("AF", "Perez, Maria"),
            ("C1", "Univ Antioquia, Fac Med, Medellin, Colombia."),
        ]);
        let record = normalizer().parse_one(&raw);
        let institutions = &record.author_institutions[0].institutions;
        assert_eq!(institutions.len(), 1);
        assert_eq!(institutions[0].name, "Univ Antioquia");
        assert_eq!(institutions[0].country, "CO");
    }

    #[test]
    fn test_no_brackets_several_authors() {
        let raw = RawRecord::from_pairs([
            ("AF", "Perez, Maria\nGomez, Juan"),
            ("C1", "Univ Antioquia, Medellin, Colombia"),
        ]);
        let institutions = normalizer().parse_institutions(&raw);
        assert_eq!(institutions.len(), 1);
        assert!(institutions[0].author_aliases.is_empty());
    }

    #[test]
    fn test_missing_fields_default() {
        let raw = RawRecord::default();
        let normalizer = normalizer();
        let document = normalizer.parse_document(&raw);
        assert_eq!(document.title, "");
        assert_eq!(document.publication_type, "");
        assert_eq!(document.year_published, None);
        assert_eq!(document.author_count, None);
        assert!(document.external_ids.is_empty());
        assert!(normalizer.parse_authors(&raw).is_empty());
        assert!(normalizer.parse_institutions(&raw).is_empty());
        assert_eq!(normalizer.parse_source(&raw).title, "");
    }

    #[test]
    fn test_malformed_scalars_are_skipped() {
        let raw = RawRecord::from_pairs([
            ("TI", "Pages"),
            ("BP", "e1234"),
            ("EP", "12"),
            ("VL", "Suppl 1"),
            ("PY", "in press"),
        ]);
        let document = normalizer().parse_document(&raw);
        assert_eq!(document.start_page, None);
        assert_eq!(document.end_page, Some(12));
        assert_eq!(document.volume, None);
        assert_eq!(document.year_published, None);
        assert_eq!(document.date_published, None);
    }

    #[test]
    fn test_publication_types() {
        let book = RawRecord::from_pairs([("PT", "B"), ("DT", "Book"), ("AU", "A, B\nC, D"), ("BA", "E, F")]);
        let document = normalizer().parse_document(&book);
        assert_eq!(document.publication_type, "book");
        assert_eq!(document.author_count, Some(1));

        let book_without_ba = RawRecord::from_pairs([("PT", "B"), ("AU", "A, B\nC, D")]);
        assert_eq!(normalizer().parse_document(&book_without_ba).author_count, Some(2));

        let journal = RawRecord::from_pairs([("PT", "J"), ("DT", "Review")]);
        assert_eq!(normalizer().parse_document(&journal).publication_type, "review");
        assert_eq!(normalizer().parse_source(&journal).source_type, "journal");

        let patent = RawRecord::from_pairs([("PT", "P")]);
        assert_eq!(normalizer().parse_document(&patent).publication_type, "patent");
    }

    #[test]
    fn test_languages() {
        let raw = RawRecord::from_pairs([("LA", "English\nUnspecified\nKlingon\nSpanish")]);
        assert_eq!(normalizer().parse_document(&raw).languages, vec!["en", "es"]);
    }

    #[test]
    fn test_external_ids() {
        let raw = RawRecord::from_pairs([
            ("DI", "10.1000/ABC"),
            ("D2", "10.1000/book"),
            ("UT", "WOS:000123456"),
        ]);
        let document = WosNormalizer::new("scielo").parse_document(&raw);
        assert_eq!(
            document.external_ids,
            vec![
                ExternalId::new("doi", "10.1000/abc"),
                ExternalId::new("book_doi", "10.1000/book"),
                ExternalId::new("scielo", "000123456"),
            ]
        );
    }

    #[test]
    fn test_researcher_ids_fuzzy_attached() {
        let raw = RawRecord::from_pairs([
            ("AF", "Smith, John\nDoe, Jane"),
            ("RI", "Doe, Jane/A-1234-2010; bogus entry"),
            ("OI", "Smith, John/0000-0001-2345-6789;Nobody, Else/0000-0000-0000-0000"),
        ]);
        let authors = normalizer().parse_authors(&raw);
        assert_eq!(
            authors[0].external_ids,
            vec![ExternalId::new("orcid", "0000-0001-2345-6789")]
        );
        assert_eq!(
            authors[1].external_ids,
            vec![ExternalId::new("researcherid", "A-1234-2010")]
        );
    }

    #[test]
    fn test_corresponding_author_from_reprint() {
        let raw = RawRecord::from_pairs([
            ("AF", "Smith, John\nDoe, Jane"),
            ("RP", "Doe, J (corresponding author), Univ X, London, England."),
            ("EM", "jane@x.ac.uk; other@x.ac.uk"),
        ]);
        let authors = normalizer().parse_authors(&raw);
        assert!(!authors[0].corresponding);
        assert!(authors[1].corresponding);
        assert_eq!(authors[1].corresponding_email, "jane@x.ac.uk");
        assert_eq!(authors[1].corresponding_address, "Univ X, London, England.");
    }

    #[test]
    fn test_reprint_does_not_match_name_prefixes() {
        let raw = RawRecord::from_pairs([
            ("AF", "Li, Wei\nLin, Hao\nGarcia Lopez, Ana"),
            ("RP", "Lin, H (corresponding author), Zhejiang Univ, Hangzhou, Peoples R China."),
        ]);
        let authors = normalizer().parse_authors(&raw);
        assert!(!authors[0].corresponding);
        assert!(authors[1].corresponding);
        assert!(!authors[2].corresponding);

        let raw = RawRecord::from_pairs([
            ("AF", "Lin, Hao\nGarcia Lopez, Ana"),
            ("RP", "Garcia, A (corresponding author), Univ Valencia, Valencia, Spain."),
        ]);
        let authors = normalizer().parse_authors(&raw);
        assert!(!authors[0].corresponding);
        assert!(authors[1].corresponding);
    }

    #[test]
    fn test_source() {
        let raw = RawRecord::from_pairs([
            ("PT", "J"),
            ("SO", "NATURE"),
            ("PU", "NATURE PORTFOLIO"),
            ("SN", "0028-0836"),
            ("EI", "1476-4687"),
            ("J9", "NATURE"),
            ("JI", "Nature"),
            ("WC", "Multidisciplinary Sciences; Biology"),
        ]);
        let source = normalizer().parse_source(&raw);
        assert_eq!(source.title, "NATURE");
        assert_eq!(source.source_type, "journal");
        assert_eq!(source.publisher, "NATURE PORTFOLIO");
        assert_eq!(source.serials.len(), 2);
        assert_eq!(source.serials[0].value, "00280836");
        assert_eq!(source.serials[1].kind, SerialKind::Eissn);
        assert_eq!(source.abbreviations.len(), 2);
        assert_eq!(source.subjects, vec!["Multidisciplinary Sciences", "Biology"]);
    }

    #[test]
    fn test_fingerprint() {
        let raw = RawRecord::from_pairs([("TI", "A Study"), ("SO", "Nature"), ("PY", "2019")]);
        let fingerprint = normalizer().fingerprint(&raw);
        assert_eq!(fingerprint.title, "A Study");
        assert_eq!(fingerprint.source, "Nature");
        assert_eq!(fingerprint.year, Some(2019));
    }
}
