//! Scopus export columns.
//!
//! Scopus CSV exports (and the JSON documents staged from them) are keyed by column
//! title rather than by short tags.

use crate::raw::FieldTag;

/// Scopus export columns read by the normalizer.
#[non_exhaustive]
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum ScopusField {
    Title,
    Year,
    SourceTitle,
    Volume,
    Issue,
    PageStart,
    PageEnd,
    CitedBy,
    Doi,
    Link,
    Abstract,
    AuthorKeywords,
    IndexKeywords,
    Language,
    DocumentType,
    Eid,
    Authors,
    AuthorIds,
    AuthorsWithAffiliations,
    CorrespondenceAddress,
    Publisher,
    Issn,
    Isbn,
    AbbreviatedSourceTitle,
    OpenAccess,
}

impl ScopusField {
    pub fn from_column(column: &str) -> Option<Self> {
        match column.trim() {
            "Title" => Some(Self::Title),
            "Year" => Some(Self::Year),
            "Source title" => Some(Self::SourceTitle),
            "Volume" => Some(Self::Volume),
            "Issue" => Some(Self::Issue),
            "Page start" => Some(Self::PageStart),
            "Page end" => Some(Self::PageEnd),
            "Cited by" => Some(Self::CitedBy),
            "DOI" => Some(Self::Doi),
            "Link" => Some(Self::Link),
            "Abstract" => Some(Self::Abstract),
            "Author Keywords" => Some(Self::AuthorKeywords),
            "Index Keywords" => Some(Self::IndexKeywords),
            "Language of Original Document" => Some(Self::Language),
            "Document Type" => Some(Self::DocumentType),
            "EID" => Some(Self::Eid),
            "Authors" => Some(Self::Authors),
            "Author(s) ID" => Some(Self::AuthorIds),
            "Authors with affiliations" => Some(Self::AuthorsWithAffiliations),
            "Correspondence Address" => Some(Self::CorrespondenceAddress),
            "Publisher" => Some(Self::Publisher),
            "ISSN" => Some(Self::Issn),
            "ISBN" => Some(Self::Isbn),
            "Abbreviated Source Title" => Some(Self::AbbreviatedSourceTitle),
            "Open Access" => Some(Self::OpenAccess),
            _ => None,
        }
    }

    pub fn as_column(&self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Year => "Year",
            Self::SourceTitle => "Source title",
            Self::Volume => "Volume",
            Self::Issue => "Issue",
            Self::PageStart => "Page start",
            Self::PageEnd => "Page end",
            Self::CitedBy => "Cited by",
            Self::Doi => "DOI",
            Self::Link => "Link",
            Self::Abstract => "Abstract",
            Self::AuthorKeywords => "Author Keywords",
            Self::IndexKeywords => "Index Keywords",
            Self::Language => "Language of Original Document",
            Self::DocumentType => "Document Type",
            Self::Eid => "EID",
            Self::Authors => "Authors",
            Self::AuthorIds => "Author(s) ID",
            Self::AuthorsWithAffiliations => "Authors with affiliations",
            Self::CorrespondenceAddress => "Correspondence Address",
            Self::Publisher => "Publisher",
            Self::Issn => "ISSN",
            Self::Isbn => "ISBN",
            Self::AbbreviatedSourceTitle => "Abbreviated Source Title",
            Self::OpenAccess => "Open Access",
        }
    }
}

impl FieldTag for ScopusField {
    fn as_tag(&self) -> &'static str {
        self.as_column()
    }
}
