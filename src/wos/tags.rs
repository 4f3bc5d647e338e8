//! Web of Science field tags.
//!
//! This module defines the two-letter field codes of the Web of Science tagged export,
//! which SciELO Citation Index records share.
//! See: https://images.webofknowledge.com/images/help/WOS/hs_wos_fieldtags.html

use crate::raw::FieldTag;

/// Web of Science field tags read by the normalizer.
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub enum WosTag {
    /// PT - Publication type (J=journal, B=book, S=series, P=patent)
    PublicationType,
    /// DT - Document type
    DocumentType,
    /// AU - Authors, short form
    Author,
    /// AF - Authors, full names
    AuthorFullName,
    /// BA - Book authors
    BookAuthor,
    /// TI - Document title
    Title,
    /// SO - Full source title
    SourceTitle,
    /// LA - Language
    Language,
    /// DE - Author keywords
    AuthorKeywords,
    /// ID - Keywords Plus
    KeywordsPlus,
    /// AB - Abstract
    Abstract,
    /// C1 - Author address
    AuthorAddress,
    /// RP - Reprint (corresponding author) address
    ReprintAddress,
    /// EM - E-mail address
    Email,
    /// RI - ResearcherID number
    ResearcherId,
    /// OI - ORCID identifier
    Orcid,
    /// FU - Funding agency and grant number
    Funding,
    /// NR - Cited reference count
    ReferenceCount,
    /// Z9 - Total times cited count
    TimesCited,
    /// PU - Publisher
    Publisher,
    /// SN - International Standard Serial Number
    Issn,
    /// EI - Electronic ISSN
    Eissn,
    /// BN - International Standard Book Number
    Isbn,
    /// J9 - 29-character source abbreviation
    SourceAbbreviation,
    /// JI - ISO source abbreviation
    IsoSourceAbbreviation,
    /// PY - Year published
    PublicationYear,
    /// VL - Volume
    Volume,
    /// IS - Issue
    Issue,
    /// BP - Beginning page
    BeginningPage,
    /// EP - Ending page
    EndingPage,
    /// DI - Digital Object Identifier
    Doi,
    /// D2 - Book DOI
    BookDoi,
    /// WC - Web of Science categories
    Categories,
    /// OA - Open access indicator
    OpenAccess,
    /// UT - Accession number
    AccessionNumber,
}

impl WosTag {
    /// Convert a string tag to a WosTag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "PT" => Some(Self::PublicationType),
            "DT" => Some(Self::DocumentType),
            "AU" => Some(Self::Author),
            "AF" => Some(Self::AuthorFullName),
            "BA" => Some(Self::BookAuthor),
            "TI" => Some(Self::Title),
            "SO" => Some(Self::SourceTitle),
            "LA" => Some(Self::Language),
            "DE" => Some(Self::AuthorKeywords),
            "ID" => Some(Self::KeywordsPlus),
            "AB" => Some(Self::Abstract),
            "C1" => Some(Self::AuthorAddress),
            "RP" => Some(Self::ReprintAddress),
            "EM" => Some(Self::Email),
            "RI" => Some(Self::ResearcherId),
            "OI" => Some(Self::Orcid),
            "FU" => Some(Self::Funding),
            "NR" => Some(Self::ReferenceCount),
            "Z9" => Some(Self::TimesCited),
            "PU" => Some(Self::Publisher),
            "SN" => Some(Self::Issn),
            "EI" => Some(Self::Eissn),
            "BN" => Some(Self::Isbn),
            "J9" => Some(Self::SourceAbbreviation),
            "JI" => Some(Self::IsoSourceAbbreviation),
            "PY" => Some(Self::PublicationYear),
            "VL" => Some(Self::Volume),
            "IS" => Some(Self::Issue),
            "BP" => Some(Self::BeginningPage),
            "EP" => Some(Self::EndingPage),
            "DI" => Some(Self::Doi),
            "D2" => Some(Self::BookDoi),
            "WC" => Some(Self::Categories),
            "OA" => Some(Self::OpenAccess),
            "UT" => Some(Self::AccessionNumber),
            _ => None,
        }
    }

    /// Convert a WosTag back to its string representation.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::PublicationType => "PT",
            Self::DocumentType => "DT",
            Self::Author => "AU",
            Self::AuthorFullName => "AF",
            Self::BookAuthor => "BA",
            Self::Title => "TI",
            Self::SourceTitle => "SO",
            Self::Language => "LA",
            Self::AuthorKeywords => "DE",
            Self::KeywordsPlus => "ID",
            Self::Abstract => "AB",
            Self::AuthorAddress => "C1",
            Self::ReprintAddress => "RP",
            Self::Email => "EM",
            Self::ResearcherId => "RI",
            Self::Orcid => "OI",
            Self::Funding => "FU",
            Self::ReferenceCount => "NR",
            Self::TimesCited => "Z9",
            Self::Publisher => "PU",
            Self::Issn => "SN",
            Self::Eissn => "EI",
            Self::Isbn => "BN",
            Self::SourceAbbreviation => "J9",
            Self::IsoSourceAbbreviation => "JI",
            Self::PublicationYear => "PY",
            Self::Volume => "VL",
            Self::Issue => "IS",
            Self::BeginningPage => "BP",
            Self::EndingPage => "EP",
            Self::Doi => "DI",
            Self::BookDoi => "D2",
            Self::Categories => "WC",
            Self::OpenAccess => "OA",
            Self::AccessionNumber => "UT",
        }
    }
}

impl FieldTag for WosTag {
    fn as_tag(&self) -> &'static str {
        WosTag::as_tag(self)
    }
}

/// Publication type codes of the `PT` field.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum WosPublicationType {
    Journal,
    Book,
    Series,
    Patent,
}

impl WosPublicationType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "J" => Some(Self::Journal),
            "B" => Some(Self::Book),
            "S" => Some(Self::Series),
            "P" => Some(Self::Patent),
            _ => None,
        }
    }

    /// Canonical source type name.
    pub fn source_type(&self) -> &'static str {
        match self {
            Self::Journal => "journal",
            Self::Book => "book",
            Self::Series => "series",
            Self::Patent => "patent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("PT", Some(WosTag::PublicationType))]
    #[case("TI", Some(WosTag::Title))]
    #[case("C1", Some(WosTag::AuthorAddress))]
    #[case("Z9", Some(WosTag::TimesCited))]
    #[case("XX", None)]
    fn test_from_tag(#[case] input: &str, #[case] expected: Option<WosTag>) {
        assert_eq!(WosTag::from_tag(input), expected);
    }

    #[rstest]
    #[case(WosTag::AuthorFullName, "AF")]
    #[case(WosTag::Doi, "DI")]
    #[case(WosTag::AccessionNumber, "UT")]
    fn test_as_tag(#[case] tag: WosTag, #[case] expected: &str) {
        assert_eq!(tag.as_tag(), expected);
        assert_eq!(WosTag::from_tag(expected), Some(tag));
    }

    #[rstest]
    #[case("J", Some(WosPublicationType::Journal))]
    #[case("B ", Some(WosPublicationType::Book))]
    #[case("X", None)]
    fn test_publication_type(#[case] code: &str, #[case] expected: Option<WosPublicationType>) {
        assert_eq!(WosPublicationType::from_code(code), expected);
    }
}
