//! Linking of canonical sub-entities to persisted entities.
//!
//! Each author, institution and source of a normalized record is resolved against the
//! store: first by identifier, then by fuzzy name. An author only links by name to a
//! persisted author with the same last name and first initial. Lookups only read the store and
//! pick the first best candidate in store order, so linking the same entity twice
//! against an unchanged store yields the same [`LinkRef`].

use crate::normalize::NormalizedRecord;
use crate::store::{DocumentStore, EntityKind, NamedEntity, PersonName};
use crate::utils::{normalize_text, text_similarity};
use crate::{Author, Document, EntityId, ExternalId, Institution, Result, Source};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tunables of the linker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Minimum Jaro-Winkler similarity of normalized names for a fuzzy link
    pub name_threshold: f64,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self { name_threshold: 0.9 }
    }
}

/// Outcome of linking one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkRef {
    /// The entity is already persisted under this id
    Existing(EntityId),
    /// No persisted entity matched; one has to be created
    New,
}

impl LinkRef {
    pub fn existing_id(&self) -> Option<&str> {
        match self {
            LinkRef::Existing(id) => Some(id),
            LinkRef::New => None,
        }
    }
}

/// An author with its link and its linked institutions.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedAuthor {
    pub author: Author,
    pub link: LinkRef,
    pub institutions: Vec<(Institution, LinkRef)>,
}

/// A normalized record whose sub-entities have been linked.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedRecord {
    pub document: Document,
    pub authors: Vec<LinkedAuthor>,
    pub source: Source,
    pub source_link: LinkRef,
}

#[derive(Debug, Clone, Default)]
pub struct Linker {
    config: LinkerConfig,
}

impl Linker {
    pub fn new(config: LinkerConfig) -> Self {
        Self { config }
    }

    /// First candidate with the highest similarity at or above the threshold.
    fn best_by_name<'a, I>(&self, name: &str, candidates: I) -> Option<EntityId>
    where
        I: IntoIterator<Item = &'a NamedEntity>,
    {
        let mut best: Option<(f64, &NamedEntity)> = None;
        for candidate in candidates {
            let Some(score) = text_similarity(name, &candidate.name) else {
                continue;
            };
            if score < self.config.name_threshold {
                continue;
            }
            if best.is_none_or(|(best_score, _)| score > best_score) {
                best = Some((score, candidate));
            }
        }
        best.map(|(_, candidate)| candidate.id.clone())
    }

    fn by_external_ids<'a, S, I>(&self, store: &S, kind: EntityKind, ids: I) -> Result<Option<EntityId>>
    where
        S: DocumentStore + ?Sized,
        I: IntoIterator<Item = &'a ExternalId>,
    {
        for id in ids {
            if let Some(found) = store.find_by_external_id(kind, id)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    pub fn link_author<S: DocumentStore + ?Sized>(&self, store: &S, author: &Author) -> Result<LinkRef> {
        if let Some(id) = self.by_external_ids(store, EntityKind::Author, &author.external_ids)? {
            return Ok(LinkRef::Existing(id));
        }
        if normalize_text(&author.last_names).is_empty() {
            return Ok(LinkRef::New);
        }
        let candidates = store.name_candidates(EntityKind::Author, &author.full_name)?;
        let mut best: Option<(f64, &NamedEntity)> = None;
        for candidate in &candidates {
            let Some(score) = candidate
                .person
                .as_ref()
                .and_then(|person| self.person_score(author, person))
            else {
                continue;
            };
            if best.is_none_or(|(best_score, _)| score > best_score) {
                best = Some((score, candidate));
            }
        }
        Ok(best.map_or(LinkRef::New, |(_, candidate)| LinkRef::Existing(candidate.id.clone())))
    }

    /// Similarity of the given names of two authors sharing last name and first initial.
    ///
    /// When either side only carries initials, the shorter initials must prefix the
    /// longer ones and the score is the threshold itself, so a full-name match ranks
    /// above it.
    fn person_score(&self, author: &Author, person: &PersonName) -> Option<f64> {
        if normalize_text(&author.last_names) != normalize_text(&person.last_names) {
            return None;
        }
        let ours = normalize_text(&author.initials);
        let theirs = normalize_text(&person.initials);
        if ours.chars().next() != theirs.chars().next() {
            return None;
        }

        let first = normalize_text(&author.first_names);
        let other = normalize_text(&person.first_names);
        if first.is_empty() || other.is_empty() || first == ours || other == theirs {
            let (short, long) = if ours.len() <= theirs.len() { (&ours, &theirs) } else { (&theirs, &ours) };
            return long
                .starts_with(short.as_str())
                .then_some(self.config.name_threshold);
        }
        text_similarity(&first, &other).filter(|score| *score >= self.config.name_threshold)
    }

    /// Links an institution by name; countries must agree when both are known.
    pub fn link_institution<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        institution: &Institution,
    ) -> Result<LinkRef> {
        if institution.name.is_empty() {
            return Ok(LinkRef::New);
        }
        let candidates = store.name_candidates(EntityKind::Institution, &institution.name)?;
        let compatible = candidates.iter().filter(|candidate| {
            candidate.country.is_empty()
                || institution.country.is_empty()
                || candidate.country == institution.country
        });
        Ok(self
            .best_by_name(&institution.name, compatible)
            .map_or(LinkRef::New, LinkRef::Existing))
    }

    /// Links a source by serial, then by title.
    pub fn link_source<S: DocumentStore + ?Sized>(&self, store: &S, source: &Source) -> Result<LinkRef> {
        let serials: Vec<ExternalId> = source
            .serials
            .iter()
            .map(|serial| ExternalId::new(serial.kind.as_str(), serial.value.as_str()))
            .collect();
        if let Some(id) = self.by_external_ids(store, EntityKind::Source, &serials)? {
            return Ok(LinkRef::Existing(id));
        }
        if source.title.is_empty() {
            return Ok(LinkRef::New);
        }
        let candidates = store.name_candidates(EntityKind::Source, &source.title)?;
        Ok(self
            .best_by_name(&source.title, &candidates)
            .map_or(LinkRef::New, LinkRef::Existing))
    }

    /// Links every sub-entity of a normalized record.
    pub fn link_record<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        record: NormalizedRecord,
    ) -> Result<LinkedRecord> {
        let mut authors = Vec::with_capacity(record.author_institutions.len());
        for pair in record.author_institutions {
            let link = self.link_author(store, &pair.author)?;
            let mut institutions = Vec::with_capacity(pair.institutions.len());
            for institution in pair.institutions {
                let link = self.link_institution(store, &institution)?;
                institutions.push((institution, link));
            }
            authors.push(LinkedAuthor {
                author: pair.author,
                link,
                institutions,
            });
        }
        let source_link = self.link_source(store, &record.source)?;
        debug!(
            authors = authors.len(),
            existing_authors = authors.iter().filter(|a| a.link != LinkRef::New).count(),
            source = ?source_link,
            "linked record"
        );

        Ok(LinkedRecord {
            document: record.document,
            authors,
            source: record.source,
            source_link,
        })
    }
}
