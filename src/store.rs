//! Document store interface and an in-memory implementation.
//!
//! The store holds both the raw provider collections and the canonical entities. Raw
//! collections are read-only for the ETL; canonical entities are inserted by the
//! pipeline and looked up by the linker.
//!
//! Format-specific projections (fingerprint fields, DOI field) are delegated to the
//! provider's [`Normalizer`], so a store does not need to know raw schemas.

use crate::merge::merge_document;
use crate::normalize::Normalizer;
use crate::pool::Candidate;
use crate::raw::RawRecord;
use crate::{Author, Document, EntityId, ExternalId, Institution, Result, Source};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Kinds of canonical entities kept by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Document,
    Author,
    Institution,
    Source,
}

/// A new canonical sub-entity to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entity", rename_all = "lowercase")]
pub enum Entity {
    Author(Author),
    Institution(Institution),
    Source(Source),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Author(_) => EntityKind::Author,
            Entity::Institution(_) => EntityKind::Institution,
            Entity::Source(_) => EntityKind::Source,
        }
    }
}

/// Name parts of a persisted author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonName {
    pub first_names: String,
    pub last_names: String,
    pub initials: String,
}

impl From<&Author> for PersonName {
    fn from(author: &Author) -> Self {
        Self {
            first_names: author.first_names.clone(),
            last_names: author.last_names.clone(),
            initials: author.initials.clone(),
        }
    }
}

/// A persisted entity's display name, as seen by the linker's fuzzy matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntity {
    pub id: EntityId,
    pub name: String,
    /// Country code for institutions, empty otherwise
    pub country: String,
    /// Set for authors only
    pub person: Option<PersonName>,
}

/// Keyed document store used by the pipeline.
///
/// All lookups return entities in a stable order, which keeps linking deterministic.
pub trait DocumentStore: Send + Sync {
    /// Id and fingerprint of every raw record of a provider.
    fn candidate_rows(&self, provider: &str, normalizer: &dyn Normalizer) -> Result<Vec<Candidate>>;

    /// Every raw record of a provider, in collection order.
    fn raw_records(&self, provider: &str) -> Result<Vec<(String, RawRecord)>>;

    fn raw_by_id(&self, provider: &str, id: &str) -> Result<Option<RawRecord>>;

    /// First raw record of a provider whose DOI equals `doi`.
    fn raw_by_doi(
        &self,
        provider: &str,
        doi: &str,
        normalizer: &dyn Normalizer,
    ) -> Result<Option<(String, RawRecord)>>;

    /// Persisted entity of `kind` carrying the given identifier.
    ///
    /// For sources, serials are looked up as ids whose `source` is the serial kind
    /// (`pissn`, `eissn`, `isbn`).
    fn find_by_external_id(&self, kind: EntityKind, id: &ExternalId) -> Result<Option<EntityId>>;

    /// Persisted entities of `kind` that may fuzzily match `name`.
    fn name_candidates(&self, kind: EntityKind, name: &str) -> Result<Vec<NamedEntity>>;

    fn insert(&self, entity: Entity) -> Result<EntityId>;

    /// Inserts a document or updates the one sharing any of its external ids.
    ///
    /// On update the existing id is kept and the new document is merged into the stored
    /// one: stored fields win, empty ones are filled and lists are unioned.
    fn upsert_document(&self, document: Document) -> Result<EntityId>;

    fn document(&self, id: &str) -> Result<Option<Document>>;
}

#[derive(Debug, Default)]
struct Entities {
    documents: Vec<(EntityId, Document)>,
    authors: Vec<(EntityId, Author)>,
    institutions: Vec<(EntityId, Institution)>,
    sources: Vec<(EntityId, Source)>,
}

/// In-memory [`DocumentStore`] for tests and small runs.
///
/// Entities are kept in insertion order; new entities get a nanoid.
#[derive(Debug, Default)]
pub struct MemoryStore {
    raw: RwLock<BTreeMap<String, Vec<(String, RawRecord)>>>,
    entities: RwLock<Entities>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a raw record to a provider collection.
    pub fn add_raw(&self, provider: &str, id: &str, raw: RawRecord) {
        self.raw
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(provider.to_string())
            .or_default()
            .push((id.to_string(), raw));
    }

    /// Loads a provider collection from a JSON array of `{"_id": ..., <fields>}` objects.
    pub fn load_json(&self, provider: &str, json: &str) -> Result<usize> {
        let records: Vec<BTreeMap<String, serde_json::Value>> = serde_json::from_str(json)?;
        let count = records.len();
        for (index, mut fields) in records.into_iter().enumerate() {
            let id = match fields.remove("_id") {
                Some(serde_json::Value::String(id)) => id,
                Some(other) => other.to_string(),
                None => index.to_string(),
            };
            let raw: RawRecord = serde_json::from_value(serde_json::Value::Object(
                fields.into_iter().collect(),
            ))?;
            self.add_raw(provider, &id, raw);
        }
        debug!(provider, count, "loaded raw collection");
        Ok(count)
    }

    pub fn documents(&self) -> Vec<(EntityId, Document)> {
        self.read_entities().documents.clone()
    }

    pub fn authors(&self) -> Vec<(EntityId, Author)> {
        self.read_entities().authors.clone()
    }

    pub fn institutions(&self) -> Vec<(EntityId, Institution)> {
        self.read_entities().institutions.clone()
    }

    pub fn sources(&self) -> Vec<(EntityId, Source)> {
        self.read_entities().sources.clone()
    }

    fn read_entities(&self) -> std::sync::RwLockReadGuard<'_, Entities> {
        self.entities.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn shares_external_id(a: &Document, b: &Document) -> bool {
    a.external_ids.iter().any(|id| b.external_ids.contains(id))
}

impl DocumentStore for MemoryStore {
    fn candidate_rows(&self, provider: &str, normalizer: &dyn Normalizer) -> Result<Vec<Candidate>> {
        Ok(self
            .raw_records(provider)?
            .into_iter()
            .map(|(id, raw)| Candidate {
                fingerprint: normalizer.fingerprint(&raw),
                id,
            })
            .collect())
    }

    fn raw_records(&self, provider: &str) -> Result<Vec<(String, RawRecord)>> {
        let raw = self.raw.read().unwrap_or_else(PoisonError::into_inner);
        Ok(raw.get(provider).cloned().unwrap_or_default())
    }

    fn raw_by_id(&self, provider: &str, id: &str) -> Result<Option<RawRecord>> {
        let raw = self.raw.read().unwrap_or_else(PoisonError::into_inner);
        Ok(raw.get(provider).and_then(|records| {
            records
                .iter()
                .find(|(candidate, _)| candidate == id)
                .map(|(_, record)| record.clone())
        }))
    }

    fn raw_by_doi(
        &self,
        provider: &str,
        doi: &str,
        normalizer: &dyn Normalizer,
    ) -> Result<Option<(String, RawRecord)>> {
        let raw = self.raw.read().unwrap_or_else(PoisonError::into_inner);
        Ok(raw.get(provider).and_then(|records| {
            records
                .iter()
                .find(|(_, record)| normalizer.doi(record).as_deref() == Some(doi))
                .cloned()
        }))
    }

    fn find_by_external_id(&self, kind: EntityKind, id: &ExternalId) -> Result<Option<EntityId>> {
        let entities = self.read_entities();
        let found = match kind {
            EntityKind::Document => entities
                .documents
                .iter()
                .find(|(_, doc)| doc.external_ids.contains(id))
                .map(|(key, _)| key),
            EntityKind::Author => entities
                .authors
                .iter()
                .find(|(_, author)| author.external_ids.contains(id))
                .map(|(key, _)| key),
            EntityKind::Source => entities
                .sources
                .iter()
                .find(|(_, source)| {
                    source
                        .serials
                        .iter()
                        .any(|serial| serial.kind.as_str() == id.source && serial.value == id.id)
                })
                .map(|(key, _)| key),
            EntityKind::Institution => None,
        };
        Ok(found.cloned())
    }

    fn name_candidates(&self, kind: EntityKind, _name: &str) -> Result<Vec<NamedEntity>> {
        let entities = self.read_entities();
        let named = match kind {
            EntityKind::Document => entities
                .documents
                .iter()
                .map(|(id, doc)| NamedEntity {
                    id: id.clone(),
                    name: doc.title.clone(),
                    country: String::new(),
                    person: None,
                })
                .collect(),
            EntityKind::Author => entities
                .authors
                .iter()
                .map(|(id, author)| NamedEntity {
                    id: id.clone(),
                    name: author.full_name.clone(),
                    country: String::new(),
                    person: Some(PersonName::from(author)),
                })
                .collect(),
            EntityKind::Institution => entities
                .institutions
                .iter()
                .map(|(id, inst)| NamedEntity {
                    id: id.clone(),
                    name: inst.name.clone(),
                    country: inst.country.clone(),
                    person: None,
                })
                .collect(),
            EntityKind::Source => entities
                .sources
                .iter()
                .map(|(id, source)| NamedEntity {
                    id: id.clone(),
                    name: source.title.clone(),
                    country: source.country.clone(),
                    person: None,
                })
                .collect(),
        };
        Ok(named)
    }

    fn insert(&self, entity: Entity) -> Result<EntityId> {
        let id = nanoid!();
        let mut entities = self.entities.write().unwrap_or_else(PoisonError::into_inner);
        match entity {
            Entity::Author(author) => entities.authors.push((id.clone(), author)),
            Entity::Institution(inst) => entities.institutions.push((id.clone(), inst)),
            Entity::Source(source) => entities.sources.push((id.clone(), source)),
        }
        Ok(id)
    }

    fn upsert_document(&self, document: Document) -> Result<EntityId> {
        let mut entities = self.entities.write().unwrap_or_else(PoisonError::into_inner);
        let existing = if document.external_ids.is_empty() {
            None
        } else {
            entities
                .documents
                .iter()
                .position(|(_, stored)| shares_external_id(stored, &document))
        };

        match existing {
            Some(index) => {
                let (id, stored) = &mut entities.documents[index];
                merge_document(stored, &document);
                debug!(id = %id, "updated document");
                Ok(id.clone())
            }
            None => {
                let id = nanoid!();
                entities.documents.push((id.clone(), document));
                debug!(id = %id, "inserted document");
                Ok(id)
            }
        }
    }

    fn document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self
            .read_entities()
            .documents
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, doc)| doc.clone()))
    }
}
