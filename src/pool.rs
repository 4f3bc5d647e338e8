//! In-memory candidate pools for similarity matching.
//!
//! A [`CandidatePool`] holds the fingerprints of the raw records of one provider that
//! have not been merged yet in the current run. Consuming a candidate removes it from
//! the pool, so it can never be matched twice. [`CandidatePools`] keeps one pool per
//! provider behind its own lock.

use crate::normalize::Normalizer;
use crate::raw::RawValue;
use crate::store::DocumentStore;
use crate::utils::normalize_text;
use crate::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// The (title, source, year) triple used to find a record without a reliable identifier.
///
/// Deserializes from `{"title", "source", "year"}` dictionaries; missing keys are
/// empty and the year may be given as a number or a string.
///
/// ```
/// use biblink::Fingerprint;
///
/// let fp: Fingerprint = serde_json::from_str(r#"{"title": "A Study", "year": "2019"}"#).unwrap();
/// assert_eq!(fp.source, "");
/// assert_eq!(fp.year, Some(2019));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Fingerprint {
    pub title: String,
    pub source: String,
    #[serde(deserialize_with = "deserialize_year")]
    pub year: Option<i32>,
}

impl Fingerprint {
    pub fn new(title: &str, source: &str, year: Option<i32>) -> Self {
        Self {
            title: title.to_string(),
            source: source.to_string(),
            year,
        }
    }
}

fn deserialize_year<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<RawValue>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(RawValue::as_text)
        .and_then(|text| text.trim().parse().ok()))
}

/// A raw record id with its fingerprint, as listed by the store for a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub fingerprint: Fingerprint,
}

/// A candidate removed from a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumedCandidate {
    /// Position of the candidate in the pool when it was consumed
    pub index: usize,
    /// Raw record id of the candidate
    pub id: String,
}

/// Position-aligned candidate sequences of one provider.
///
/// `ids`, `titles`, `sources` and `years` always have the same length; entries are
/// removed from all four at once and the relative order of the rest is preserved.
/// Titles and sources are stored in their [`normalize_text`] form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePool {
    ids: Vec<String>,
    titles: Vec<String>,
    sources: Vec<String>,
    years: Vec<Option<i32>>,
}

impl CandidatePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: &str, fingerprint: Fingerprint) {
        self.ids.push(id.to_string());
        self.titles.push(normalize_text(&fingerprint.title));
        self.sources.push(normalize_text(&fingerprint.source));
        self.years.push(fingerprint.year);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn years(&self) -> &[Option<i32>] {
        &self.years
    }

    pub fn id(&self, index: usize) -> Option<&str> {
        self.ids.get(index).map(String::as_str)
    }

    /// Current position of a raw record id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|candidate| candidate == id)
    }

    /// Removes the candidate at `index` from all four sequences.
    pub fn consume(&mut self, index: usize) -> Option<ConsumedCandidate> {
        if index >= self.len() {
            return None;
        }
        let id = self.ids.remove(index);
        self.titles.remove(index);
        self.sources.remove(index);
        self.years.remove(index);
        Some(ConsumedCandidate { index, id })
    }

    /// Removes the candidate with the given raw record id, if still present.
    pub fn consume_id(&mut self, id: &str) -> Option<ConsumedCandidate> {
        let index = self.position(id)?;
        self.consume(index)
    }

    fn is_aligned(&self) -> bool {
        let n = self.ids.len();
        self.titles.len() == n && self.sources.len() == n && self.years.len() == n
    }
}

impl FromIterator<Candidate> for CandidatePool {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut pool = CandidatePool::new();
        for candidate in iter {
            pool.push(&candidate.id, candidate.fingerprint);
        }
        pool
    }
}

/// One [`CandidatePool`] per provider, each behind its own lock.
///
/// Scoring takes the read lock of a single provider; consumption takes its write lock.
/// Pools of different providers never contend.
#[derive(Debug, Default)]
pub struct CandidatePools {
    pools: BTreeMap<String, RwLock<CandidatePool>>,
}

impl CandidatePools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the pool of every given provider from the store.
    pub fn from_store<'a, S, I>(store: &S, providers: I) -> Result<Self>
    where
        S: DocumentStore + ?Sized,
        I: IntoIterator<Item = (&'a str, &'a dyn Normalizer)>,
    {
        let mut pools = Self::new();
        for (provider, normalizer) in providers {
            let pool: CandidatePool = store
                .candidate_rows(provider, normalizer)?
                .into_iter()
                .collect();
            debug!(provider, candidates = pool.len(), "loaded candidate pool");
            pools.insert(provider, pool);
        }
        Ok(pools)
    }

    pub fn insert(&mut self, provider: &str, pool: CandidatePool) {
        debug_assert!(pool.is_aligned());
        self.pools.insert(provider.to_string(), RwLock::new(pool));
    }

    /// Provider names in sorted order.
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    pub fn contains(&self, provider: &str) -> bool {
        self.pools.contains_key(provider)
    }

    /// Shared access to a provider's pool. Poisoned locks are recovered.
    pub fn read(&self, provider: &str) -> Option<RwLockReadGuard<'_, CandidatePool>> {
        self.pools
            .get(provider)
            .map(|lock| lock.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Exclusive access to a provider's pool.
    pub fn write(&self, provider: &str) -> Option<RwLockWriteGuard<'_, CandidatePool>> {
        self.pools
            .get(provider)
            .map(|lock| lock.write().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of candidates left for a provider, `0` for unknown providers.
    pub fn remaining(&self, provider: &str) -> usize {
        self.read(provider).map_or(0, |pool| pool.len())
    }

    /// Consumes a candidate by raw record id, e.g. after a DOI match.
    pub fn consume_id(&self, provider: &str, id: &str) -> Option<ConsumedCandidate> {
        let consumed = self.write(provider)?.consume_id(id);
        if consumed.is_some() {
            debug!(provider, id, remaining = self.remaining(provider), "consumed candidate");
        }
        consumed
    }
}
