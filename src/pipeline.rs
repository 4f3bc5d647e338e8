//! Batch orchestration: extract, normalize, merge, link and persist.
//!
//! Every input is processed end to end on its own. A failing or panicking record is
//! reported in the [`RunReport`] and never stops its siblings. In concurrent mode the
//! inputs run on a dedicated rayon thread pool; the candidate pools are shared and
//! guarded per provider, so a raw record is merged at most once per run.
//!
//! # Example
//!
//! ```
//! use biblink::pipeline::{Input, Outcome, Pipeline};
//! use biblink::store::MemoryStore;
//! use biblink::{EtlConfig, Fingerprint, RawRecord};
//!
//! let store = MemoryStore::new();
//! store.add_raw("wos", "WOS:1", RawRecord::from_pairs([("TI", "A Study"), ("SO", "Nature"), ("PY", "2019")]));
//! store.add_raw("scopus", "2-s2.0-1", RawRecord::from_pairs([("Title", "A study"), ("Source title", "Nature"), ("Year", "2019")]));
//!
//! let pipeline = Pipeline::new(store, EtlConfig::default()).unwrap();
//! let report = pipeline.run(&[Input::Fingerprint(Fingerprint::new("A Study", "Nature", Some(2019)))]);
//!
//! let Outcome::Persisted { id } = &report.statuses[0].outcome else { panic!() };
//! let document = pipeline.store().documents().into_iter().find(|(key, _)| key == id).unwrap().1;
//! assert_eq!(document.source_checked.len(), 2);
//! ```

use crate::config::EtlConfig;
use crate::link::{LinkRef, LinkedRecord, Linker};
use crate::matcher::SimilarityMatcher;
use crate::merge::merge_records;
use crate::normalize::Normalizer;
use crate::pool::CandidatePools;
use crate::raw::RawRecord;
use crate::store::{DocumentStore, Entity};
use crate::utils::format_doi;
use crate::{DocumentAuthor, EntityId, EtlError, Fingerprint, NormalizedRecord, Result};
use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// Execution options of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Worker threads in concurrent mode
    pub n_jobs: usize,
    /// Process inputs on a thread pool instead of one after another
    pub concurrent: bool,
    /// Extra link-and-persist attempts after a failed one
    pub persist_retries: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            n_jobs: std::thread::available_parallelism().map_or(1, |n| n.get()),
            concurrent: false,
            persist_retries: 0,
        }
    }
}

/// One unit of work.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Look the DOI up in every provider
    Doi(String),
    /// Match the fingerprint against every provider pool
    Fingerprint(Fingerprint),
    /// A record of a staged provider collection; the other providers are matched
    /// against its fingerprint
    Staged {
        provider: String,
        id: String,
        raw: RawRecord,
    },
}

impl Input {
    /// Inputs for a list of DOIs.
    pub fn from_dois<I, S>(dois: I) -> Vec<Input>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        dois.into_iter()
            .map(|doi| Input::Doi(doi.as_ref().to_string()))
            .collect()
    }

    /// Inputs for the DOI column of a CSV file.
    #[cfg(feature = "csv")]
    pub fn from_csv(input: &str, config: &crate::csv::CsvConfig) -> Result<Vec<Input>> {
        Ok(Self::from_dois(crate::csv::read_dois(input, config)?))
    }

    /// Inputs for a JSON array of `{"title", "source", "year"}` dictionaries.
    pub fn from_fingerprints_json(json: &str) -> Result<Vec<Input>> {
        let fingerprints: Vec<Fingerprint> = serde_json::from_str(json)?;
        Ok(fingerprints.into_iter().map(Input::Fingerprint).collect())
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Doi(doi) => write!(f, "doi {doi}"),
            Input::Fingerprint(fp) => match fp.year {
                Some(year) => write!(f, "fingerprint \"{}\" ({year})", fp.title),
                None => write!(f, "fingerprint \"{}\"", fp.title),
            },
            Input::Staged { provider, id, .. } => write!(f, "staged {provider}/{id}"),
        }
    }
}

/// Result of processing one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Persisted { id: EntityId },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStatus {
    /// Position of the input in the batch
    pub index: usize,
    pub outcome: Outcome,
}

impl RecordStatus {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Persisted { .. })
    }
}

/// Per-input outcomes of a run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub statuses: Vec<RecordStatus>,
}

impl RunReport {
    pub fn successes(&self) -> impl Iterator<Item = &RecordStatus> {
        self.statuses.iter().filter(|status| status.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordStatus> {
        self.statuses.iter().filter(|status| !status.is_success())
    }

    pub fn status(&self, index: usize) -> Option<&RecordStatus> {
        self.statuses.iter().find(|status| status.index == index)
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// A raw record found for an input: `(provider, raw id, record)`.
type Found = (String, String, RawRecord);

/// Drives batches of inputs through the ETL.
pub struct Pipeline<S: DocumentStore> {
    store: S,
    config: EtlConfig,
    normalizers: Vec<(String, Box<dyn Normalizer>)>,
    pools: CandidatePools,
    matcher: SimilarityMatcher,
    linker: Linker,
}

impl<S: DocumentStore> Pipeline<S> {
    /// Validates the configuration and loads the candidate pool of every provider.
    pub fn new(store: S, config: EtlConfig) -> Result<Self> {
        config.validate()?;
        let normalizers: Vec<(String, Box<dyn Normalizer>)> = config
            .providers
            .iter()
            .map(|p| (p.name.clone(), p.format.normalizer(&p.name, &config.normalizer)))
            .collect();
        let pools = CandidatePools::from_store(
            &store,
            normalizers.iter().map(|(name, n)| (name.as_str(), n.as_ref())),
        )?;
        info!(
            providers = normalizers.len(),
            candidates = normalizers.iter().map(|(name, _)| pools.remaining(name)).sum::<usize>(),
            "pipeline ready"
        );

        Ok(Self {
            matcher: SimilarityMatcher::new(config.matcher.clone()),
            linker: Linker::new(config.linker.clone()),
            store,
            config,
            normalizers,
            pools,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    pub fn pools(&self) -> &CandidatePools {
        &self.pools
    }

    fn normalizer(&self, provider: &str) -> Result<&dyn Normalizer> {
        self.normalizers
            .iter()
            .find(|(name, _)| name == provider)
            .map(|(_, n)| n.as_ref())
            .ok_or_else(|| EtlError::UnknownProvider(provider.to_string()))
    }

    /// Inputs for every record of a staged provider collection.
    pub fn staged_inputs(&self, provider: &str) -> Result<Vec<Input>> {
        self.normalizer(provider)?;
        Ok(self
            .store
            .raw_records(provider)?
            .into_iter()
            .map(|(id, raw)| Input::Staged {
                provider: provider.to_string(),
                id,
                raw,
            })
            .collect())
    }

    /// Processes a batch and reports the outcome of every input.
    pub fn run(&self, inputs: &[Input]) -> RunReport {
        let options = &self.config.pipeline;
        info!(inputs = inputs.len(), concurrent = options.concurrent, "run started");

        let process = |(index, input): (usize, &Input)| RecordStatus {
            index,
            outcome: self.process_guarded(index, input),
        };

        let statuses = if options.concurrent && options.n_jobs > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(options.n_jobs)
                .build()
            {
                Ok(pool) => pool.install(|| inputs.par_iter().enumerate().map(process).collect()),
                Err(err) => {
                    warn!(error = %err, "could not build thread pool, running sequentially");
                    inputs.iter().enumerate().map(process).collect()
                }
            }
        } else {
            inputs.iter().enumerate().map(process).collect()
        };

        let report = RunReport { statuses };
        info!(
            successes = report.successes().count(),
            failures = report.failures().count(),
            "run finished"
        );
        report
    }

    /// Processes one input, turning errors and panics into a failed outcome.
    fn process_guarded(&self, index: usize, input: &Input) -> Outcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.process_one(input))) {
            Ok(Ok(id)) => {
                debug!(index, id = %id, "record persisted");
                Outcome::Persisted { id }
            }
            Ok(Err(err)) => {
                warn!(index, input = %input, error = %err, "record failed");
                Outcome::Failed {
                    reason: err.to_string(),
                }
            }
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(index, input = %input, reason = %reason, "record panicked");
                Outcome::Failed {
                    reason: format!("panic: {reason}"),
                }
            }
        }
    }

    /// Extract, checkpoint, normalize, merge, link and persist one input.
    pub fn process_one(&self, input: &Input) -> Result<EntityId> {
        let found = self.extract(input)?;
        if found.is_empty() {
            return Err(EtlError::NotFound(input.to_string()));
        }

        let ts = Utc::now().timestamp();
        let mut records: Vec<NormalizedRecord> = Vec::with_capacity(found.len());
        for (provider, normalizer) in &self.normalizers {
            let format = self.config.provider(provider).map(|p| p.format);
            for (_, id, raw) in found.iter().filter(|(p, _, _)| p == provider) {
                if let Some(format) = format {
                    let unread = format.unread_fields(raw);
                    if !unread.is_empty() {
                        debug!(provider = %provider, id = %id, fields = ?unread, "fields ignored by the normalizer");
                    }
                }
                let mut record = normalizer.parse_one(raw);
                record
                    .document
                    .add_source_check(&self.config.checked_source_name(provider), id, ts);
                records.push(record);
            }
        }
        let merged = merge_records(records).ok_or_else(|| EtlError::NotFound(input.to_string()))?;

        let attempts = self.config.pipeline.persist_retries + 1;
        let mut attempt = 1;
        loop {
            let result = self
                .linker
                .link_record(&self.store, merged.clone())
                .and_then(|linked| self.persist(linked));
            match result {
                Ok(id) => return Ok(id),
                Err(err) if attempt < attempts => {
                    warn!(input = %input, attempt, error = %err, "persist failed, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Finds the raw records of an input and consumes them from the candidate pools.
    fn extract(&self, input: &Input) -> Result<Vec<Found>> {
        match input {
            Input::Doi(doi) => {
                let doi = format_doi(doi).ok_or_else(|| EtlError::InvalidFieldValue {
                    field: "doi".to_string(),
                    message: format!("not a DOI: {doi}"),
                })?;
                let mut found = Vec::new();
                for (provider, normalizer) in &self.normalizers {
                    let Some((id, raw)) = self.store.raw_by_doi(provider, &doi, normalizer.as_ref())? else {
                        continue;
                    };
                    if self.pools.consume_id(provider, &id).is_none() {
                        debug!(provider = %provider, id = %id, "raw record already merged, skipping");
                        continue;
                    }
                    found.push((provider.clone(), id, raw));
                }
                Ok(found)
            }
            Input::Fingerprint(fingerprint) => self.extract_similar(fingerprint, &[]),
            Input::Staged { provider, id, raw } => {
                let normalizer = self.normalizer(provider)?;
                if self.pools.consume_id(provider, id).is_none() {
                    return Err(EtlError::AlreadyMerged(format!("{provider}/{id}")));
                }
                let mut found = vec![(provider.clone(), id.clone(), raw.clone())];
                found.extend(self.extract_similar(&normalizer.fingerprint(raw), &[provider.as_str()])?);
                Ok(found)
            }
        }
    }

    fn extract_similar(&self, fingerprint: &Fingerprint, exclude: &[&str]) -> Result<Vec<Found>> {
        let (result, mut records) =
            self.matcher
                .find_one_similarity(&self.store, &self.pools, fingerprint, exclude)?;
        let mut found = Vec::new();
        for (provider, candidate) in result.consumed() {
            match records.remove(provider).flatten() {
                Some(raw) => found.push((provider.to_string(), candidate.id.clone(), raw)),
                None => warn!(provider, id = %candidate.id, "matched candidate has no raw record"),
            }
        }
        Ok(found)
    }

    /// Creates the new sub-entities and upserts the document with its references.
    fn persist(&self, linked: LinkedRecord) -> Result<EntityId> {
        let LinkedRecord {
            mut document,
            authors,
            source,
            source_link,
        } = linked;

        document.source_id = match source_link {
            LinkRef::Existing(id) => Some(id),
            LinkRef::New if source.title.is_empty() && source.serials.is_empty() => None,
            LinkRef::New => Some(self.store.insert(Entity::Source(source))?),
        };

        document.authors.clear();
        for linked_author in authors {
            let mut affiliations = Vec::with_capacity(linked_author.institutions.len());
            for (institution, link) in linked_author.institutions {
                let id = match link {
                    LinkRef::Existing(id) => id,
                    LinkRef::New => self.store.insert(Entity::Institution(institution))?,
                };
                affiliations.push(id);
            }
            let id = match linked_author.link {
                LinkRef::Existing(id) => id,
                LinkRef::New => {
                    let mut author = linked_author.author;
                    author.affiliations = affiliations.clone();
                    self.store.insert(Entity::Author(author))?
                }
            };
            document.authors.push(DocumentAuthor { id, affiliations });
        }

        self.store.upsert_document(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Candidate;
    use crate::store::{EntityKind, MemoryStore, NamedEntity};
    use crate::{Document, ExternalId};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Delegates to a [`MemoryStore`] but fails or panics on selected document titles.
    struct FlakyStore {
        inner: MemoryStore,
        fail_title: Option<&'static str>,
        panic_title: Option<&'static str>,
    }

    impl FlakyStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                fail_title: None,
                panic_title: None,
            }
        }
    }

    impl DocumentStore for FlakyStore {
        fn candidate_rows(&self, provider: &str, normalizer: &dyn Normalizer) -> Result<Vec<Candidate>> {
            self.inner.candidate_rows(provider, normalizer)
        }

        fn raw_records(&self, provider: &str) -> Result<Vec<(String, RawRecord)>> {
            self.inner.raw_records(provider)
        }

        fn raw_by_id(&self, provider: &str, id: &str) -> Result<Option<RawRecord>> {
            self.inner.raw_by_id(provider, id)
        }

        fn raw_by_doi(
            &self,
            provider: &str,
            doi: &str,
            normalizer: &dyn Normalizer,
        ) -> Result<Option<(String, RawRecord)>> {
            self.inner.raw_by_doi(provider, doi, normalizer)
        }

        fn find_by_external_id(&self, kind: EntityKind, id: &ExternalId) -> Result<Option<EntityId>> {
            self.inner.find_by_external_id(kind, id)
        }

        fn name_candidates(&self, kind: EntityKind, name: &str) -> Result<Vec<NamedEntity>> {
            self.inner.name_candidates(kind, name)
        }

        fn insert(&self, entity: Entity) -> Result<EntityId> {
            self.inner.insert(entity)
        }

        fn upsert_document(&self, document: Document) -> Result<EntityId> {
            if self.fail_title == Some(document.title.as_str()) {
                return Err(EtlError::Store("write rejected".to_string()));
            }
            if self.panic_title == Some(document.title.as_str()) {
                panic!("connection lost");
            }
            self.inner.upsert_document(document)
        }

        fn document(&self, id: &str) -> Result<Option<Document>> {
            self.inner.document(id)
        }
    }

    fn batch_store() -> MemoryStore {
        let store = MemoryStore::new();
        for i in 1..=5 {
            store.add_raw(
                "wos",
                &format!("WOS:{i}"),
                RawRecord::from_pairs([
                    ("TI", format!("Record {i}")),
                    ("PY", "2020".to_string()),
                    ("DI", format!("10.1000/r{i}")),
                    ("AU", "Smith, J".to_string()),
                    ("C1", "[Smith, J] Univ X, ENGLAND".to_string()),
                ]),
            );
        }
        store
    }

    fn config(concurrent: bool) -> EtlConfig {
        let mut config = EtlConfig::default();
        config.pipeline.concurrent = concurrent;
        config.pipeline.n_jobs = 3;
        config
    }

    fn doi_batch() -> Vec<Input> {
        Input::from_dois((1..=5).map(|i| format!("10.1000/r{i}")))
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_failed_record_does_not_abort_batch(#[case] concurrent: bool) {
        let mut store = FlakyStore::new(batch_store());
        store.fail_title = Some("Record 3");
        let pipeline = Pipeline::new(store, config(concurrent)).unwrap();

        let report = pipeline.run(&doi_batch());
        assert_eq!(report.len(), 5);
        assert_eq!(report.successes().count(), 4);
        let failures: Vec<&RecordStatus> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 2);
        assert_eq!(
            failures[0].outcome,
            Outcome::Failed {
                reason: "Store error: write rejected".to_string()
            }
        );
        assert_eq!(pipeline.store().inner.documents().len(), 4);
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_panicking_record_is_reported(#[case] concurrent: bool) {
        let mut store = FlakyStore::new(batch_store());
        store.panic_title = Some("Record 5");
        let pipeline = Pipeline::new(store, config(concurrent)).unwrap();

        let report = pipeline.run(&doi_batch());
        assert_eq!(report.successes().count(), 4);
        let status = report.status(4).unwrap();
        assert_eq!(
            status.outcome,
            Outcome::Failed {
                reason: "panic: connection lost".to_string()
            }
        );
    }

    #[test]
    fn test_doi_input_persists_linked_document() {
        let pipeline = Pipeline::new(batch_store(), EtlConfig::default()).unwrap();
        let report = pipeline.run(&[Input::Doi("https://doi.org/10.1000/R1".to_string())]);
        let Outcome::Persisted { id } = &report.statuses[0].outcome else {
            panic!("expected success, got {:?}", report.statuses[0]);
        };

        let document = pipeline.store().document(id).unwrap().unwrap();
        assert_eq!(document.title, "Record 1");
        assert_eq!(document.source_checked.len(), 1);
        assert_eq!(document.source_checked[0].source, "wos");
        assert_eq!(document.source_checked[0].id, "WOS:1");
        assert_eq!(document.authors.len(), 1);
        assert_eq!(document.authors[0].affiliations.len(), 1);
        assert_eq!(pipeline.store().authors()[0].1.full_name, "J Smith");
        assert_eq!(pipeline.store().institutions()[0].1.country, "GB");
        assert_eq!(pipeline.pools().remaining("wos"), 4);
    }

    #[test]
    fn test_sub_entities_are_linked_across_records() {
        let pipeline = Pipeline::new(batch_store(), EtlConfig::default()).unwrap();
        let report = pipeline.run(&doi_batch());
        assert_eq!(report.successes().count(), 5);
        assert_eq!(pipeline.store().authors().len(), 1);
        assert_eq!(pipeline.store().institutions().len(), 1);
    }

    #[test]
    fn test_unknown_doi_fails_with_not_found() {
        let pipeline = Pipeline::new(batch_store(), EtlConfig::default()).unwrap();
        let report = pipeline.run(&[Input::Doi("10.1000/missing".to_string()), Input::Doi("nonsense".to_string())]);
        assert_eq!(report.failures().count(), 2);
        assert_eq!(
            report.statuses[0].outcome,
            Outcome::Failed {
                reason: "No raw record found: doi 10.1000/missing".to_string()
            }
        );
    }

    #[cfg(feature = "csv")]
    #[test]
    fn test_csv_doi_batch() {
        let inputs = Input::from_csv("Title,DOI\nA,10.1000/R1\nB,\nC,10.1000/r2\n", &Default::default()).unwrap();
        assert_eq!(
            inputs,
            vec![Input::Doi("10.1000/r1".to_string()), Input::Doi("10.1000/r2".to_string())]
        );

        let pipeline = Pipeline::new(batch_store(), EtlConfig::default()).unwrap();
        assert_eq!(pipeline.run(&inputs).successes().count(), 2);
    }

    #[test]
    fn test_fingerprint_inputs_consume_each_candidate_once() {
        let store = MemoryStore::new();
        store.add_raw("wos", "w1", RawRecord::from_pairs([("TI", "A Study"), ("SO", "Nature"), ("PY", "2019")]));
        store.add_raw(
            "scopus",
            "s1",
            RawRecord::from_pairs([("Title", "A study."), ("Source title", "NATURE"), ("Year", "2019")]),
        );
        let mut config = EtlConfig::default();
        config.db_suffix = "_test".to_string();
        let pipeline = Pipeline::new(store, config).unwrap();

        let inputs = Input::from_fingerprints_json(
            r#"[{"title":"A Study","source":"Nature","year":2019},{"title":"A Study","source":"Nature","year":2019}]"#,
        )
        .unwrap();
        let report = pipeline.run(&inputs);
        assert!(report.statuses[0].is_success());
        assert!(!report.statuses[1].is_success());

        let documents = pipeline.store().documents();
        assert_eq!(documents.len(), 1);
        let sources: Vec<&str> = documents[0].1.source_checked.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["wos_test", "scopus_test"]);
    }

    #[test]
    fn test_staged_collection() {
        let store = batch_store();
        store.add_raw(
            "scopus",
            "2-s2.0-3",
            RawRecord::from_pairs([("Title", "Record 3"), ("Year", "2020"), ("Cited by", "7")]),
        );
        let pipeline = Pipeline::new(store, EtlConfig::default()).unwrap();

        let inputs = pipeline.staged_inputs("scopus").unwrap();
        assert_eq!(inputs.len(), 1);
        let report = pipeline.run(&inputs);
        assert_eq!(report.successes().count(), 1);

        let (_, document) = pipeline.store().documents().remove(0);
        assert_eq!(document.citations_count, Some(7));
        assert_eq!(document.source_checked.len(), 2);
        assert_eq!(pipeline.pools().remaining("wos"), 4);
        assert_eq!(pipeline.pools().remaining("scopus"), 0);

        assert!(matches!(
            pipeline.staged_inputs("lens"),
            Err(EtlError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_staged_record_merged_by_fingerprint_is_not_merged_again() {
        let store = MemoryStore::new();
        store.add_raw(
            "wos",
            "w1",
            RawRecord::from_pairs([
                ("TI", "A Study"),
                ("SO", "Nature"),
                ("PY", "2019"),
                ("AB", "wos abstract"),
            ]),
        );
        store.add_raw(
            "scopus",
            "s1",
            RawRecord::from_pairs([("Title", "A study"), ("Source title", "Nature"), ("Year", "2019")]),
        );
        let pipeline = Pipeline::new(store, EtlConfig::default()).unwrap();

        let mut inputs = vec![Input::Fingerprint(Fingerprint::new("A Study", "Nature", Some(2019)))];
        inputs.extend(pipeline.staged_inputs("scopus").unwrap());
        let report = pipeline.run(&inputs);

        assert!(report.statuses[0].is_success());
        assert_eq!(
            report.statuses[1].outcome,
            Outcome::Failed {
                reason: "Raw record already merged in this run: scopus/s1".to_string()
            }
        );
        let documents = pipeline.store().documents();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].1.abstract_text, "wos abstract");
        assert_eq!(documents[0].1.source_checked.len(), 2);
    }

    #[test]
    fn test_repeated_doi_is_merged_once() {
        let pipeline = Pipeline::new(batch_store(), EtlConfig::default()).unwrap();
        let report = pipeline.run(&Input::from_dois(["10.1000/r1", "10.1000/R1"]));
        assert!(report.statuses[0].is_success());
        assert_eq!(
            report.statuses[1].outcome,
            Outcome::Failed {
                reason: "No raw record found: doi 10.1000/R1".to_string()
            }
        );
        assert_eq!(pipeline.store().documents().len(), 1);
    }

    #[test]
    fn test_retry_relinks_instead_of_duplicating() {
        struct FailOnce {
            inner: MemoryStore,
            failed: std::sync::atomic::AtomicBool,
        }

        impl DocumentStore for FailOnce {
            fn candidate_rows(&self, provider: &str, normalizer: &dyn Normalizer) -> Result<Vec<Candidate>> {
                self.inner.candidate_rows(provider, normalizer)
            }
            fn raw_records(&self, provider: &str) -> Result<Vec<(String, RawRecord)>> {
                self.inner.raw_records(provider)
            }
            fn raw_by_id(&self, provider: &str, id: &str) -> Result<Option<RawRecord>> {
                self.inner.raw_by_id(provider, id)
            }
            fn raw_by_doi(
                &self,
                provider: &str,
                doi: &str,
                normalizer: &dyn Normalizer,
            ) -> Result<Option<(String, RawRecord)>> {
                self.inner.raw_by_doi(provider, doi, normalizer)
            }
            fn find_by_external_id(&self, kind: EntityKind, id: &ExternalId) -> Result<Option<EntityId>> {
                self.inner.find_by_external_id(kind, id)
            }
            fn name_candidates(&self, kind: EntityKind, name: &str) -> Result<Vec<NamedEntity>> {
                self.inner.name_candidates(kind, name)
            }
            fn insert(&self, entity: Entity) -> Result<EntityId> {
                self.inner.insert(entity)
            }
            fn upsert_document(&self, document: Document) -> Result<EntityId> {
                if !self.failed.swap(true, std::sync::atomic::Ordering::SeqCst) {
                    return Err(EtlError::Store("timeout".to_string()));
                }
                self.inner.upsert_document(document)
            }
            fn document(&self, id: &str) -> Result<Option<Document>> {
                self.inner.document(id)
            }
        }

        let store = FailOnce {
            inner: batch_store(),
            failed: Default::default(),
        };
        let mut config = EtlConfig::default();
        config.pipeline.persist_retries = 1;
        let pipeline = Pipeline::new(store, config).unwrap();

        let report = pipeline.run(&[Input::Doi("10.1000/r1".to_string())]);
        assert_eq!(report.successes().count(), 1);
        assert_eq!(pipeline.store().inner.authors().len(), 1);
        assert_eq!(pipeline.store().inner.institutions().len(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EtlConfig::default();
        config.pipeline.n_jobs = 0;
        assert!(matches!(
            Pipeline::new(MemoryStore::new(), config),
            Err(EtlError::Config(_))
        ));
    }

    #[test]
    fn test_report_serializes_outcomes() {
        let report = RunReport {
            statuses: vec![RecordStatus {
                index: 0,
                outcome: Outcome::Failed {
                    reason: "boom".to_string(),
                },
            }],
        };
        assert_eq!(
            serde_json::to_string(&report).unwrap(),
            r#"{"statuses":[{"index":0,"outcome":{"status":"failed","reason":"boom"}}]}"#
        );
    }
}
