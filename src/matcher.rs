//! Fingerprint similarity matching against the candidate pools.
//!
//! For every provider the matcher scores the remaining candidates against a target
//! [`Fingerprint`], keeps the best one at or above the acceptance threshold and
//! consumes it from the pool, so it is never matched again in the same run.
//!
//! Ranking is deterministic: higher score first, then an exact year match, then the
//! lower pool index.
//!
//! # Example
//!
//! ```
//! use biblink::matcher::{MatcherConfig, SimilarityMatcher};
//! use biblink::pool::{CandidatePool, CandidatePools};
//! use biblink::Fingerprint;
//!
//! let mut pool = CandidatePool::new();
//! pool.push("w1", Fingerprint::new("Deep Learning for Proteins", "Science", Some(2021)));
//! pool.push("w2", Fingerprint::new("A Study", "Nature", Some(2019)));
//!
//! let mut pools = CandidatePools::new();
//! pools.insert("wos", pool);
//!
//! let matcher = SimilarityMatcher::new(MatcherConfig::default());
//! let result = matcher.match_fingerprint(&pools, &Fingerprint::new("A study.", "Nature", Some(2019)), &[]);
//! assert_eq!(result.get("wos").map(|c| c.id.as_str()), Some("w2"));
//! assert_eq!(pools.remaining("wos"), 1);
//! ```

use crate::pool::{CandidatePool, CandidatePools, ConsumedCandidate};
use crate::raw::RawRecord;
use crate::store::DocumentStore;
use crate::utils::normalize_text;
use crate::{Fingerprint, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strsim::jaro_winkler;
use tracing::{debug, trace};

/// Tunables of the similarity matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum blended score for a candidate to be accepted
    pub acceptance_threshold: f64,
    /// Weight of the title similarity when both sources are present
    pub title_weight: f64,
    /// Weight of the source similarity when both sources are present
    pub source_weight: f64,
    /// Subtracted from the score when both years are known and differ
    pub year_mismatch_penalty: f64,
    /// Pools with at least this many candidates are scored in parallel
    pub parallel_threshold: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.9,
            title_weight: 0.8,
            source_weight: 0.2,
            year_mismatch_penalty: 0.0,
            parallel_threshold: 2048,
        }
    }
}

/// Consumed candidate per provider; `None` when no candidate cleared the threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matches: BTreeMap<String, Option<ConsumedCandidate>>,
}

impl MatchResult {
    pub fn get(&self, provider: &str) -> Option<&ConsumedCandidate> {
        self.matches.get(provider).and_then(Option::as_ref)
    }

    /// `(provider, candidate)` pairs of the providers that matched.
    pub fn consumed(&self) -> impl Iterator<Item = (&str, &ConsumedCandidate)> {
        self.matches
            .iter()
            .filter_map(|(provider, candidate)| candidate.as_ref().map(|c| (provider.as_str(), c)))
    }

    pub fn is_empty(&self) -> bool {
        self.consumed().next().is_none()
    }
}

/// Fingerprint with title and source already normalized.
#[derive(Debug, Clone)]
struct Target {
    title: String,
    source: String,
    year: Option<i32>,
}

impl From<&Fingerprint> for Target {
    fn from(fingerprint: &Fingerprint) -> Self {
        Self {
            title: normalize_text(&fingerprint.title),
            source: normalize_text(&fingerprint.source),
            year: fingerprint.year,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Scored {
    index: usize,
    score: f64,
    year_match: bool,
}

/// The better of two scored candidates under the ranking order.
fn better(a: Scored, b: Scored) -> Scored {
    if a.score != b.score {
        return if a.score > b.score { a } else { b };
    }
    if a.year_match != b.year_match {
        return if a.year_match { a } else { b };
    }
    if a.index <= b.index { a } else { b }
}

/// Scores fingerprints and consumes the best candidate of every provider pool.
#[derive(Debug, Clone, Default)]
pub struct SimilarityMatcher {
    config: MatcherConfig,
}

impl SimilarityMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Similarity of a candidate to the target in `[0, 1]` before the year penalty.
    ///
    /// `title` and `source` are already normalized, as stored in the pool.
    fn similarity(&self, target: &Target, title: &str, source: &str) -> Option<f64> {
        if target.title.is_empty() || title.is_empty() {
            return None;
        }
        let title_score = jaro_winkler(&target.title, title);

        if target.source.is_empty() || source.is_empty() {
            return Some(title_score);
        }
        let source_score = jaro_winkler(&target.source, source);
        let weights = self.config.title_weight + self.config.source_weight;
        Some((self.config.title_weight * title_score + self.config.source_weight * source_score) / weights)
    }

    fn score(&self, target: &Target, pool: &CandidatePool, index: usize) -> Option<Scored> {
        let mut score = self.similarity(target, &pool.titles()[index], &pool.sources()[index])?;
        let year = pool.years()[index];
        let year_match = target.year.is_some() && target.year == year;
        if target.year.is_some() && year.is_some() && !year_match {
            score -= self.config.year_mismatch_penalty;
        }
        (score >= self.config.acceptance_threshold).then_some(Scored {
            index,
            score,
            year_match,
        })
    }

    /// Best candidate of a pool at or above the acceptance threshold.
    fn best_candidate(&self, target: &Target, pool: &CandidatePool) -> Option<Scored> {
        if pool.len() >= self.config.parallel_threshold {
            (0..pool.len())
                .into_par_iter()
                .filter_map(|index| self.score(target, pool, index))
                .reduce_with(better)
        } else {
            (0..pool.len())
                .filter_map(|index| self.score(target, pool, index))
                .reduce(better)
        }
    }

    /// Scores under the read lock, then consumes under the write lock.
    ///
    /// If the chosen candidate was consumed by another worker in between, the pool is
    /// scored again.
    fn match_provider(&self, pools: &CandidatePools, provider: &str, target: &Target) -> Option<ConsumedCandidate> {
        loop {
            let chosen = {
                let pool = pools.read(provider)?;
                if pool.is_empty() {
                    return None;
                }
                let best = self.best_candidate(target, &pool)?;
                trace!(provider, index = best.index, score = best.score, "best candidate");
                pool.id(best.index)?.to_string()
            };

            let mut pool = pools.write(provider)?;
            if let Some(index) = pool.position(&chosen) {
                let consumed = pool.consume(index);
                debug!(provider, id = %chosen, remaining = pool.len(), "consumed candidate");
                return consumed;
            }
            debug!(provider, id = %chosen, "candidate taken by another worker, rescoring");
        }
    }

    /// Matches a fingerprint against every pool not in `exclude`, consuming the matches.
    pub fn match_fingerprint(
        &self,
        pools: &CandidatePools,
        fingerprint: &Fingerprint,
        exclude: &[&str],
    ) -> MatchResult {
        let target = Target::from(fingerprint);
        let matches = pools
            .providers()
            .filter(|provider| !exclude.contains(provider))
            .map(|provider| (provider.to_string(), self.match_provider(pools, provider, &target)))
            .collect();
        MatchResult { matches }
    }

    /// Matches a fingerprint and fetches the raw record of every consumed candidate.
    pub fn find_one_similarity<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        pools: &CandidatePools,
        fingerprint: &Fingerprint,
        exclude: &[&str],
    ) -> Result<(MatchResult, BTreeMap<String, Option<RawRecord>>)> {
        let result = self.match_fingerprint(pools, fingerprint, exclude);
        let mut records = BTreeMap::new();
        for (provider, candidate) in &result.matches {
            let raw = match candidate {
                Some(candidate) => store.raw_by_id(provider, &candidate.id)?,
                None => None,
            };
            records.insert(provider.clone(), raw);
        }
        Ok((result, records))
    }
}
