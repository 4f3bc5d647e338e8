//! Run configuration.
//!
//! All tunables of a run live in [`EtlConfig`], which can be loaded from TOML. Every
//! section has defaults, so a file only needs the values it changes:
//!
//! ```
//! use biblink::EtlConfig;
//!
//! let config = EtlConfig::from_toml_str(
//!     r#"
//!     db_suffix = "_antioquia"
//!
//!     [matcher]
//!     acceptance_threshold = 0.85
//!
//!     [[providers]]
//!     name = "wos"
//!     format = "wos"
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.matcher.acceptance_threshold, 0.85);
//! assert_eq!(config.providers.len(), 1);
//! ```

use crate::link::LinkerConfig;
use crate::matcher::MatcherConfig;
use crate::normalize::Format;
use crate::pipeline::PipelineOptions;
use crate::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A raw provider collection and the format its records are in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub format: Format,
}

impl ProviderConfig {
    pub fn new(name: &str, format: Format) -> Self {
        Self {
            name: name.to_string(),
            format,
        }
    }
}

/// Options shared by every format normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Minimum partial-ratio similarity between an author's `"Last, First"` name and the
    /// name attached to an ORCID/ResearcherID entry.
    pub id_match_threshold: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            id_match_threshold: 0.8,
        }
    }
}

/// Complete configuration of an ETL run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Appended to provider names in `source_checked` entries
    pub db_suffix: String,
    /// Providers in merge priority order
    pub providers: Vec<ProviderConfig>,
    pub normalizer: NormalizerConfig,
    pub matcher: MatcherConfig,
    pub linker: LinkerConfig,
    pub pipeline: PipelineOptions,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            db_suffix: String::new(),
            providers: vec![
                ProviderConfig::new("wos", Format::Wos),
                ProviderConfig::new("scielo", Format::Wos),
                ProviderConfig::new("scopus", Format::Scopus),
            ],
            normalizer: NormalizerConfig::default(),
            matcher: MatcherConfig::default(),
            linker: LinkerConfig::default(),
            pipeline: PipelineOptions::default(),
        }
    }
}

impl EtlConfig {
    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: EtlConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    /// Looks up a provider by name.
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Name under which a provider is recorded in `source_checked`.
    pub fn checked_source_name(&self, provider: &str) -> String {
        format!("{}{}", provider, self.db_suffix)
    }

    /// Checks thresholds are in range and provider names are unique.
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("normalizer.id_match_threshold", self.normalizer.id_match_threshold),
            ("matcher.acceptance_threshold", self.matcher.acceptance_threshold),
            ("linker.name_threshold", self.linker.name_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(EtlError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if self.matcher.title_weight < 0.0 || self.matcher.source_weight < 0.0 {
            return Err(EtlError::Config("matcher weights must be non-negative".into()));
        }
        if self.matcher.title_weight + self.matcher.source_weight <= 0.0 {
            return Err(EtlError::Config("matcher weights must not both be zero".into()));
        }

        if self.pipeline.n_jobs == 0 {
            return Err(EtlError::Config("pipeline.n_jobs must be at least 1".into()));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name.as_str()) {
                return Err(EtlError::Config(format!(
                    "duplicate provider: {}",
                    provider.name
                )));
            }
        }
        Ok(())
    }
}
