//! CSV exports and DOI lists.
//!
//! Scopus exports its records as CSV with one column per field. [`read_records`] turns
//! every row into a [`RawRecord`] keyed by the column header, ready to be loaded into a
//! provider collection. [`read_dois`] pulls the DOI column out of any CSV, e.g. a list
//! of works to look up with [`Input::Doi`](crate::pipeline::Input::Doi).
//!
//! # Example
//!
//! ```
//! use biblink::csv::{read_dois, read_records, CsvConfig};
//!
//! let input = "Title,Year,DOI,EID\nA Study,2019,https://doi.org/10.1/A,2-s2.0-1\n";
//! let config = CsvConfig::new().with_id_column("EID");
//!
//! let records = read_records(input, &config).unwrap();
//! assert_eq!(records[0].0, "2-s2.0-1");
//! assert_eq!(read_dois(input, &config).unwrap(), vec!["10.1/a"]);
//! ```

use csv::{ReaderBuilder, StringRecord};
use nanoid::nanoid;
use tracing::{debug, warn};

use crate::raw::RawRecord;
use crate::store::MemoryStore;
use crate::utils::format_doi;
use crate::{EtlError, Result};

/// Header names recognized as the DOI column, compared case-insensitively
const DEFAULT_DOI_HEADERS: &[&str] = &["doi", "di", "digital object identifier"];

/// Options for reading CSV input.
#[derive(Debug, Clone)]
pub struct CsvConfig {
    delimiter: u8,
    doi_headers: Vec<String>,
    /// Column holding the raw record id; a nanoid is generated when absent
    id_column: Option<String>,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            doi_headers: DEFAULT_DOI_HEADERS.iter().map(|h| h.to_string()).collect(),
            id_column: None,
        }
    }
}

impl CsvConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Replaces the headers recognized as the DOI column.
    #[must_use]
    pub fn with_doi_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.doi_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_id_column(mut self, column: &str) -> Self {
        self.id_column = Some(column.to_string());
        self
    }

    fn reader<'a>(&self, input: &'a str) -> csv::Reader<&'a [u8]> {
        ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(input.as_bytes())
    }
}

fn column(headers: &StringRecord, names: &[String]) -> Option<usize> {
    headers
        .iter()
        .position(|header| names.iter().any(|name| name.eq_ignore_ascii_case(header)))
}

/// Reads every row as a raw record keyed by column header; empty cells are skipped.
pub fn read_records(input: &str, config: &CsvConfig) -> Result<Vec<(String, RawRecord)>> {
    let mut reader = config.reader(input);
    let headers = reader.headers()?.clone();
    let id_column = match &config.id_column {
        Some(name) => Some(
            column(&headers, std::slice::from_ref(name))
                .ok_or_else(|| EtlError::MissingField(name.clone()))?,
        ),
        None => None,
    };

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let id = id_column
            .and_then(|index| row.get(index))
            .filter(|id| !id.is_empty())
            .map_or_else(|| nanoid!(), str::to_string);
        let raw = RawRecord::from_pairs(
            headers
                .iter()
                .zip(row.iter())
                .filter(|(_, value)| !value.is_empty()),
        );
        records.push((id, raw));
    }
    debug!(count = records.len(), "read csv records");
    Ok(records)
}

/// Reads a CSV export into a provider collection of a [`MemoryStore`].
pub fn load_into(store: &MemoryStore, provider: &str, input: &str, config: &CsvConfig) -> Result<usize> {
    let records = read_records(input, config)?;
    let count = records.len();
    for (id, raw) in records {
        store.add_raw(provider, &id, raw);
    }
    Ok(count)
}

/// Normalized DOIs of the DOI column, in row order. Cells that are not DOIs are skipped.
pub fn read_dois(input: &str, config: &CsvConfig) -> Result<Vec<String>> {
    let mut reader = config.reader(input);
    let headers = reader.headers()?.clone();
    let index = column(&headers, &config.doi_headers)
        .ok_or_else(|| EtlError::MissingField("doi".to_string()))?;

    let mut dois = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        let cell = row.get(index).unwrap_or_default();
        if cell.is_empty() {
            continue;
        }
        match format_doi(cell) {
            Some(doi) => dois.push(doi),
            None => warn!(row = line + 1, value = cell, "skipping value that is not a DOI"),
        }
    }
    Ok(dois)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawValue;
    use crate::store::DocumentStore;
    use pretty_assertions::assert_eq;

    const SCOPUS_EXPORT: &str = "\
Authors,Title,Year,Source title,DOI,EID
\"Smith J., Doe A.\",A Study,2019,Nature,10.1038/x1,2-s2.0-1
Perez M.,\"Another, longer title\",2020,,,2-s2.0-2
";

    #[test]
    fn test_read_records_keyed_by_header() {
        let records = read_records(SCOPUS_EXPORT, &CsvConfig::new().with_id_column("eid")).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, "2-s2.0-1");
        assert_eq!(records[0].1.value("Authors"), Some(&RawValue::from("Smith J., Doe A.")));
        assert_eq!(records[1].1.value("Title"), Some(&RawValue::from("Another, longer title")));
        assert_eq!(records[1].1.value("DOI"), None);
    }

    #[test]
    fn test_generated_ids_without_id_column() {
        let records = read_records(SCOPUS_EXPORT, &CsvConfig::new()).unwrap();
        assert_ne!(records[0].0, records[1].0);
        assert!(!records[0].0.is_empty());
    }

    #[test]
    fn test_missing_id_column() {
        let result = read_records(SCOPUS_EXPORT, &CsvConfig::new().with_id_column("UT"));
        assert!(matches!(result, Err(EtlError::MissingField(_))));
    }

    #[test]
    fn test_load_into_store() {
        let store = MemoryStore::new();
        let count = load_into(&store, "scopus", SCOPUS_EXPORT, &CsvConfig::new().with_id_column("EID")).unwrap();
        assert_eq!(count, 2);
        assert!(store.raw_by_id("scopus", "2-s2.0-2").unwrap().is_some());
    }

    #[test]
    fn test_read_dois() {
        let input = "id;Digital Object Identifier\n1;https://doi.org/10.1000/ABC\n2;\n3;n/a\n4; 10.1000/def \n";
        let dois = read_dois(input, &CsvConfig::new().with_delimiter(b';')).unwrap();
        assert_eq!(dois, vec!["10.1000/abc", "10.1000/def"]);
    }

    #[test]
    fn test_read_dois_custom_header() {
        let config = CsvConfig::new().with_doi_headers(["identifier"]);
        let dois = read_dois("Identifier\n10.1/a\n", &config).unwrap();
        assert_eq!(dois, vec!["10.1/a"]);
        assert!(matches!(
            read_dois("Title\nA\n", &CsvConfig::new()),
            Err(EtlError::MissingField(_))
        ));
    }
}
