//! Parsing of the `C1` author address field.
//!
//! Each line of `C1` is one affiliation block. A block may start with a bracketed list
//! of the authors it belongs to:
//!
//! ```text
//! [Smith, J; Doe, A] Univ X, Dept Chem, London, ENGLAND
//! Univ Y, Medellin, Colombia
//! ```

use crate::vocab::resolve_country;

/// One line of the author address field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressBlock {
    /// Authors listed in the bracket prefix, empty when the block has none
    pub authors: Vec<String>,
    /// The address with the bracket prefix removed
    pub address: String,
}

impl AddressBlock {
    /// Institution name: the first comma-separated segment of the address.
    pub fn institution_name(&self) -> &str {
        self.address
            .split(", ")
            .next()
            .map(str::trim)
            .unwrap_or("")
    }

    /// Country name: the last comma-separated segment of the address.
    pub fn country_name(&self) -> &str {
        self.address
            .rsplit(", ")
            .next()
            .map(str::trim)
            .unwrap_or("")
    }

    /// Alpha-2 code of [`Self::country_name`], empty when unresolved.
    pub fn country_code(&self) -> &'static str {
        resolve_country(self.country_name())
    }
}

/// Splits the raw `C1` field into address blocks.
///
/// Dots are removed before parsing, so `"Univ. X"` and `"Smith, J."` become
/// `"Univ X"` and `"Smith, J"`.
pub fn parse_address_blocks(c1: &str) -> Vec<AddressBlock> {
    let cleaned = c1.replace('.', "");
    cleaned
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_block)
        .collect()
}

fn parse_block(line: &str) -> AddressBlock {
    if let Some(rest) = line.strip_prefix('[') {
        if let Some((authors, address)) = rest.split_once(']') {
            return AddressBlock {
                authors: authors
                    .split(';')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(String::from)
                    .collect(),
                address: address.trim().to_string(),
            };
        }
    }
    AddressBlock {
        authors: Vec::new(),
        address: line.to_string(),
    }
}
