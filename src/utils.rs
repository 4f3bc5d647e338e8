use crate::regex::Regex;
use std::sync::LazyLock;
use strsim::{jaro_winkler, normalized_levenshtein};

static DOI_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:dx\.)?doi\.org/(.+)$").unwrap());

static UNICODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<U\+([0-9A-Fa-f]+)>").unwrap());

const HTML_REPLACEMENTS: [(&str, &str); 9] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&amp;", "&"),
    ("<sup>", ""),
    ("</sup>", ""),
    ("<sub>", ""),
    ("</sub>", ""),
    ("<inf>", ""),
    ("</inf>", ""),
];

/// Formats a DOI string by removing URL prefixes and [doi] suffixes
///
/// # Arguments
///
/// * `doi_str` - The DOI string to format
pub fn format_doi(doi_str: &str) -> Option<String> {
    if doi_str.is_empty() {
        return None;
    }
    let doi = doi_str
        .trim()
        .trim_end_matches("[doi]")
        .trim()
        .replace(|c: char| c.is_whitespace(), "")
        .to_lowercase();

    // Find the first occurrence of "10." which typically starts a DOI
    if let Some(pos) = doi.find("10.") {
        let doi = &doi[pos..];
        if let Some(captures) = DOI_URL_REGEX.captures(doi) {
            Some(captures[1].to_string())
        } else {
            Some(doi.to_string())
        }
    } else {
        None
    }
}

/// Strips hyphens and whitespace from an ISSN/ISBN.
pub fn strip_serial(serial: &str) -> String {
    serial
        .trim()
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

/// Lowercases, decodes `<U+XXXX>` escapes, drops markup and keeps only alphanumerics.
pub fn normalize_text(input: &str) -> String {
    let decoded = UNICODE_REGEX.replace_all(input, |caps: &crate::regex::Captures| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });

    let mut s = decoded.trim().to_lowercase();
    for (from, to) in HTML_REPLACEMENTS.iter() {
        s = s.replace(from, to);
    }

    s.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Jaro-Winkler similarity of two strings after [`normalize_text`].
///
/// Returns `None` when either side is empty after normalization.
pub fn text_similarity(a: &str, b: &str) -> Option<f64> {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some(jaro_winkler(&a, &b))
}

/// Best similarity between the shorter string and any equally long window of the longer one.
///
/// Comparison is case-insensitive; the result is in `[0, 1]`.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let short: String = short.into_iter().collect();

    long.windows(short.chars().count())
        .map(|window| normalized_levenshtein(&short, &window.iter().collect::<String>()))
        .fold(0.0, f64::max)
}

/// Uppercases the first letter of every whitespace-separated word and lowercases the rest.
pub fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Splits a `"Last, First"` name into `(last, first)`.
///
/// A name without comma is treated as a bare given name. Extra comma segments are
/// appended to the given names.
pub fn parse_author_name(name: &str) -> (String, String) {
    let parts: Vec<&str> = name
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    match parts.len() {
        0 => (String::new(), String::new()),
        1 => (String::new(), parts[0].to_string()),
        _ => (parts[0].to_string(), parts[1..].join(" ")),
    }
}

/// Initials of the given names, e.g. `"John Paul"` -> `"JP"`.
pub fn initials(given_names: &str) -> String {
    given_names
        .split(|c: char| c.is_whitespace() || c == '-' || c == '.')
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_doi() {
        let test_cases = vec![
            ("10.1000/test", Some("10.1000/test".to_string())),
            ("10.1000/test [doi]", Some("10.1000/test".to_string())),
            ("https://doi.org/10.1000/test", Some("10.1000/test".to_string())),
            ("http://dx.doi.org/10.1000/test", Some("10.1000/test".to_string())),
            ("DOI: 10.1000/TEST", Some("10.1000/test".to_string())),
            ("", None),
            ("invalid", None),
        ];

        for (input, expected) in test_cases {
            assert_eq!(format_doi(input), expected);
        }
    }

    #[test]
    fn test_strip_serial() {
        assert_eq!(strip_serial("1234-567X"), "1234567X");
        assert_eq!(strip_serial(" 978-3-16-148410-0 "), "9783161484100");
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("Machine Learning! (2<sup>nd</sup> Edition)"),
            "machinelearning2ndedition"
        );
        assert_eq!(normalize_text("<U+03A9>mega"), "ωmega");
    }

    #[test]
    fn test_text_similarity() {
        assert_eq!(text_similarity("A Study", "a study."), Some(1.0));
        assert_eq!(text_similarity("", "a study"), None);
        assert!(text_similarity("A Study", "Another thing").unwrap() < 0.9);
    }

    #[test]
    fn test_partial_ratio() {
        assert_eq!(partial_ratio("Smith, John", "smith, john"), 1.0);
        assert_eq!(partial_ratio("Smith, J", "Smith, John"), 1.0);
        assert!(partial_ratio("Doe, Jane", "Smith, John") < 0.8);
        assert_eq!(partial_ratio("", "Smith"), 0.0);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("JOHN paul"), "John Paul");
        assert_eq!(title_case("j"), "J");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_parse_author_name() {
        assert_eq!(
            parse_author_name("Smith, John"),
            ("Smith".to_string(), "John".to_string())
        );
        assert_eq!(
            parse_author_name("Smith"),
            (String::new(), "Smith".to_string())
        );
        assert_eq!(
            parse_author_name("Smith, John, Jr"),
            ("Smith".to_string(), "John Jr".to_string())
        );
        assert_eq!(parse_author_name(""), (String::new(), String::new()));
    }

    #[test]
    fn test_initials() {
        assert_eq!(initials("John Paul"), "JP");
        assert_eq!(initials("Jean-Luc"), "JL");
        assert_eq!(initials(""), "");
    }
}
