//! Joining of normalized records of the same work coming from several providers.
//!
//! Records are folded in provider priority order. Scalar fields keep the first
//! non-empty value; list fields are unioned without duplicates.

use crate::normalize::{AuthorAffiliation, NormalizedRecord};
use crate::utils::normalize_text;
use crate::{Author, Document, Source};
use itertools::Itertools;

fn first_text(target: &mut String, other: &str) {
    if target.is_empty() && !other.is_empty() {
        *target = other.to_string();
    }
}

fn first_some<T: Clone>(target: &mut Option<T>, other: &Option<T>) {
    if target.is_none() {
        *target = other.clone();
    }
}

fn union<T: Clone + Eq + std::hash::Hash>(target: &mut Vec<T>, other: &[T]) {
    *target = target.iter().chain(other).unique().cloned().collect();
}

/// Merges `other` into `target`; `target` keeps every non-empty field.
pub fn merge_document(target: &mut Document, other: &Document) {
    target.updated = target.updated.max(other.updated);
    for check in &other.source_checked {
        target.add_source_check(&check.source, &check.id, check.ts);
    }
    first_text(&mut target.publication_type, &other.publication_type);
    first_text(&mut target.title, &other.title);
    first_text(&mut target.subtitle, &other.subtitle);
    first_text(&mut target.abstract_text, &other.abstract_text);
    first_text(&mut target.funding_details, &other.funding_details);
    union(&mut target.keywords, &other.keywords);
    union(&mut target.languages, &other.languages);
    union(&mut target.urls, &other.urls);
    for ext in &other.external_ids {
        target.add_external_id(ext.clone());
    }
    first_some(&mut target.start_page, &other.start_page);
    first_some(&mut target.end_page, &other.end_page);
    first_some(&mut target.volume, &other.volume);
    first_some(&mut target.issue, &other.issue);
    first_some(&mut target.date_published, &other.date_published);
    first_some(&mut target.year_published, &other.year_published);
    first_some(&mut target.references_count, &other.references_count);
    first_some(&mut target.citations_count, &other.citations_count);
    first_some(&mut target.is_open_access, &other.is_open_access);
    first_some(&mut target.author_count, &other.author_count);
    first_some(&mut target.source_id, &other.source_id);
    if target.authors.is_empty() {
        target.authors = other.authors.clone();
    }
}

fn merge_source(target: &mut Source, other: &Source) {
    first_text(&mut target.title, &other.title);
    first_text(&mut target.source_type, &other.source_type);
    first_text(&mut target.publisher, &other.publisher);
    first_text(&mut target.country, &other.country);
    for serial in &other.serials {
        target.add_serial(serial.kind, serial.value.clone());
    }
    for abbreviation in &other.abbreviations {
        if !target.abbreviations.contains(abbreviation) {
            target.abbreviations.push(abbreviation.clone());
        }
    }
    union(&mut target.subjects, &other.subjects);
}

/// Whether two authors from different providers are the same person.
fn same_author(a: &Author, b: &Author) -> bool {
    if a.external_ids.iter().any(|id| b.external_ids.contains(id)) {
        return true;
    }
    let last = normalize_text(&a.last_names);
    !last.is_empty()
        && last == normalize_text(&b.last_names)
        && a.initials.chars().next() == b.initials.chars().next()
}

fn merge_authors(target: &mut Vec<AuthorAffiliation>, other: &[AuthorAffiliation]) {
    if target.is_empty() {
        target.extend(other.iter().cloned());
        return;
    }
    for pair in target.iter_mut() {
        let Some(matching) = other.iter().find(|o| same_author(&pair.author, &o.author)) else {
            continue;
        };
        union(&mut pair.author.external_ids, &matching.author.external_ids);
        union(&mut pair.author.aliases, &matching.author.aliases);
        if !pair.author.corresponding && matching.author.corresponding {
            pair.author.corresponding = true;
            first_text(&mut pair.author.corresponding_email, &matching.author.corresponding_email);
            first_text(&mut pair.author.corresponding_address, &matching.author.corresponding_address);
        }
        if pair.institutions.is_empty() {
            pair.institutions = matching.institutions.clone();
        }
    }
}

/// Merges records given in provider priority order.
///
/// Returns `None` for an empty input.
pub fn merge_records<I>(records: I) -> Option<NormalizedRecord>
where
    I: IntoIterator<Item = NormalizedRecord>,
{
    let mut records = records.into_iter();
    let mut merged = records.next()?;
    for record in records {
        merge_document(&mut merged.document, &record.document);
        merge_authors(&mut merged.author_institutions, &record.author_institutions);
        merge_source(&mut merged.source, &record.source);
    }
    Some(merged)
}
