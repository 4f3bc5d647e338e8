//! Controlled vocabularies used during normalization.

pub mod country;
pub mod language;

pub use country::resolve_country;
pub use language::language_code;
