//! Controlled vocabulary from English language names to ISO 639-1 codes.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Token providers use when the language is unknown.
pub const UNSPECIFIED: &str = "Unspecified";

const ISO_639_1: [(&str, &str); 80] = [
    ("Afrikaans", "af"),
    ("Albanian", "sq"),
    ("Arabic", "ar"),
    ("Armenian", "hy"),
    ("Azerbaijani", "az"),
    ("Basque", "eu"),
    ("Belarusian", "be"),
    ("Bengali", "bn"),
    ("Bosnian", "bs"),
    ("Bulgarian", "bg"),
    ("Catalan", "ca"),
    ("Chinese", "zh"),
    ("Croatian", "hr"),
    ("Czech", "cs"),
    ("Danish", "da"),
    ("Dutch", "nl"),
    ("English", "en"),
    ("Esperanto", "eo"),
    ("Estonian", "et"),
    ("Faroese", "fo"),
    ("Finnish", "fi"),
    ("French", "fr"),
    ("Galician", "gl"),
    ("Georgian", "ka"),
    ("German", "de"),
    ("Greek", "el"),
    ("Guarani", "gn"),
    ("Hebrew", "he"),
    ("Hindi", "hi"),
    ("Hungarian", "hu"),
    ("Icelandic", "is"),
    ("Indonesian", "id"),
    ("Irish", "ga"),
    ("Italian", "it"),
    ("Japanese", "ja"),
    ("Kazakh", "kk"),
    ("Korean", "ko"),
    ("Kurdish", "ku"),
    ("Latin", "la"),
    ("Latvian", "lv"),
    ("Lithuanian", "lt"),
    ("Luxembourgish", "lb"),
    ("Macedonian", "mk"),
    ("Malay", "ms"),
    ("Maltese", "mt"),
    ("Maori", "mi"),
    ("Marathi", "mr"),
    ("Mongolian", "mn"),
    ("Nepali", "ne"),
    ("Norwegian", "no"),
    ("Persian", "fa"),
    ("Polish", "pl"),
    ("Portuguese", "pt"),
    ("Punjabi", "pa"),
    ("Quechua", "qu"),
    ("Romanian", "ro"),
    ("Russian", "ru"),
    ("Serbian", "sr"),
    ("Sinhala", "si"),
    ("Slovak", "sk"),
    ("Slovenian", "sl"),
    ("Somali", "so"),
    ("Spanish", "es"),
    ("Swahili", "sw"),
    ("Swedish", "sv"),
    ("Tagalog", "tl"),
    ("Tajik", "tg"),
    ("Tamil", "ta"),
    ("Telugu", "te"),
    ("Thai", "th"),
    ("Tibetan", "bo"),
    ("Turkish", "tr"),
    ("Turkmen", "tk"),
    ("Ukrainian", "uk"),
    ("Urdu", "ur"),
    ("Uzbek", "uz"),
    ("Vietnamese", "vi"),
    ("Welsh", "cy"),
    ("Yiddish", "yi"),
    ("Zulu", "zu"),
];

static NAME_INDEX: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    ISO_639_1
        .iter()
        .map(|(name, code)| (name.to_lowercase(), *code))
        .collect()
});

/// Maps one raw language token to its ISO 639-1 code.
///
/// [`UNSPECIFIED`] maps to an empty code; unknown tokens yield `None`.
pub fn language_code(token: &str) -> Option<&'static str> {
    let token = token.trim();
    if token == UNSPECIFIED {
        return Some("");
    }
    NAME_INDEX.get(&token.to_lowercase()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("English", Some("en"))]
    #[case("spanish", Some("es"))]
    #[case(" Portuguese ", Some("pt"))]
    #[case("Unspecified", Some(""))]
    #[case("Klingon", None)]
    fn test_language_code(#[case] token: &str, #[case] expected: Option<&str>) {
        assert_eq!(language_code(token), expected);
    }
}
