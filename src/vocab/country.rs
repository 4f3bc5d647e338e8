//! Country name resolution to ISO 3166-1 alpha-2 codes.
//!
//! Resolution runs in two stages: a fixed override table for the non-ISO spellings
//! citation indexes use in affiliation strings, then an exact lookup in the ISO 3166
//! name index. Both stages are pure functions of the input name.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Non-ISO spellings found in affiliation strings.
const OVERRIDES: [(&str, &str); 19] = [
    ("ENGLAND", "GB"),
    ("UNITED KINGDOM", "GB"),
    ("UNITED STATES", "US"),
    ("SCOTLAND", "GB"),
    ("WALES", "GB"),
    ("NORTH IRELAND", "GB"),
    ("CZECH REPUBLIC", "CZ"),
    ("VENEZUELA", "VE"),
    ("VIETNAM", "VN"),
    ("RUSSIA", "RU"),
    ("PEOPLES R CHINA", "CN"),
    ("IRAN", "IR"),
    ("SOUTH KOREA", "KR"),
    ("U ARAB EMIRATES", "AE"),
    ("DEM REP CONGO", "CD"),
    ("TANZANIA", "TZ"),
    ("TAIWAN", "TW"),
    ("MICRONESIA", "FM"),
    ("BOLIVIA", "BO"),
];

/// ISO 3166-1 short names and their alpha-2 codes.
const ISO_3166: [(&str, &str); 249] = [
    ("AFGHANISTAN", "AF"),
    ("ÅLAND ISLANDS", "AX"),
    ("ALBANIA", "AL"),
    ("ALGERIA", "DZ"),
    ("AMERICAN SAMOA", "AS"),
    ("ANDORRA", "AD"),
    ("ANGOLA", "AO"),
    ("ANGUILLA", "AI"),
    ("ANTARCTICA", "AQ"),
    ("ANTIGUA AND BARBUDA", "AG"),
    ("ARGENTINA", "AR"),
    ("ARMENIA", "AM"),
    ("ARUBA", "AW"),
    ("AUSTRALIA", "AU"),
    ("AUSTRIA", "AT"),
    ("AZERBAIJAN", "AZ"),
    ("BAHAMAS", "BS"),
    ("BAHRAIN", "BH"),
    ("BANGLADESH", "BD"),
    ("BARBADOS", "BB"),
    ("BELARUS", "BY"),
    ("BELGIUM", "BE"),
    ("BELIZE", "BZ"),
    ("BENIN", "BJ"),
    ("BERMUDA", "BM"),
    ("BHUTAN", "BT"),
    ("BOLIVIA, PLURINATIONAL STATE OF", "BO"),
    ("BONAIRE, SINT EUSTATIUS AND SABA", "BQ"),
    ("BOSNIA AND HERZEGOVINA", "BA"),
    ("BOTSWANA", "BW"),
    ("BOUVET ISLAND", "BV"),
    ("BRAZIL", "BR"),
    ("BRITISH INDIAN OCEAN TERRITORY", "IO"),
    ("BRUNEI DARUSSALAM", "BN"),
    ("BULGARIA", "BG"),
    ("BURKINA FASO", "BF"),
    ("BURUNDI", "BI"),
    ("CABO VERDE", "CV"),
    ("CAMBODIA", "KH"),
    ("CAMEROON", "CM"),
    ("CANADA", "CA"),
    ("CAYMAN ISLANDS", "KY"),
    ("CENTRAL AFRICAN REPUBLIC", "CF"),
    ("CHAD", "TD"),
    ("CHILE", "CL"),
    ("CHINA", "CN"),
    ("CHRISTMAS ISLAND", "CX"),
    ("COCOS (KEELING) ISLANDS", "CC"),
    ("COLOMBIA", "CO"),
    ("COMOROS", "KM"),
    ("CONGO", "CG"),
    ("CONGO, DEMOCRATIC REPUBLIC OF THE", "CD"),
    ("COOK ISLANDS", "CK"),
    ("COSTA RICA", "CR"),
    ("CÔTE D'IVOIRE", "CI"),
    ("CROATIA", "HR"),
    ("CUBA", "CU"),
    ("CURAÇAO", "CW"),
    ("CYPRUS", "CY"),
    ("CZECHIA", "CZ"),
    ("DENMARK", "DK"),
    ("DJIBOUTI", "DJ"),
    ("DOMINICA", "DM"),
    ("DOMINICAN REPUBLIC", "DO"),
    ("ECUADOR", "EC"),
    ("EGYPT", "EG"),
    ("EL SALVADOR", "SV"),
    ("EQUATORIAL GUINEA", "GQ"),
    ("ERITREA", "ER"),
    ("ESTONIA", "EE"),
    ("ESWATINI", "SZ"),
    ("ETHIOPIA", "ET"),
    ("FALKLAND ISLANDS (MALVINAS)", "FK"),
    ("FAROE ISLANDS", "FO"),
    ("FIJI", "FJ"),
    ("FINLAND", "FI"),
    ("FRANCE", "FR"),
    ("FRENCH GUIANA", "GF"),
    ("FRENCH POLYNESIA", "PF"),
    ("FRENCH SOUTHERN TERRITORIES", "TF"),
    ("GABON", "GA"),
    ("GAMBIA", "GM"),
    ("GEORGIA", "GE"),
    ("GERMANY", "DE"),
    ("GHANA", "GH"),
    ("GIBRALTAR", "GI"),
    ("GREECE", "GR"),
    ("GREENLAND", "GL"),
    ("GRENADA", "GD"),
    ("GUADELOUPE", "GP"),
    ("GUAM", "GU"),
    ("GUATEMALA", "GT"),
    ("GUERNSEY", "GG"),
    ("GUINEA", "GN"),
    ("GUINEA-BISSAU", "GW"),
    ("GUYANA", "GY"),
    ("HAITI", "HT"),
    ("HEARD ISLAND AND MCDONALD ISLANDS", "HM"),
    ("HOLY SEE", "VA"),
    ("HONDURAS", "HN"),
    ("HONG KONG", "HK"),
    ("HUNGARY", "HU"),
    ("ICELAND", "IS"),
    ("INDIA", "IN"),
    ("INDONESIA", "ID"),
    ("IRAN, ISLAMIC REPUBLIC OF", "IR"),
    ("IRAQ", "IQ"),
    ("IRELAND", "IE"),
    ("ISLE OF MAN", "IM"),
    ("ISRAEL", "IL"),
    ("ITALY", "IT"),
    ("JAMAICA", "JM"),
    ("JAPAN", "JP"),
    ("JERSEY", "JE"),
    ("JORDAN", "JO"),
    ("KAZAKHSTAN", "KZ"),
    ("KENYA", "KE"),
    ("KIRIBATI", "KI"),
    ("KOREA, DEMOCRATIC PEOPLE'S REPUBLIC OF", "KP"),
    ("KOREA, REPUBLIC OF", "KR"),
    ("KUWAIT", "KW"),
    ("KYRGYZSTAN", "KG"),
    ("LAO PEOPLE'S DEMOCRATIC REPUBLIC", "LA"),
    ("LATVIA", "LV"),
    ("LEBANON", "LB"),
    ("LESOTHO", "LS"),
    ("LIBERIA", "LR"),
    ("LIBYA", "LY"),
    ("LIECHTENSTEIN", "LI"),
    ("LITHUANIA", "LT"),
    ("LUXEMBOURG", "LU"),
    ("MACAO", "MO"),
    ("MADAGASCAR", "MG"),
    ("MALAWI", "MW"),
    ("MALAYSIA", "MY"),
    ("MALDIVES", "MV"),
    ("MALI", "ML"),
    ("MALTA", "MT"),
    ("MARSHALL ISLANDS", "MH"),
    ("MARTINIQUE", "MQ"),
    ("MAURITANIA", "MR"),
    ("MAURITIUS", "MU"),
    ("MAYOTTE", "YT"),
    ("MEXICO", "MX"),
    ("MICRONESIA, FEDERATED STATES OF", "FM"),
    ("MOLDOVA, REPUBLIC OF", "MD"),
    ("MONACO", "MC"),
    ("MONGOLIA", "MN"),
    ("MONTENEGRO", "ME"),
    ("MONTSERRAT", "MS"),
    ("MOROCCO", "MA"),
    ("MOZAMBIQUE", "MZ"),
    ("MYANMAR", "MM"),
    ("NAMIBIA", "NA"),
    ("NAURU", "NR"),
    ("NEPAL", "NP"),
    ("NETHERLANDS", "NL"),
    ("NEW CALEDONIA", "NC"),
    ("NEW ZEALAND", "NZ"),
    ("NICARAGUA", "NI"),
    ("NIGER", "NE"),
    ("NIGERIA", "NG"),
    ("NIUE", "NU"),
    ("NORFOLK ISLAND", "NF"),
    ("NORTH MACEDONIA", "MK"),
    ("NORTHERN MARIANA ISLANDS", "MP"),
    ("NORWAY", "NO"),
    ("OMAN", "OM"),
    ("PAKISTAN", "PK"),
    ("PALAU", "PW"),
    ("PALESTINE, STATE OF", "PS"),
    ("PANAMA", "PA"),
    ("PAPUA NEW GUINEA", "PG"),
    ("PARAGUAY", "PY"),
    ("PERU", "PE"),
    ("PHILIPPINES", "PH"),
    ("PITCAIRN", "PN"),
    ("POLAND", "PL"),
    ("PORTUGAL", "PT"),
    ("PUERTO RICO", "PR"),
    ("QATAR", "QA"),
    ("RÉUNION", "RE"),
    ("ROMANIA", "RO"),
    ("RUSSIAN FEDERATION", "RU"),
    ("RWANDA", "RW"),
    ("SAINT BARTHÉLEMY", "BL"),
    ("SAINT HELENA, ASCENSION AND TRISTAN DA CUNHA", "SH"),
    ("SAINT KITTS AND NEVIS", "KN"),
    ("SAINT LUCIA", "LC"),
    ("SAINT MARTIN (FRENCH PART)", "MF"),
    ("SAINT PIERRE AND MIQUELON", "PM"),
    ("SAINT VINCENT AND THE GRENADINES", "VC"),
    ("SAMOA", "WS"),
    ("SAN MARINO", "SM"),
    ("SAO TOME AND PRINCIPE", "ST"),
    ("SAUDI ARABIA", "SA"),
    ("SENEGAL", "SN"),
    ("SERBIA", "RS"),
    ("SEYCHELLES", "SC"),
    ("SIERRA LEONE", "SL"),
    ("SINGAPORE", "SG"),
    ("SINT MAARTEN (DUTCH PART)", "SX"),
    ("SLOVAKIA", "SK"),
    ("SLOVENIA", "SI"),
    ("SOLOMON ISLANDS", "SB"),
    ("SOMALIA", "SO"),
    ("SOUTH AFRICA", "ZA"),
    ("SOUTH GEORGIA AND THE SOUTH SANDWICH ISLANDS", "GS"),
    ("SOUTH SUDAN", "SS"),
    ("SPAIN", "ES"),
    ("SRI LANKA", "LK"),
    ("SUDAN", "SD"),
    ("SURINAME", "SR"),
    ("SVALBARD AND JAN MAYEN", "SJ"),
    ("SWEDEN", "SE"),
    ("SWITZERLAND", "CH"),
    ("SYRIAN ARAB REPUBLIC", "SY"),
    ("TAIWAN, PROVINCE OF CHINA", "TW"),
    ("TAJIKISTAN", "TJ"),
    ("TANZANIA, UNITED REPUBLIC OF", "TZ"),
    ("THAILAND", "TH"),
    ("TIMOR-LESTE", "TL"),
    ("TOGO", "TG"),
    ("TOKELAU", "TK"),
    ("TONGA", "TO"),
    ("TRINIDAD AND TOBAGO", "TT"),
    ("TUNISIA", "TN"),
    ("TÜRKIYE", "TR"),
    ("TURKMENISTAN", "TM"),
    ("TURKS AND CAICOS ISLANDS", "TC"),
    ("TUVALU", "TV"),
    ("UGANDA", "UG"),
    ("UKRAINE", "UA"),
    ("UNITED ARAB EMIRATES", "AE"),
    ("UNITED KINGDOM OF GREAT BRITAIN AND NORTHERN IRELAND", "GB"),
    ("UNITED STATES OF AMERICA", "US"),
    ("UNITED STATES MINOR OUTLYING ISLANDS", "UM"),
    ("URUGUAY", "UY"),
    ("UZBEKISTAN", "UZ"),
    ("VANUATU", "VU"),
    ("VENEZUELA, BOLIVARIAN REPUBLIC OF", "VE"),
    ("VIET NAM", "VN"),
    ("VIRGIN ISLANDS, BRITISH", "VG"),
    ("VIRGIN ISLANDS, U.S.", "VI"),
    ("WALLIS AND FUTUNA", "WF"),
    ("WESTERN SAHARA", "EH"),
    ("YEMEN", "YE"),
    ("ZAMBIA", "ZM"),
    ("ZIMBABWE", "ZW"),
];

static NAME_INDEX: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    ISO_3166
        .iter()
        .map(|(name, code)| (normalize_country_name(name), *code))
        .collect()
});

/// Normalizes a country name for lookup: dots removed, whitespace collapsed, uppercased.
pub fn normalize_country_name(name: &str) -> String {
    name.replace('.', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Stage one: the fixed override table.
///
/// Any name ending in `USA` (e.g. `"CA 94305 USA"`) resolves to `US`.
pub fn override_code(name: &str) -> Option<&'static str> {
    let name = normalize_country_name(name);
    if name.ends_with("USA") {
        return Some("US");
    }
    OVERRIDES
        .iter()
        .find(|(spelling, _)| *spelling == name)
        .map(|(_, code)| *code)
}

/// Stage two: exact, case-insensitive lookup in the ISO 3166 name index.
pub fn iso_code(name: &str) -> Option<&'static str> {
    NAME_INDEX.get(&normalize_country_name(name)).copied()
}

/// Resolves a country name to its alpha-2 code, overrides first.
///
/// Unresolvable names yield an empty string.
pub fn resolve_country(name: &str) -> &'static str {
    override_code(name).or_else(|| iso_code(name)).unwrap_or("")
}
