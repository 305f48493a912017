//! Built-in material tables and country lists for the two destination regimes.

use crate::model::MaterialCode;

const EU_MATERIALS: &[(&str, &str)] = &[
    ("Cigarette Paper", "4813100000"),
    ("Tipping Paper", "4813200000"),
    ("Plugwrap", "4813900000"),
    ("Filter Tow", "5502100000"),
    ("Filter Rods", "5601220000"),
    ("Adhesive", "3506911000"),
    ("Capsules", "3926909990"),
    ("Plasticizer", "2917120000"),
    ("Adsorbent", "3802100000"),
    ("Board Packaging", "4819100000"),
    ("Paper Packaging", "4819200000"),
];

const US_MATERIALS: &[(&str, &str)] = &[
    ("Cigarette Paper", "4813100000"),
    ("Tipping Paper", "4813200000"),
    ("Plugwrap", "4813900000"),
    ("Filter Tow", "5502100000"),
    ("Filter Rods", "5601220000"),
    ("Adhesive", "3506910000"),
    ("Capsules", "3926909990"),
    ("Plasticizer", "2917125000"),
    ("Adsorbent", "3802100000"),
    ("Board Packaging", "4819100000"),
    ("Paper Packaging", "4819200000"),
    ("Inner Bundling", "4811900000"),
    ("Board Inner Frame", "4819100000"),
];

/// Non-EU supplier countries for EU import scenarios.
const EU_COUNTRIES: &[&str] = &[
    "US", "CN", "HK", "JP", "KR", "IN", "ID", "VN", "TH", "MY", "PH", "TW", "SG", "AU", "GB",
    "CH", "NO", "TR", "PK", "BD", "LK", "BR", "AR", "MX", "CA", "CL", "CO", "ZA", "EG", "AE",
];

/// Origins for US imports, EU member states included.
const US_COUNTRIES: &[&str] = &[
    "CN", "MX", "CA", "AU", "CL", "CO", "KR", "SG", "HN", "JP", "CH", "GB", "IN", "ID", "VN",
    "TH", "MY", "BR", "AR", "TR", "ZA", "EG", "AE", "NO", "PK", "BD", "LK",
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT",
    "LV", "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];

fn materials(table: &[(&str, &str)]) -> Vec<MaterialCode> {
    table
        .iter()
        .map(|(name, code)| MaterialCode::new(*name, *code))
        .collect()
}

fn countries(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

pub fn eu_materials() -> Vec<MaterialCode> {
    materials(EU_MATERIALS)
}

pub fn us_materials() -> Vec<MaterialCode> {
    materials(US_MATERIALS)
}

pub fn eu_countries() -> Vec<String> {
    countries(EU_COUNTRIES)
}

pub fn us_countries() -> Vec<String> {
    countries(US_COUNTRIES)
}
