//! Plain data shared by the adapters, the resolver, the orchestrator and the store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Measure type for a tariff preference (trade agreement or unilateral scheme).
pub const MEASURE_TYPE_PREFERENCE: u32 = 142;
/// Measure type for the third-country (MFN) duty.
pub const MEASURE_TYPE_THIRD_COUNTRY: u32 = 103;

/// Import destination whose tariff schedule is being queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "EU")]
    Eu,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Us => "US",
            Destination::Eu => "EU",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag identifying which adapter produced a persisted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTag {
    /// EU measure service, XML envelope.
    #[serde(rename = "TARIC")]
    Taric,
    /// Token-authenticated JSON lookup service.
    #[serde(rename = "WOVE")]
    Wove,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Taric => "TARIC",
            SourceTag::Wove => "WOVE",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a regime's material table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialCode {
    /// Human label, unique within a table.
    pub name: String,
    /// 10-digit hierarchical classification code.
    #[serde(rename = "code")]
    pub tariff_code: String,
}

impl MaterialCode {
    pub fn new(name: impl Into<String>, tariff_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tariff_code: tariff_code.into(),
        }
    }
}

/// A single measure parsed out of an XML lookup response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateMeasure {
    pub measure_type: u32,
    /// Duty rate in percent.
    pub rate: f64,
    pub description: Option<String>,
}

/// Label attached to a resolved rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateType {
    #[serde(rename = "FTA")]
    Fta,
    #[serde(rename = "MFN")]
    Mfn,
    #[serde(rename = "MFN+Additional")]
    MfnAdditional,
    Unknown,
    Error,
}

impl RateType {
    /// Canonical label, as persisted in the `rate_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            RateType::Fta => "FTA",
            RateType::Mfn => "MFN",
            RateType::MfnAdditional => "MFN+Additional",
            RateType::Unknown => "Unknown",
            RateType::Error => "Error",
        }
    }

    /// Label used in detailed single-lookup output.
    pub fn display_label(&self) -> &'static str {
        match self {
            RateType::Fta => "Preference",
            other => other.as_str(),
        }
    }
}

impl fmt::Display for RateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of resolving one (code, country) query.
///
/// `rate: None` means no applicable measure was found. That is a legitimate
/// answer and is not the same thing as a failed lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRate {
    pub rate: Option<f64>,
    pub rate_type: RateType,
    pub description: Option<String>,
}

impl ResolvedRate {
    pub fn new(rate: f64, rate_type: RateType) -> Self {
        Self {
            rate: Some(rate),
            rate_type,
            description: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn not_found() -> Self {
        Self {
            rate: None,
            rate_type: RateType::Unknown,
            description: Some("No rate found".to_string()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            rate: None,
            rate_type: RateType::Error,
            description: Some(message.into()),
        }
    }
}

/// A persisted row of the `duty_rates` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyRateRecord {
    pub country_iso: String,
    pub destination: Destination,
    pub material: String,
    #[serde(rename = "cn_code")]
    pub tariff_code: String,
    pub rate: f64,
    pub rate_type: String,
    pub source: SourceTag,
}

impl DutyRateRecord {
    /// Builds the row for a resolved rate. Returns `None` for a null rate,
    /// which is never persisted.
    pub fn from_resolved(
        country: &str,
        destination: Destination,
        material: &MaterialCode,
        source: SourceTag,
        resolved: &ResolvedRate,
    ) -> Option<Self> {
        let rate = resolved.rate?;
        Some(Self {
            country_iso: country.to_string(),
            destination,
            material: material.name.clone(),
            tariff_code: material.tariff_code.clone(),
            rate,
            rate_type: resolved.rate_type.as_str().to_string(),
            source,
        })
    }
}

/// Counters for a single orchestrator run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncRunSummary {
    pub success: usize,
    pub skipped: usize,
    /// Lookup and store failures together.
    pub errors: usize,
    pub lookup_errors: usize,
    pub store_errors: usize,
}

impl SyncRunSummary {
    pub fn record_lookup_error(&mut self) {
        self.lookup_errors += 1;
        self.errors += 1;
    }

    pub fn record_store_error(&mut self) {
        self.store_errors += 1;
        self.errors += 1;
    }

    /// A run is degraded when any cell or the partition clear failed.
    pub fn is_degraded(&self) -> bool {
        self.errors > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_rate_never_becomes_a_record() {
        let material = MaterialCode::new("Filter Tow", "5502100000");
        let record = DutyRateRecord::from_resolved(
            "CN",
            Destination::Eu,
            &material,
            SourceTag::Taric,
            &ResolvedRate::not_found(),
        );
        assert!(record.is_none());
    }

    #[test]
    fn record_serialises_with_store_column_names() {
        let material = MaterialCode::new("Filter Tow", "5502100000");
        let record = DutyRateRecord::from_resolved(
            "JP",
            Destination::Eu,
            &material,
            SourceTag::Taric,
            &ResolvedRate::new(0.0, RateType::Fta),
        )
        .expect("non-null rate yields a record");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["country_iso"], "JP");
        assert_eq!(json["destination"], "EU");
        assert_eq!(json["cn_code"], "5502100000");
        assert_eq!(json["rate"], 0.0);
        assert_eq!(json["rate_type"], "FTA");
        assert_eq!(json["source"], "TARIC");
    }

    #[test]
    fn preference_is_the_display_label_for_fta() {
        assert_eq!(RateType::Fta.as_str(), "FTA");
        assert_eq!(RateType::Fta.display_label(), "Preference");
        assert_eq!(RateType::MfnAdditional.display_label(), "MFN+Additional");
    }

    #[test]
    fn summary_errors_is_sum_of_breakdown() {
        let mut summary = SyncRunSummary::default();
        summary.record_lookup_error();
        summary.record_store_error();
        summary.record_lookup_error();
        assert_eq!(summary.errors, 3);
        assert_eq!(summary.lookup_errors, 2);
        assert_eq!(summary.store_errors, 1);
        assert!(summary.is_degraded());
    }
}
