use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::catalog;
use crate::model::{Destination, MaterialCode, SourceTag};

/// Pause between TARIC requests.
pub const TARIC_PACING: Duration = Duration::from_millis(120);
/// Pause between Wove requests.
pub const WOVE_PACING: Duration = Duration::from_millis(75);
/// Per-request timeout applied to every outbound call.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything that distinguishes one destination regime from another.
///
/// A single orchestrator consumes this; adding a regime means adding a value, not a code path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeConfig {
    pub destination: Destination,
    pub source: SourceTag,
    pub countries: Vec<String>,
    pub materials: Vec<MaterialCode>,
    /// Delay after each matrix cell.
    #[serde(with = "millis", rename = "pacing_ms")]
    pub pacing: Duration,
}

impl RegimeConfig {
    /// EU imports resolved through TARIC measures.
    pub fn eu_taric() -> Self {
        Self {
            destination: Destination::Eu,
            source: SourceTag::Taric,
            countries: catalog::eu_countries(),
            materials: catalog::eu_materials(),
            pacing: TARIC_PACING,
        }
    }

    /// US imports resolved through the Wove lookup API.
    pub fn us_wove() -> Self {
        Self {
            destination: Destination::Us,
            source: SourceTag::Wove,
            countries: catalog::us_countries(),
            materials: catalog::us_materials(),
            pacing: WOVE_PACING,
        }
    }

    /// Number of cells in the country × material matrix.
    pub fn cell_count(&self) -> usize {
        self.countries.len() * self.materials.len()
    }

    pub fn trace_loaded(&self) {
        info!(
            destination = %self.destination,
            source = %self.source,
            countries = self.countries.len(),
            materials = self.materials.len(),
            pacing_ms = self.pacing.as_millis() as u64,
            "Loaded regime"
        );
        debug!(?self, "Regime loaded (full debug)");
    }
}

/// Switches for one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Clear the partition before writing.
    pub reset_existing: bool,
    /// Look everything up but write nothing.
    pub dry_run: bool,
    pub reference_date: NaiveDate,
}

impl SyncOptions {
    pub fn new(reset_existing: bool, dry_run: bool) -> Self {
        Self {
            reset_existing,
            dry_run,
            reference_date: today(),
        }
    }

    pub fn with_reference_date(mut self, reference_date: NaiveDate) -> Self {
        self.reference_date = reference_date;
        self
    }
}

/// Current UTC calendar date.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taric_paces_slower_than_wove() {
        assert!(RegimeConfig::eu_taric().pacing > RegimeConfig::us_wove().pacing);
    }

    #[test]
    fn regimes_carry_their_partition_tags() {
        let eu = RegimeConfig::eu_taric();
        assert_eq!((eu.destination, eu.source), (Destination::Eu, SourceTag::Taric));
        let us = RegimeConfig::us_wove();
        assert_eq!((us.destination, us.source), (Destination::Us, SourceTag::Wove));
        assert_eq!(us.cell_count(), 54 * 13);
    }

    #[test]
    fn regime_deserialises_pacing_in_millis() {
        let json = r#"{
            "destination": "EU",
            "source": "TARIC",
            "countries": ["CN"],
            "materials": [{"name": "Filter Tow", "code": "5502100000"}],
            "pacing_ms": 0
        }"#;
        let regime: RegimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(regime.pacing, Duration::ZERO);
        assert_eq!(regime.materials[0].tariff_code, "5502100000");
    }
}
