//! Read-only matrix report: resolves every cell of a regime and returns the detail
//! instead of writing it. Failed cells are reported inline with `RateType::Error`.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{RegimeConfig, SyncOptions};
use crate::contract::{RateQuery, RateSource};
use crate::error::SyncError;
use crate::model::ResolvedRate;

#[derive(Debug, Clone, Serialize)]
pub struct MaterialRate {
    pub material: String,
    pub tariff_code: String,
    #[serde(flatten)]
    pub resolved: ResolvedRate,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryRates {
    pub country: String,
    pub materials: Vec<MaterialRate>,
}

/// Resolves the full matrix without touching the store.
pub async fn probe<R>(
    regime: &RegimeConfig,
    options: &SyncOptions,
    source: &R,
) -> Result<Vec<CountryRates>, SyncError>
where
    R: RateSource + ?Sized,
{
    let session = source
        .open_session()
        .await
        .map_err(|error| SyncError::Auth {
            source_tag: regime.source,
            error,
        })?;

    let mut report = Vec::with_capacity(regime.countries.len());
    for country in &regime.countries {
        let mut materials = Vec::with_capacity(regime.materials.len());
        for material in &regime.materials {
            let query = RateQuery {
                tariff_code: material.tariff_code.clone(),
                country: country.clone(),
                destination: regime.destination,
                reference_date: options.reference_date,
            };
            let resolved = match source.fetch_rate(&session, &query).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(country = %country, material = %material.name, error = %e, "Probe lookup failed");
                    ResolvedRate::error(e.to_string())
                }
            };
            materials.push(MaterialRate {
                material: material.name.clone(),
                tariff_code: material.tariff_code.clone(),
                resolved,
            });

            if !regime.pacing.is_zero() {
                tokio::time::sleep(regime.pacing).await;
            }
        }
        info!(country = %country, "Fetched rates for country");
        report.push(CountryRates {
            country: country.clone(),
            materials,
        });
    }
    Ok(report)
}
