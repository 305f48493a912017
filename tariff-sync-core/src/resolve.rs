//! Picks one authoritative rate out of the measures a TARIC lookup returns.

use crate::model::{
    CandidateMeasure, RateType, ResolvedRate, MEASURE_TYPE_PREFERENCE, MEASURE_TYPE_THIRD_COUNTRY,
};

/// Tariff preference (142) beats third-country duty (103). Nothing else is considered.
///
/// Within one measure type the first candidate in document order wins.
pub fn resolve(candidates: &[CandidateMeasure]) -> ResolvedRate {
    let first_of = |measure_type: u32| candidates.iter().find(|m| m.measure_type == measure_type);

    if let Some(preference) = first_of(MEASURE_TYPE_PREFERENCE) {
        return ResolvedRate::new(preference.rate, RateType::Fta)
            .with_description(preference.description.clone());
    }
    if let Some(third_country) = first_of(MEASURE_TYPE_THIRD_COUNTRY) {
        return ResolvedRate::new(third_country.rate, RateType::Mfn)
            .with_description(third_country.description.clone());
    }
    ResolvedRate::not_found()
}
