//! High-level pipeline: replaces one (destination, source) partition of the duty rate table.
//!
//! This module provides the top-level orchestration for a synchronisation run. Given a
//! [`RegimeConfig`] it:
//!   - Opens a session with the rate source once (token exchange where the source needs one)
//!   - Clears the partition in the store, unless told to keep it or running dry
//!   - Walks the country × material matrix strictly one cell at a time
//!   - Classifies every cell as success, skipped or error and pauses before the next
//!   - Returns a [`SyncRunSummary`] with the counters
//!
//! # Responsibilities
//! - Partial-failure isolation: a failing cell is logged with its country and material,
//!   counted, and the run moves on. Nothing is retried.
//! - Only a failed session opening aborts the run, before anything was written.
//! - Null rates are never written; they count as skipped.
//!
//! # State
//! `INIT → (CLEARING) → ITERATING(country, material) → DONE`. The counters are the only
//! mutable state.
//!
//! # Callable From
//! - The CLI crate (`sync` subcommand) and integration tests with mocked
//!   [`RateSource`]/[`DutyRateStore`] implementations.

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{RegimeConfig, SyncOptions};
use crate::contract::{DutyRateStore, RateQuery, RateSource, Session};
use crate::error::{LookupError, StoreError, SyncError};
use crate::model::{DutyRateRecord, MaterialCode, ResolvedRate, SyncRunSummary};

/// What happened to one matrix cell.
#[derive(Debug)]
pub enum CellOutcome {
    /// Non-null rate obtained (and written unless dry run).
    Success(ResolvedRate),
    /// The source answered with no applicable measure.
    Skipped,
    LookupFailed(LookupError),
    StoreFailed(StoreError),
}

fn tally(summary: &mut SyncRunSummary, outcome: &CellOutcome) {
    match outcome {
        CellOutcome::Success(_) => summary.success += 1,
        CellOutcome::Skipped => summary.skipped += 1,
        CellOutcome::LookupFailed(_) => summary.record_lookup_error(),
        CellOutcome::StoreFailed(_) => summary.record_store_error(),
    }
}

/// Entrypoint: run one full synchronisation of `regime`'s partition.
pub async fn synchronise<R, S>(
    regime: &RegimeConfig,
    options: &SyncOptions,
    source: &R,
    store: &S,
) -> Result<SyncRunSummary, SyncError>
where
    R: RateSource + ?Sized,
    S: DutyRateStore + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = info_span!(
        "sync",
        %run_id,
        destination = %regime.destination,
        source = %regime.source
    );
    run(regime, options, source, store).instrument(span).await
}

async fn run<R, S>(
    regime: &RegimeConfig,
    options: &SyncOptions,
    source: &R,
    store: &S,
) -> Result<SyncRunSummary, SyncError>
where
    R: RateSource + ?Sized,
    S: DutyRateStore + ?Sized,
{
    info!(
        mode = if options.dry_run { "DRY_RUN" } else { "WRITE" },
        reference_date = %options.reference_date,
        cells = regime.cell_count(),
        "[SYNC] Starting duty rate synchronisation"
    );

    let session = source.open_session().await.map_err(|error| {
        error!(error = %error, "[SYNC][ERROR] Could not open rate source session");
        SyncError::Auth {
            source_tag: regime.source,
            error,
        }
    })?;

    let mut summary = SyncRunSummary::default();

    if options.reset_existing {
        if options.dry_run {
            info!("[SYNC] Dry run: partition left untouched");
        } else {
            info!("[SYNC] Clearing existing partition");
            if let Err(e) = store.clear_partition(regime.destination, regime.source).await {
                error!(error = %e, "[SYNC][ERROR] Failed to clear partition, continuing");
                summary.record_store_error();
            }
        }
    }

    for country in &regime.countries {
        info!(country = %country, "[SYNC] Country");
        for material in &regime.materials {
            let outcome =
                process_cell(regime, options, source, store, &session, country, material).await;
            match &outcome {
                CellOutcome::Success(resolved) => info!(
                    country = %country,
                    material = %material.name,
                    rate = ?resolved.rate,
                    rate_type = %resolved.rate_type,
                    "[SYNC] OK"
                ),
                CellOutcome::Skipped => info!(
                    country = %country,
                    material = %material.name,
                    "[SYNC] SKIP: no applicable measure"
                ),
                CellOutcome::LookupFailed(e) => error!(
                    country = %country,
                    material = %material.name,
                    code = %material.tariff_code,
                    error = %e,
                    "[SYNC][ERROR] Lookup failed"
                ),
                CellOutcome::StoreFailed(e) => error!(
                    country = %country,
                    material = %material.name,
                    code = %material.tariff_code,
                    error = %e,
                    "[SYNC][ERROR] Insert failed"
                ),
            }
            tally(&mut summary, &outcome);

            if !regime.pacing.is_zero() {
                tokio::time::sleep(regime.pacing).await;
            }
        }
    }

    if summary.is_degraded() {
        warn!(
            success = summary.success,
            skipped = summary.skipped,
            errors = summary.errors,
            lookup_errors = summary.lookup_errors,
            store_errors = summary.store_errors,
            "[SYNC] Finished with errors"
        );
    } else {
        info!(
            success = summary.success,
            skipped = summary.skipped,
            errors = summary.errors,
            "[SYNC] Finished"
        );
    }
    Ok(summary)
}

async fn process_cell<R, S>(
    regime: &RegimeConfig,
    options: &SyncOptions,
    source: &R,
    store: &S,
    session: &Session,
    country: &str,
    material: &MaterialCode,
) -> CellOutcome
where
    R: RateSource + ?Sized,
    S: DutyRateStore + ?Sized,
{
    let query = RateQuery {
        tariff_code: material.tariff_code.clone(),
        country: country.to_string(),
        destination: regime.destination,
        reference_date: options.reference_date,
    };

    let resolved = match source.fetch_rate(session, &query).await {
        Ok(resolved) => resolved,
        Err(e) => return CellOutcome::LookupFailed(e),
    };

    let Some(record) =
        DutyRateRecord::from_resolved(country, regime.destination, material, regime.source, &resolved)
    else {
        return CellOutcome::Skipped;
    };

    if !options.dry_run {
        if let Err(e) = store.insert(&record).await {
            return CellOutcome::StoreFailed(e);
        }
    }
    CellOutcome::Success(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_keeps_error_total_in_step_with_breakdown() {
        let mut summary = SyncRunSummary::default();
        tally(&mut summary, &CellOutcome::Success(ResolvedRate::not_found()));
        tally(&mut summary, &CellOutcome::Skipped);
        tally(&mut summary, &CellOutcome::LookupFailed(LookupError::MissingToken));
        tally(
            &mut summary,
            &CellOutcome::StoreFailed(StoreError::Rejected {
                status: 409,
                body: "conflict".into(),
            }),
        );

        assert_eq!(summary.success, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.lookup_errors, 1);
        assert_eq!(summary.store_errors, 1);
        assert_eq!(summary.errors, 2);
        assert!(summary.is_degraded());
    }
}
