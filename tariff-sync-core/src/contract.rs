//! # contract: the two seams of a synchronisation run
//!
//! This module defines the traits the orchestrator talks to:
//! - [`RateSource`]: a tariff lookup service (TARIC, Wove, or a test double)
//! - [`DutyRateStore`]: the row store holding persisted duty rates
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; the generated `MockRateSource` and
//!   `MockDutyRateStore` are exported under the default `test-export-mocks` feature
//!   so integration tests in `tests/` can use them.
//!
//! ## Adding New Rate Sources
//! - Implement [`RateSource`]; do any one-off handshake in `open_session` and keep
//!   `fetch_rate` free of side effects beyond the request itself.
//! - Return `ResolvedRate::not_found()` when the service answers but has no
//!   applicable measure. Reserve `Err` for transport and parse faults.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{LookupError, StoreError};
use crate::model::{Destination, DutyRateRecord, ResolvedRate, SourceTag};

/// Bearer token obtained from a token exchange. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Per-run state returned by [`RateSource::open_session`]; read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<AccessToken>,
}

impl Session {
    /// Session for sources that need no handshake.
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self { token: Some(token) }
    }
}

/// One cell of the country × material matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateQuery {
    pub tariff_code: String,
    pub country: String,
    pub destination: Destination,
    /// Lookups are always "as of" this date.
    pub reference_date: NaiveDate,
}

/// A tariff lookup service able to resolve one rate per query.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Called once per run, before any lookup. A failure aborts the run.
    async fn open_session(&self) -> Result<Session, LookupError>;

    /// Look up and resolve the rate for a single query.
    async fn fetch_rate(
        &self,
        session: &Session,
        query: &RateQuery,
    ) -> Result<ResolvedRate, LookupError>;
}

/// The persisted `duty_rates` table, partitioned by (destination, source).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DutyRateStore: Send + Sync {
    /// Delete every row of the partition.
    async fn clear_partition(
        &self,
        destination: Destination,
        source: SourceTag,
    ) -> Result<(), StoreError>;

    /// Create a single row.
    async fn insert(&self, record: &DutyRateRecord) -> Result<(), StoreError>;

    /// Read back every row of the partition.
    async fn list_partition(
        &self,
        destination: Destination,
        source: SourceTag,
    ) -> Result<Vec<DutyRateRecord>, StoreError>;
}
