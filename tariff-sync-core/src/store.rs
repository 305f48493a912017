//! REST row store client for the `duty_rates` table (PostgREST dialect).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::contract::DutyRateStore;
use crate::error::{excerpt, StoreError};
use crate::http::{build_client, read_body};
use crate::model::{Destination, DutyRateRecord, SourceTag};

pub const DUTY_RATES_TABLE: &str = "duty_rates";

/// Query-string filter selecting one (destination, source) partition.
pub fn partition_filter(destination: Destination, source: SourceTag) -> [(&'static str, String); 2] {
    [
        ("destination", format!("eq.{}", destination.as_str())),
        ("source", format!("eq.{}", source.as_str())),
    ]
}

pub struct RestStore {
    client: Client,
    table_url: String,
    api_key: String,
}

impl fmt::Debug for RestStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestStore")
            .field("table_url", &self.table_url)
            .finish_non_exhaustive()
    }
}

impl RestStore {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            client: build_client(timeout)?,
            table_url: table_url(base_url),
            api_key: api_key.into(),
        })
    }

    fn authorised(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
    }

    async fn check(resp: reqwest::Response, op: &'static str) -> Result<String, StoreError> {
        let (status, body) = read_body(resp).await?;
        if !status.is_success() {
            error!(status = %status, op, "Store rejected request");
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }
        Ok(body)
    }
}

/// `{base}/rest/v1/duty_rates`, tolerant of a trailing slash on `base`.
pub fn table_url(base_url: &str) -> String {
    format!(
        "{}/rest/v1/{}",
        base_url.trim_end_matches('/'),
        DUTY_RATES_TABLE
    )
}

#[async_trait]
impl DutyRateStore for RestStore {
    async fn clear_partition(
        &self,
        destination: Destination,
        source: SourceTag,
    ) -> Result<(), StoreError> {
        info!(%destination, %source, "Clearing partition");
        let resp = self
            .authorised(self.client.delete(&self.table_url))
            .header("Prefer", "return=minimal")
            .query(&partition_filter(destination, source))
            .send()
            .await?;
        Self::check(resp, "clear_partition").await?;
        Ok(())
    }

    async fn insert(&self, record: &DutyRateRecord) -> Result<(), StoreError> {
        debug!(country = %record.country_iso, material = %record.material, "Inserting row");
        let resp = self
            .authorised(self.client.post(&self.table_url))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        Self::check(resp, "insert").await?;
        Ok(())
    }

    async fn list_partition(
        &self,
        destination: Destination,
        source: SourceTag,
    ) -> Result<Vec<DutyRateRecord>, StoreError> {
        let resp = self
            .authorised(self.client.get(&self.table_url))
            .query(&[("select", "*")])
            .query(&partition_filter(destination, source))
            .send()
            .await?;
        let body = Self::check(resp, "list_partition").await?;
        let rows: Vec<DutyRateRecord> = serde_json::from_str(&body)?;
        info!(%destination, %source, rows = rows.len(), "Listed partition");
        Ok(rows)
    }
}
