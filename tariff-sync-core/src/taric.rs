//! # taric: EU measure lookups over the TARIC SOAP service
//!
//! A lookup posts a `goodsMeasForWs` envelope for one goods code, one origin
//! country and one reference date, and gets back an XML document listing every
//! measure that applies. This module turns that document into
//! [`CandidateMeasure`]s; choosing between them is [`crate::resolve`]'s job.
//!
//! Parsing walks a real document tree. A `<measure>` block lacking a numeric
//! `<measure_type>` or a `<duty_rate>` of the form `N.N %` is dropped, never
//! reported as an error. Only a body that is not XML at all is a parse failure.

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, error};

use crate::contract::{RateQuery, RateSource, Session};
use crate::error::{excerpt, LookupError};
use crate::http::{build_client, read_body};
use crate::model::{CandidateMeasure, ResolvedRate};
use crate::resolve::resolve;

pub const DEFAULT_TARIC_ENDPOINT: &str =
    "https://ec.europa.eu/taxation_customs/dds2/taric/services/goods";

/// Builds the request envelope. Trade movement is always import.
pub fn build_envelope(goods_code: &str, country: &str, reference_date: NaiveDate) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns:tns="http://goodsNomenclatureForWS.ws.taric.dds.s/">
  <soap:Body>
    <tns:goodsMeasForWs>
      <tns:goodsCode>{code}</tns:goodsCode>
      <tns:countryCode>{country}</tns:countryCode>
      <tns:referenceDate>{date}</tns:referenceDate>
      <tns:tradeMovement>I</tns:tradeMovement>
    </tns:goodsMeasForWs>
  </soap:Body>
</soap:Envelope>"#,
        code = escape(goods_code),
        country = escape(country),
        date = reference_date.format("%Y-%m-%d"),
    )
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Leading percentage of a `<duty_rate>`, e.g. `4.00 %`.
static DUTY_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*%").expect("duty rate pattern is valid"));

/// Extracts every complete measure block, in document order.
pub fn parse_measures(xml: &str) -> Result<Vec<CandidateMeasure>, LookupError> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| LookupError::Parse(e.to_string()))?;

    let measures = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "measure")
        .filter_map(|block| {
            let child_text = |name: &str| {
                block
                    .descendants()
                    .find(|n| n.is_element() && n.tag_name().name() == name)
                    .and_then(|n| n.text())
                    .map(str::trim)
            };

            let measure_type = child_text("measure_type")?.parse::<u32>().ok()?;
            let rate_text = child_text("duty_rate")?;
            let rate = DUTY_RATE
                .captures(rate_text)?
                .get(1)?
                .as_str()
                .parse::<f64>()
                .ok()?;
            let description = child_text("description")
                .filter(|d| !d.is_empty())
                .map(str::to_string);

            Some(CandidateMeasure {
                measure_type,
                rate,
                description,
            })
        })
        .collect();

    Ok(measures)
}

/// Client for the TARIC goods measure service.
pub struct TaricClient {
    client: Client,
    endpoint: String,
}

impl TaricClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }

    /// Every candidate measure for `goods_code` imported from `country` on `reference_date`.
    pub async fn lookup(
        &self,
        goods_code: &str,
        country: &str,
        reference_date: NaiveDate,
    ) -> Result<Vec<CandidateMeasure>, LookupError> {
        let envelope = build_envelope(goods_code, country, reference_date);
        debug!(goods_code, country, %reference_date, "Posting TARIC envelope");

        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", "\"\"")
            .body(envelope)
            .send()
            .await?;

        let (status, body) = read_body(resp).await?;
        if !status.is_success() {
            error!(status = %status, goods_code, country, "TARIC request failed");
            return Err(LookupError::Transport {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        let measures = parse_measures(&body)?;
        debug!(goods_code, country, count = measures.len(), "Parsed TARIC measures");
        Ok(measures)
    }
}

#[async_trait]
impl RateSource for TaricClient {
    async fn open_session(&self) -> Result<Session, LookupError> {
        Ok(Session::anonymous())
    }

    async fn fetch_rate(
        &self,
        _session: &Session,
        query: &RateQuery,
    ) -> Result<ResolvedRate, LookupError> {
        let candidates = self
            .lookup(&query.tariff_code, &query.country, query.reference_date)
            .await?;
        Ok(resolve(&candidates))
    }
}
