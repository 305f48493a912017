//! US duty lookups through the Wove external tariff API.
//!
//! The service applies trade-agreement precedence itself; this module only reads
//! the result. A client-credential token is exchanged once per run and reused for
//! every lookup.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::contract::{AccessToken, RateQuery, RateSource, Session};
use crate::error::{excerpt, LookupError};
use crate::http::{build_client, read_body};
use crate::model::{Destination, RateType, ResolvedRate};

pub const DEFAULT_WOVE_BASE_URL: &str = "https://api.wove.com";

const TOKEN_PATH: &str = "/api/v1/external/auth/token";
const LOOKUP_PATH: &str = "/api/v1/external/tariffs/lookup";

/// Client-credential pair for the token exchange.
#[derive(Clone)]
pub struct WoveCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for WoveCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WoveCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Body of a tariff lookup.
#[derive(Debug, Default, Deserialize)]
pub struct LookupResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<LookupData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupData {
    #[serde(default)]
    pub fta_options: Option<Vec<RateComponent>>,
    #[serde(default)]
    pub applicable_rate: Option<RateComponent>,
    #[serde(default)]
    pub additional_duties: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateComponent {
    #[serde(default)]
    pub ad_valorem_rate: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Reads the reported rate out of a lookup response.
///
/// The first trade-agreement option wins whenever it carries a rate, zero included.
/// Otherwise the applicable general rate is used; listed additional duties only
/// change its label, they are not added in.
pub fn extract_rate(response: &LookupResponse) -> ResolvedRate {
    let data = match &response.data {
        Some(data) if response.success => data,
        _ => return ResolvedRate::not_found(),
    };

    if let Some(fta) = data.fta_options.as_ref().and_then(|options| options.first()) {
        if let Some(rate) = fta.ad_valorem_rate {
            return ResolvedRate::new(rate, RateType::Fta).with_description(fta.description.clone());
        }
    }

    if let Some(applicable) = &data.applicable_rate {
        if let Some(rate) = applicable.ad_valorem_rate {
            let has_additional = data
                .additional_duties
                .as_ref()
                .is_some_and(|duties| !duties.is_empty());
            let rate_type = if has_additional {
                RateType::MfnAdditional
            } else {
                RateType::Mfn
            };
            return ResolvedRate::new(rate, rate_type)
                .with_description(applicable.description.clone());
        }
    }

    ResolvedRate::not_found()
}

/// Client for the Wove token and lookup endpoints.
pub struct WoveClient {
    client: Client,
    base_url: String,
    credentials: WoveCredentials,
}

impl WoveClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: WoveCredentials,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let base_url: String = base_url.into();
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Exchanges the client credentials for a bearer token.
    pub async fn authenticate(&self) -> Result<AccessToken, LookupError> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        info!(url = %url, "Requesting Wove token");

        let resp = self
            .client
            .post(&url)
            .json(&TokenRequest {
                grant_type: "client_credentials",
                client_id: &self.credentials.client_id,
                client_secret: &self.credentials.client_secret,
            })
            .send()
            .await?;

        let (status, body) = read_body(resp).await?;
        if !status.is_success() {
            error!(status = %status, "Wove token exchange failed");
            return Err(LookupError::Transport {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| LookupError::Parse(format!("token response: {e}")))?;
        match token.access_token {
            Some(t) if !t.is_empty() => {
                info!("Wove token obtained");
                Ok(AccessToken::new(t))
            }
            _ => {
                error!("Wove token response missing access_token");
                Err(LookupError::MissingToken)
            }
        }
    }

    /// Looks up the rate for `hs_code` shipped from `origin` to `destination`.
    pub async fn lookup(
        &self,
        token: &AccessToken,
        hs_code: &str,
        origin: &str,
        destination: Destination,
    ) -> Result<ResolvedRate, LookupError> {
        let url = format!("{}{}", self.base_url, LOOKUP_PATH);
        debug!(hs_code, origin, %destination, "Requesting Wove lookup");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("hsCode", hs_code),
                ("originCountry", origin),
                ("destinationCountry", destination.as_str()),
                ("includeFtaOptions", "true"),
            ])
            .bearer_auth(token.secret())
            .send()
            .await?;

        let (status, body) = read_body(resp).await?;
        if !status.is_success() {
            error!(status = %status, hs_code, origin, "Wove lookup failed");
            return Err(LookupError::Transport {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }
        if body.trim().is_empty() {
            return Ok(ResolvedRate::not_found());
        }

        let parsed: LookupResponse = serde_json::from_str(&body)
            .map_err(|e| LookupError::Parse(format!("lookup response: {e}")))?;
        Ok(extract_rate(&parsed))
    }
}

#[async_trait]
impl RateSource for WoveClient {
    async fn open_session(&self) -> Result<Session, LookupError> {
        Ok(Session::with_token(self.authenticate().await?))
    }

    async fn fetch_rate(
        &self,
        session: &Session,
        query: &RateQuery,
    ) -> Result<ResolvedRate, LookupError> {
        let token = session.token.as_ref().ok_or(LookupError::MissingToken)?;
        self.lookup(token, &query.tariff_code, &query.country, query.destination)
            .await
    }
}
