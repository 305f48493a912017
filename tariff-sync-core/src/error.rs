use thiserror::Error;

/// Longest response body excerpt carried in an error.
pub const BODY_EXCERPT_LIMIT: usize = 400;

/// Failure of a single tariff lookup (or of the token exchange preceding it).
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tariff service returned {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("could not parse tariff response: {0}")]
    Parse(String),

    #[error("token response missing access_token")]
    MissingToken,
}

/// Failure of a row store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("could not decode store response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors that abort a whole run before the matrix is iterated.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("authentication with {source_tag} failed: {error}")]
    Auth {
        source_tag: crate::model::SourceTag,
        #[source]
        error: LookupError,
    },
}

/// Unmet configuration preconditions.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required env vars: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: String, value: String },

    #[error("catalog error: {0}")]
    Catalog(String),
}

/// Cuts a response body down to [`BODY_EXCERPT_LIMIT`] characters.
pub fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LIMIT).collect()
}
