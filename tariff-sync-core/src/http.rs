use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Builds the shared HTTP client; every request inherits `timeout`.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Reads a response body as text, status alongside.
///
/// A body that fails to arrive on a success status is an error. On a failure status the
/// body only feeds the error excerpt, so an unreadable one becomes empty.
pub(crate) async fn read_body(resp: Response) -> Result<(StatusCode, String), reqwest::Error> {
    let status = resp.status();
    if !status.is_success() {
        return Ok((status, resp.text().await.unwrap_or_default()));
    }
    let text = resp.text().await?;
    Ok((status, text))
}
