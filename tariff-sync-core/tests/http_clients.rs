use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tariff_sync_core::contract::{AccessToken, DutyRateStore};
use tariff_sync_core::error::{LookupError, StoreError, BODY_EXCERPT_LIMIT};
use tariff_sync_core::model::{Destination, DutyRateRecord, RateType, SourceTag};
use tariff_sync_core::store::RestStore;
use tariff_sync_core::taric::TaricClient;
use tariff_sync_core::wove::{WoveClient, WoveCredentials};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Loopback HTTP/1.1 server answering one canned response per connection, in order.
struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    async fn start(responses: Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut socket).await;
                seen.lock().unwrap().push(request);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        Self { base_url, requests }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn reply(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn json(status: &str, body: &str) -> String {
    reply(status, "application/json", body)
}

fn credentials() -> WoveCredentials {
    WoveCredentials {
        client_id: "client-1".into(),
        client_secret: "s3cret".into(),
    }
}

fn record() -> DutyRateRecord {
    DutyRateRecord {
        country_iso: "CN".into(),
        destination: Destination::Eu,
        material: "Filter Tow".into(),
        tariff_code: "5502100000".into(),
        rate: 4.0,
        rate_type: "MFN".into(),
        source: SourceTag::Taric,
    }
}

#[tokio::test]
async fn test_taric_lookup_posts_envelope_and_parses_measures() {
    let xml = r#"<?xml version="1.0"?><result><measures>
        <measure><measure_type>103</measure_type><duty_rate>4.00 %</duty_rate></measure>
        </measures></result>"#;
    let server = StubServer::start(vec![reply("200 OK", "text/xml", xml)]).await;
    let client = TaricClient::new(format!("{}/goods", server.base_url), TIMEOUT).unwrap();

    let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let measures = client.lookup("5502100000", "CN", date).await.unwrap();

    assert_eq!(measures.len(), 1);
    assert_eq!(measures[0].measure_type, 103);
    let request = server.requests().remove(0);
    assert!(request.starts_with("POST /goods HTTP/1.1"), "{request}");
    assert!(request.to_lowercase().contains("soapaction: \"\""));
    assert!(request.contains("<tns:referenceDate>2025-06-02</tns:referenceDate>"));
}

#[tokio::test]
async fn test_taric_failure_status_becomes_transport_error_with_excerpt() {
    let body = "x".repeat(BODY_EXCERPT_LIMIT * 3);
    let server = StubServer::start(vec![reply("503 Service Unavailable", "text/plain", &body)]).await;
    let client = TaricClient::new(server.base_url.clone(), TIMEOUT).unwrap();

    let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let err = client.lookup("5502100000", "CN", date).await.unwrap_err();

    match err {
        LookupError::Transport { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body.len(), BODY_EXCERPT_LIMIT);
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wove_authenticate_sends_client_credentials() {
    let server =
        StubServer::start(vec![json("200 OK", r#"{"access_token": "tok-123", "expires_in": 3600}"#)])
            .await;
    let client = WoveClient::new(server.base_url.clone(), credentials(), TIMEOUT).unwrap();

    let token = client.authenticate().await.unwrap();

    assert_eq!(token.secret(), "tok-123");
    let request = server.requests().remove(0);
    assert!(request.starts_with("POST /api/v1/external/auth/token HTTP/1.1"), "{request}");
    assert!(request.contains(r#""grant_type":"client_credentials""#));
    assert!(request.contains(r#""client_id":"client-1""#));
}

#[tokio::test]
async fn test_wove_authenticate_without_token_is_missing_token() {
    for body in [r#"{}"#, r#"{"access_token": ""}"#] {
        let server = StubServer::start(vec![json("200 OK", body)]).await;
        let client = WoveClient::new(server.base_url.clone(), credentials(), TIMEOUT).unwrap();

        let err = client.authenticate().await.unwrap_err();
        assert!(matches!(err, LookupError::MissingToken), "{body}: {err:?}");
    }
}

#[tokio::test]
async fn test_wove_lookup_sends_query_and_bearer_token() {
    let server = StubServer::start(vec![json(
        "200 OK",
        r#"{"success": true, "data": {"applicableRate": {"adValoremRate": 7.5}, "additionalDuties": [{}]}}"#,
    )])
    .await;
    let client = WoveClient::new(server.base_url.clone(), credentials(), TIMEOUT).unwrap();

    let resolved = client
        .lookup(&AccessToken::new("tok-123"), "5502100000", "CN", Destination::Us)
        .await
        .unwrap();

    assert_eq!(resolved.rate, Some(7.5));
    assert_eq!(resolved.rate_type, RateType::MfnAdditional);
    let request = server.requests().remove(0);
    let request_line = request.lines().next().unwrap();
    assert!(request_line.starts_with("GET /api/v1/external/tariffs/lookup?"), "{request_line}");
    for param in [
        "hsCode=5502100000",
        "originCountry=CN",
        "destinationCountry=US",
        "includeFtaOptions=true",
    ] {
        assert!(request_line.contains(param), "{param} missing from {request_line}");
    }
    assert!(request.to_lowercase().contains("authorization: bearer tok-123"));
}

#[tokio::test]
async fn test_wove_lookup_failure_status_is_transport_error() {
    let server = StubServer::start(vec![json("401 Unauthorized", r#"{"error": "expired"}"#)]).await;
    let client = WoveClient::new(server.base_url.clone(), credentials(), TIMEOUT).unwrap();

    let err = client
        .lookup(&AccessToken::new("stale"), "5502100000", "CN", Destination::Us)
        .await
        .unwrap_err();

    assert!(
        matches!(err, LookupError::Transport { status: 401, ref body } if body.contains("expired")),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_wove_lookup_empty_body_is_not_found() {
    let server = StubServer::start(vec![json("200 OK", "")]).await;
    let client = WoveClient::new(server.base_url.clone(), credentials(), TIMEOUT).unwrap();

    let resolved = client
        .lookup(&AccessToken::new("tok"), "5502100000", "CN", Destination::Us)
        .await
        .unwrap();

    assert_eq!(resolved.rate, None);
    assert_eq!(resolved.rate_type, RateType::Unknown);
}

#[tokio::test]
async fn test_wove_lookup_truncated_body_is_an_error_not_a_skip() {
    // Announces far more bytes than it sends, then hangs up.
    let truncated = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 5000\r\nConnection: close\r\n\r\n{\"success\": true, \"data\": {\"applicableRa".to_string();
    let server = StubServer::start(vec![truncated]).await;
    let client = WoveClient::new(server.base_url.clone(), credentials(), TIMEOUT).unwrap();

    let err = client
        .lookup(&AccessToken::new("tok"), "5502100000", "CN", Destination::Us)
        .await
        .unwrap_err();

    assert!(matches!(err, LookupError::Http(_)), "{err:?}");
}

#[tokio::test]
async fn test_store_clear_partition_sends_filter_and_headers() {
    let server = StubServer::start(vec![reply("204 No Content", "text/plain", "")]).await;
    let store = RestStore::new(&format!("{}/", server.base_url), "svc-key", TIMEOUT).unwrap();

    store
        .clear_partition(Destination::Eu, SourceTag::Taric)
        .await
        .unwrap();

    let request = server.requests().remove(0);
    assert!(
        request.starts_with("DELETE /rest/v1/duty_rates?destination=eq.EU&source=eq.TARIC HTTP/1.1"),
        "{request}"
    );
    let lower = request.to_lowercase();
    assert!(lower.contains("apikey: svc-key"));
    assert!(lower.contains("authorization: bearer svc-key"));
    assert!(lower.contains("prefer: return=minimal"));
}

#[tokio::test]
async fn test_store_insert_posts_row_with_store_column_names() {
    let server = StubServer::start(vec![reply("201 Created", "text/plain", "")]).await;
    let store = RestStore::new(&server.base_url, "svc-key", TIMEOUT).unwrap();

    store.insert(&record()).await.unwrap();

    let request = server.requests().remove(0);
    assert!(request.starts_with("POST /rest/v1/duty_rates HTTP/1.1"), "{request}");
    assert!(request.contains(r#""cn_code":"5502100000""#));
    assert!(request.contains(r#""destination":"EU""#));
}

#[tokio::test]
async fn test_store_rejection_keeps_status_and_body() {
    let server = StubServer::start(vec![json(
        "409 Conflict",
        r#"{"message": "duplicate key value violates unique constraint"}"#,
    )])
    .await;
    let store = RestStore::new(&server.base_url, "svc-key", TIMEOUT).unwrap();

    let err = store.insert(&record()).await.unwrap_err();

    assert!(
        matches!(err, StoreError::Rejected { status: 409, ref body } if body.contains("duplicate key")),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_store_list_partition_decodes_rows() {
    let server = StubServer::start(vec![json(
        "200 OK",
        r#"[{"id": 1, "country_iso": "CN", "destination": "EU", "material": "Filter Tow",
            "cn_code": "5502100000", "rate": 4, "rate_type": "MFN", "source": "TARIC"}]"#,
    )])
    .await;
    let store = RestStore::new(&server.base_url, "svc-key", TIMEOUT).unwrap();

    let rows = store
        .list_partition(Destination::Eu, SourceTag::Taric)
        .await
        .unwrap();

    assert_eq!(rows, vec![record()]);
    let request_line = server.requests().remove(0);
    assert!(request_line.starts_with("GET /rest/v1/duty_rates?select=*&destination=eq.EU&source=eq.TARIC"));
}
