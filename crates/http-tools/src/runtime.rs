use crate::request::{CONTENT_TYPE_JSON, RequestSpec, generate_curl};
use crate::safety::{redact_url, redact_url_str, sanitize_reqwest_error};
use base64::Engine as _;
use indexmap::IndexMap;
use mime::Mime;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const FAILED_STATUS_TEXT: &str = "Request Failed";

#[derive(Debug, Error)]
pub enum HttpToolsError {
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("http transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, HttpToolsError>;

impl From<reqwest::Error> for HttpToolsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}

/// Outcome of a test request.
///
/// Transport failures are reported in-band: `status == 0`, `status_text == "Request Failed"` and
/// `body == {"error": "..."}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: IndexMap<String, String>,
    pub body: Value,
    pub duration_ms: u64,
    pub curl: String,
}

impl ApiResponse {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == 0
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientOptions {
    pub timeout: Duration,
    /// Maximum response body size (bytes). `None` = unlimited.
    pub max_response_bytes: Option<usize>,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_response_bytes: None,
        }
    }
}

#[derive(Clone)]
pub struct HttpTestClient {
    client: Client,
    options: HttpClientOptions,
}

impl HttpTestClient {
    #[must_use]
    pub fn new(client: Client, options: HttpClientOptions) -> Self {
        Self { client, options }
    }

    #[must_use]
    pub fn options(&self) -> &HttpClientOptions {
        &self.options
    }

    /// Execute `spec` and report the outcome. Never fails: any error becomes a status-0 response.
    pub async fn execute(&self, spec: &RequestSpec) -> ApiResponse {
        let curl = generate_curl(spec);
        let start = Instant::now();
        match self.send(spec).await {
            Ok((status, status_text, headers, body)) => ApiResponse {
                status,
                status_text,
                headers,
                body,
                duration_ms: elapsed_ms(start),
                curl,
            },
            Err(e) => {
                let message = match e {
                    HttpToolsError::Runtime(m)
                    | HttpToolsError::Http(m)
                    | HttpToolsError::Transport(m) => m,
                };
                warn!(
                    method = %spec.method,
                    url = %redact_url_str(&spec.raw_url()),
                    error = %message,
                    "test request failed"
                );
                ApiResponse {
                    status: 0,
                    status_text: FAILED_STATUS_TEXT.to_string(),
                    headers: IndexMap::new(),
                    body: json!({ "error": message }),
                    duration_ms: elapsed_ms(start),
                    curl,
                }
            }
        }
    }

    async fn send(
        &self,
        spec: &RequestSpec,
    ) -> Result<(u16, String, IndexMap<String, String>, Value)> {
        let url = spec.build_url()?;
        debug!(method = %spec.method, url = %redact_url(&url), "sending test request");

        let mut request = self.client.request(spec.method.into(), url);
        for (key, value) in &spec.headers {
            request = request.header(key, value);
        }
        if spec.needs_json_content_type() {
            request = request.header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_JSON);
        }
        if let Some(body) = spec.wire_body() {
            request = request.body(body);
        }
        request = request.timeout(self.options.timeout);

        let response = request.send().await?;
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();

        let mut headers = IndexMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing: &mut String| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        let content_type = headers.get("content-type").cloned();

        let bytes =
            read_response_body_limited_bytes(response, self.options.max_response_bytes).await?;
        let body = decode_body(&bytes, content_type.as_deref());

        debug!(status = status.as_u16(), bytes = bytes.len(), "test request completed");
        Ok((status.as_u16(), status_text, headers, body))
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

async fn read_response_body_limited_bytes(
    mut response: reqwest::Response,
    max_bytes: Option<usize>,
) -> Result<Vec<u8>> {
    let Some(max) = max_bytes else {
        let bytes = response.bytes().await.map_err(HttpToolsError::from)?;
        return Ok(bytes.to_vec());
    };

    if let Some(len) = response.content_length()
        && len > max as u64
    {
        return Err(HttpToolsError::Http(format!(
            "Response too large: {len} bytes (limit {max})"
        )));
    }

    let mut out: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(HttpToolsError::from)? {
        if out.len().saturating_add(chunk.len()) > max {
            return Err(HttpToolsError::Http(format!(
                "Response too large: exceeded {max} bytes"
            )));
        }
        out.extend_from_slice(&chunk);
    }

    Ok(out)
}

/// `application/json` and any `+json` structured suffix.
#[must_use]
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(ct) = content_type else {
        return false;
    };
    let Ok(m) = ct.parse::<Mime>() else {
        return ct.to_ascii_lowercase().contains(CONTENT_TYPE_JSON);
    };
    m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON)
}

fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Value {
    let text = match bytes_to_text_or_base64_json(bytes, content_type) {
        Value::String(s) => s,
        other => return other,
    };
    if is_json_content_type(content_type)
        && let Ok(v) = serde_json::from_str::<Value>(&text)
    {
        return v;
    }
    Value::String(text)
}

fn bytes_to_text_or_base64_json(bytes: &[u8], content_type: Option<&str>) -> Value {
    if let Ok(s) = std::str::from_utf8(bytes) {
        Value::String(s.to_string())
    } else {
        let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
        json!({
            "encoding": "base64",
            "mimeType": content_type,
            "data": b64
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantics::HttpMethod;
    use axum::Router;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, Uri};
    use axum::routing::any;
    use tokio::net::TcpListener;

    struct EchoServer {
        base_url: String,
        shutdown_tx: tokio::sync::oneshot::Sender<()>,
        handle: tokio::task::JoinHandle<std::io::Result<()>>,
    }

    impl EchoServer {
        async fn stop(self) {
            let _ = self.shutdown_tx.send(());
            self.handle
                .await
                .expect("server task join")
                .expect("server result");
        }
    }

    async fn spawn(app: Router) -> EchoServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let handle = tokio::spawn(async move { server.await });
        EchoServer {
            base_url: format!("http://{addr}"),
            shutdown_tx,
            handle,
        }
    }

    async fn echo_handler(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> axum::Json<Value> {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let x_trace = headers
            .get("x-trace")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        axum::Json(json!({
            "method": method.as_str(),
            "uri": uri.to_string(),
            "contentType": content_type,
            "xTrace": x_trace,
            "body": String::from_utf8_lossy(&body),
        }))
    }

    fn client() -> HttpTestClient {
        HttpTestClient::new(Client::new(), HttpClientOptions::default())
    }

    #[tokio::test]
    async fn execute_sends_exactly_the_url_shown_in_curl() {
        let server = spawn(Router::new().route("/{*path}", any(echo_handler))).await;

        let mut spec = RequestSpec::new(
            format!("{}/", server.base_url),
            HttpMethod::Post,
            "/users/{id}/notes",
        );
        spec.path_params.insert("id".to_string(), "a b".to_string());
        spec.query_params
            .insert("q".to_string(), "x&y".to_string());
        spec.headers
            .insert("X-Trace".to_string(), "t-1".to_string());
        spec.body = Some(json!({"text": "hi"}));

        let resp = client().execute(&spec).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.status_text, "OK");
        assert_eq!(resp.body["method"], "POST");
        assert_eq!(resp.body["uri"], "/users/a%20b/notes?q=x%26y");
        assert_eq!(resp.body["contentType"], "application/json");
        assert_eq!(resp.body["xTrace"], "t-1");
        assert_eq!(resp.body["body"], "{\"text\":\"hi\"}");

        let sent = format!("{}{}", server.base_url, "/users/a%20b/notes?q=x%26y");
        assert!(
            resp.curl.ends_with(&format!("'{sent}'")),
            "curl should target {sent}: {}",
            resp.curl
        );
        assert_eq!(
            resp.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );

        server.stop().await;
    }

    #[tokio::test]
    async fn get_never_sends_a_body_or_content_type() {
        let server = spawn(Router::new().route("/{*path}", any(echo_handler))).await;

        let mut spec = RequestSpec::new(server.base_url.clone(), HttpMethod::Get, "/items");
        spec.body = Some(json!({"ignored": true}));
        let resp = client().execute(&spec).await;
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["body"], "");
        assert_eq!(resp.body["contentType"], Value::Null);
        assert!(!resp.curl.contains("-d"), "{}", resp.curl);

        server.stop().await;
    }

    #[tokio::test]
    async fn non_json_responses_are_returned_as_text() {
        async fn text_handler() -> ([(axum::http::HeaderName, &'static str); 1], &'static str) {
            (
                [(axum::http::header::CONTENT_TYPE, "text/plain")],
                "{\"looks\": \"like json\"}",
            )
        }
        async fn problem_handler() -> (
            axum::http::StatusCode,
            [(axum::http::HeaderName, &'static str); 1],
            &'static str,
        ) {
            (
                axum::http::StatusCode::NOT_FOUND,
                [(axum::http::header::CONTENT_TYPE, "application/problem+json")],
                "{\"title\": \"missing\"}",
            )
        }
        let app = Router::new()
            .route("/text", any(text_handler))
            .route("/problem", any(problem_handler));
        let server = spawn(app).await;

        let resp = client()
            .execute(&RequestSpec::new(
                server.base_url.clone(),
                HttpMethod::Get,
                "/text",
            ))
            .await;
        assert_eq!(resp.body, json!("{\"looks\": \"like json\"}"));

        let resp = client()
            .execute(&RequestSpec::new(
                server.base_url.clone(),
                HttpMethod::Get,
                "/problem",
            ))
            .await;
        assert_eq!(resp.status, 404);
        assert_eq!(resp.status_text, "Not Found");
        assert_eq!(resp.body, json!({"title": "missing"}));

        server.stop().await;
    }

    #[tokio::test]
    async fn unreachable_host_returns_structured_failure() {
        // Bind then drop to get a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let spec = RequestSpec::new(format!("http://{addr}"), HttpMethod::Get, "/health");
        let resp = client().execute(&spec).await;
        assert!(resp.is_failure());
        assert_eq!(resp.status, 0);
        assert_eq!(resp.status_text, FAILED_STATUS_TEXT);
        assert!(resp.headers.is_empty());
        assert!(resp.body["error"].as_str().is_some_and(|s| !s.is_empty()));
        assert!(resp.curl.contains(&format!("http://{addr}/health")));
    }

    #[tokio::test]
    async fn timeout_returns_structured_failure() {
        async fn slow_handler() -> &'static str {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }
        let server = spawn(Router::new().route("/slow", any(slow_handler))).await;

        let client = HttpTestClient::new(
            Client::new(),
            HttpClientOptions {
                timeout: Duration::from_millis(100),
                max_response_bytes: None,
            },
        );
        let resp = client
            .execute(&RequestSpec::new(
                server.base_url.clone(),
                HttpMethod::Get,
                "/slow",
            ))
            .await;
        assert_eq!(resp.status, 0);
        assert_eq!(resp.status_text, FAILED_STATUS_TEXT);

        server.stop().await;
    }

    #[tokio::test]
    async fn oversized_body_is_reported_as_failure() {
        async fn big_handler() -> String {
            "x".repeat(4096)
        }
        let server = spawn(Router::new().route("/big", any(big_handler))).await;

        let client = HttpTestClient::new(
            Client::new(),
            HttpClientOptions {
                timeout: DEFAULT_TIMEOUT,
                max_response_bytes: Some(1024),
            },
        );
        let resp = client
            .execute(&RequestSpec::new(
                server.base_url.clone(),
                HttpMethod::Get,
                "/big",
            ))
            .await;
        assert_eq!(resp.status, 0);
        assert!(
            resp.body["error"]
                .as_str()
                .is_some_and(|s| s.contains("too large"))
        );

        server.stop().await;
    }

    #[test]
    fn json_content_type_detection() {
        assert!(is_json_content_type(Some("application/json; charset=utf-8")));
        assert!(is_json_content_type(Some("application/vnd.api+json")));
        assert!(!is_json_content_type(Some("text/html")));
        assert!(!is_json_content_type(None));
    }

    #[test]
    fn binary_bodies_become_base64_envelopes() {
        let v = decode_body(&[0xff, 0xfe, 0x00], Some("application/octet-stream"));
        assert_eq!(v["encoding"], "base64");
        assert_eq!(v["mimeType"], "application/octet-stream");
    }
}
