//! Minimal HTTP client with safe logging, retries, and flexible auth.
//!
//! - Request options: headers, `Auth`, query params, timeout, retries
//! - JSON responses, URL-encoded form request bodies
//! - Redacts sensitive query params and form fields and never logs secret values
//! - Retries 429/5xx with exponential backoff and `Retry-After` support
//! - Optional *raw* request/response logging via `FOLLOWCHECK_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), followcheck_http::HttpError> {
//! let client = followcheck_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", followcheck_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: `Auth::Bearer` values are sanitized before use, and logs only
//! ever include the auth kind (bearer/none), not the secret.
//!
//! Observability: structured `tracing` events are emitted for request start,
//! headers, body snippets (truncated), retries, final errors, and (optionally)
//! raw request/response lines (target `http.raw`) when `FOLLOWCHECK_HTTP_RAW=1`.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

pub use reqwest::header;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "FOLLOWCHECK_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs and kept error bodies (64 KiB)

const SECRET_KEYS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "token",
    "secret",
    "password",
    "enc_password",
    "verification_code",
    "signed_body",
    "bearer",
];

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn is_secret_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SECRET_KEYS.contains(&lower.as_str())
}

fn is_secret_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("authorization")
        || name.eq_ignore_ascii_case("ig-set-authorization")
        || name.eq_ignore_ascii_case("cookie")
        || name.eq_ignore_ascii_case("set-cookie")
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&str>) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{}", method)];
    for (name, val) in redact_headers(headers) {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    if let Some(s) = body {
        let mut s = s.to_string();
        if s.len() > RAW_MAX_BODY {
            s.truncate(RAW_MAX_BODY);
            s.push_str("...");
        }
        parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
    }
    let (host_path, query) = redact_query(url);
    let query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    if query.is_empty() {
        parts.push(format!("'{}://{}'", url.scheme(), host_path));
    } else {
        parts.push(format!("'{}://{}?{}'", url.scheme(), host_path, query));
    }
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_secret_header(&key) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
        /// Response body, capped at 64 KiB, for callers that parse API-specific errors.
        body: String,
    },
}

impl HttpError {
    /// HTTP status for `Api` errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use followcheck_http::Auth;
///
/// let bearer = Auth::Bearer("IGT:2:token");
/// match bearer {
///     Auth::Bearer(value) => assert_eq!(value, "IGT:2:token"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    None,
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use followcheck_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     retries: Some(1),
///     query: Some(vec![("count", "200".into())]),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

/// Decoded JSON body together with the response headers.
#[derive(Debug, Clone)]
pub struct JsonResponse<T> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: T,
}

/// URL-encoded form body.
struct FormBody<'a>(&'a [(&'a str, Cow<'a, str>)]);

impl FormBody<'_> {
    const CONTENT_TYPE: &'static str = "application/x-www-form-urlencoded";

    fn encode(&self) -> Vec<u8> {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter().map(|(k, v)| (*k, v.as_ref())))
            .finish()
            .into_bytes()
    }

    /// Loggable rendering with secret fields masked.
    fn redacted(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter().map(|(k, v)| {
                if is_secret_key(k) {
                    (*k, "<redacted>")
                } else {
                    (*k, v.as_ref())
                }
            }))
            .finish()
    }
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    default_headers: HeaderMap,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use followcheck_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://i.instagram.com")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 2);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_headers: HeaderMap::new(),
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// Headers sent on every request before any per-request headers.
    pub fn with_default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    /// GET JSON with per-request options (headers/query/auth/timeout/retries).
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json_internal::<T>(Method::GET, path, None, opts)
            .await
            .map(|r| r.body)
    }

    /// POST an URL-encoded form and decode the JSON reply.
    pub async fn post_form<T>(
        &self,
        path: &str,
        form: &[(&str, Cow<'_, str>)],
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.post_form_with_headers(path, form, opts)
            .await
            .map(|r| r.body)
    }

    /// Like [`HttpClient::post_form`] but also hands back status and response headers.
    pub async fn post_form_with_headers<T>(
        &self,
        path: &str,
        form: &[(&str, Cow<'_, str>)],
        opts: RequestOpts<'_>,
    ) -> Result<JsonResponse<T>, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json_internal(Method::POST, path, Some(FormBody(form)), opts)
            .await
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn request_json_internal<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<FormBody<'_>>,
        opts: RequestOpts<'_>,
    ) -> Result<JsonResponse<T>, HttpError>
    where
        T: DeserializeOwned,
    {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;
        if let Some(q) = &opts.query {
            url.query_pairs_mut()
                .extend_pairs(q.iter().map(|(k, v)| (*k, v.as_ref())));
        }

        let mut attempt = 0usize;
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let body_bytes = body.as_ref().map(FormBody::encode);

        let auth_kind = match &opts.auth {
            Some(Auth::Bearer(_)) => "bearer",
            Some(Auth::None) | None => "none",
        };
        let (host_path, redacted_q) = redact_query(&url);

        loop {
            // ----- Build request -----
            let mut headers = self.default_headers.clone();
            if let Some(hdrs) = &opts.headers {
                for (k, v) in hdrs.iter() {
                    headers.insert(k, v.clone());
                }
            }
            if body.is_some() {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(FormBody::CONTENT_TYPE));
            }

            let mut rb = self
                .inner
                .request(method.clone(), url.clone())
                .timeout(timeout)
                .headers(headers.clone());

            if let Some(bytes) = &body_bytes {
                rb = rb.body(bytes.clone());
            }

            match &opts.auth {
                Some(Auth::Bearer(tok)) => {
                    let tok = sanitize_token(tok)?;
                    rb = rb.bearer_auth(tok);
                }
                Some(Auth::None) | None => {}
            }

            // Lightweight request id without extra deps
            let req_id = format!(
                "r{:x}",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos()
            );

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                method=%method,
                host_path=%host_path,
                query=?redacted_q,
                timeout_ms=timeout.as_millis() as u64,
                auth_kind,
                has_body=%body.is_some(),
                "http.request.start"
            );

            if raw_enabled() {
                let shown = body.as_ref().map(FormBody::redacted);
                let curl = make_curl(&method, &url, &headers, shown.as_deref());
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            // ----- Send -----
            let t0 = std::time::Instant::now();
            let resp = match rb.send().await {
                Ok(resp) => resp,
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network_send"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(req_id=%req_id, attempt, message=%message, "http.network_error.send");
                    return Err(HttpError::Network(message));
                }
            };
            let status = resp.status();
            let resp_headers = resp.headers().clone();
            let bytes = match resp.bytes().await {
                Ok(bytes) => bytes,
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network_body"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(req_id=%req_id, attempt, message=%message, "http.network_error.body");
                    return Err(HttpError::Network(message));
                }
            };
            let dur_ms = t0.elapsed().as_millis() as u64;

            let req_hdr_id = resp_headers
                .get("x-ig-request-id")
                .or_else(|| resp_headers.get("x-fb-trace-id"))
                .or_else(|| resp_headers.get("x-request-id"))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");

            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=dur_ms,
                body_len=bytes.len(),
                x_request_id=%req_hdr_id,
                "http.response.headers"
            );

            if raw_enabled() {
                let hdrs = redact_headers(&resp_headers);
                let truncated = bytes.len() > RAW_MAX_BODY;
                let text = String::from_utf8_lossy(&bytes[..bytes.len().min(RAW_MAX_BODY)]);
                tracing::info!(
                    target:"http.raw",
                    %req_id,
                    status=%status,
                    duration_ms=dur_ms,
                    headers=?hdrs,
                    body=%text,
                    truncated
                );
            }

            let snippet = snip_body(&bytes);
            tracing::trace!(req_id=%req_id, body_snippet=%snippet, "http.response.body_snippet");

            // ----- Success path -----
            if status.is_success() {
                return serde_json::from_slice::<T>(&bytes)
                    .map(|body| JsonResponse {
                        status,
                        headers: resp_headers,
                        body,
                    })
                    .map_err(|e| {
                        tracing::warn!(
                            req_id=%req_id,
                            serde_line=%e.line(),
                            serde_col=%e.column(),
                            serde_err=%e.to_string(),
                            body_snippet=%snippet,
                            "http.response.decode_error"
                        );
                        HttpError::Decode(e.to_string(), snippet)
                    });
            }

            // ----- Non-success: maybe retry -----
            let message = extract_error_message(&bytes);
            let request_id = req_hdr_id.to_string();

            let is_429 = status == StatusCode::TOO_MANY_REQUESTS;
            let is_5xx = status.is_server_error();

            if (is_429 || is_5xx) && attempt < max_retries {
                attempt += 1;
                let delay = if let Some(secs) = retry_after_delay_secs(&resp_headers) {
                    Duration::from_secs(secs)
                } else if is_429 {
                    // floor for 429 when no Retry-After is present
                    backoff(attempt).max(Duration::from_millis(1100))
                } else {
                    backoff(attempt)
                };
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    retry_after_secs=?retry_after_delay_secs(&resp_headers),
                    message=%message,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(
                req_id=%req_id,
                %status,
                message=%message,
                x_request_id=%request_id,
                body_snippet=%snippet,
                "http.error"
            );
            let kept = &bytes[..bytes.len().min(RAW_MAX_BODY)];
            return Err(HttpError::Api {
                status,
                message,
                request_id,
                body: String::from_utf8_lossy(kept).into_owned(),
            });
        }
    }
}

// ==============================
// Helpers
// ==============================

fn backoff(attempt: usize) -> Duration {
    let shift = (attempt.saturating_sub(1)).min(16) as u32;
    Duration::from_millis(200u64.saturating_mul(1u64 << shift))
}

fn extract_error_message(body: &[u8]) -> String {
    // Instagram: {"message":"...", "status":"fail", "error_type":"bad_password"}
    // Generic:   {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        error_type: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        match (m.message.is_empty(), m.error_type.is_empty()) {
            (false, false) => return format!("{} ({})", m.message, m.error_type),
            (false, true) => return m.message,
            (true, false) => return m.error_type,
            (true, true) => {}
        }
        if !m.detail.is_empty() {
            return m.detail;
        }
        if !m.error.is_empty() {
            return m.error;
        }
    }
    snip_body(body)
}

/// Longest wait honoured from a `Retry-After` header.
const MAX_RETRY_AFTER_SECS: u64 = 60;

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| secs.min(MAX_RETRY_AFTER_SECS))
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        let mut cut = 500;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

fn sanitize_token(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if !s.is_ascii() {
        return Err(HttpError::Build("token contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build("token contains control characters".into()));
    }

    HeaderValue::from_str(&format!("Bearer {}", s))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}

fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    // "host + path" string and redacted query list for logging
    let host = url.host_str().unwrap_or("-");
    let host_path = match url.port() {
        Some(port) => format!("{host}:{port}{}", url.path()),
        None => format!("{host}{}", url.path()),
    };
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret_key(&k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}
