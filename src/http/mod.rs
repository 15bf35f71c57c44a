use crate::config::Config;
use log::warn;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateMeta {
    pub remaining: Option<i32>,
    pub used: Option<i32>,
    pub reset_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub retriable: bool,
}

#[derive(Debug, Clone)]
pub struct RestResponse<T> {
    pub value: Option<T>,
    pub rate: Option<RateMeta>,
    pub error: Option<ErrorInfo>,
    pub status: StatusCode,
    pub headers: Option<HeaderMap>,
}

pub fn build_client(cfg: &Config) -> reqwest::Result<Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&cfg.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("github-connector")),
    );
    let builder = Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls();
    builder.build()
}

fn auth_header(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).expect("valid header")
}

pub fn map_status_to_error(status: StatusCode, message: String) -> ErrorInfo {
    let (code, retriable) = match status {
        StatusCode::BAD_REQUEST => ("bad_request", false),
        StatusCode::UNAUTHORIZED => ("unauthorized", false),
        StatusCode::FORBIDDEN => ("forbidden", false),
        StatusCode::NOT_FOUND => ("not_found", false),
        StatusCode::CONFLICT => ("conflict", false),
        StatusCode::UNPROCESSABLE_ENTITY => ("unprocessable", false),
        StatusCode::TOO_MANY_REQUESTS => ("rate_limited", true),
        s if s.is_server_error() => ("upstream_error", true),
        _ => ("server_error", false),
    };
    ErrorInfo {
        code: code.to_string(),
        message,
        retriable,
    }
}

pub fn extract_rate_from_rest(headers: &HeaderMap) -> RateMeta {
    let remaining = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i32>().ok());
    let used = headers
        .get("x-ratelimit-used")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i32>().ok());
    let reset_at = headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|epoch| chrono::DateTime::<chrono::Utc>::from_timestamp(epoch, 0))
        .map(|t| t.to_rfc3339());
    RateMeta {
        remaining,
        used,
        reset_at,
    }
}

fn compute_backoff(attempt: u32, retry_after: Option<Duration>) -> Duration {
    if let Some(d) = retry_after {
        return d;
    }
    // Exponential backoff with jitter: base 200ms * 2^attempt, max 5s.
    let base = 200u64.saturating_mul(1u64 << attempt.min(5));
    let max = 5_000u64.min(base);
    let jitter = fastrand::u64(0..=max / 2);
    Duration::from_millis(max / 2 + jitter)
}

/// Percent-encode a single URL path segment. Identifiers chosen by users
/// (repository names, milestone titles) may carry spaces or slashes.
pub fn encode_path_segment(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

pub fn has_next_page_from_link(headers: &HeaderMap) -> bool {
    if let Some(link) = headers.get("link").and_then(|v| v.to_str().ok()) {
        return link.contains("rel=\"next\"");
    }
    false
}

fn retry_after_from(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Authenticated HTTP transport plus response parsing for actions and
/// option lookups. One context is built per host invocation; it carries
/// no state beyond the client and configuration.
pub struct Context {
    client: Client,
    cfg: Config,
}

impl Context {
    pub fn new(cfg: Config) -> reqwest::Result<Self> {
        let client = build_client(&cfg)?;
        Ok(Self { client, cfg })
    }

    fn rest_request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.cfg.api_url, path);
        self.client
            .request(method, url)
            .header(AUTHORIZATION, auth_header(&self.cfg.token))
            .header("X-GitHub-Api-Version", &self.cfg.api_version)
            .header(
                ACCEPT,
                HeaderValue::from_static("application/vnd.github+json"),
            )
    }

    pub async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> RestResponse<T> {
        self.execute_json(reqwest::Method::GET, path, None).await
    }

    pub async fn patch_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> RestResponse<T> {
        let body = match serde_json::to_value(body) {
            Ok(v) => v,
            Err(e) => {
                return RestResponse {
                    value: None,
                    rate: None,
                    error: Some(ErrorInfo {
                        code: "server_error".into(),
                        message: e.to_string(),
                        retriable: false,
                    }),
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    headers: None,
                }
            }
        };
        self.execute_json(reqwest::Method::PATCH, path, Some(body))
            .await
    }

    // Shared request loop: retries 429/5xx with backoff, honors Retry-After.
    // GitHub's issue PATCH is idempotent for identical bodies, so mutations
    // go through the same policy as reads.
    async fn execute_json<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> RestResponse<T> {
        let mut attempt: u32 = 0;
        loop {
            let mut req = self.rest_request(method.clone(), path);
            if let Some(ref b) = body {
                req = req.json(b);
            }
            let res = match req.send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!("REST {} {} error sending request: {}", method, path, e);
                    if attempt < 5 {
                        tokio::time::sleep(compute_backoff(attempt, None)).await;
                        attempt += 1;
                        continue;
                    }
                    return RestResponse {
                        value: None,
                        rate: None,
                        error: Some(ErrorInfo {
                            code: "upstream_error".into(),
                            message: e.to_string(),
                            retriable: true,
                        }),
                        status: StatusCode::INTERNAL_SERVER_ERROR,
                        headers: None,
                    };
                }
            };

            let status = res.status();
            let headers = res.headers().clone();
            let rate = extract_rate_from_rest(&headers);
            let retry_after = retry_after_from(&headers);

            if status.is_success() {
                match res.json::<T>().await {
                    Ok(val) => {
                        return RestResponse {
                            value: Some(val),
                            rate: Some(rate),
                            error: None,
                            status,
                            headers: Some(headers),
                        };
                    }
                    Err(e) => {
                        return RestResponse {
                            value: None,
                            rate: Some(rate),
                            error: Some(ErrorInfo {
                                code: "server_error".into(),
                                message: e.to_string(),
                                retriable: false,
                            }),
                            status,
                            headers: Some(headers),
                        };
                    }
                }
            }

            // Retry on 429/5xx
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt < 5 {
                    let backoff = compute_backoff(attempt, retry_after);
                    warn!(
                        "REST {} {} retrying (status {}), backoff {:?}",
                        method, path, status, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                    continue;
                }
            }
            let text = res.text().await.unwrap_or_default();
            let err = map_status_to_error(status, text);
            return RestResponse {
                value: None,
                rate: Some(rate),
                error: Some(err),
                status,
                headers: Some(headers),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_mapping_matrix() {
        assert_eq!(
            map_status_to_error(StatusCode::BAD_REQUEST, "".into()).code,
            "bad_request"
        );
        assert_eq!(
            map_status_to_error(StatusCode::UNAUTHORIZED, "".into()).code,
            "unauthorized"
        );
        assert_eq!(
            map_status_to_error(StatusCode::FORBIDDEN, "".into()).code,
            "forbidden"
        );
        assert_eq!(
            map_status_to_error(StatusCode::NOT_FOUND, "".into()).code,
            "not_found"
        );
        assert_eq!(
            map_status_to_error(StatusCode::CONFLICT, "".into()).code,
            "conflict"
        );
        assert_eq!(
            map_status_to_error(StatusCode::UNPROCESSABLE_ENTITY, "".into()).code,
            "unprocessable"
        );
        let rl = map_status_to_error(StatusCode::TOO_MANY_REQUESTS, "".into());
        assert_eq!(rl.code, "rate_limited");
        assert!(rl.retriable);
        let s5 = map_status_to_error(StatusCode::INTERNAL_SERVER_ERROR, "".into());
        assert_eq!(s5.code, "upstream_error");
        assert!(s5.retriable);
    }

    #[test]
    fn backoff_respects_retry_after() {
        let d = compute_backoff(0, Some(Duration::from_secs(7)));
        assert_eq!(d, Duration::from_secs(7));
    }

    #[test]
    fn backoff_is_bounded() {
        for attempt in 0..10 {
            let d = compute_backoff(attempt, None);
            assert!(d <= Duration::from_millis(5_000));
        }
    }

    #[test]
    fn path_segment_encoding() {
        assert_eq!(encode_path_segment("Prod Env/Blue%"), "Prod%20Env%2FBlue%25");
        assert_eq!(encode_path_segment("abc-._~123"), "abc-._~123");
    }

    #[test]
    fn next_page_link_detection() {
        let mut h = HeaderMap::new();
        h.insert(
            "link",
            "<https://api.github.com/user/repos?page=2>; rel=\"next\", <https://api.github.com/user/repos?page=5>; rel=\"last\""
                .parse()
                .unwrap(),
        );
        assert!(has_next_page_from_link(&h));
        let mut last_only = HeaderMap::new();
        last_only.insert(
            "link",
            "<https://api.github.com/user/repos?page=5>; rel=\"last\""
                .parse()
                .unwrap(),
        );
        assert!(!has_next_page_from_link(&last_only));
        assert!(!has_next_page_from_link(&HeaderMap::new()));
    }
}
