use github_connector::http::{encode_path_segment, extract_rate_from_rest, map_status_to_error};
use reqwest::header::HeaderMap;

#[test]
fn status_error_mapping() {
    let e = map_status_to_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "rate".into());
    assert_eq!(e.code, "rate_limited");
    assert!(e.retriable);
    let e = map_status_to_error(reqwest::StatusCode::UNPROCESSABLE_ENTITY, "state".into());
    assert_eq!(e.code, "unprocessable");
    assert!(!e.retriable);
}

#[test]
fn rest_rate_headers() {
    let mut h = HeaderMap::new();
    h.insert("x-ratelimit-remaining", "4999".parse().unwrap());
    h.insert("x-ratelimit-used", "1".parse().unwrap());
    // Use a fixed epoch for deterministic test
    h.insert("x-ratelimit-reset", "0".parse().unwrap());
    let rate = extract_rate_from_rest(&h);
    assert_eq!(rate.remaining, Some(4999));
    assert_eq!(rate.used, Some(1));
    assert!(rate.reset_at.is_some());
}

#[test]
fn url_path_segment_encoding() {
    // Spaces, slash, percent and unicode should be percent-encoded
    assert_eq!(encode_path_segment("Prod Env/Blue%"), "Prod%20Env%2FBlue%25");
    // Unreserved characters remain as-is
    assert_eq!(encode_path_segment("abc-._~123"), "abc-._~123");
}
