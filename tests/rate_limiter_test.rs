//! Rate limiter tests
//!
//! Tests the request rate limiting built into HttpActivitySource.

use tokio_test::{assert_err, assert_ok};
use whale_radar_lib::modules::tracker::HttpActivitySource;

#[tokio::test]
async fn test_source_creation() {
    let source = assert_ok!(HttpActivitySource::new("https://api.example.com/", 5.0));
    assert_eq!(source.base_url(), "https://api.example.com");
}

#[tokio::test]
async fn test_can_make_request() {
    let source = HttpActivitySource::new("https://api.example.com", 5.0).unwrap();
    assert!(source.can_make_request_now());
}

#[tokio::test]
async fn test_burst_is_one_second_of_requests() {
    let source = HttpActivitySource::new("https://api.example.com", 3.0).unwrap();

    assert!(source.can_make_request_now());
    assert!(source.can_make_request_now());
    assert!(source.can_make_request_now());
    assert!(!source.can_make_request_now());
}

#[tokio::test]
async fn test_independent_sources() {
    let first = HttpActivitySource::new("https://a.example.com", 1.0).unwrap();
    let second = HttpActivitySource::new("https://b.example.com", 1.0).unwrap();

    assert!(first.can_make_request_now());
    assert!(!first.can_make_request_now());
    assert!(second.can_make_request_now());
}

#[test]
fn test_invalid_rates_rejected() {
    assert_err!(HttpActivitySource::new("https://api.example.com", 0.0));
    assert_err!(HttpActivitySource::new("https://api.example.com", -2.0));
    assert_err!(HttpActivitySource::new("https://api.example.com", f64::INFINITY));
}

#[test]
fn test_out_of_range_rates_rejected() {
    assert_err!(HttpActivitySource::new("https://api.example.com", 1e-20));
    assert_err!(HttpActivitySource::new("https://api.example.com", f64::MIN_POSITIVE));
    assert_err!(HttpActivitySource::new("https://api.example.com", 1e30));
}

#[test]
fn test_slow_rate_accepted() {
    let source = assert_ok!(HttpActivitySource::new("https://api.example.com", 0.01));
    assert!(source.can_make_request_now());
    assert!(!source.can_make_request_now());
}
