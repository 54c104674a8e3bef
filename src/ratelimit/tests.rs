use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderValue};

use super::*;

fn limiter() -> InMemoryRateLimiter {
    InMemoryRateLimiter::default()
}

#[test]
fn test_ten_calls_per_window_then_rejected() {
    let limiter = limiter();
    let start = Instant::now();

    for i in 0..10 {
        let now = start + Duration::from_secs(i * 5);
        assert!(limiter.check_admission_at("203.0.113.7", now), "call {i}");
    }
    assert!(!limiter.check_admission_at("203.0.113.7", start + Duration::from_secs(59)));
    assert_eq!(limiter.record("203.0.113.7").unwrap().count, 10);
}

#[test]
fn test_window_expiry_resets_counter() {
    let limiter = limiter();
    let start = Instant::now();

    for _ in 0..10 {
        assert!(limiter.check_admission_at("203.0.113.7", start));
    }
    assert!(!limiter.check_admission_at("203.0.113.7", start));

    // The window boundary itself still belongs to the old window.
    let boundary = start + Duration::from_secs(60);
    assert!(!limiter.check_admission_at("203.0.113.7", boundary));

    let later = boundary + Duration::from_millis(1);
    assert!(limiter.check_admission_at("203.0.113.7", later));

    let record = limiter.record("203.0.113.7").unwrap();
    assert_eq!(record.count, 1);
    assert_eq!(record.window_reset, later + Duration::from_secs(60));
}

#[test]
fn test_keys_are_independent() {
    let limiter = InMemoryRateLimiter::new(RateLimitConfig {
        max_requests: 1,
        ..RateLimitConfig::default()
    });
    let now = Instant::now();

    assert!(limiter.check_admission_at("198.51.100.1", now));
    assert!(!limiter.check_admission_at("198.51.100.1", now));
    assert!(limiter.check_admission_at("198.51.100.2", now));
    assert!(limiter.check_admission_at(UNKNOWN_CLIENT_KEY, now));
    assert!(!limiter.check_admission_at(UNKNOWN_CLIENT_KEY, now));
}

#[test]
fn test_tracked_keys_are_bounded() {
    let limiter = InMemoryRateLimiter::new(RateLimitConfig {
        max_keys: 16,
        ..RateLimitConfig::default()
    });
    let now = Instant::now();

    for i in 0..500 {
        limiter.check_admission_at(&format!("10.0.{}.{}", i / 256, i % 256), now);
    }

    limiter.tracked_keys();
    assert!(limiter.tracked_keys() <= 16);
}

#[test]
fn test_untracked_key_has_no_record() {
    assert!(limiter().record("192.0.2.1").is_none());
}

#[tokio::test]
async fn test_trait_object_admission() {
    let limiter: Arc<dyn AdmissionControl> = Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
        max_requests: 2,
        ..RateLimitConfig::default()
    }));

    assert!(limiter.check_admission("192.0.2.10").await);
    assert!(limiter.check_admission("192.0.2.10").await);
    assert!(!limiter.check_admission("192.0.2.10").await);
}

#[test]
fn test_concurrent_admissions_never_exceed_max() {
    let limiter = Arc::new(limiter());
    let now = Instant::now();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            std::thread::spawn(move || {
                (0..5)
                    .filter(|_| limiter.check_admission_at("203.0.113.50", now))
                    .count()
            })
        })
        .collect();

    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(admitted, 10);
}

#[test]
fn test_client_key_prefers_first_forwarded_address() {
    let mut headers = HeaderMap::new();
    headers.insert(
        FORWARDED_FOR_HEADER,
        HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
    );
    headers.insert(REAL_IP_HEADER, HeaderValue::from_static("10.0.0.2"));

    assert_eq!(client_key(&headers), "203.0.113.7");
}

#[test]
fn test_client_key_falls_back_to_real_ip() {
    let mut headers = HeaderMap::new();
    headers.insert(REAL_IP_HEADER, HeaderValue::from_static("10.0.0.2"));
    assert_eq!(client_key(&headers), "10.0.0.2");

    headers.insert(FORWARDED_FOR_HEADER, HeaderValue::from_static(""));
    assert_eq!(client_key(&headers), "10.0.0.2");
}

#[test]
fn test_client_key_defaults_to_unknown() {
    assert_eq!(client_key(&HeaderMap::new()), "unknown");
}

#[test]
fn test_admission_through_block_on() {
    let limiter = limiter();
    tokio_test::block_on(async {
        assert!(limiter.check_admission("192.0.2.77").await);
    });
    assert_eq!(limiter.record("192.0.2.77").unwrap().count, 1);
}
