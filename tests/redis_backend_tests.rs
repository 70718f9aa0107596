//! Redis Backend Tests
//!
//! Runs the store, cache and limiter against a live Redis server. Set
//! `REDIS_TEST_URL` (e.g. `redis://127.0.0.1:6379`) to enable them; without
//! it every test returns immediately. Keys are unique per run.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;

use property_cache::cache::PageSlice;
use property_cache::store::StoreConfig;
use property_cache::{CacheKeys, CacheService, CacheTtl, KvStore, RateLimiter, RedisStore, Role};

// == Helper Functions ==

fn test_url() -> Option<String> {
    std::env::var("REDIS_TEST_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

fn redis_store() -> Option<Arc<RedisStore>> {
    let url = test_url()?;
    let store = RedisStore::new(StoreConfig {
        url,
        ..StoreConfig::default()
    })
    .unwrap();
    Some(Arc::new(store))
}

/// An id no other run shares.
fn unique(label: &str) -> String {
    format!(
        "{}-{}-{}",
        label,
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

async fn remaining_ttl(key: &str) -> i64 {
    let client = redis::Client::open(test_url().unwrap().as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    redis::cmd("TTL").arg(key).query_async(&mut conn).await.unwrap()
}

// == Store Commands ==

#[tokio::test]
async fn test_set_nx_ex_only_first_writer_wins() {
    let Some(store) = redis_store() else { return };
    let key = unique("lock:test");

    assert!(store.set_nx_ex(&key, "worker-a", 30).await.unwrap());
    assert!(!store.set_nx_ex(&key, "worker-b", 30).await.unwrap());
    assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("worker-a"));

    store.del(&[key]).await.unwrap();
}

#[tokio::test]
async fn test_incr_with_expiry_starts_window_once() {
    let Some(store) = redis_store() else { return };
    let key = unique("ratelimit:test");

    assert_eq!(store.incr_with_expiry(&key, 60).await.unwrap(), 1);
    assert_eq!(store.incr_with_expiry(&key, 60).await.unwrap(), 2);

    let ttl = remaining_ttl(&key).await;
    assert!((1..=60).contains(&ttl), "ttl was {}", ttl);

    store.del(&[key]).await.unwrap();
}

#[tokio::test]
async fn test_del_reports_removed_count() {
    let Some(store) = redis_store() else { return };
    let key = unique("ticket:test");

    store.set_ex(&key, "{}", 60).await.unwrap();

    assert_eq!(store.del(&[key.clone()]).await.unwrap(), 1);
    assert_eq!(store.del(&[key.clone()]).await.unwrap(), 0);
    assert!(!store.exists(&key).await.unwrap());
}

#[tokio::test]
async fn test_reconnects_after_disconnect() {
    let Some(store) = redis_store() else { return };

    store.ping().await.unwrap();
    assert!(store.is_connected().await);

    store.disconnect().await;
    assert!(!store.is_connected().await);

    store.ping().await.unwrap();
    assert!(store.is_connected().await);
}

// == Cache Service ==

#[tokio::test]
async fn test_pattern_invalidation_is_scoped() {
    let Some(store) = redis_store() else { return };
    let cache = CacheService::new(store);
    let agent = unique("agent");
    let other = unique("agent-other");

    let stale = [
        CacheKeys::tickets(Role::Agent, &agent, PageSlice::new(1, 20)),
        CacheKeys::tickets(Role::Agent, &agent, PageSlice::new(2, 20)),
    ];
    let fresh = CacheKeys::tickets(Role::Agent, &other, PageSlice::new(1, 20));
    for key in stale.iter().chain([&fresh]) {
        assert!(cache.set(key, &Vec::<u32>::new(), CacheTtl::SHORT).await);
    }

    let scope = CacheKeys::scope("tickets", Role::Agent, &agent);
    let removed = cache.del_pattern(&CacheKeys::pattern(&scope)).await;

    assert_eq!(removed, 2);
    for key in &stale {
        assert!(!cache.exists(key).await);
    }
    assert!(cache.exists(&fresh).await);
    assert!(cache.del(&fresh).await);
}

#[tokio::test]
async fn test_get_or_set_produces_once() {
    let Some(store) = redis_store() else { return };
    let cache = CacheService::new(store);
    let key = CacheKeys::property(&unique("property"));

    let first: Option<String> = cache
        .get_or_set(&key, CacheTtl::SHORT, || async { Ok::<_, String>("loaded".to_string()) })
        .await;
    let second: Option<String> = cache
        .get_or_set(&key, CacheTtl::SHORT, || async {
            Err::<String, _>("producer must not run on a hit".to_string())
        })
        .await;

    assert_eq!(first.as_deref(), Some("loaded"));
    assert_eq!(second.as_deref(), Some("loaded"));
    assert_eq!(cache.stats().producer_errors, 0);
    assert_eq!(cache.remove(&key).await, 1);
}

#[tokio::test]
async fn test_set_if_absent_single_winner() {
    let Some(store) = redis_store() else { return };
    let cache = CacheService::new(store);
    let key = unique("lock:invoice");

    let mut workers = JoinSet::new();
    for worker in 0..8 {
        let cache = cache.clone();
        let key = key.clone();
        workers.spawn(async move {
            cache
                .set_if_absent(&key, &format!("worker-{}", worker), Duration::from_secs(30))
                .await
        });
    }

    let mut winners = 0;
    while let Some(won) = workers.join_next().await {
        if won.unwrap() {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    cache.remove(&key).await;
}

// == Rate Limiter ==

#[tokio::test]
async fn test_limiter_admits_up_to_max() {
    let Some(store) = redis_store() else { return };
    let limiter = RateLimiter::new(CacheService::new(store));
    let subject = unique("tenant");

    let mut allowed = Vec::new();
    for _ in 0..5 {
        let decision = limiter
            .check(&subject, "ticket_create", 3, Duration::from_secs(60))
            .await;
        allowed.push((decision.allowed, decision.remaining));
    }

    assert_eq!(
        allowed,
        vec![(true, 2), (true, 1), (true, 0), (false, 0), (false, 0)]
    );
}

#[tokio::test]
async fn test_limiter_window_resets() {
    let Some(store) = redis_store() else { return };
    let limiter = RateLimiter::new(CacheService::new(store));
    let subject = unique("tenant");
    let window = Duration::from_secs(1);

    assert!(limiter.check(&subject, "invoice_payment", 1, window).await.allowed);
    assert!(!limiter.check(&subject, "invoice_payment", 1, window).await.allowed);

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let decision = limiter.check(&subject, "invoice_payment", 1, window).await;
    assert!(decision.allowed);
    assert_eq!(decision.current, 1);
}
