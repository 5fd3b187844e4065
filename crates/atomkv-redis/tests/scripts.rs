//! Integration tests for the server-side compound operations.

mod common;

use std::collections::HashSet;
use std::time::Duration;

use atomkv_cache::prelude::*;
use common::{cache, key};
use futures_util::future::join_all;

// ==================== incr_xx ====================

#[tokio::test]
async fn test_incr_xx_requires_existing_key() {
    let cache = cache().await;
    let k = key("incrxx");

    let err = cache.incr_xx(&k, 1).await.unwrap_err();
    assert_eq!(err, CacheError::key_not_found(&k));
    assert!(!cache.exists(&k).await.unwrap());

    cache.set(&k, "10", Duration::ZERO).await.unwrap();
    assert_eq!(cache.incr_xx(&k, 5).await.unwrap(), 15);
    assert_eq!(cache.incr_xx(&k, -20).await.unwrap(), -5);
}

#[tokio::test]
async fn test_concurrent_incr_xx_on_missing_key_never_creates_it() {
    let cache = cache().await;
    let k = key("incrxx-race");

    let results = join_all((0..32).map(|_| cache.incr_xx(&k, 1))).await;
    assert!(results.iter().all(|r| r.as_ref().unwrap_err().kind() == ErrorKind::KeyNotFound));
    assert!(!cache.exists(&k).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_incr_xx_counts_every_call() {
    let cache = cache().await;
    let k = key("incrxx-count");
    cache.set(&k, "0", Duration::ZERO).await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            let k = k.clone();
            tokio::spawn(async move {
                for _ in 0..25 {
                    cache.incr_xx(&k, 1).await.unwrap();
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(cache.get(&k).await.unwrap(), "200");
}

// ==================== decr_with_limit ====================

#[tokio::test]
async fn test_decr_with_limit_stops_at_bound() {
    let cache = cache().await;
    let k = key("ctr");
    cache.set(&k, "10", Duration::ZERO).await.unwrap();

    for expected in (1..10).rev() {
        assert_eq!(cache.decr_with_limit(&k, 1, 1).await.unwrap(), expected);
    }

    let err = cache.decr_with_limit(&k, 1, 1).await.unwrap_err();
    assert_eq!(err.sentinel, 0);
    assert_eq!(err.error, CacheError::bound_exceeded(&k, 1));
    assert_eq!(cache.get(&k).await.unwrap(), "1");
}

#[tokio::test]
async fn test_decr_with_limit_missing_key_counts_as_zero() {
    let cache = cache().await;
    let k = key("ctr-missing");

    assert_eq!(cache.decr_with_limit(&k, 3, -5).await.unwrap(), -3);
    let err = cache.decr_with_limit(&k, 3, -5).await.unwrap_err();
    assert_eq!(err.sentinel, -6);
    assert_eq!(err.kind(), ErrorKind::BoundExceeded);
    assert_eq!(cache.get(&k).await.unwrap(), "-3");
}

#[tokio::test]
async fn test_concurrent_decr_with_limit_never_oversells() {
    let cache = cache().await;
    let k = key("seats");
    cache.set(&k, "20", Duration::ZERO).await.unwrap();

    let results = join_all((0..50).map(|_| cache.decr_with_limit(&k, 1, 0))).await;
    let sold = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(sold, 20);

    let left: HashSet<i64> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
    assert_eq!(left, (0..20).collect::<HashSet<i64>>());
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.sentinel == -1 && e.kind() == ErrorKind::BoundExceeded)
    );
    assert_eq!(cache.get(&k).await.unwrap(), "0");
}

#[tokio::test]
async fn test_decr_with_limit_transport_error_keeps_sentinel() {
    let cache = cache().await.with_deadline(Duration::ZERO);

    let err = cache.decr_with_limit(&key("ctr"), 1, 10).await.unwrap_err();
    assert_eq!(err.sentinel, 9);
    assert_eq!(err.kind(), ErrorKind::Timeout);
    let err: CacheError = err.into();
    assert!(err.is_transport());
}

// ==================== hget_set ====================

#[tokio::test]
async fn test_hget_set_compare_and_swap() {
    let cache = cache().await;
    let k = key("lock");

    // an absent field only matches an empty token
    let err = cache
        .hget_set(&k, "owner", "alice", "bob", Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err, CacheError::value_mismatch(&k, "owner"));
    assert!(!cache.exists(&k).await.unwrap());

    assert_eq!(
        cache
            .hget_set(&k, "owner", "alice", "", Duration::ZERO)
            .await
            .unwrap(),
        "alice"
    );
    let err = cache
        .hget_set(&k, "owner", "bob", "", Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueMismatch);
    assert_eq!(cache.hget(&k, "owner").await.unwrap(), "alice");
}

#[tokio::test]
async fn test_hget_set_refreshes_ttl_only_on_success() {
    let cache = cache().await;
    let k = key("lease");
    cache
        .hset(&k, "token", "t1", Duration::from_secs(30))
        .await
        .unwrap();

    cache
        .hget_set(&k, "token", "t3", "wrong", Duration::from_secs(600))
        .await
        .unwrap_err();
    assert!(cache.ttl(&k).await.unwrap().unwrap() <= Duration::from_secs(30));

    cache
        .hget_set(&k, "token", "t2", "t1", Duration::from_secs(600))
        .await
        .unwrap();
    assert!(cache.ttl(&k).await.unwrap().unwrap() > Duration::from_secs(500));
    assert_eq!(cache.hget(&k, "token").await.unwrap(), "t2");
}

#[tokio::test]
async fn test_concurrent_hget_set_has_one_winner() {
    let cache = cache().await;
    let k = key("cas");
    cache.hset(&k, "v", "0", Duration::ZERO).await.unwrap();

    let candidates: Vec<String> = (1..=16).map(|i| i.to_string()).collect();
    let results = join_all(
        candidates
            .iter()
            .map(|c| cache.hget_set(&k, "v", c, "0", Duration::ZERO)),
    )
    .await;

    let winners: Vec<&String> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(&cache.hget(&k, "v").await.unwrap(), winners[0]);
}

// ==================== zadd_to_fixed ====================

#[tokio::test]
async fn test_zadd_to_fixed_keeps_top_scores() {
    let cache = cache().await;
    let k = key("top3");

    for (member, score) in [("a", 10.0), ("b", 20.0), ("c", 30.0)] {
        assert!(cache.zadd_to_fixed(&k, member, score, 3).await.unwrap());
    }
    assert!(!cache.zadd_to_fixed(&k, "low", 5.0, 3).await.unwrap());
    // ties with the lowest kept score are rejected
    assert!(!cache.zadd_to_fixed(&k, "tie", 10.0, 3).await.unwrap());
    assert!(cache.zadd_to_fixed(&k, "d", 25.0, 3).await.unwrap());

    assert_eq!(cache.zcard(&k).await.unwrap(), 3);
    assert_eq!(cache.zrevrange(&k, 0, -1).await.unwrap(), ["c", "d", "b"]);
}

#[tokio::test]
async fn test_zadd_to_fixed_evicts_lowest_at_capacity() {
    let cache = cache().await;
    let k = key("pair");
    cache.zadd(&k, "a", 100.0).await.unwrap();
    cache.zadd(&k, "b", 101.0).await.unwrap();

    assert!(!cache.zadd_to_fixed(&k, "c", 50.0, 2).await.unwrap());
    assert_eq!(cache.zrange(&k, 0, -1).await.unwrap(), ["a", "b"]);

    assert!(cache.zadd_to_fixed(&k, "c", 150.0, 2).await.unwrap());
    assert_eq!(
        cache.zrevrange_with_scores(&k, 0, -1).await.unwrap(),
        vec![ScoredMember::new("c", 150.0), ScoredMember::new("b", 101.0)]
    );
}

#[tokio::test]
async fn test_zadd_to_fixed_never_exceeds_cap() {
    let cache = cache().await;
    let k = key("capped");
    let members: Vec<String> = (0..11).map(|i| format!("m{i}")).collect();

    let results = join_all(
        members
            .iter()
            .enumerate()
            .map(|(i, m)| cache.zadd_to_fixed(&k, m, i as f64, 10)),
    )
    .await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(cache.zcard(&k).await.unwrap(), 10);
    // whatever the arrival order, the lowest score cannot survive
    assert!(cache.zscore(&k, "m0").await.unwrap_err().is_cache_miss());
}

#[tokio::test]
async fn test_zadd_to_fixed_rejects_zero_cap() {
    let cache = cache().await;
    let err = cache
        .zadd_to_fixed(&key("capped"), "a", 1.0, 0)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}
