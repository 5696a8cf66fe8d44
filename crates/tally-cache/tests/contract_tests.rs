use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::json;
use tally_cache::{
    CacheKey, ConnectionManager, ConnectionState, Invalidation, RetryPolicy, StoreError,
};

mod common;

#[tokio::test]
async fn set_then_get_returns_equal_value() {
    let (cache, _) = common::memory_cache();

    let values = [
        json!(null),
        json!(true),
        json!(-12.5),
        json!("ledger"),
        json!([1, "two", {"three": 3}]),
        json!({"company": {"id": 9, "accounts": ["cash", "ar"], "closed": false}}),
    ];

    for (i, value) in values.iter().enumerate() {
        let key = CacheKey::new("value").push(i);
        assert!(cache.set(key.as_str(), value).await);
        assert_eq!(
            cache.get::<serde_json::Value>(key.as_str()).await.as_ref(),
            Some(value)
        );
    }

    let mut typed = BTreeMap::new();
    typed.insert("cash".to_string(), 100_i64);
    typed.insert("ar".to_string(), -40_i64);
    assert!(cache.set("company:9:balances", &typed).await);
    assert_eq!(cache.get("company:9:balances").await, Some(typed));
}

#[tokio::test]
async fn unknown_key_is_a_miss() {
    let (cache, _) = common::memory_cache();
    assert_eq!(cache.get::<serde_json::Value>("never:written").await, None);
}

#[tokio::test]
async fn scope_pattern_leaves_other_scopes() {
    let (cache, store) = common::memory_cache();
    for key in ["scope:a", "scope:b", "other:c"] {
        cache.set(key, &key).await;
    }

    assert!(cache.delete_by_pattern("scope:*").await);

    assert!(!store.contains("scope:a").await);
    assert!(!store.contains("scope:b").await);
    assert!(store.contains("other:c").await);
}

#[tokio::test]
async fn empty_pattern_match_changes_nothing() {
    let (cache, store) = common::memory_cache();
    cache.set("other:c", &1).await;
    let before = store.entry_count();

    assert!(cache.delete_by_pattern("scope:*").await);
    assert!(store.contains("other:c").await);
    assert_eq!(store.entry_count(), before);
}

#[tokio::test]
async fn unreachable_store_never_breaks_the_caller() {
    let (cache, store) = common::memory_cache();
    store.set_available(false);

    assert!(!cache.set("scope:a", &1).await);
    assert_eq!(cache.get::<i32>("scope:a").await, None);
    assert!(!cache.delete("scope:a").await);
    assert!(!cache.delete_by_pattern("scope:*").await);

    // El camino autoritativo sigue funcionando
    let fetched = cache
        .get_or_compute("scope:a", 60, || async { Ok::<_, StoreError>(41 + 1) })
        .await
        .unwrap();
    assert_eq!(fetched.value, 42);
}

#[tokio::test]
async fn entry_with_one_second_ttl_expires() {
    let (cache, _) = common::memory_cache();

    assert!(cache.set_with_ttl("session:short", &"x", 1).await);
    assert_eq!(
        cache.get::<String>("session:short").await.as_deref(),
        Some("x")
    );

    tokio::time::sleep(Duration::from_millis(1_200)).await;

    assert_eq!(cache.get::<String>("session:short").await, None);
}

#[tokio::test(start_paused = true)]
async fn exhausted_budget_stops_connecting() {
    let connector = common::RefusingConnector::default();
    let manager = ConnectionManager::new(connector.clone(), RetryPolicy::default());

    assert!(manager.connection().await.is_err());
    assert_eq!(connector.attempts(), 4);
    assert_eq!(manager.state(), ConnectionState::Failed);

    for _ in 0..5 {
        let result: Result<(), StoreError> = manager.execute("get", |_| async { Ok(()) }).await;
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }
    assert_eq!(connector.attempts(), 4);
}

#[tokio::test]
async fn write_path_invalidates_list_and_item() {
    let (cache, store) = common::memory_cache();
    let invoices = CacheKey::new("company").push(3).push("invoices");
    let item = invoices.clone().push(11);
    let list = invoices.clone().push("list");

    cache.set(item.as_str(), &json!({"total": 10})).await;
    cache.set(list.as_str(), &json!([11])).await;

    cache
        .commit_and_invalidate(Invalidation::new().key(&item).key(&list), async {
            Ok::<_, StoreError>(())
        })
        .await
        .unwrap();

    assert!(!store.contains(item.as_str()).await);
    assert!(!store.contains(list.as_str()).await);
}
