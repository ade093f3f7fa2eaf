//! Integration tests for the SQLite store: ban action log plus the
//! IP→location cache and its uniqueness contract.

use banlog::models::UNKNOWN_LOCATION;
use banlog::storage::SqliteStorage;

async fn create_storage() -> SqliteStorage {
    let storage = SqliteStorage::new("sqlite::memory:").await.unwrap();
    storage.init().await.unwrap();
    storage
}

#[tokio::test]
async fn test_save_ban_action_assigns_fresh_ids() {
    let storage = create_storage().await;

    let first = storage.save_ban_action("ssh", "8.8.8.8").await.unwrap();
    let second = storage.save_ban_action("ftp", "8.8.4.4").await.unwrap();
    assert!(first > 0);
    assert_ne!(first, second);

    let actions = storage.list_actions_since(0).await.unwrap();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].protocol, "ssh");
    assert_eq!(actions[0].ip, "8.8.8.8");
    // location stays unresolved until the enrichment step fills it in
    assert!(actions[0].location.is_none());
}

#[tokio::test]
async fn test_update_ban_action_location() {
    let storage = create_storage().await;

    let id = storage.save_ban_action("ssh", "8.8.8.8").await.unwrap();
    assert!(storage
        .update_ban_action_location(id, "United States")
        .await
        .unwrap());

    let actions = storage.list_actions_since(0).await.unwrap();
    assert_eq!(actions[0].location.as_deref(), Some("United States"));

    // a missing id reports false instead of failing
    assert!(!storage
        .update_ban_action_location(9999, "Nowhere")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_lookup_miss_on_empty_cache_is_none_not_error() {
    let storage = create_storage().await;

    let cached = storage.lookup_location("1.2.3.4").await.unwrap();
    assert!(cached.is_none());
}

#[tokio::test]
async fn test_save_location_is_insert_or_fetch() {
    let storage = create_storage().await;

    let first = storage.save_location("8.8.8.8", "United States").await.unwrap();
    assert!(first.id > 0);

    // a second save for the same IP returns the original row untouched
    let second = storage.save_location("8.8.8.8", "Canada").await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.country_name, "United States");

    // still exactly one cache row for the IP
    let cached = storage.lookup_location("8.8.8.8").await.unwrap().unwrap();
    assert_eq!(cached.id, first.id);
    assert_eq!(cached.country_name, "United States");
}

#[tokio::test]
async fn test_unknown_is_distinct_from_absent() {
    let storage = create_storage().await;

    storage
        .save_location("127.0.0.1", UNKNOWN_LOCATION)
        .await
        .unwrap();

    // "Unknown" is a real cache row
    let cached = storage.lookup_location("127.0.0.1").await.unwrap().unwrap();
    assert!(cached.is_unknown());

    // a never-seen IP is not
    assert!(storage.lookup_location("10.0.0.1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_unknown_ips_filters_on_sentinel() {
    let storage = create_storage().await;

    storage.save_location("8.8.8.8", "United States").await.unwrap();
    storage
        .save_location("127.0.0.1", UNKNOWN_LOCATION)
        .await
        .unwrap();
    storage
        .save_location("192.168.0.1", UNKNOWN_LOCATION)
        .await
        .unwrap();

    let unknowns = storage.list_unknown_ips().await.unwrap();
    let ips: Vec<&str> = unknowns.iter().map(|l| l.ip.as_str()).collect();
    assert_eq!(ips, vec!["127.0.0.1", "192.168.0.1"]);
}

#[tokio::test]
async fn test_update_location_resolves_unknown_in_place() {
    let storage = create_storage().await;

    let before = storage
        .save_location("1.1.1.1", UNKNOWN_LOCATION)
        .await
        .unwrap();
    assert!(storage
        .update_location("1.1.1.1", "Australia")
        .await
        .unwrap());

    let after = storage.lookup_location("1.1.1.1").await.unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.country_name, "Australia");
    assert!(storage.list_unknown_ips().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_purge_deletes_all_logs_and_keeps_cache() {
    let storage = create_storage().await;

    for _ in 0..5 {
        storage.save_ban_action("ssh", "8.8.8.8").await.unwrap();
    }
    storage.save_location("8.8.8.8", "United States").await.unwrap();

    let purged = storage.purge_logs().await.unwrap();
    assert_eq!(purged, 5);
    assert!(storage.list_actions_since(0).await.unwrap().is_empty());

    // purge is about logs only; the cache survives
    assert!(storage.lookup_location("8.8.8.8").await.unwrap().is_some());

    // purging again removes nothing
    assert_eq!(storage.purge_logs().await.unwrap(), 0);
}
