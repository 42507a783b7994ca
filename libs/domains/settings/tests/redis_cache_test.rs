//! Settings cache behaviour against a real Redis server

use domain_settings::cache::{RedisCacheBackend, SettingsConfig};
use domain_settings::*;
use serde_json::json;
use std::sync::Arc;
use test_utils::{TestDatabase, TestRedis};

async fn setup(ttl: u64) -> (TestDatabase, TestRedis, SettingsService<SqlSettingRepository>) {
    let db = TestDatabase::new().await;
    entity::create_tables(&db.connection()).await.unwrap();
    let redis = TestRedis::new().await;

    let cache = SettingsCache::new(
        Arc::new(RedisCacheBackend::new(redis.connection())),
        &SettingsConfig {
            cache_expire_secs: ttl,
        },
    );
    let service = SettingsService::new(SqlSettingRepository::new(db.connection()), cache);
    (db, redis, service)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_reads_populate_and_writes_invalidate() {
    let (_db, redis, service) = setup(0).await;

    service
        .batch_upsert(vec![SettingInput::new("site_name", "demo", SettingType::String, "website")])
        .await
        .unwrap();
    assert!(redis.keys("setting:*").await.is_empty());

    service.get("site_name").await.unwrap();
    service.get_group_map("website").await.unwrap();
    assert_eq!(
        redis.keys("setting:*").await,
        vec!["setting:group:website".to_string(), "setting:site_name".to_string()]
    );
    assert_eq!(redis.ttl("setting:site_name").await, -1);

    service
        .batch_upsert(vec![SettingInput::new("site_name", "renamed", SettingType::String, "website")])
        .await
        .unwrap();
    assert!(redis.raw("setting:site_name").await.is_none());
    assert!(redis.raw("setting:group:website").await.is_none());

    assert_eq!(service.get("site_name").await.unwrap().value, json!("renamed"));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_configured_expiry_is_applied() {
    let (_db, redis, service) = setup(120).await;

    service
        .batch_upsert(vec![SettingInput::new("smtp_host", "localhost", SettingType::String, "mail")])
        .await
        .unwrap();
    service.get("smtp_host").await.unwrap();

    let ttl = redis.ttl("setting:smtp_host").await;
    assert!((1..=120).contains(&ttl), "ttl was {ttl}");
}
