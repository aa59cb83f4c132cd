mod common;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use shortcode_service::application::services::{CreateLink, LinkService, LinkSettings};
use shortcode_service::domain::caller::Caller;
use shortcode_service::domain::entities::{Link, LinkUpdate, NewLink};
use shortcode_service::domain::repositories::LinkRepository;
use shortcode_service::infrastructure::cache::{LinkCache, MemoryLinkCache, MemoryPopularityIndex};
use shortcode_service::infrastructure::persistence::MemoryLinkRepository;
use shortcode_service::error::LinkError;
use shortcode_service::utils::code_generator::{ALPHABET, CODE_LENGTH};

fn admin() -> Caller {
    Caller::authenticated("token-admin")
}

fn expired_request(url: &str) -> CreateLink {
    CreateLink::new(url).expiring_at(Utc::now() - Duration::seconds(1))
}

#[tokio::test]
async fn test_create_resolve_and_count_uses() {
    let (service, _repo) = common::create_test_service();

    let link = service
        .create(&Caller::Guest, CreateLink::new("https://example.com/docs"))
        .await
        .unwrap();

    assert_eq!(link.code.len(), CODE_LENGTH);
    assert!(link.code.bytes().all(|b| ALPHABET.contains(&b)));
    assert!(!link.custom_alias);
    assert_eq!(link.use_count, 0);

    for _ in 0..3 {
        let target = service.resolve(&link.code).await.unwrap();
        assert_eq!(target, "https://example.com/docs");
    }

    let stats = service.stats(&link.code).await.unwrap();
    assert_eq!(stats.use_count, 3);
    assert!(stats.last_used_at.is_some());
}

#[tokio::test]
async fn test_default_expiry_is_fifteen_days() {
    let (service, _repo) = common::create_test_service();

    let before = Utc::now();
    let link = service
        .create(&Caller::Guest, CreateLink::new("https://example.com"))
        .await
        .unwrap();

    let expires_at = link.expires_at.unwrap();
    assert!(expires_at >= before + Duration::days(15));
    assert!(expires_at <= Utc::now() + Duration::days(15));
}

#[tokio::test]
async fn test_expired_link_is_gone_then_not_found() {
    let (service, repo) = common::create_test_service();

    let link = service
        .create(&Caller::Guest, expired_request("https://example.com/old"))
        .await
        .unwrap();

    let first = service.resolve(&link.code).await;
    assert_eq!(first, Err(LinkError::expired(&link.code)));
    assert!(repo.is_empty().await);

    let second = service.resolve(&link.code).await;
    assert_eq!(second, Err(LinkError::not_found(&link.code)));
}

#[tokio::test]
async fn test_resolve_unknown_code() {
    let (service, _repo) = common::create_test_service();

    let result = service.resolve("nope00").await;
    assert!(matches!(result, Err(LinkError::NotFound { .. })));
}

#[tokio::test]
async fn test_custom_alias_taken_by_live_link() {
    let (service, _repo) = common::create_test_service();

    let first = service
        .create(
            &Caller::Guest,
            CreateLink::new("https://example.com/a").with_alias("mine"),
        )
        .await
        .unwrap();
    assert_eq!(first.code, "mine");
    assert!(first.custom_alias);

    let second = service
        .create(
            &Caller::Guest,
            CreateLink::new("https://example.com/b").with_alias("mine"),
        )
        .await;

    assert_eq!(
        second,
        Err(LinkError::AliasTaken {
            alias: "mine".to_string()
        })
    );
    assert_eq!(service.resolve("mine").await.unwrap(), "https://example.com/a");
}

#[tokio::test]
async fn test_custom_alias_reused_after_expiry() {
    let (service, _repo) = common::create_test_service();

    service
        .create(
            &Caller::Guest,
            expired_request("https://example.com/old").with_alias("promo"),
        )
        .await
        .unwrap();

    let fresh = service
        .create(
            &Caller::Guest,
            CreateLink::new("https://example.com/new").with_alias("promo"),
        )
        .await
        .unwrap();

    assert_eq!(fresh.code, "promo");
    assert_eq!(fresh.use_count, 0);
    assert_eq!(service.resolve("promo").await.unwrap(), "https://example.com/new");
}

#[tokio::test]
async fn test_reserved_alias_rejected() {
    let (service, _repo) = common::create_test_service();

    let result = service
        .create(
            &Caller::Guest,
            CreateLink::new("https://example.com").with_alias("shorten"),
        )
        .await;

    assert!(matches!(result, Err(LinkError::InvalidAlias { .. })));
}

#[tokio::test]
async fn test_invalid_target_rejected() {
    let (service, repo) = common::create_test_service();

    let result = service
        .create(&Caller::Guest, CreateLink::new("ftp://example.com/file"))
        .await;

    assert!(matches!(result, Err(LinkError::InvalidUrl { .. })));
    assert!(repo.is_empty().await);
}

#[tokio::test]
async fn test_popular_orders_by_use_count() {
    let (service, _repo) = common::create_test_service();

    let busy = service
        .create(&Caller::Guest, CreateLink::new("https://example.com/busy"))
        .await
        .unwrap();
    let quiet = service
        .create(&Caller::Guest, CreateLink::new("https://example.com/quiet"))
        .await
        .unwrap();
    service
        .create(&Caller::Guest, CreateLink::new("https://example.com/idle"))
        .await
        .unwrap();

    for _ in 0..5 {
        service.resolve(&busy.code).await.unwrap();
    }
    for _ in 0..3 {
        service.resolve(&quiet.code).await.unwrap();
    }

    let top = service.popular(10).await.unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].code, busy.code);
    assert_eq!(top[0].score, 5);
    assert_eq!(top[1].code, quiet.code);
    assert_eq!(top[1].score, 3);

    let top_one = service.popular(1).await.unwrap();
    assert_eq!(top_one.len(), 1);
    assert_eq!(top_one[0].code, busy.code);
}

#[tokio::test]
async fn test_update_is_visible_to_next_resolve() {
    let (service, _repo) = common::create_test_service();

    let link = service
        .create(&Caller::Guest, CreateLink::new("https://example.com/v1"))
        .await
        .unwrap();
    // Prime the cache with the old target.
    service.resolve(&link.code).await.unwrap();

    let updated = service
        .update(&admin(), &link.code, "https://example.com/v2")
        .await
        .unwrap();
    assert_eq!(updated.target_url, "https://example.com/v2");
    assert_eq!(updated.use_count, 1);

    assert_eq!(
        service.resolve(&link.code).await.unwrap(),
        "https://example.com/v2"
    );
}

#[tokio::test]
async fn test_delete_is_visible_to_next_resolve() {
    let (service, _repo) = common::create_test_service();

    let link = service
        .create(&Caller::Guest, CreateLink::new("https://example.com"))
        .await
        .unwrap();
    service.resolve(&link.code).await.unwrap();

    service.delete(&admin(), &link.code).await.unwrap();

    assert!(matches!(
        service.resolve(&link.code).await,
        Err(LinkError::NotFound { .. })
    ));
    assert!(service.popular(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_guest_cannot_mutate() {
    let (service, _repo) = common::create_test_service();

    let link = service
        .create(&Caller::Guest, CreateLink::new("https://example.com"))
        .await
        .unwrap();

    assert_eq!(
        service
            .update(&Caller::Guest, &link.code, "https://example.org")
            .await,
        Err(LinkError::Forbidden)
    );
    assert_eq!(
        service.regenerate(&Caller::Guest, &link.code).await,
        Err(LinkError::Forbidden)
    );
    assert_eq!(
        service.delete(&Caller::Guest, &link.code).await,
        Err(LinkError::Forbidden)
    );

    assert_eq!(
        service.resolve(&link.code).await.unwrap(),
        "https://example.com"
    );
}

#[tokio::test]
async fn test_regenerate_moves_link_and_keeps_usage() {
    let (service, _repo) = common::create_test_service();

    let link = service
        .create(&Caller::Guest, CreateLink::new("https://example.com/moved"))
        .await
        .unwrap();
    service.resolve(&link.code).await.unwrap();
    service.resolve(&link.code).await.unwrap();

    let moved = service.regenerate(&admin(), &link.code).await.unwrap();

    assert_ne!(moved.code, link.code);
    assert_eq!(moved.use_count, 2);
    assert_eq!(moved.created_at, link.created_at);
    assert!(matches!(
        service.resolve(&link.code).await,
        Err(LinkError::NotFound { .. })
    ));
    assert_eq!(
        service.resolve(&moved.code).await.unwrap(),
        "https://example.com/moved"
    );

    let top = service.popular(10).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].code, moved.code);
    assert_eq!(top[0].score, 3);
}

#[tokio::test]
async fn test_regenerate_refuses_custom_alias() {
    let (service, _repo) = common::create_test_service();

    service
        .create(
            &Caller::Guest,
            CreateLink::new("https://example.com").with_alias("keep-me"),
        )
        .await
        .unwrap();

    let result = service.regenerate(&admin(), "keep-me").await;
    assert!(matches!(result, Err(LinkError::AliasProtected { .. })));
}

#[tokio::test]
async fn test_search_returns_live_matches_only() {
    let (service, repo) = common::create_test_service();

    let live = service
        .create(&Caller::Guest, CreateLink::new("https://example.com/same"))
        .await
        .unwrap();
    service
        .create(&Caller::Guest, expired_request("https://example.com/same"))
        .await
        .unwrap();
    service
        .create(&Caller::Guest, CreateLink::new("https://example.com/other"))
        .await
        .unwrap();

    let found = service.search("https://example.com/same").await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].code, live.code);
    // The dead duplicate was purged during the search.
    assert_eq!(repo.len().await, 2);
}

#[tokio::test]
async fn test_list_then_purge_expired() {
    let (service, repo) = common::create_test_service();

    for path in ["a", "b"] {
        service
            .create(
                &Caller::Guest,
                expired_request(&format!("https://example.com/{path}")),
            )
            .await
            .unwrap();
    }
    service
        .create(&Caller::Guest, CreateLink::new("https://example.com/live"))
        .await
        .unwrap();

    assert_eq!(service.list_expired().await.unwrap().len(), 2);
    // Listing alone deletes nothing.
    assert_eq!(repo.len().await, 3);

    assert_eq!(service.purge_expired().await.unwrap(), 2);
    assert_eq!(repo.len().await, 1);
    assert!(service.list_expired().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rebuild_popularity_from_store() {
    let (service, _repo) = common::create_test_service();

    let link = service
        .create(&Caller::Guest, CreateLink::new("https://example.com"))
        .await
        .unwrap();
    service
        .create(&Caller::Guest, CreateLink::new("https://example.com/unused"))
        .await
        .unwrap();
    for _ in 0..4 {
        service.resolve(&link.code).await.unwrap();
    }

    let ranked = service.rebuild_popularity(100).await.unwrap();
    assert_eq!(ranked, 1);

    let top = service.popular(10).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].code, link.code);
    assert_eq!(top[0].score, 4);
}

#[tokio::test]
async fn test_health_reports_in_memory_backends() {
    let (service, _repo) = common::create_test_service();

    let health = service.health().await;
    assert!(health.store);
    assert!(health.cache);
    assert!(health.is_healthy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolves_are_all_counted() {
    let (service, repo) = common::create_test_service();

    let link = service
        .create(&Caller::Guest, CreateLink::new("https://example.com/hot"))
        .await
        .unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..64 {
        let service = Arc::clone(&service);
        let code = link.code.clone();
        tasks.spawn(async move { service.resolve(&code).await });
    }
    while let Some(result) = tasks.join_next().await {
        assert_eq!(result.unwrap().unwrap(), "https://example.com/hot");
    }

    let stored = repo.get(&link.code).await.unwrap();
    assert_eq!(stored.use_count, 64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_alias_creation_has_one_winner() {
    let (service, repo) = common::create_test_service();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let service = Arc::clone(&service);
        tasks.spawn(async move {
            service
                .create(
                    &Caller::Guest,
                    CreateLink::new(format!("https://example.com/{i}")).with_alias("race"),
                )
                .await
        });
    }

    let mut winners = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(link) => {
                assert_eq!(link.code, "race");
                winners += 1;
            }
            Err(e) => assert_eq!(
                e,
                LinkError::AliasTaken {
                    alias: "race".to_string()
                }
            ),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(repo.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creations_get_distinct_codes() {
    let (service, repo) = common::create_test_service();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..50 {
        let service = Arc::clone(&service);
        tasks.spawn(async move {
            service
                .create(&Caller::Guest, CreateLink::new("https://example.com"))
                .await
        });
    }

    let mut codes = std::collections::HashSet::new();
    while let Some(result) = tasks.join_next().await {
        codes.insert(result.unwrap().unwrap().code);
    }

    assert_eq!(codes.len(), 50);
    assert_eq!(repo.len().await, 50);
}

/// In-memory store whose first conditional delete parks until released.
struct GatedRepository {
    inner: MemoryLinkRepository,
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedRepository {
    fn new() -> Self {
        Self {
            inner: MemoryLinkRepository::new(),
            armed: AtomicBool::new(true),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl LinkRepository for GatedRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, LinkError> {
        self.inner.create(new_link).await
    }

    async fn get(&self, code: &str) -> Result<Link, LinkError> {
        self.inner.get(code).await
    }

    async fn exists(&self, code: &str) -> Result<bool, LinkError> {
        self.inner.exists(code).await
    }

    async fn update(&self, code: &str, update: LinkUpdate) -> Result<Link, LinkError> {
        self.inner.update(code, update).await
    }

    async fn delete(&self, code: &str) -> Result<(), LinkError> {
        self.inner.delete(code).await
    }

    async fn delete_expired(&self, code: &str, as_of: DateTime<Utc>) -> Result<bool, LinkError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.delete_expired(code, as_of).await
    }

    async fn list_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<Link>, LinkError> {
        self.inner.list_expired(as_of).await
    }

    async fn find_by_target(&self, target_url: &str) -> Result<Vec<Link>, LinkError> {
        self.inner.find_by_target(target_url).await
    }

    async fn most_used(&self, limit: usize) -> Result<Vec<Link>, LinkError> {
        self.inner.most_used(limit).await
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_lazy_purge_spares_alias_recreated_meanwhile() {
    let repo = Arc::new(GatedRepository::new());
    let service = Arc::new(LinkService::new(
        Arc::clone(&repo),
        Arc::new(MemoryLinkCache::new(100)),
        Arc::new(MemoryPopularityIndex::new()),
        LinkSettings::default(),
    ));

    service
        .create(
            &Caller::Guest,
            expired_request("https://old.com").with_alias("mine"),
        )
        .await
        .unwrap();

    let stale_reader = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.resolve("mine").await })
    };
    repo.entered.notified().await;

    // The reader saw the dead record and is parked before its delete.
    let fresh = service
        .create(
            &Caller::Guest,
            CreateLink::new("https://new.com").with_alias("mine"),
        )
        .await
        .unwrap();
    assert_eq!(fresh.target_url, "https://new.com");

    repo.release.notify_one();
    let first = stale_reader.await.unwrap();
    assert_eq!(first, Err(LinkError::expired("mine")));

    assert!(repo.exists("mine").await.unwrap());
    assert_eq!(service.resolve("mine").await.unwrap(), "https://new.com");
}

#[tokio::test]
async fn test_dead_cached_snapshot_does_not_purge_live_record() {
    let repo = Arc::new(MemoryLinkRepository::new());
    let cache = Arc::new(MemoryLinkCache::new(100));
    let service = LinkService::new(
        Arc::clone(&repo),
        cache.clone(),
        Arc::new(MemoryPopularityIndex::new()),
        LinkSettings::default(),
    );

    let mut link = service
        .create(
            &Caller::Guest,
            CreateLink::new("https://new.com").with_alias("mine"),
        )
        .await
        .unwrap();

    // Leftover snapshot of an earlier, dead record under the same alias.
    link.target_url = "https://old.com".to_string();
    link.expires_at = Some(Utc::now() - Duration::minutes(1));
    cache
        .put(&link, std::time::Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(service.resolve("mine").await.unwrap(), "https://new.com");
    assert_eq!(repo.len().await, 1);
    assert_eq!(repo.get("mine").await.unwrap().use_count, 1);
}
