//! Link lifecycle orchestration.
//!
//! Coordinates the code generator, the link store and both cache
//! capabilities. The store is the only source of truth: cache lookups save a
//! store read at most, and every returned target comes from a store snapshot.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::caller::{AccessPolicy, AuthenticatedOnly, Caller};
use crate::domain::entities::{Link, LinkStats, LinkUpdate, NewLink, PopularityEntry};
use crate::domain::repositories::LinkRepository;
use crate::error::LinkError;
use crate::infrastructure::cache::{CacheError, CacheResult, LinkCache, PopularityIndex};
use crate::utils::code_generator::{CodeGenerator, validate_custom_alias};
use crate::utils::url_validator::validate_target_url;

/// Store insertions retried when a generated code is taken between the
/// occupancy check and the insert.
const CREATE_RETRIES: usize = 3;

/// Tunables for [`LinkService`].
#[derive(Debug, Clone, Copy)]
pub struct LinkSettings {
    /// Lifetime given to links created without an explicit deadline.
    pub default_link_ttl: chrono::Duration,
    /// How long a cached snapshot may be served.
    pub cache_ttl: Duration,
    /// Upper bound for a single store call.
    pub store_timeout: Duration,
    /// Upper bound for a single cache call.
    pub cache_timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            default_link_ttl: chrono::Duration::days(15),
            cache_ttl: Duration::from_secs(3600),
            store_timeout: Duration::from_millis(2000),
            cache_timeout: Duration::from_millis(250),
        }
    }
}

/// Input of [`LinkService::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateLink {
    pub target_url: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub custom_alias: Option<String>,
}

impl CreateLink {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.custom_alias = Some(alias.into());
        self
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Backend reachability reported by [`LinkService::health`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceHealth {
    pub store: bool,
    pub cache: bool,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        self.store && self.cache
    }
}

async fn within_store_deadline<T>(
    timeout: Duration,
    call: impl Future<Output = Result<T, LinkError>>,
) -> Result<T, LinkError> {
    tokio::time::timeout(timeout, call).await.unwrap_or_else(|_| {
        Err(LinkError::StoreUnavailable(format!(
            "store call timed out after {}ms",
            timeout.as_millis()
        )))
    })
}

async fn within_cache_deadline<T>(
    timeout: Duration,
    call: impl Future<Output = CacheResult<T>>,
) -> CacheResult<T> {
    tokio::time::timeout(timeout, call)
        .await
        .unwrap_or(Err(CacheError::Timeout))
}

/// Service for creating, resolving and maintaining short links.
///
/// Generic over the store so tests can inject a mock; the server uses
/// `LinkService<dyn LinkRepository>`.
pub struct LinkService<R: LinkRepository + ?Sized> {
    repository: Arc<R>,
    cache: Arc<dyn LinkCache>,
    popularity: Arc<dyn PopularityIndex>,
    generator: CodeGenerator,
    policy: Arc<dyn AccessPolicy>,
    settings: LinkSettings,
}

impl<R: LinkRepository + ?Sized> LinkService<R> {
    /// Creates a service with the default generator and the
    /// [`AuthenticatedOnly`] policy.
    pub fn new(
        repository: Arc<R>,
        cache: Arc<dyn LinkCache>,
        popularity: Arc<dyn PopularityIndex>,
        settings: LinkSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            popularity,
            generator: CodeGenerator::default(),
            policy: Arc::new(AuthenticatedOnly),
            settings,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_generator(mut self, generator: CodeGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    /// Creates a short link.
    ///
    /// Without `expires_at` the link lives for `default_link_ttl` from now.
    /// A custom alias bypasses the generator; a dead link still holding the
    /// alias is purged first so the alias can be reused.
    ///
    /// # Errors
    ///
    /// - [`LinkError::InvalidUrl`] / [`LinkError::InvalidAlias`] on malformed input
    /// - [`LinkError::AliasTaken`] if a live link already uses the alias
    /// - [`LinkError::CapacityExhausted`] if no free code could be found
    pub async fn create(&self, caller: &Caller, request: CreateLink) -> Result<Link, LinkError> {
        validate_target_url(&request.target_url)
            .map_err(|e| LinkError::invalid_url(e.to_string()))?;

        let created_at = Utc::now();
        let expires_at = request
            .expires_at
            .unwrap_or(created_at + self.settings.default_link_ttl);

        let link = match request.custom_alias {
            Some(alias) => {
                self.create_with_alias(alias, request.target_url, created_at, expires_at)
                    .await?
            }
            None => {
                self.create_generated(request.target_url, created_at, expires_at)
                    .await?
            }
        };

        info!(
            code = %link.code,
            custom_alias = link.custom_alias,
            created_by = caller.subject(),
            "Short link created"
        );
        Ok(link)
    }

    async fn create_with_alias(
        &self,
        alias: String,
        target_url: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Link, LinkError> {
        validate_custom_alias(&alias)?;

        match self.store(self.repository.get(&alias)).await {
            Ok(existing) if existing.is_expired_at(created_at) => {
                self.purge(&existing).await?;
            }
            Ok(_) => return Err(LinkError::AliasTaken { alias }),
            Err(LinkError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let new_link = NewLink {
            code: alias.clone(),
            target_url,
            created_at,
            expires_at: Some(expires_at),
            custom_alias: true,
        };

        match self.store(self.repository.create(new_link)).await {
            Err(LinkError::AlreadyExists { .. }) => Err(LinkError::AliasTaken { alias }),
            other => other,
        }
    }

    async fn create_generated(
        &self,
        target_url: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Link, LinkError> {
        let mut last_error = None;

        for _ in 0..CREATE_RETRIES {
            let code = self.free_code().await?;
            let new_link = NewLink {
                code,
                target_url: target_url.clone(),
                created_at,
                expires_at: Some(expires_at),
                custom_alias: false,
            };

            match self.store(self.repository.create(new_link)).await {
                Err(e @ LinkError::AlreadyExists { .. }) => {
                    debug!(error = %e, "Generated code claimed concurrently, retrying");
                    last_error = Some(e);
                }
                other => return other,
            }
        }

        Err(last_error.unwrap_or(LinkError::CapacityExhausted {
            attempts: self.generator.max_attempts(),
        }))
    }

    /// Draws a code the store does not hold yet.
    async fn free_code(&self) -> Result<String, LinkError> {
        let repository = &self.repository;
        let timeout = self.settings.store_timeout;

        self.generator
            .generate(|candidate| async move {
                within_store_deadline(timeout, repository.exists(&candidate)).await
            })
            .await
    }

    /// Resolves a code to its target and records one use.
    ///
    /// The cache may answer the lookup; the use is always recorded with a
    /// single atomic store update, and the returned target is taken from the
    /// store's post-update snapshot.
    ///
    /// # Errors
    ///
    /// - [`LinkError::NotFound`] if the code is absent, including when a
    ///   concurrent delete wins
    /// - [`LinkError::Expired`] if the link was dead; it is purged
    /// - [`LinkError::StoreUnavailable`] if the store fails or times out
    pub async fn resolve(&self, code: &str) -> Result<String, LinkError> {
        let now = Utc::now();

        let cached = match self.cached(self.cache.get(code)).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(%code, error = %e, "Cache lookup failed, reading from store");
                None
            }
        };

        // A dead snapshot may describe an earlier record under this code, so
        // only the store decides whether the current one is dead.
        let (snapshot, cache_hit) = match cached {
            Some(link) if !link.is_expired_at(now) => (link, true),
            Some(_) => {
                self.drop_snapshot(code).await;
                (self.store(self.repository.get(code)).await?, false)
            }
            None => (self.store(self.repository.get(code)).await?, false),
        };

        if snapshot.is_expired_at(now) {
            self.purge(&snapshot).await?;
            return Err(LinkError::expired(code));
        }

        let updated = match self
            .store(self.repository.update(code, LinkUpdate::RecordUse { at: now }))
            .await
        {
            Ok(link) => link,
            Err(e @ LinkError::NotFound { .. }) => {
                self.drop_snapshot(code).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        if !cache_hit {
            self.remember(&updated).await;
        }
        self.bump(&updated.code, updated.use_count).await;

        debug!(%code, use_count = updated.use_count, "Short link resolved");
        Ok(updated.target_url)
    }

    /// Points a live link at a new target.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Forbidden`] if the caller may not mutate links
    /// - [`LinkError::InvalidUrl`] if the new target is malformed
    /// - [`LinkError::NotFound`] / [`LinkError::Expired`] as for [`Self::resolve`]
    pub async fn update(
        &self,
        caller: &Caller,
        code: &str,
        new_target_url: &str,
    ) -> Result<Link, LinkError> {
        self.authorize(caller)?;
        validate_target_url(new_target_url).map_err(|e| LinkError::invalid_url(e.to_string()))?;

        self.live_link(code).await?;

        let updated = self
            .store(
                self.repository
                    .update(code, LinkUpdate::SetTarget(new_target_url.to_string())),
            )
            .await?;

        self.drop_snapshot(code).await;
        self.remember(&updated).await;

        info!(%code, updated_by = caller.subject(), "Short link target updated");
        Ok(updated)
    }

    /// Moves a live generated link to a fresh code.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Forbidden`] if the caller may not mutate links
    /// - [`LinkError::AliasProtected`] if the link uses a custom alias
    /// - [`LinkError::NotFound`] / [`LinkError::Expired`] as for [`Self::resolve`]
    pub async fn regenerate(&self, caller: &Caller, code: &str) -> Result<Link, LinkError> {
        self.authorize(caller)?;

        let link = self.live_link(code).await?;
        if link.custom_alias {
            return Err(LinkError::AliasProtected {
                code: code.to_string(),
            });
        }

        let mut last_error = None;
        let mut rekeyed = None;
        for _ in 0..CREATE_RETRIES {
            let new_code = self.free_code().await?;
            match self
                .store(self.repository.update(code, LinkUpdate::Rekey(new_code)))
                .await
            {
                Ok(link) => {
                    rekeyed = Some(link);
                    break;
                }
                Err(e @ LinkError::AlreadyExists { .. }) => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }
        let rekeyed = match (rekeyed, last_error) {
            (Some(link), _) => link,
            (None, Some(e)) => return Err(e),
            (None, None) => {
                return Err(LinkError::CapacityExhausted {
                    attempts: self.generator.max_attempts(),
                });
            }
        };

        self.forget(code).await;
        if rekeyed.has_been_used() {
            self.bump(&rekeyed.code, rekeyed.use_count).await;
        }
        self.remember(&rekeyed).await;

        info!(
            old_code = %code,
            new_code = %rekeyed.code,
            updated_by = caller.subject(),
            "Short link regenerated"
        );
        Ok(rekeyed)
    }

    /// Deletes a link, dead or alive.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Forbidden`] if the caller may not mutate links
    /// - [`LinkError::NotFound`] if the code is absent
    pub async fn delete(&self, caller: &Caller, code: &str) -> Result<(), LinkError> {
        self.authorize(caller)?;

        self.store(self.repository.delete(code)).await?;
        self.forget(code).await;

        info!(%code, deleted_by = caller.subject(), "Short link deleted");
        Ok(())
    }

    /// Returns the usage snapshot of a live link.
    ///
    /// Always read from the store, so the count is exact.
    pub async fn stats(&self, code: &str) -> Result<LinkStats, LinkError> {
        self.live_link(code).await.map(LinkStats::from)
    }

    /// Lists live links whose target is exactly `target_url`.
    ///
    /// Dead matches are purged on the way.
    pub async fn search(&self, target_url: &str) -> Result<Vec<Link>, LinkError> {
        let now = Utc::now();
        let matches = self
            .store(self.repository.find_by_target(target_url))
            .await?;

        let (dead, live): (Vec<Link>, Vec<Link>) = matches
            .into_iter()
            .partition(|link| link.is_expired_at(now));

        for link in &dead {
            self.purge(link).await?;
        }

        Ok(live)
    }

    /// Returns up to `n` codes from the popularity ranking, highest first.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::CacheUnavailable`] if the ranking cannot be read;
    /// there is no store fallback for this query.
    pub async fn popular(&self, n: usize) -> Result<Vec<PopularityEntry>, LinkError> {
        self.cached(self.popularity.top_n(n))
            .await
            .map_err(|e| LinkError::CacheUnavailable(e.to_string()))
    }

    /// Lists dead links still present in the store without purging them.
    pub async fn list_expired(&self) -> Result<Vec<Link>, LinkError> {
        self.store(self.repository.list_expired(Utc::now())).await
    }

    /// Deletes every dead link and returns how many were removed.
    pub async fn purge_expired(&self) -> Result<usize, LinkError> {
        let expired = self.list_expired().await?;

        let mut purged = 0;
        for link in &expired {
            if self.purge(link).await? {
                purged += 1;
            }
        }

        if purged > 0 {
            info!(count = purged, "Expired links purged");
        }
        Ok(purged)
    }

    /// Replaces the popularity ranking with the `limit` most used live links.
    ///
    /// Returns the number of ranked codes.
    pub async fn rebuild_popularity(&self, limit: usize) -> Result<usize, LinkError> {
        let now = Utc::now();
        let entries: Vec<PopularityEntry> = self
            .store(self.repository.most_used(limit))
            .await?
            .into_iter()
            .filter(|link| link.has_been_used() && !link.is_expired_at(now))
            .map(|link| PopularityEntry::new(link.code, link.use_count))
            .collect();
        let count = entries.len();

        self.cached(self.popularity.rebuild(entries))
            .await
            .map_err(|e| LinkError::CacheUnavailable(e.to_string()))?;

        info!(count, "Popularity ranking rebuilt");
        Ok(count)
    }

    /// Checks store and cache reachability.
    pub async fn health(&self) -> ServiceHealth {
        let store = tokio::time::timeout(self.settings.store_timeout, self.repository.health_check())
            .await
            .unwrap_or(false);
        let cache = tokio::time::timeout(self.settings.cache_timeout, self.cache.health_check())
            .await
            .unwrap_or(false);

        ServiceHealth { store, cache }
    }

    fn authorize(&self, caller: &Caller) -> Result<(), LinkError> {
        if self.policy.can_mutate(caller) {
            Ok(())
        } else {
            Err(LinkError::Forbidden)
        }
    }

    /// Fetches a link from the store, purging it if dead.
    async fn live_link(&self, code: &str) -> Result<Link, LinkError> {
        let link = self.store(self.repository.get(code)).await?;

        if link.is_expired_at(Utc::now()) {
            self.purge(&link).await?;
            return Err(LinkError::expired(code));
        }
        Ok(link)
    }

    /// Deletes the dead record observed as `link` and everything cached about it.
    ///
    /// The store only removes the record under `link.code` if it is still
    /// dead, so a live link created under the same code in the meantime
    /// survives along with its ranking entry. Returns whether a record was
    /// removed; `false` means a concurrent purge or re-creation got there first.
    async fn purge(&self, link: &Link) -> Result<bool, LinkError> {
        let removed = self
            .store(self.repository.delete_expired(&link.code, Utc::now()))
            .await?;

        if removed {
            self.forget(&link.code).await;
            info!(code = %link.code, expires_at = ?link.expires_at, "Expired link purged");
        } else {
            self.drop_snapshot(&link.code).await;
            debug!(code = %link.code, "Expired link already replaced or purged");
        }
        Ok(removed)
    }

    async fn store<T>(
        &self,
        call: impl Future<Output = Result<T, LinkError>>,
    ) -> Result<T, LinkError> {
        within_store_deadline(self.settings.store_timeout, call).await
    }

    async fn cached<T>(&self, call: impl Future<Output = CacheResult<T>>) -> CacheResult<T> {
        within_cache_deadline(self.settings.cache_timeout, call).await
    }

    async fn remember(&self, link: &Link) {
        if let Err(e) = self
            .cached(self.cache.put(link, self.settings.cache_ttl))
            .await
        {
            warn!(code = %link.code, error = %e, "Cache put failed");
        }
    }

    async fn drop_snapshot(&self, code: &str) {
        if let Err(e) = self.cached(self.cache.invalidate(code)).await {
            warn!(%code, error = %e, "Cache invalidate failed");
        }
    }

    async fn bump(&self, code: &str, score: i64) {
        if let Err(e) = self.cached(self.popularity.bump(code, score)).await {
            warn!(%code, error = %e, "Popularity bump failed");
        }
    }

    /// Removes both the snapshot and the ranking entry of `code`.
    async fn forget(&self, code: &str) {
        self.drop_snapshot(code).await;
        if let Err(e) = self.cached(self.popularity.remove(code)).await {
            warn!(%code, error = %e, "Popularity remove failed");
        }
    }
}
