//! In-process implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::RwLock;

use crate::domain::entities::{Link, LinkUpdate, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::LinkError;

/// Link store held in process memory.
///
/// All writes go through one write lock, which gives the same per-code
/// atomicity as a row-level update in a relational store. Data is lost on
/// restart.
#[derive(Default)]
pub struct MemoryLinkRepository {
    links: RwLock<HashMap<String, Link>>,
}

impl MemoryLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored links, dead ones included.
    pub async fn len(&self) -> usize {
        self.links.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.links.read().await.is_empty()
    }
}

fn sorted_by<K: Ord>(mut links: Vec<Link>, key: impl Fn(&Link) -> K) -> Vec<Link> {
    links.sort_by_key(key);
    links
}

#[async_trait]
impl LinkRepository for MemoryLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, LinkError> {
        let mut links = self.links.write().await;

        match links.entry(new_link.code.clone()) {
            Entry::Occupied(_) => Err(LinkError::already_exists(new_link.code)),
            Entry::Vacant(slot) => Ok(slot.insert(new_link.into_link()).clone()),
        }
    }

    async fn get(&self, code: &str) -> Result<Link, LinkError> {
        self.links
            .read()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| LinkError::not_found(code))
    }

    async fn exists(&self, code: &str) -> Result<bool, LinkError> {
        Ok(self.links.read().await.contains_key(code))
    }

    async fn update(&self, code: &str, update: LinkUpdate) -> Result<Link, LinkError> {
        let mut links = self.links.write().await;

        if let LinkUpdate::Rekey(new_code) = &update {
            if new_code == code {
                return links.get(code).cloned().ok_or_else(|| LinkError::not_found(code));
            }
            if links.contains_key(new_code) {
                return Err(LinkError::already_exists(new_code.as_str()));
            }
            let mut link = links.remove(code).ok_or_else(|| LinkError::not_found(code))?;
            update.apply(&mut link);
            links.insert(new_code.clone(), link.clone());
            return Ok(link);
        }

        let link = links.get_mut(code).ok_or_else(|| LinkError::not_found(code))?;
        update.apply(link);
        Ok(link.clone())
    }

    async fn delete(&self, code: &str) -> Result<(), LinkError> {
        self.links
            .write()
            .await
            .remove(code)
            .map(|_| ())
            .ok_or_else(|| LinkError::not_found(code))
    }

    async fn delete_expired(&self, code: &str, as_of: DateTime<Utc>) -> Result<bool, LinkError> {
        let mut links = self.links.write().await;

        match links.get(code) {
            Some(link) if link.is_expired_at(as_of) => {
                links.remove(code);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<Link>, LinkError> {
        let expired = self
            .links
            .read()
            .await
            .values()
            .filter(|link| link.is_expired_at(as_of))
            .cloned()
            .collect();

        Ok(sorted_by(expired, |link| (link.expires_at, link.code.clone())))
    }

    async fn find_by_target(&self, target_url: &str) -> Result<Vec<Link>, LinkError> {
        let matches = self
            .links
            .read()
            .await
            .values()
            .filter(|link| link.target_url == target_url)
            .cloned()
            .collect();

        Ok(sorted_by(matches, |link| (link.created_at, link.code.clone())))
    }

    async fn most_used(&self, limit: usize) -> Result<Vec<Link>, LinkError> {
        let all = self.links.read().await.values().cloned().collect();
        let mut ranked = sorted_by(all, |link| {
            (std::cmp::Reverse(link.use_count), link.code.clone())
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    async fn health_check(&self) -> bool {
        true
    }
}
