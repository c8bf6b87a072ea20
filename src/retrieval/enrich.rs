//! Enrichment stage: attach server role ids to message authors

use crate::discord::{DiscordClient, Member, Message, RoleId, ServerId, Transport, UserId};
use crate::error::{Result, ScraperError};
use crate::metadata::MetadataCache;
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Per-batch enrichment counts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// Distinct authors fetched successfully in this batch
    pub fetched: usize,
    /// Distinct authors already cached
    pub cached: usize,
    /// Distinct authors whose lookup failed
    pub failed: usize,
}

/// Best-effort member lookups under a concurrency cap
///
/// Role data is display-only, so a failed lookup leaves that author's role set
/// empty and never fails the batch. The one exception is a rejected token:
/// `Unauthorized` cancels the remaining lookups and is returned.
pub struct Enricher<'a, T> {
    client: &'a DiscordClient<T>,
    cache: &'a MetadataCache,
    limiter: Semaphore,
}

impl<'a, T: Transport> Enricher<'a, T> {
    pub fn new(client: &'a DiscordClient<T>, cache: &'a MetadataCache, concurrency: usize) -> Self {
        Self {
            client,
            cache,
            limiter: Semaphore::new(concurrency.max(1)),
        }
    }

    /// Enrich one page; returns once every lookup has resolved
    pub async fn enrich(
        &self,
        server_id: &ServerId,
        messages: &mut [Message],
    ) -> Result<EnrichmentReport> {
        let mut report = EnrichmentReport::default();
        let mut resolved: HashMap<UserId, Option<Arc<Member>>> = HashMap::new();
        let mut missing: Vec<UserId> = Vec::new();

        // One cache lookup, and at most one fetch, per distinct author
        for message in messages.iter() {
            let author = &message.author.id;
            if resolved.contains_key(author) {
                continue;
            }
            let cached = self.cache.member(server_id, author);
            if cached.is_some() {
                report.cached += 1;
            } else {
                missing.push(author.clone());
            }
            resolved.insert(author.clone(), cached);
        }

        let outcomes = try_join_all(
            missing
                .iter()
                .map(|user_id| self.fetch_member(server_id, user_id)),
        )
        .await?;

        for (user_id, member) in missing.into_iter().zip(outcomes) {
            if member.is_some() {
                report.fetched += 1;
            } else {
                report.failed += 1;
            }
            resolved.insert(user_id, member);
        }

        for message in messages.iter_mut() {
            message.author.roles = roles_of(&resolved, &message.author.id);
        }

        tracing::debug!(
            server_id = %server_id,
            messages = messages.len(),
            fetched = report.fetched,
            cached = report.cached,
            failed = report.failed,
            "Page enriched"
        );

        Ok(report)
    }

    async fn fetch_member(
        &self,
        server_id: &ServerId,
        user_id: &UserId,
    ) -> Result<Option<Arc<Member>>> {
        let Ok(_permit) = self.limiter.acquire().await else {
            return Ok(None);
        };

        match self.client.get_member(server_id, user_id).await {
            Ok(member) => Ok(Some(self.cache.put_member(server_id, user_id, member))),
            Err(e @ ScraperError::Unauthorized { .. }) => Err(e),
            Err(e) => {
                tracing::debug!(
                    user_id = %user_id,
                    error = %e,
                    "Failed to fetch member roles, leaving them empty"
                );
                Ok(None)
            }
        }
    }
}

fn roles_of(resolved: &HashMap<UserId, Option<Arc<Member>>>, user_id: &UserId) -> Vec<RoleId> {
    resolved
        .get(user_id)
        .and_then(Option::as_ref)
        .map(|member| member.roles.clone())
        .unwrap_or_default()
}
