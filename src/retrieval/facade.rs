use crate::discord::{
    ChannelTarget, DiscordClient, MAX_PAGE_SIZE, Message, Role, ServerId, ServerInfo, Transport,
};
use crate::error::Result;
use crate::logging::{Timer, log_error};
use crate::metadata::{CacheStats, MetadataCache};
use crate::retrieval::enrich::Enricher;
use crate::retrieval::paginate::{Paginator, StopReason};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONCURRENT_REQUESTS: usize = 5;

#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    /// Maximum messages to return; `None` walks the whole history
    pub limit: Option<usize>,
    /// Member lookups in flight per page
    pub concurrent_requests: usize,
    pub page_size: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            limit: None,
            concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

/// Everything one run produced, for the exporter
#[derive(Debug, Clone)]
pub struct Retrieval {
    pub channel_name: String,
    pub server: Option<ServerInfo>,
    pub server_id: Option<ServerId>,
    pub roles: Vec<Role>,
    /// Oldest first
    pub messages: Vec<Message>,
    pub stop: StopReason,
    pub cache_stats: CacheStats,
}

pub struct Retriever<T> {
    client: DiscordClient<T>,
    options: RetrievalOptions,
}

impl<T: Transport> Retriever<T> {
    pub fn new(client: DiscordClient<T>, options: RetrievalOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &DiscordClient<T> {
        &self.client
    }

    /// Run one full retrieval against `target`
    pub async fn retrieve(
        &self,
        target: &ChannelTarget,
        cancel: &CancellationToken,
    ) -> Result<Retrieval> {
        let _timer = Timer::new("retrieve");
        let channel_id = &target.channel_id;
        let cache = MetadataCache::new();

        tracing::info!(channel_id = %channel_id, "Fetching channel info");
        let channel = self.client.get_channel(channel_id).await.inspect_err(|e| {
            log_error("get_channel", e);
        })?;
        let channel_name = channel.display_name();

        let server_id = target.server_id.clone().or_else(|| {
            let derived = channel.guild_id.clone();
            if let Some(server_id) = &derived {
                tracing::info!(server_id = %server_id, "Resolved server from channel info");
            }
            derived
        });

        let (server, roles) = match &server_id {
            Some(server_id) => (
                self.fetch_server(server_id).await,
                self.fetch_roles(server_id, &cache).await,
            ),
            None => (None, Vec::new()),
        };

        let enricher = Enricher::new(&self.client, &cache, self.options.concurrent_requests);
        let mut paginator = Paginator::new(&self.client)
            .with_limit(self.options.limit)
            .with_page_size(self.options.page_size);
        if let Some(server_id) = &server_id {
            if !roles.is_empty() {
                paginator = paginator.with_enricher(&enricher, server_id.clone());
            }
        }

        let harvest = paginator.run(channel_id, cancel).await?;

        let mut messages = harvest.messages;
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

        if messages.is_empty() {
            tracing::info!(channel = %channel_name, "No messages retrieved");
        }
        match &harvest.stop {
            StopReason::Aborted(cause) => tracing::warn!(
                channel = %channel_name,
                retrieved = messages.len(),
                cause = %cause,
                "Retrieval incomplete, returning partial result"
            ),
            StopReason::Cancelled => tracing::warn!(
                channel = %channel_name,
                retrieved = messages.len(),
                "Retrieval cancelled, returning partial result"
            ),
            _ => tracing::info!(
                channel = %channel_name,
                retrieved = messages.len(),
                "Retrieval complete"
            ),
        }
        cache.log_stats();

        Ok(Retrieval {
            channel_name,
            server,
            server_id,
            roles,
            messages,
            stop: harvest.stop,
            cache_stats: cache.stats(),
        })
    }

    async fn fetch_server(&self, server_id: &ServerId) -> Option<ServerInfo> {
        match self.client.get_server(server_id).await {
            Ok(server) => {
                tracing::info!(server_id = %server_id, server = %server.name, "Fetched server info");
                Some(server)
            }
            Err(e) => {
                tracing::warn!(server_id = %server_id, error = %e, "Failed to fetch server info");
                None
            }
        }
    }

    async fn fetch_roles(&self, server_id: &ServerId, cache: &MetadataCache) -> Vec<Role> {
        if let Some(roles) = cache.roles(server_id) {
            return roles.as_ref().clone();
        }

        match self.client.get_roles(server_id).await {
            Ok(roles) => {
                tracing::info!(server_id = %server_id, roles = roles.len(), "Fetched server roles");
                cache.put_roles(server_id, roles).as_ref().clone()
            }
            Err(e) => {
                tracing::warn!(
                    server_id = %server_id,
                    error = %e,
                    "Failed to fetch server roles, messages will not be enriched"
                );
                Vec::new()
            }
        }
    }
}
