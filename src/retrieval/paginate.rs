//! Pagination engine: walk a channel's history newest to oldest

use crate::discord::{
    ChannelId, DiscordClient, MAX_PAGE_SIZE, Message, MessageId, ServerId, Transport,
};
use crate::error::Result;
use crate::logging::{Timer, log_error};
use crate::retrieval::enrich::Enricher;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SLOW_PAGE: Duration = Duration::from_secs(10);

/// Why pagination stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Empty or short page: the beginning of the channel was reached
    Exhausted,
    /// The caller's limit was reached
    LimitReached,
    /// A later page failed terminally; earlier pages are kept
    Aborted(String),
    /// The operator interrupted the run
    Cancelled,
}

impl StopReason {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Exhausted | Self::LimitReached)
    }
}

/// Messages accumulated by one pagination run, newest first
#[derive(Debug, Clone)]
pub struct Harvest {
    pub messages: Vec<Message>,
    pub pages: usize,
    pub stop: StopReason,
}

pub struct Paginator<'a, T> {
    client: &'a DiscordClient<T>,
    enricher: Option<(&'a Enricher<'a, T>, ServerId)>,
    page_size: usize,
    limit: Option<usize>,
}

impl<'a, T: Transport> Paginator<'a, T> {
    pub fn new(client: &'a DiscordClient<T>) -> Self {
        Self {
            client,
            enricher: None,
            page_size: MAX_PAGE_SIZE,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Enrich every non-empty page against `server_id` before accumulating it
    pub fn with_enricher(mut self, enricher: &'a Enricher<'a, T>, server_id: ServerId) -> Self {
        self.enricher = Some((enricher, server_id));
        self
    }

    /// Fetch pages until exhausted, limited, aborted or cancelled
    ///
    /// Auth failures, a rejected token during enrichment, and any terminal
    /// failure of the first page are returned as errors. Later failures stop
    /// the walk and keep what was accumulated.
    pub async fn run(&self, channel_id: &ChannelId, cancel: &CancellationToken) -> Result<Harvest> {
        let mut messages: Vec<Message> = Vec::new();
        let mut cursor: Option<MessageId> = None;
        let mut pages = 0;

        if self.limit == Some(0) {
            return Ok(Harvest {
                messages,
                pages,
                stop: StopReason::LimitReached,
            });
        }

        let stop = loop {
            let request_size = match self.limit {
                Some(limit) => self.page_size.min(limit - messages.len()),
                None => self.page_size,
            };

            let _timer = Timer::new("fetch_page").slow_after(SLOW_PAGE);
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => break StopReason::Cancelled,
                result = self.client.get_messages(channel_id, request_size, cursor.as_ref()) => result,
            };

            let mut page = match fetched {
                Ok(page) => page,
                Err(e) if e.is_auth() || pages == 0 => {
                    log_error("get_messages", &e);
                    return Err(e);
                }
                Err(e) => {
                    log_error("get_messages", &e);
                    tracing::warn!(
                        channel_id = %channel_id,
                        kept = messages.len(),
                        "Pagination aborted, keeping messages fetched so far"
                    );
                    break StopReason::Aborted(e.to_string());
                }
            };
            pages += 1;

            if page.is_empty() {
                if pages == 1 {
                    tracing::info!(channel_id = %channel_id, "Channel has no messages");
                }
                break StopReason::Exhausted;
            }
            let page_len = page.len();

            if let Some((enricher, server_id)) = &self.enricher {
                let enriched = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break StopReason::Cancelled,
                    result = enricher.enrich(server_id, &mut page) => result,
                };
                if let Err(e) = enriched {
                    log_error("get_member", &e);
                    return Err(e);
                }
            }

            cursor = page.iter().map(|m| &m.id).min().cloned();
            messages.extend(page);

            tracing::info!(
                channel_id = %channel_id,
                page = pages,
                page_len = page_len,
                fetched = messages.len(),
                "Fetched page"
            );

            if let Some(limit) = self.limit {
                if messages.len() >= limit {
                    messages.truncate(limit);
                    break StopReason::LimitReached;
                }
            }
            if page_len < request_size {
                break StopReason::Exhausted;
            }
        };

        tracing::info!(
            channel_id = %channel_id,
            total = messages.len(),
            pages = pages,
            stop = ?stop,
            "Pagination finished"
        );

        Ok(Harvest {
            messages,
            pages,
            stop,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::fake::{self, FakeDiscord, FakeTransport};
    use crate::discord::{RawResponse, RetryPolicy, TransportError};
    use crate::error::ScraperError;
    use crate::metadata::MetadataCache;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn client(transport: FakeTransport) -> DiscordClient<FakeTransport> {
        DiscordClient::new(transport, RetryPolicy::new(2, Duration::from_millis(10)))
    }

    fn limits(transport: &FakeTransport) -> Vec<String> {
        transport
            .requests_to("channels/", "/messages")
            .iter()
            .map(|r| r.param("limit").unwrap_or_default().to_string())
            .collect()
    }

    async fn run(client: &DiscordClient<FakeTransport>, limit: Option<usize>) -> Harvest {
        Paginator::new(client)
            .with_limit(limit)
            .run(&fake::channel_id(), &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_limit_spans_two_pages() {
        let client = client(FakeDiscord::new(500, 3).into_transport());

        let harvest = run(&client, Some(150)).await;

        assert_eq!(harvest.messages.len(), 150);
        assert_eq!(harvest.pages, 2);
        assert_eq!(harvest.stop, StopReason::LimitReached);
        assert_eq!(limits(client.transport()), vec!["100", "50"]);
    }

    #[tokio::test]
    async fn test_cursor_is_oldest_id_of_previous_page() {
        let client = client(FakeDiscord::new(250, 1).into_transport());

        let harvest = run(&client, None).await;

        let requests = client.transport().requests_to("channels/", "/messages");
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].param("before"), None);
        assert_eq!(requests[1].param("before"), Some("1000150"));
        assert_eq!(requests[2].param("before"), Some("1000050"));
        assert_eq!(harvest.messages.len(), 250);
        assert_eq!(harvest.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_short_channel_single_request() {
        let client = client(FakeDiscord::new(3, 1).into_transport());

        let harvest = run(&client, None).await;

        assert_eq!(harvest.messages.len(), 3);
        assert_eq!(client.transport().request_count(), 1);
        assert_eq!(harvest.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_exact_multiple_ends_on_empty_page() {
        let client = client(FakeDiscord::new(200, 1).into_transport());

        let harvest = run(&client, None).await;

        assert_eq!(harvest.messages.len(), 200);
        assert_eq!(harvest.pages, 3);
        assert_eq!(harvest.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_zero_limit_issues_no_request() {
        let client = client(FakeDiscord::new(10, 1).into_transport());

        let harvest = run(&client, Some(0)).await;

        assert!(harvest.messages.is_empty());
        assert_eq!(client.transport().request_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_channel_is_success() {
        let client = client(FakeDiscord::new(0, 1).into_transport());

        let harvest = run(&client, None).await;

        assert!(harvest.messages.is_empty());
        assert_eq!(harvest.pages, 1);
        assert_eq!(harvest.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_limit_never_exceeded_and_ids_unique() {
        for (count, limit) in [(0, 7), (5, 7), (99, 100), (100, 100), (101, 100), (340, 275)] {
            let client = client(FakeDiscord::new(count, 4).into_transport());

            let harvest = run(&client, Some(limit)).await;

            assert!(harvest.messages.len() <= limit);
            assert_eq!(harvest.messages.len(), count.min(limit), "count={count} limit={limit}");
            let ids: HashSet<_> = harvest.messages.iter().map(|m| m.id.clone()).collect();
            assert_eq!(ids.len(), harvest.messages.len());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_page_failure_keeps_partial_result() {
        let discord = FakeDiscord::new(300, 1);
        let transport = FakeTransport::handler(move |request| {
            if request.param("before").is_some() {
                Ok(RawResponse::new(503, ""))
            } else {
                discord.respond(request)
            }
        });
        let client = client(transport);

        let harvest = run(&client, None).await;

        assert_eq!(harvest.messages.len(), 100);
        assert!(matches!(harvest.stop, StopReason::Aborted(ref cause) if cause.contains("get_messages")));
        // first page + three attempts at the second
        assert_eq!(client.transport().request_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_page_failure_propagates() {
        let client = client(FakeTransport::handler(|_| {
            Err(TransportError::Connect("refused".into()))
        }));

        let result = Paginator::new(&client)
            .run(&fake::channel_id(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ScraperError::RetriesExhausted { .. })));
    }

    #[tokio::test]
    async fn test_auth_failure_stops_paging() {
        let discord = FakeDiscord::new(300, 1);
        let transport = FakeTransport::handler(move |request| {
            if request.param("before").is_some() {
                Ok(RawResponse::new(403, ""))
            } else {
                discord.respond(request)
            }
        });
        let client = client(transport);

        let result = Paginator::new(&client)
            .run(&fake::channel_id(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ScraperError::Forbidden { .. })));
        assert_eq!(client.transport().request_count(), 2);
    }

    #[tokio::test]
    async fn test_pages_enriched_before_accumulation() {
        let client = client(FakeDiscord::new(120, 7).into_transport());
        let cache = MetadataCache::new();
        let enricher = Enricher::new(&client, &cache, 3);

        let harvest = Paginator::new(&client)
            .with_enricher(&enricher, fake::server_id())
            .run(&fake::channel_id(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(harvest.messages.len(), 120);
        assert!(harvest.messages.iter().all(|m| !m.author.roles.is_empty()));
        // 7 authors appear on both pages but are fetched once
        assert_eq!(client.transport().requests_to("guilds/", "").len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_enrichment_discards_page() {
        let discord = FakeDiscord::new(250, 250);
        let cancel = CancellationToken::new();
        let member_calls = Arc::new(AtomicUsize::new(0));
        let (trigger, calls) = (cancel.clone(), member_calls.clone());
        let transport = discord
            .into_transport()
            .with_latency(Duration::from_millis(20))
            .on_request(move |request| {
                // cancel while the second page is being enriched
                if request.path.contains("/members/") && calls.fetch_add(1, Ordering::SeqCst) == 130 {
                    trigger.cancel();
                }
            });
        let client = client(transport);
        let cache = MetadataCache::new();
        let enricher = Enricher::new(&client, &cache, 5);

        let harvest = Paginator::new(&client)
            .with_enricher(&enricher, fake::server_id())
            .run(&fake::channel_id(), &cancel)
            .await
            .unwrap();

        assert_eq!(harvest.stop, StopReason::Cancelled);
        assert_eq!(harvest.messages.len(), 100);
        assert!(harvest.messages.iter().all(|m| !m.author.roles.is_empty()));
        assert_eq!(client.transport().in_flight(), 0);
        assert_eq!(client.transport().requests_to("channels/", "/messages").len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_before_start_returns_empty() {
        let client = client(FakeDiscord::new(10, 1).into_transport());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let harvest = Paginator::new(&client)
            .run(&fake::channel_id(), &cancel)
            .await
            .unwrap();

        assert_eq!(harvest.stop, StopReason::Cancelled);
        assert!(harvest.messages.is_empty());
        assert_eq!(client.transport().request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_enrichment_stops_paging() {
        let discord = FakeDiscord::new(250, 250);
        let transport = FakeTransport::handler(move |request| {
            if request.path.contains("/members/") {
                Ok(RawResponse::new(401, ""))
            } else {
                discord.respond(request)
            }
        });
        let client = client(transport);
        let cache = MetadataCache::new();
        let enricher = Enricher::new(&client, &cache, 5);

        let result = Paginator::new(&client)
            .with_enricher(&enricher, fake::server_id())
            .run(&fake::channel_id(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ScraperError::Unauthorized { .. })));
        assert_eq!(client.transport().requests_to("channels/", "/messages").len(), 1);
        assert!(client.transport().requests_to("guilds/500/members/", "").len() <= 5);
    }
}
