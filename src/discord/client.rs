use crate::discord::retry::RetryPolicy;
use crate::discord::transport::{Request, Transport};
use crate::discord::types::{
    ChannelId, ChannelInfo, Member, Message, MessageId, Role, ServerId, ServerInfo, UserId,
};
use crate::error::{Result, ScraperError};
use serde::de::DeserializeOwned;

/// Server-imposed maximum messages per page
pub const MAX_PAGE_SIZE: usize = 100;

/// Typed access to the endpoints the scraper consumes
pub struct DiscordClient<T> {
    transport: T,
    retry: RetryPolicy,
}

impl<T: Transport> DiscordClient<T> {
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn get_json<D: DeserializeOwned>(&self, operation: &str, request: Request) -> Result<D> {
        let body = self
            .retry
            .execute(&self.transport, operation, &request)
            .await?;

        serde_json::from_slice(&body).map_err(|source| ScraperError::Decode {
            operation: operation.to_string(),
            source,
        })
    }

    pub async fn get_channel(&self, channel_id: &ChannelId) -> Result<ChannelInfo> {
        self.get_json("get_channel", Request::get(format!("channels/{}", channel_id)))
            .await
    }

    pub async fn get_server(&self, server_id: &ServerId) -> Result<ServerInfo> {
        self.get_json("get_server", Request::get(format!("guilds/{}", server_id)))
            .await
    }

    pub async fn get_roles(&self, server_id: &ServerId) -> Result<Vec<Role>> {
        self.get_json(
            "get_roles",
            Request::get(format!("guilds/{}/roles", server_id)),
        )
        .await
    }

    pub async fn get_member(&self, server_id: &ServerId, user_id: &UserId) -> Result<Member> {
        self.get_json(
            "get_member",
            Request::get(format!("guilds/{}/members/{}", server_id, user_id)),
        )
        .await
    }

    /// One page, newest first, strictly older than `before` when given
    pub async fn get_messages(
        &self,
        channel_id: &ChannelId,
        limit: usize,
        before: Option<&MessageId>,
    ) -> Result<Vec<Message>> {
        let mut request = Request::get(format!("channels/{}/messages", channel_id))
            .with_param("limit", limit.clamp(1, MAX_PAGE_SIZE));
        if let Some(before) = before {
            request = request.with_param("before", before);
        }

        self.get_json("get_messages", request).await
    }
}
