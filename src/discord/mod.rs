mod client;
#[cfg(test)]
pub(crate) mod fake;
mod retry;
mod transport;
mod types;

pub use client::{DiscordClient, MAX_PAGE_SIZE};
pub use retry::{Attempt, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES, RetryCause, RetryPolicy};
pub use transport::{
    HttpTransport, RawResponse, Request, Transport, TransportError, parse_retry_after,
};
pub use types::{
    Attachment, Author, ChannelId, ChannelInfo, ChannelTarget, Embed, Emoji, Member, Message,
    MessageId, Reaction, Role, RoleId, ServerId, ServerInfo, UserId,
};
