use crate::error::ScraperError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_type!(ChannelId);
id_type!(
    /// Guild id; "server" in user-facing text
    ServerId
);
id_type!(UserId);
id_type!(RoleId);
id_type!(
    /// Snowflake id, ordered by creation time
    MessageId
);

impl MessageId {
    pub fn snowflake(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

// Snowflakes are decimal strings without leading zeros, so a longer id is a newer id.
impl Ord for MessageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for MessageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Message author, augmented with role ids during enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

impl Author {
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emoji {
    /// Present only for custom emoji
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Emoji {
    /// `<:name:id>` for custom emoji, the unicode character otherwise
    pub fn markup(&self) -> String {
        let name = self.name.as_deref().unwrap_or_default();
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => format!("<:{}:{}>", name, id),
            _ => name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: Emoji,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub timestamp: DateTime<Utc>,
    pub author: Author,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    #[serde(default)]
    pub position: i64,
    /// 24-bit RGB, 0 means no color
    #[serde(default)]
    pub color: u32,
}

impl Role {
    pub fn rgb(&self) -> Option<u32> {
        (self.color != 0).then_some(self.color & 0x00FF_FFFF)
    }

    pub fn hex_color(&self) -> Option<String> {
        self.rgb().map(|c| format!("#{:06x}", c))
    }
}

/// Guild member, only the parts enrichment needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub id: ServerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: ChannelId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub guild_id: Option<ServerId>,
}

impl ChannelInfo {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("channel_{}", self.id))
    }
}

/// Caller-supplied `server/channel` or bare `channel`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    pub server_id: Option<ServerId>,
    pub channel_id: ChannelId,
}

impl FromStr for ChannelTarget {
    type Err = ScraperError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let invalid = || ScraperError::InvalidChannel(input.to_string());

        match input.split_once('/') {
            Some((server, channel)) => {
                let (server, channel) = (server.trim(), channel.trim());
                if server.is_empty() || channel.is_empty() || channel.contains('/') {
                    return Err(invalid());
                }
                Ok(Self {
                    server_id: Some(ServerId::new(server)),
                    channel_id: ChannelId::new(channel),
                })
            }
            None if input.is_empty() => Err(invalid()),
            None => Ok(Self {
                server_id: None,
                channel_id: ChannelId::new(input),
            }),
        }
    }
}
