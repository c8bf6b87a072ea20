//! In-memory transport and simulated Discord API for tests

use crate::discord::transport::{RawResponse, Request, Transport, TransportError};
use crate::discord::types::{
    Author, ChannelId, Member, Message, MessageId, Role, RoleId, ServerId, UserId,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Reply = Result<RawResponse, TransportError>;
type Handler = Box<dyn Fn(&Request) -> Reply + Send + Sync>;
type Hook = Box<dyn Fn(&Request) + Send + Sync>;

pub(crate) struct FakeTransport {
    handler: Handler,
    hook: Option<Hook>,
    latency: Duration,
    requests: Mutex<Vec<Request>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeTransport {
    pub(crate) fn handler(handler: impl Fn(&Request) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            hook: None,
            latency: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Replies in order, whatever the request
    pub(crate) fn scripted(replies: Vec<Reply>) -> Self {
        let replies = Mutex::new(VecDeque::from(replies));
        Self::handler(move |_| {
            replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("script exhausted".into())))
        })
    }

    pub(crate) fn on_request(mut self, hook: impl Fn(&Request) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests_to(&self, prefix: &str, suffix: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(prefix) && r.path.ends_with(suffix))
            .collect()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Transport for FakeTransport {
    async fn get(&self, request: &Request) -> Reply {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(hook) = &self.hook {
            hook(request);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        (self.handler)(request)
    }
}

pub(crate) const SERVER: &str = "500";
pub(crate) const CHANNEL: &str = "600";
pub(crate) const FIRST_ID: u64 = 1_000_000;

pub(crate) fn server_id() -> ServerId {
    ServerId::new(SERVER)
}

pub(crate) fn channel_id() -> ChannelId {
    ChannelId::new(CHANNEL)
}

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

pub(crate) fn user_id(n: usize) -> UserId {
    UserId::new(format!("{}", 9000 + n))
}

/// Message number `i` (0 = oldest), written by author `author`
pub(crate) fn message(i: usize, author: usize) -> Message {
    Message {
        id: MessageId::new(format!("{}", FIRST_ID + i as u64)),
        timestamp: base_time() + ChronoDuration::minutes(i as i64),
        author: Author {
            id: user_id(author),
            username: format!("user{}", author),
            global_name: None,
            roles: Vec::new(),
        },
        content: format!("message {}", i),
        attachments: Vec::new(),
        embeds: Vec::new(),
        reactions: Vec::new(),
    }
}

pub(crate) fn role(id: &str, name: &str, position: i64, color: u32) -> Role {
    Role {
        id: RoleId::new(id),
        name: name.to_string(),
        position,
        color,
    }
}

/// A server with one channel, answering like the Discord REST API
pub(crate) struct FakeDiscord {
    pub(crate) messages: Vec<Message>,
    pub(crate) roles: Vec<Role>,
    pub(crate) members: HashMap<UserId, Member>,
    pub(crate) guild_in_channel: bool,
}

impl FakeDiscord {
    /// `count` messages cycling through `authors` authors, each author a member
    /// holding role `10`
    pub(crate) fn new(count: usize, authors: usize) -> Self {
        let authors = authors.max(1);
        let messages = (0..count).map(|i| message(i, i % authors)).collect();
        let members = (0..authors)
            .map(|a| {
                (
                    user_id(a),
                    Member {
                        roles: vec![RoleId::new("10")],
                    },
                )
            })
            .collect();

        Self {
            messages,
            roles: vec![
                role("10", "Member", 1, 0),
                role("20", "Moderator", 5, 0x3498db),
            ],
            members,
            guild_in_channel: true,
        }
    }

    pub(crate) fn into_transport(self) -> FakeTransport {
        FakeTransport::handler(move |request| self.respond(request))
    }

    pub(crate) fn respond(&self, request: &Request) -> Reply {
        let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();

        match segments.as_slice() {
            ["channels", CHANNEL] => {
                let mut channel = json!({"id": CHANNEL, "name": "general"});
                if self.guild_in_channel {
                    channel["guild_id"] = json!(SERVER);
                }
                Ok(ok_json(&channel))
            }
            ["channels", CHANNEL, "messages"] => Ok(ok_json(&self.page(request))),
            ["guilds", SERVER] => Ok(ok_json(&json!({"id": SERVER, "name": "Test Server"}))),
            ["guilds", SERVER, "roles"] => Ok(ok_json(&self.roles)),
            ["guilds", SERVER, "members", user] => {
                match self.members.get(&UserId::new(*user)) {
                    Some(member) => Ok(ok_json(member)),
                    None => Ok(RawResponse::new(404, r#"{"message": "Unknown Member"}"#)),
                }
            }
            _ => Ok(RawResponse::new(404, r#"{"message": "Unknown"}"#)),
        }
    }

    /// Newest-first page of messages strictly older than `before`
    fn page(&self, request: &Request) -> Vec<Message> {
        let limit: usize = request
            .param("limit")
            .and_then(|l| l.parse().ok())
            .unwrap_or(50);
        let before = request.param("before").map(MessageId::new);

        let mut older: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| before.as_ref().is_none_or(|b| m.id < *b))
            .cloned()
            .collect();
        older.sort_by(|a, b| b.id.cmp(&a.id));
        older.truncate(limit);
        older
    }
}

pub(crate) fn ok_json(value: &impl serde::Serialize) -> RawResponse {
    RawResponse::new(200, serde_json::to_vec(value).unwrap())
}
