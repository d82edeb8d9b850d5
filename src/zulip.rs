//! Minimal Zulip REST client: subscribe to streams, long-poll the event
//! queue, send private messages.
//!
//! Only the surface the bot needs is covered. All requests authenticate
//! with basic auth (bot email + API key); a 401 anywhere maps to
//! `BotError::Authentication`, everything else unexpected to
//! `BotError::Transport`.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ZulipConfig;
use crate::errors::BotError;

/// An inbound Zulip message, as embedded in a `message` event.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub content: String,
    pub sender_id: i64,
    pub sender_email: String,
    pub sender_full_name: String,
}

impl InboundMessage {
    /// Only private messages are commands; stream messages are ignored.
    pub fn is_private(&self) -> bool {
        self.message_type == "private"
    }
}

/// A reply to be sent privately back to the original sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub content: String,
    pub sender_email: String,
}

/// Registered event queue handle. `last_event_id` advances as events are
/// consumed and is echoed back on every poll.
#[derive(Debug, Clone, Deserialize)]
pub struct EventQueue {
    pub queue_id: String,
    pub last_event_id: i64,
}

/// One entry from `GET /events`. Heartbeats and other non-message events
/// carry no `message`.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub message: Option<InboundMessage>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    result: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Stream {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    streams: Vec<Stream>,
}

/// Zulip REST client.
#[derive(Clone)]
pub struct ZulipClient {
    http: reqwest::Client,
    site: String,
    email: String,
    api_key: String,
}

impl ZulipClient {
    pub fn new(config: &ZulipConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            site: config.site.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.site, path)
    }

    fn check(resp: &reqwest::Response, what: &str) -> Result<(), BotError> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BotError::Authentication(format!(
                "{what}: credentials rejected"
            )));
        }
        if !status.is_success() {
            return Err(BotError::Transport(format!(
                "{what}: unexpected status {status}"
            )));
        }
        Ok(())
    }

    /// Every stream name on the server.
    pub async fn all_streams(&self) -> Result<Vec<String>, BotError> {
        let resp = self
            .http
            .get(self.url("streams"))
            .basic_auth(&self.email, Some(&self.api_key))
            .send()
            .await?;
        Self::check(&resp, "GET /streams")?;

        let body: StreamsResponse = resp.json().await?;
        Ok(body.streams.into_iter().map(|s| s.name).collect())
    }

    /// Subscribe the bot to the given streams.
    pub async fn subscribe(&self, streams: &[String]) -> Result<(), BotError> {
        let subscriptions: Vec<serde_json::Value> = streams
            .iter()
            .map(|name| serde_json::json!({ "name": name }))
            .collect();
        let subscriptions = serde_json::to_string(&subscriptions)?;

        let resp = self
            .http
            .post(self.url("users/me/subscriptions"))
            .basic_auth(&self.email, Some(&self.api_key))
            .form(&[("subscriptions", subscriptions.as_str())])
            .send()
            .await?;
        Self::check(&resp, "POST /users/me/subscriptions")?;

        debug!(count = streams.len(), "subscribed to streams");
        Ok(())
    }

    /// Register an event queue for message events.
    pub async fn register_queue(&self) -> Result<EventQueue, BotError> {
        let resp = self
            .http
            .post(self.url("register"))
            .basic_auth(&self.email, Some(&self.api_key))
            .form(&[("event_types", r#"["message"]"#)])
            .send()
            .await?;
        Self::check(&resp, "POST /register")?;

        let queue: EventQueue = resp.json().await?;
        debug!(queue_id = %queue.queue_id, "event queue registered");
        Ok(queue)
    }

    /// Long-poll the event queue. Returns `Ok(None)` when the queue has
    /// expired server-side and must be re-registered.
    pub async fn poll_events(&self, queue: &EventQueue) -> Result<Option<Vec<Event>>, BotError> {
        let resp = self
            .http
            .get(self.url("events"))
            .basic_auth(&self.email, Some(&self.api_key))
            .query(&[
                ("queue_id", queue.queue_id.clone()),
                ("last_event_id", queue.last_event_id.to_string()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(BotError::Authentication(
                "GET /events: credentials rejected".to_string(),
            ));
        }

        // Queue expiry arrives as an error body, not a status family of
        // its own, so decode before rejecting on status.
        let body: EventsResponse = resp.json().await?;
        if body.code.as_deref() == Some("BAD_EVENT_QUEUE_ID") {
            warn!("event queue expired, re-registering");
            return Ok(None);
        }
        if !status.is_success() || body.result == "error" {
            return Err(BotError::Transport(format!(
                "GET /events: {} ({})",
                status, body.msg
            )));
        }

        Ok(Some(body.events))
    }

    /// Send `reply.content` as a private message to `reply.sender_email`.
    pub async fn send_private_message(&self, reply: &OutboundReply) -> Result<(), BotError> {
        let resp = self
            .http
            .post(self.url("messages"))
            .basic_auth(&self.email, Some(&self.api_key))
            .form(&[
                ("type", "private"),
                ("to", reply.sender_email.as_str()),
                ("content", reply.content.as_str()),
            ])
            .send()
            .await?;
        Self::check(&resp, "POST /messages")?;

        debug!(to = %reply.sender_email, "reply sent");
        Ok(())
    }
}
