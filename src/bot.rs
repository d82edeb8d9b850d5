//! Message loop: receive private messages, dispatch commands, reply.
//!
//! One message at a time. The registry persists and flushes before the
//! next event is consumed, so there is never more than one writer.

#[cfg(test)]
#[path = "bot_tests.rs"]
mod bot_tests;

use tracing::{debug, error, info};

use crate::command::Command;
use crate::config::ZulipConfig;
use crate::errors::BotError;
use crate::health::AppState;
use crate::registry::InterestRegistry;
use crate::store::RecordStore;
use crate::zulip::{Event, InboundMessage, OutboundReply, ZulipClient};

pub struct PairingBot<S: RecordStore> {
    client: ZulipClient,
    registry: InterestRegistry<S>,
    bot_email: String,
    subscribed_streams: Vec<String>,
    health: AppState,
}

impl<S: RecordStore> PairingBot<S> {
    pub fn new(
        client: ZulipClient,
        registry: InterestRegistry<S>,
        config: &ZulipConfig,
        health: AppState,
    ) -> Self {
        Self {
            client,
            registry,
            bot_email: config.email.clone(),
            subscribed_streams: config.subscribed_streams.clone(),
            health,
        }
    }

    /// Run until Ctrl-C / SIGTERM.
    ///
    /// Transport and persistence failures abort the loop; invalid
    /// commands never reach here (they become normal replies).
    pub async fn run(self) -> Result<(), BotError> {
        self.subscribe().await?;

        let mut queue = self.client.register_queue().await?;
        self.health.set_zulip_connected(true).await;
        info!(queue_id = %queue.queue_id, "pairing bot started");

        loop {
            tokio::select! {
                _ = shutdown_signal() => {
                    info!("Shutdown signal received");
                    break;
                }

                polled = self.client.poll_events(&queue) => {
                    match polled {
                        Ok(Some(events)) => {
                            for event in events {
                                if event.id > queue.last_event_id {
                                    queue.last_event_id = event.id;
                                }
                                self.handle_event(event).await;
                            }
                        }
                        // Queue expired server-side; start a fresh one
                        Ok(None) => {
                            queue = self.client.register_queue().await?;
                        }
                        Err(e) => {
                            self.health.set_zulip_connected(false).await;
                            return Err(e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Subscribe to the configured streams, or to every stream on the
    /// server when none are configured.
    async fn subscribe(&self) -> Result<(), BotError> {
        let streams = if self.subscribed_streams.is_empty() {
            self.client.all_streams().await?
        } else {
            self.subscribed_streams.clone()
        };

        info!(count = streams.len(), "subscribing to streams");
        self.client.subscribe(&streams).await
    }

    async fn handle_event(&self, event: Event) {
        if event.event_type != "message" {
            return;
        }
        let Some(message) = event.message else {
            return;
        };

        self.health.increment_messages_received().await;

        if !should_process(&message, &self.bot_email) {
            debug!(sender = %message.sender_email, "ignoring message");
            return;
        }

        match process_message(&self.registry, &message) {
            Ok(reply) => {
                self.health.increment_commands().await;
                match self.client.send_private_message(&reply).await {
                    Ok(()) => self.health.increment_messages_sent().await,
                    Err(e) => {
                        error!(error = %e, to = %reply.sender_email, "failed to send reply");
                        self.health.increment_errors().await;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, sender = %message.sender_email, "command failed");
                self.health.increment_errors().await;
            }
        }
    }
}

/// Whether an inbound message should be dispatched: private messages
/// only, and never the bot's own (the event queue echoes outbound PMs
/// back to us).
pub fn should_process(message: &InboundMessage, bot_email: &str) -> bool {
    message.is_private() && message.sender_email != bot_email
}

/// The linear composition: parse → dispatch → reply.
///
/// An unrecognized command is not an error here — it becomes a normal
/// reply quoting the offending text. Store failures bubble up.
pub fn process_message<S: RecordStore>(
    registry: &InterestRegistry<S>,
    message: &InboundMessage,
) -> Result<OutboundReply, BotError> {
    let content = message.content.trim();
    debug!(content, sender_id = message.sender_id, "processing message");

    let reply = match Command::parse(content) {
        Ok(command) => registry.dispatch(
            &command,
            &message.sender_id.to_string(),
            &message.sender_full_name,
        )?,
        Err(BotError::InvalidCommand(raw)) => {
            format!("`{raw}` is not a valid command.")
        }
        Err(other) => return Err(other),
    };

    Ok(OutboundReply {
        content: reply,
        sender_email: message.sender_email.clone(),
    })
}

/// Resolves when the process receives SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = sigterm => {}
    }
}
