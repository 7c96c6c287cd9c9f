//! # kinowatch-agent
//!
//! Event dispatcher: consumes the inbound event stream from the channel,
//! routes commands and callback actions, mutates the registry, and replies.
//! Runs until the stream ends; a failed reply never aborts the loop.

use std::sync::Arc;

use futures::Stream;
use kinowatch_core::traits::{Channel, ScheduleSource};
use kinowatch_core::types::{CallbackAction, InboundEvent, Keyboard, OutgoingMessage};
use kinowatch_registry::Registry;
use tokio_stream::StreamExt;

pub const START_COMMAND: &str = "/start";

const GREETING: &str =
    "Hi! I track TV broadcasts of the movie for you. Pick an action:";
const ACK: &str = "Thanks for the message!";
const SUBSCRIBED: &str = "You are now subscribed to daily updates!";
const UNSUBSCRIBED: &str = "You are unsubscribed from daily updates!";

/// Routes inbound events to registry mutations and channel replies.
pub struct Dispatcher {
    channel: Arc<dyn Channel>,
    source: Arc<dyn ScheduleSource>,
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(
        channel: Arc<dyn Channel>,
        source: Arc<dyn ScheduleSource>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            channel,
            source,
            registry,
        }
    }

    /// Consume events until the stream ends.
    pub async fn run(&self, mut events: impl Stream<Item = InboundEvent> + Unpin) {
        while let Some(event) = events.next().await {
            self.handle(event).await;
        }
        tracing::info!("inbound event stream ended");
    }

    /// Apply the routing table to one event.
    pub async fn handle(&self, event: InboundEvent) {
        let reply = match event {
            InboundEvent::Message { chat_id, ref text } if text == START_COMMAND => {
                tracing::info!(chat_id, "start command");
                self.registry.add(chat_id).await;
                OutgoingMessage::with_keyboard(chat_id, GREETING, action_menu())
            }
            InboundEvent::Message { chat_id, ref text } => {
                tracing::debug!(chat_id, text, "message");
                OutgoingMessage::text(chat_id, ACK)
            }
            InboundEvent::Callback { chat_id, action } => {
                tracing::info!(chat_id, %action, "callback");
                match action {
                    CallbackAction::GetSchedule => {
                        OutgoingMessage::text(chat_id, self.source.fetch().await)
                    }
                    CallbackAction::Subscribe => {
                        self.registry.add(chat_id).await;
                        OutgoingMessage::text(chat_id, SUBSCRIBED)
                    }
                    // Confirmation only; membership is intentionally left
                    // untouched (see DESIGN.md).
                    CallbackAction::Unsubscribe => OutgoingMessage::text(chat_id, UNSUBSCRIBED),
                }
            }
        };

        let chat_id = reply.chat_id;
        if let Err(e) = self.channel.send(reply).await {
            tracing::warn!(chat_id, "failed to send reply: {e}");
        }
    }
}

/// The three-button menu attached to the greeting.
pub fn action_menu() -> Keyboard {
    Keyboard::new().row(vec![
        ("Get schedule", CallbackAction::GetSchedule),
        ("Subscribe", CallbackAction::Subscribe),
        ("Unsubscribe", CallbackAction::Unsubscribe),
    ])
}
