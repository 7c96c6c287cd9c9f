//! Telegram Bot channel — REST API + `getUpdates` long polling.
//!
//! Sends messages over the Bot API and produces inbound events through a
//! spawned long-poll task. Poll failures are logged and retried with a
//! short backoff; the event stream ends only when its receiver is dropped.

use async_trait::async_trait;
use futures::stream::Stream;
use kinowatch_core::error::{KinowatchError, Result};
use kinowatch_core::traits::Channel;
use kinowatch_core::types::{CallbackAction, InboundEvent, Keyboard, OutgoingMessage};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Telegram channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Long-poll timeout passed to getUpdates, in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_poll_timeout() -> u64 {
    60
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

/// Telegram Bot channel.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "https://api.telegram.org/bot{}/{method}",
            self.config.bot_token
        )
    }

    /// Get current bot info. Fails on a bad token.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| KinowatchError::Channel(format!("getMe failed: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| KinowatchError::Channel(format!("Invalid getMe response: {e}")))?;

        if !body["ok"].as_bool().unwrap_or(false) {
            let desc = body["description"].as_str().unwrap_or("unknown error");
            return Err(KinowatchError::AuthFailed(format!("getMe rejected: {desc}")));
        }

        serde_json::from_value(body["result"].clone())
            .map_err(|e| KinowatchError::Channel(format!("Invalid bot info: {e}")))
    }

    /// Send a text message, with an optional inline keyboard.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        let mut body = serde_json::json!({ "chat_id": chat_id, "text": text });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = keyboard_markup(keyboard);
        }

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| KinowatchError::Channel(format!("Telegram send failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(KinowatchError::Channel(format!("Telegram {status}: {text}")));
        }
        Ok(())
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<serde_json::Value>> {
        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.config.poll_timeout_secs.to_string()),
            ])
            .timeout(std::time::Duration::from_secs(
                self.config.poll_timeout_secs + 10,
            ))
            .send()
            .await
            .map_err(|e| KinowatchError::Channel(format!("getUpdates failed: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| KinowatchError::Channel(format!("Invalid getUpdates response: {e}")))?;

        if !body["ok"].as_bool().unwrap_or(false) {
            let desc = body["description"].as_str().unwrap_or("unknown error");
            return Err(KinowatchError::Channel(format!("getUpdates rejected: {desc}")));
        }

        Ok(body["result"].as_array().cloned().unwrap_or_default())
    }

    /// Acknowledge a callback query so the client stops its spinner.
    async fn answer_callback(&self, callback_id: &str) {
        let body = serde_json::json!({ "callback_query_id": callback_id });
        if let Err(e) = self
            .client
            .post(self.api_url("answerCallbackQuery"))
            .json(&body)
            .send()
            .await
        {
            tracing::debug!("answerCallbackQuery failed: {e}");
        }
    }

    /// Start the long-poll loop — returns a stream of inbound events.
    pub fn start_polling(self: Arc<Self>) -> TelegramUpdateStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let channel = self;
            let mut offset: i64 = 0;

            loop {
                let updates = match channel.get_updates(offset).await {
                    Ok(updates) => updates,
                    Err(e) => {
                        tracing::warn!("Telegram poll failed: {e}, retrying in 5s...");
                        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                for update in updates {
                    if let Some(id) = update["update_id"].as_i64() {
                        offset = id + 1;
                    }

                    if let Some(callback_id) = update["callback_query"]["id"].as_str() {
                        channel.answer_callback(callback_id).await;
                    }

                    let Some(event) = parse_update(&update) else {
                        continue;
                    };

                    if tx.send(event).is_err() {
                        tracing::info!("Telegram stream closed (receiver dropped)");
                        return;
                    }
                }
            }
        });

        TelegramUpdateStream { rx }
    }
}

/// Map a raw Bot API update onto an inbound event.
///
/// Messages carry the chat id and text; callback queries carry the chat id
/// of the message the keyboard hangs off plus an action token. Updates of
/// any other shape, and unknown tokens, map to nothing.
fn parse_update(update: &serde_json::Value) -> Option<InboundEvent> {
    if let Some(message) = update.get("message") {
        let chat_id = message["chat"]["id"].as_i64()?;
        let text = message["text"].as_str().unwrap_or("").to_string();
        return Some(InboundEvent::Message { chat_id, text });
    }

    if let Some(callback) = update.get("callback_query") {
        let chat_id = callback["message"]["chat"]["id"].as_i64()?;
        let token = callback["data"].as_str()?;
        let Some(action) = CallbackAction::parse(token) else {
            tracing::debug!(token, "ignoring unknown callback token");
            return None;
        };
        return Some(InboundEvent::Callback { chat_id, action });
    }

    None
}

/// Bot API `reply_markup` payload for an inline keyboard.
fn keyboard_markup(keyboard: &Keyboard) -> serde_json::Value {
    let rows: Vec<Vec<serde_json::Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| {
                    serde_json::json!({
                        "text": button.label,
                        "callback_data": button.action.token(),
                    })
                })
                .collect()
        })
        .collect();
    serde_json::json!({ "inline_keyboard": rows })
}

/// Stream of inbound Telegram events from the long-poll task.
pub struct TelegramUpdateStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<InboundEvent>,
}

impl Stream for TelegramUpdateStream {
    type Item = InboundEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Unpin for TelegramUpdateStream {}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        self.send_message(message.chat_id, &message.text, message.keyboard.as_ref())
            .await
    }
}

// --- Telegram API Types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    pub first_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_update() {
        let update = serde_json::json!({
            "update_id": 100,
            "message": {
                "chat": { "id": 42 },
                "text": "/start"
            }
        });
        let event = parse_update(&update).expect("message event");
        match event {
            InboundEvent::Message { chat_id, text } => {
                assert_eq!(chat_id, 42);
                assert_eq!(text, "/start");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_callback_update() {
        let update = serde_json::json!({
            "update_id": 101,
            "callback_query": {
                "id": "cb1",
                "data": "subscribe",
                "message": { "chat": { "id": 7 } }
            }
        });
        let event = parse_update(&update).expect("callback event");
        match event {
            InboundEvent::Callback { chat_id, action } => {
                assert_eq!(chat_id, 7);
                assert_eq!(action, CallbackAction::Subscribe);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_token_dropped() {
        let update = serde_json::json!({
            "update_id": 102,
            "callback_query": {
                "id": "cb2",
                "data": "mystery_button",
                "message": { "chat": { "id": 7 } }
            }
        });
        assert!(parse_update(&update).is_none());
    }

    #[test]
    fn test_parse_textless_message() {
        // Stickers and photos have no text; still a message event so the
        // sender gets the generic acknowledgment.
        let update = serde_json::json!({
            "update_id": 103,
            "message": { "chat": { "id": 9 } }
        });
        let event = parse_update(&update).expect("message event");
        assert!(matches!(event, InboundEvent::Message { chat_id: 9, ref text } if text.is_empty()));
    }

    #[test]
    fn test_keyboard_markup_shape() {
        let keyboard = Keyboard::new()
            .row(vec![
                ("Schedule", CallbackAction::GetSchedule),
                ("Subscribe", CallbackAction::Subscribe),
            ])
            .row(vec![("Unsubscribe", CallbackAction::Unsubscribe)]);

        let markup = keyboard_markup(&keyboard);
        let rows = markup["inline_keyboard"].as_array().expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1]["callback_data"], "subscribe");
        assert_eq!(rows[1][0]["text"], "Unsubscribe");
    }
}
