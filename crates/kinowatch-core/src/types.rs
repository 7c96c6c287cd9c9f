//! Inbound event and outbound message types.

use serde::{Deserialize, Serialize};

/// Opaque Telegram chat identifier. One per subscriber.
pub type ChatId = i64;

/// Action token carried by an inline-keyboard callback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallbackAction {
    GetSchedule,
    Subscribe,
    Unsubscribe,
}

impl CallbackAction {
    /// Parse an inbound callback data token. Unknown tokens yield None.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "get_schedule" => Some(Self::GetSchedule),
            "subscribe" => Some(Self::Subscribe),
            "unsubscribe" => Some(Self::Unsubscribe),
            _ => None,
        }
    }

    /// Wire token sent as callback data on keyboard buttons.
    pub fn token(&self) -> &'static str {
        match self {
            Self::GetSchedule => "get_schedule",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

impl std::fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Incoming event from the messaging channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InboundEvent {
    /// Free-text direct message.
    Message { chat_id: ChatId, text: String },
    /// Inline-keyboard button press.
    Callback {
        chat_id: ChatId,
        action: CallbackAction,
    },
}

impl InboundEvent {
    pub fn chat_id(&self) -> ChatId {
        match self {
            Self::Message { chat_id, .. } | Self::Callback { chat_id, .. } => *chat_id,
        }
    }
}

/// Outgoing message to the messaging channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub chat_id: ChatId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<Keyboard>,
}

impl OutgoingMessage {
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(chat_id: ChatId, text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            chat_id,
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Inline keyboard attached to an outgoing message.
///
/// Rows of labeled buttons; each button fires a [`CallbackAction`]
/// back through the event stream when pressed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<KeyboardButton>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub label: String,
    pub action: CallbackAction,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<(&str, CallbackAction)>) -> Self {
        self.rows.push(
            buttons
                .into_iter()
                .map(|(label, action)| KeyboardButton {
                    label: label.to_string(),
                    action,
                })
                .collect(),
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_action_roundtrip() {
        for action in [
            CallbackAction::GetSchedule,
            CallbackAction::Subscribe,
            CallbackAction::Unsubscribe,
        ] {
            assert_eq!(CallbackAction::parse(action.token()), Some(action));
        }
        assert_eq!(CallbackAction::parse("delete_everything"), None);
    }

    #[test]
    fn test_inbound_event_chat_id() {
        let msg = InboundEvent::Message {
            chat_id: 42,
            text: "/start".into(),
        };
        assert_eq!(msg.chat_id(), 42);

        let cb = InboundEvent::Callback {
            chat_id: 7,
            action: CallbackAction::Subscribe,
        };
        assert_eq!(cb.chat_id(), 7);
    }

    #[test]
    fn test_outgoing_constructors() {
        let plain = OutgoingMessage::text(1, "hello");
        assert!(plain.keyboard.is_none());

        let keyboard = Keyboard::new().row(vec![("Subscribe", CallbackAction::Subscribe)]);
        let with_kb = OutgoingMessage::with_keyboard(1, "pick one", keyboard);
        let kb = with_kb.keyboard.expect("keyboard attached");
        assert_eq!(kb.rows.len(), 1);
        assert_eq!(kb.rows[0][0].label, "Subscribe");
    }
}
