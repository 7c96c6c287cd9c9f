//! Seams between the bot logic and its external collaborators.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::OutgoingMessage;

/// Outbound side of a messaging platform.
///
/// Implementations deliver a message to one recipient; delivery failures
/// come back as errors and are the caller's to log. Inbound events are
/// produced separately, as a stream, by the concrete channel.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: OutgoingMessage) -> Result<()>;
}

/// Produces the current day's formatted listing text.
///
/// Infallible by contract: every failure mode maps to user-displayable
/// placeholder text, never an error to the caller.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch(&self) -> String;
}
