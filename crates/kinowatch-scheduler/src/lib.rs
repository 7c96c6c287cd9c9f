//! # kinowatch-scheduler
//!
//! Daily broadcast trigger: a poll loop that wakes every few seconds,
//! compares local wall-clock time against the configured trigger time, and
//! fans the day's schedule out to every subscriber at most once per
//! calendar day.
//!
//! The once-per-day guarantee comes from an explicit last-fired-date
//! marker, not from sleeping past the trigger minute, so duplicate or
//! delayed poll ticks inside the trigger minute cannot double-fire.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use kinowatch_core::config::BroadcastConfig;
use kinowatch_core::traits::{Channel, ScheduleSource};
use kinowatch_core::types::OutgoingMessage;
use kinowatch_registry::Registry;

/// Daily trigger loop over a shared registry.
pub struct SchedulerEngine {
    channel: Arc<dyn Channel>,
    source: Arc<dyn ScheduleSource>,
    registry: Arc<Registry>,
    hour: u32,
    minute: u32,
    poll_interval: Duration,
    last_fired: Option<NaiveDate>,
}

impl SchedulerEngine {
    pub fn new(
        config: &BroadcastConfig,
        channel: Arc<dyn Channel>,
        source: Arc<dyn ScheduleSource>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            channel,
            source,
            registry,
            hour: config.hour,
            minute: config.minute,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            last_fired: None,
        }
    }

    /// Whether a tick at `now` should fire: trigger minute matched and
    /// today has not fired yet.
    fn due(&self, now: NaiveDateTime) -> bool {
        now.hour() == self.hour
            && now.minute() == self.minute
            && self.last_fired != Some(now.date())
    }

    /// Evaluate one poll tick. Returns true if the broadcast fired.
    pub async fn tick(&mut self, now: NaiveDateTime) -> bool {
        if !self.due(now) {
            return false;
        }
        tracing::info!(date = %now.date(), "trigger time reached, broadcasting");
        self.broadcast().await;
        self.last_fired = Some(now.date());
        true
    }

    /// Fetch the schedule once and send it to a registry snapshot,
    /// best-effort per recipient.
    pub async fn broadcast(&self) -> usize {
        let text = self.source.fetch().await;
        let recipients = self.registry.snapshot().await;

        let mut failed = 0usize;
        for chat_id in &recipients {
            if let Err(e) = self
                .channel
                .send(OutgoingMessage::text(*chat_id, text.clone()))
                .await
            {
                failed += 1;
                tracing::warn!(chat_id, "broadcast send failed: {e}");
            }
        }

        tracing::info!(
            recipients = recipients.len(),
            failed,
            "daily broadcast complete"
        );
        recipients.len()
    }

    /// Run for process lifetime: evaluate, sleep, repeat.
    pub async fn run(mut self) {
        tracing::info!(
            hour = self.hour,
            minute = self.minute,
            poll_secs = self.poll_interval.as_secs(),
            "scheduler started"
        );
        loop {
            self.tick(Local::now().naive_local()).await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
