//! Reminder sinks
//!
//! The sweep only computes who is due; what happens with that list is up to
//! the sink. Outbound delivery (SMS, WhatsApp, ...) lives outside this crate.

use async_trait::async_trait;
use shared::models::{Member, Owner};

/// Receives one owner's due members per sweep
#[async_trait]
pub trait ReminderSink: Send + Sync {
    async fn deliver(&self, owner: &Owner, due: &[Member]) -> anyhow::Result<()>;
}

/// Default sink: writes one log line per due member
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

#[async_trait]
impl ReminderSink for LoggingSink {
    async fn deliver(&self, owner: &Owner, due: &[Member]) -> anyhow::Result<()> {
        for member in due {
            tracing::info!(
                owner_id = owner.id,
                member_id = member.id,
                member = %member.name,
                mobile_no = member.mobile_no.as_deref().unwrap_or("-"),
                "Payment due today"
            );
        }
        Ok(())
    }
}
