//! Resolved status buckets for a target date

use serde::{Deserialize, Serialize};

use super::ledger::PaymentChannel;
use super::member::Member;

/// Member paid on the target date, tagged with the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaidMember {
    #[serde(flatten)]
    pub member: Member,
    pub channel: PaymentChannel,
}

/// Status of every billing candidate on one date, each bucket sorted by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusBuckets {
    pub pending: Vec<Member>,
    pub paid: Vec<PaidMember>,
    pub suspended: Vec<Member>,
}

impl StatusBuckets {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.paid.is_empty() && self.suspended.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len() + self.paid.len() + self.suspended.len()
    }
}
