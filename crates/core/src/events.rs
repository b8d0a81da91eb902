//! Change events for campaigns and profile balances
//!
//! Both store backends publish change events over tokio broadcast
//! channels. Subscribers receive a filtered stream wrapper; a lagged
//! receiver skips to the newest event instead of failing, since any
//! delivered event only triggers a full resync anyway.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::models::{Campaign, CampaignStatus};

/// Kind of row change observed at the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "INSERT" => ChangeKind::Insert,
            "DELETE" => ChangeKind::Delete,
            _ => ChangeKind::Update,
        }
    }
}

/// A campaign row changed at the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignChangeEvent {
    pub kind: ChangeKind,
    pub campaign: Campaign,
}

/// A profile's counters changed at the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceChangeEvent {
    pub profile_id: Uuid,
    pub reward_points: i64,
    pub credit_balance: i64,
}

/// Server-side filter for campaign listings and subscriptions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignFilter {
    pub status: Option<CampaignStatus>,
    pub advertiser_id: Option<Uuid>,
}

impl CampaignFilter {
    /// Active campaigns only, the viewer feed filter
    pub fn active() -> Self {
        Self {
            status: Some(CampaignStatus::Active),
            advertiser_id: None,
        }
    }

    /// Everything owned by one advertiser, the dashboard filter
    pub fn advertiser(advertiser_id: Uuid) -> Self {
        Self {
            status: None,
            advertiser_id: Some(advertiser_id),
        }
    }

    pub fn matches(&self, campaign: &Campaign) -> bool {
        if let Some(status) = self.status {
            if campaign.status != status {
                return false;
            }
        }
        if let Some(advertiser_id) = self.advertiser_id {
            if campaign.advertiser_id != advertiser_id {
                return false;
            }
        }
        true
    }
}

/// Filtered stream of campaign change events
pub struct CampaignEvents {
    rx: broadcast::Receiver<CampaignChangeEvent>,
    filter: CampaignFilter,
}

impl CampaignEvents {
    pub fn new(rx: broadcast::Receiver<CampaignChangeEvent>, filter: CampaignFilter) -> Self {
        Self { rx, filter }
    }

    /// Next matching event, or `None` once the publisher is gone
    ///
    /// Deletes always pass the filter: a row leaving the filtered set is
    /// exactly what a subscriber needs to resync over.
    pub async fn recv(&mut self) -> Option<CampaignChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if event.kind == ChangeKind::Delete || self.filter.matches(&event.campaign) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "campaign event stream lagged, skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Filtered stream of balance change events for one profile
pub struct BalanceEvents {
    rx: broadcast::Receiver<BalanceChangeEvent>,
    profile_id: Uuid,
}

impl BalanceEvents {
    pub fn new(rx: broadcast::Receiver<BalanceChangeEvent>, profile_id: Uuid) -> Self {
        Self { rx, profile_id }
    }

    pub async fn recv(&mut self) -> Option<BalanceChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.profile_id == self.profile_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "balance event stream lagged, skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
