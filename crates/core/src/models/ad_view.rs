//! Ad view records
//!
//! An [`AdView`] is immutable once created and is the idempotency record
//! for settlement: at most one row exists per (viewer, campaign) pair,
//! enforced by a uniqueness constraint in the backing store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Campaign;

/// Record that a viewer has watched a campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdView {
    pub id: Uuid,
    pub viewer_id: Uuid,
    pub campaign_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl AdView {
    pub fn new(viewer_id: Uuid, campaign_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            viewer_id,
            campaign_id,
            created_at: Utc::now(),
        }
    }
}

/// An ad view joined with its campaign, for watch history listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedAd {
    pub campaign: Campaign,
    pub watched_on: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ad_view_binds_pair() {
        let viewer_id = Uuid::new_v4();
        let campaign_id = Uuid::new_v4();
        let view = AdView::new(viewer_id, campaign_id);

        assert_eq!(view.viewer_id, viewer_id);
        assert_eq!(view.campaign_id, campaign_id);
    }
}
