//! Watch history
//!
//! Views and campaigns live in different stores, so the history is a
//! two-step fetch joined in memory. Views whose campaign has since
//! been deleted are dropped rather than surfaced half-empty.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use adssimsim_core::models::{Campaign, WatchedAd};
use adssimsim_core::Result;
use adssimsim_store::repository::{AdViewStore, CampaignRepository};

pub struct WatchHistory {
    ad_views: Arc<dyn AdViewStore>,
    campaigns: Arc<dyn CampaignRepository>,
}

impl WatchHistory {
    pub fn new(ad_views: Arc<dyn AdViewStore>, campaigns: Arc<dyn CampaignRepository>) -> Self {
        Self {
            ad_views,
            campaigns,
        }
    }

    /// The viewer's most recent `limit` watched ads, newest first
    pub async fn history(&self, viewer_id: Uuid, limit: u32) -> Result<Vec<WatchedAd>> {
        let views = self.ad_views.list_for_viewer(viewer_id, limit).await?;
        if views.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = views.iter().map(|view| view.campaign_id).collect();
        let campaigns: HashMap<Uuid, Campaign> = self
            .campaigns
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|campaign| (campaign.id, campaign))
            .collect();

        let history: Vec<WatchedAd> = views
            .into_iter()
            .filter_map(|view| {
                campaigns.get(&view.campaign_id).map(|campaign| WatchedAd {
                    campaign: campaign.clone(),
                    watched_on: view.created_at,
                })
            })
            .collect();

        debug!(%viewer_id, entries = history.len(), "watch history assembled");
        Ok(history)
    }
}
