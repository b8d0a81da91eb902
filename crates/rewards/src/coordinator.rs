//! Settlement coordination
//!
//! The atomic engine delegates to a [`SettlementLedger`] and the whole
//! settlement commits or rolls back as one unit. The sequential engine
//! exists for deployments without a transactional backend: the dedup
//! guard and the viewer credit are hard failures, the campaign counter
//! and advertiser debit are not. When a non-critical write fails the
//! viewer keeps the points and the books are off by one settlement
//! until reconciliation, which is logged as ledger drift.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use adssimsim_core::error::AdssimsimError;
use adssimsim_core::models::Campaign;
use adssimsim_core::Result;
use adssimsim_store::repository::{
    AdViewStore, CampaignRepository, ProfileRepository, SettlementLedger,
};

/// What a settlement left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementOutcome {
    /// Viewer's reward point total after the credit
    pub viewer_points: i64,
    /// True when a non-critical write failed and the campaign counters
    /// or advertiser balance lag the viewer credit
    pub ledger_drift: bool,
}

enum Engine {
    Atomic {
        ledger: Arc<dyn SettlementLedger>,
    },
    Sequential {
        ad_views: Arc<dyn AdViewStore>,
        profiles: Arc<dyn ProfileRepository>,
        campaigns: Arc<dyn CampaignRepository>,
    },
}

pub struct SettlementCoordinator {
    engine: Engine,
}

impl SettlementCoordinator {
    pub fn atomic(ledger: Arc<dyn SettlementLedger>) -> Self {
        Self {
            engine: Engine::Atomic { ledger },
        }
    }

    pub fn sequential(
        ad_views: Arc<dyn AdViewStore>,
        profiles: Arc<dyn ProfileRepository>,
        campaigns: Arc<dyn CampaignRepository>,
    ) -> Self {
        Self {
            engine: Engine::Sequential {
                ad_views,
                profiles,
                campaigns,
            },
        }
    }

    /// Settle one completed view of `campaign` by `viewer_id`
    pub async fn settle(&self, viewer_id: Uuid, campaign: &Campaign) -> Result<SettlementOutcome> {
        if !campaign.is_claimable() {
            return Err(AdssimsimError::validation(format!(
                "campaign {} is not claimable in status {}",
                campaign.id,
                campaign.status.as_str()
            )));
        }

        match &self.engine {
            Engine::Atomic { ledger } => {
                let record = ledger
                    .settle_atomic(viewer_id, campaign.id, campaign.advertiser_id, campaign.reward)
                    .await?;
                info!(%viewer_id, campaign_id = %campaign.id, reward = campaign.reward, "settled");
                Ok(SettlementOutcome {
                    viewer_points: record.viewer_points,
                    ledger_drift: false,
                })
            }
            Engine::Sequential {
                ad_views,
                profiles,
                campaigns,
            } => {
                if !ad_views.insert_if_absent(viewer_id, campaign.id).await? {
                    return Err(AdssimsimError::duplicate_claim(viewer_id, campaign.id));
                }

                // The view row is already recorded; failing the credit
                // here leaves a view without points, which must surface
                // as critical rather than be silently swallowed
                let viewer_points = profiles
                    .credit_reward_points(viewer_id, campaign.reward)
                    .await
                    .map_err(|e| {
                        AdssimsimError::critical(format!("viewer credit failed: {e}"))
                    })?;

                let mut ledger_drift = false;
                if let Err(error) = campaigns.record_view(campaign.id, campaign.reward).await {
                    let drift =
                        AdssimsimError::non_critical("campaign_stats", error.to_string());
                    warn!(campaign_id = %campaign.id, %drift, "ledger drift");
                    ledger_drift = true;
                }
                if let Err(error) = profiles
                    .debit_credit_balance(campaign.advertiser_id, campaign.reward)
                    .await
                {
                    let drift =
                        AdssimsimError::non_critical("advertiser_debit", error.to_string());
                    warn!(advertiser_id = %campaign.advertiser_id, %drift, "ledger drift");
                    ledger_drift = true;
                }

                info!(%viewer_id, campaign_id = %campaign.id, reward = campaign.reward, ledger_drift, "settled");
                Ok(SettlementOutcome {
                    viewer_points,
                    ledger_drift,
                })
            }
        }
    }
}
