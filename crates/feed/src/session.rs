//! Client sessions
//!
//! [`FeedSession`] owns the pair of background tasks keeping a
//! [`FeedSynchronizer`] live: a push task that resyncs on every change
//! event and a poll task that resyncs on a timer, covering windows
//! where push notifications were lost. The two are acquired and
//! released together; `close()` (also run by `Drop`) aborts both
//! before returning.
//!
//! [`ViewerSession`] and [`AdvertiserSession`] wrap the user-facing
//! mutations in optimistic state transitions.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use adssimsim_core::events::CampaignEvents;
use adssimsim_core::models::{Campaign, CampaignDraft, CampaignPatch, WatchedAd};
use adssimsim_core::Result;
use adssimsim_rewards::{SettlementCoordinator, WatchHistory};
use adssimsim_store::repository::{CampaignRepository, ProfileRepository};

use crate::optimistic::OptimisticCell;
use crate::synchronizer::FeedSynchronizer;

/// A live feed subscription: push events plus a poll fallback
pub struct FeedSession {
    push_task: JoinHandle<()>,
    poll_task: JoinHandle<()>,
}

impl FeedSession {
    pub fn open(
        synchronizer: Arc<FeedSynchronizer>,
        mut events: CampaignEvents,
        poll_interval: Duration,
    ) -> Self {
        let push_sync = synchronizer.clone();
        let push_task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!(campaign_id = %event.campaign.id, "change event, resyncing");
                if let Err(error) = push_sync.resync().await {
                    warn!(%error, "push-triggered resync failed");
                }
            }
        });

        let poll_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(error) = synchronizer.resync().await {
                    warn!(%error, "poll resync failed");
                }
            }
        });

        Self {
            push_task,
            poll_task,
        }
    }

    /// Stop both background tasks
    ///
    /// Abort is synchronous; once this returns neither task will touch
    /// the synchronizer again.
    pub fn close(&mut self) {
        self.push_task.abort();
        self.poll_task.abort();
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// A viewer's claim state and watch history
pub struct ViewerSession {
    viewer_id: Uuid,
    coordinator: Arc<SettlementCoordinator>,
    history: WatchHistory,
    points: Mutex<OptimisticCell<i64>>,
}

impl ViewerSession {
    pub fn new(
        viewer_id: Uuid,
        starting_points: i64,
        coordinator: Arc<SettlementCoordinator>,
        history: WatchHistory,
    ) -> Self {
        Self {
            viewer_id,
            coordinator,
            history,
            points: Mutex::new(OptimisticCell::new(starting_points)),
        }
    }

    pub async fn points(&self) -> i64 {
        *self.points.lock().await.value()
    }

    /// Claim the reward for a completed view
    ///
    /// Points are credited optimistically before settlement; the lock
    /// is held across the settle call, so a session never has two
    /// claims in flight.
    pub async fn claim_reward(&self, campaign: &Campaign) -> Result<i64> {
        let mut points = self.points.lock().await;
        let optimistic = *points.value() + campaign.reward;
        points.begin(optimistic)?;

        match self.coordinator.settle(self.viewer_id, campaign).await {
            Ok(outcome) => {
                points.commit(outcome.viewer_points)?;
                Ok(outcome.viewer_points)
            }
            Err(error) => {
                points.rollback()?;
                Err(error)
            }
        }
    }

    /// Claimable campaigns from the feed, minus already-watched ones
    pub async fn claimable_feed(
        &self,
        synchronizer: &FeedSynchronizer,
        query: &str,
        history_limit: u32,
    ) -> Result<Vec<Campaign>> {
        let watched: HashSet<Uuid> = self
            .history
            .history(self.viewer_id, history_limit)
            .await?
            .into_iter()
            .map(|watched| watched.campaign.id)
            .collect();

        Ok(synchronizer
            .snapshot(query)
            .await
            .into_iter()
            .map(|entry| entry.campaign().clone())
            .filter(|campaign| campaign.is_claimable() && !watched.contains(&campaign.id))
            .collect())
    }

    pub async fn watch_history(&self, limit: u32) -> Result<Vec<WatchedAd>> {
        self.history.history(self.viewer_id, limit).await
    }
}

/// An advertiser's campaign management state
pub struct AdvertiserSession {
    advertiser_id: Uuid,
    campaigns: Arc<dyn CampaignRepository>,
    synchronizer: Arc<FeedSynchronizer>,
}

impl AdvertiserSession {
    /// Open a session, granting the one-time starter credit if this
    /// advertiser has never held a balance
    pub async fn open(
        advertiser_id: Uuid,
        campaigns: Arc<dyn CampaignRepository>,
        profiles: Arc<dyn ProfileRepository>,
        synchronizer: Arc<FeedSynchronizer>,
        initial_credit: i64,
    ) -> Result<Self> {
        if profiles
            .ensure_initial_credit(advertiser_id, initial_credit)
            .await?
        {
            info!(%advertiser_id, initial_credit, "starter credit granted");
        }

        Ok(Self {
            advertiser_id,
            campaigns,
            synchronizer,
        })
    }

    /// Create a campaign with a visible placeholder while the write is
    /// in flight
    ///
    /// On failure the placeholder flips to `UploadFailed` with the
    /// error attached instead of disappearing.
    pub async fn create_campaign(&self, mut draft: CampaignDraft) -> Result<Campaign> {
        draft.advertiser_id = self.advertiser_id;
        let client_ref = Uuid::new_v4();
        draft.client_ref = Some(client_ref);

        self.synchronizer
            .insert_placeholder(draft.placeholder(client_ref))
            .await;

        match self.campaigns.create(&draft).await {
            Ok(campaign) => {
                self.synchronizer
                    .promote_placeholder(client_ref, campaign.clone())
                    .await;
                Ok(campaign)
            }
            Err(error) => {
                self.synchronizer
                    .fail_placeholder(client_ref, &error.to_string())
                    .await;
                Err(error)
            }
        }
    }

    /// Adjust a campaign's reward, optimistically in the feed first
    pub async fn adjust_reward(&self, campaign: &Campaign, new_reward: i64) -> Result<Campaign> {
        let mut cell = OptimisticCell::new(campaign.clone());
        let mut optimistic = campaign.clone();
        optimistic.reward = new_reward;
        cell.begin(optimistic.clone())?;
        self.synchronizer.upsert(optimistic).await;

        match self
            .campaigns
            .update(campaign.id, &CampaignPatch::reward(new_reward))
            .await
        {
            Ok(updated) => {
                cell.commit(updated.clone())?;
                self.synchronizer.upsert(updated.clone()).await;
                Ok(updated)
            }
            Err(error) => {
                let prior = cell.rollback()?;
                self.synchronizer.upsert(prior).await;
                Err(error)
            }
        }
    }
}
