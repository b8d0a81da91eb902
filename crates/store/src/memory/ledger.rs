//! In-memory settlement ledger
//!
//! The Postgres ledger gets atomicity from a transaction; here a mutex
//! serializes settlements and every precondition is checked before the
//! first mutation, so a failed settle leaves the maps untouched.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use adssimsim_core::error::AdssimsimError;
use adssimsim_core::Result;

use crate::memory::{InMemoryAdViewStore, InMemoryCampaignRepository, InMemoryProfileRepository};
use crate::repository::{
    AdViewStore, CampaignRepository, ProfileRepository, SettlementLedger, SettlementRecord,
};

#[derive(Clone)]
pub struct InMemorySettlementLedger {
    campaigns: InMemoryCampaignRepository,
    profiles: InMemoryProfileRepository,
    ad_views: InMemoryAdViewStore,
    lock: Arc<Mutex<()>>,
}

impl InMemorySettlementLedger {
    pub fn new(
        campaigns: InMemoryCampaignRepository,
        profiles: InMemoryProfileRepository,
        ad_views: InMemoryAdViewStore,
    ) -> Self {
        Self {
            campaigns,
            profiles,
            ad_views,
            lock: Arc::new(Mutex::new(())),
        }
    }
}

#[async_trait]
impl SettlementLedger for InMemorySettlementLedger {
    async fn settle_atomic(
        &self,
        viewer_id: Uuid,
        campaign_id: Uuid,
        advertiser_id: Uuid,
        reward: i64,
    ) -> Result<SettlementRecord> {
        let _guard = self.lock.lock().await;

        // Preconditions first; nothing below may fail once mutation starts
        if self.campaigns.get(campaign_id).await?.is_none() {
            return Err(AdssimsimError::not_found("campaign", campaign_id));
        }
        if self.profiles.get(viewer_id).await?.is_none() {
            return Err(AdssimsimError::critical("viewer profile missing"));
        }
        if self.profiles.get(advertiser_id).await?.is_none() {
            return Err(AdssimsimError::not_found("profile", advertiser_id));
        }

        if !self.ad_views.insert_if_absent(viewer_id, campaign_id).await? {
            return Err(AdssimsimError::duplicate_claim(viewer_id, campaign_id));
        }

        let viewer_points = self.profiles.credit_reward_points(viewer_id, reward).await?;
        self.campaigns.record_view(campaign_id, reward).await?;
        let advertiser_balance = self
            .profiles
            .debit_credit_balance(advertiser_id, reward)
            .await?;

        let view = self
            .ad_views
            .get(viewer_id, campaign_id)
            .ok_or_else(|| AdssimsimError::critical("settled view vanished"))?;

        debug!(%viewer_id, %campaign_id, reward, "settlement committed");
        Ok(SettlementRecord {
            view_id: view.id,
            viewer_points,
            advertiser_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use adssimsim_core::models::{
        CampaignDraft, CampaignGoal, CampaignKind, CompanyInfo, Profile, Role,
    };

    async fn seeded() -> (InMemoryStore, Uuid, Uuid, Uuid) {
        let store = InMemoryStore::new();

        let mut viewer = Profile::new(
            Uuid::new_v4(),
            "watcher".to_string(),
            "watcher@example.com".to_string(),
            Role::Viewer,
        );
        viewer.reward_points = 100;
        store.profiles.insert(viewer.clone());

        let mut advertiser = Profile::new(
            Uuid::new_v4(),
            "acme".to_string(),
            "ads@acme.example".to_string(),
            Role::Advertiser,
        );
        advertiser.credit_balance = 500;
        store.profiles.insert(advertiser.clone());

        let campaign = store
            .campaigns
            .create(&CampaignDraft {
                advertiser_id: advertiser.id,
                name: "Launch".to_string(),
                budget: 1000,
                reward: 10,
                kind: CampaignKind::Video,
                goal: CampaignGoal::BrandAwareness,
                category: "Tech".to_string(),
                cta_text: "Go".to_string(),
                landing_page_url: "https://example.com".to_string(),
                creative_url: "https://example.com/ad.mp4".to_string(),
                thumbnail_url: None,
                duration: 15,
                company: CompanyInfo::named("Acme"),
                client_ref: None,
            })
            .await
            .unwrap();

        (store, viewer.id, campaign.id, advertiser.id)
    }

    #[tokio::test]
    async fn test_settle_moves_points_and_counters_together() {
        let (store, viewer_id, campaign_id, advertiser_id) = seeded().await;

        let record = store
            .ledger
            .settle_atomic(viewer_id, campaign_id, advertiser_id, 10)
            .await
            .unwrap();

        assert_eq!(record.viewer_points, 110);
        assert_eq!(record.advertiser_balance, 490);

        let campaign = store.campaigns.get(campaign_id).await.unwrap().unwrap();
        assert_eq!(campaign.impressions, 1);
        assert_eq!(campaign.rewarded_points, 10);
        assert!(store.ad_views.get(viewer_id, campaign_id).is_some());
    }

    #[tokio::test]
    async fn test_second_settle_is_duplicate_and_changes_nothing() {
        let (store, viewer_id, campaign_id, advertiser_id) = seeded().await;

        store
            .ledger
            .settle_atomic(viewer_id, campaign_id, advertiser_id, 10)
            .await
            .unwrap();
        let second = store
            .ledger
            .settle_atomic(viewer_id, campaign_id, advertiser_id, 10)
            .await;

        assert!(matches!(
            second,
            Err(AdssimsimError::DuplicateClaim { .. })
        ));

        let viewer = store.profiles.get(viewer_id).await.unwrap().unwrap();
        assert_eq!(viewer.reward_points, 110);
        let campaign = store.campaigns.get(campaign_id).await.unwrap().unwrap();
        assert_eq!(campaign.impressions, 1);
    }

    #[tokio::test]
    async fn test_concurrent_settles_have_one_winner() {
        let (store, viewer_id, campaign_id, advertiser_id) = seeded().await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = store.ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .settle_atomic(viewer_id, campaign_id, advertiser_id, 10)
                    .await
            }));
        }

        let mut successes = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AdssimsimError::DuplicateClaim { .. }) => duplicates += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(duplicates, 7);

        let viewer = store.profiles.get(viewer_id).await.unwrap().unwrap();
        assert_eq!(viewer.reward_points, 110);
    }

    #[tokio::test]
    async fn test_missing_campaign_fails_before_any_write() {
        let (store, viewer_id, _, advertiser_id) = seeded().await;
        let ghost = Uuid::new_v4();

        let result = store
            .ledger
            .settle_atomic(viewer_id, ghost, advertiser_id, 10)
            .await;
        assert!(matches!(result, Err(AdssimsimError::NotFound { .. })));

        let viewer = store.profiles.get(viewer_id).await.unwrap().unwrap();
        assert_eq!(viewer.reward_points, 100);
        assert!(store.ad_views.get(viewer_id, ghost).is_none());
    }
}
