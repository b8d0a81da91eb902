//! In-memory campaign repository

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use adssimsim_core::error::AdssimsimError;
use adssimsim_core::events::{CampaignChangeEvent, CampaignEvents, CampaignFilter, ChangeKind};
use adssimsim_core::models::{Campaign, CampaignDraft, CampaignPatch, CampaignStatus};
use adssimsim_core::pagination::PageRequest;
use adssimsim_core::validation::validate_input;
use adssimsim_core::Result;

use crate::repository::CampaignRepository;

const EVENT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct InMemoryCampaignRepository {
    campaigns: Arc<DashMap<Uuid, Campaign>>,
    events: broadcast::Sender<CampaignChangeEvent>,
}

impl InMemoryCampaignRepository {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            campaigns: Arc::new(DashMap::new()),
            events,
        }
    }

    /// Seed an already-materialized campaign, bypassing draft validation
    pub fn insert(&self, campaign: Campaign) {
        self.campaigns.insert(campaign.id, campaign.clone());
        self.publish(ChangeKind::Insert, campaign);
    }

    fn publish(&self, kind: ChangeKind, campaign: Campaign) {
        // A send error only means nobody is subscribed right now
        let _ = self.events.send(CampaignChangeEvent { kind, campaign });
    }
}

impl Default for InMemoryCampaignRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignRepository {
    async fn create(&self, draft: &CampaignDraft) -> Result<Campaign> {
        validate_input(draft)?;

        let campaign = Campaign {
            id: Uuid::new_v4(),
            advertiser_id: draft.advertiser_id,
            name: draft.name.clone(),
            budget: draft.budget,
            reward: draft.reward,
            impressions: 0,
            clicks: 0,
            rewarded_points: 0,
            status: CampaignStatus::Active,
            kind: draft.kind,
            goal: draft.goal,
            category: draft.category.clone(),
            cta_text: draft.cta_text.clone(),
            landing_page_url: draft.landing_page_url.clone(),
            creative_url: draft.creative_url.clone(),
            thumbnail_url: draft.thumbnail_url.clone(),
            duration: draft.duration,
            company: draft.company.clone(),
            upload_error: None,
            client_ref: draft.client_ref,
            created_at: chrono::Utc::now(),
        };

        self.campaigns.insert(campaign.id, campaign.clone());
        self.publish(ChangeKind::Insert, campaign.clone());
        debug!(campaign_id = %campaign.id, "campaign created");
        Ok(campaign)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Campaign>> {
        Ok(self.campaigns.get(&id).map(|entry| entry.clone()))
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Campaign>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.campaigns.get(id).map(|entry| entry.clone()))
            .collect())
    }

    async fn list(&self, filter: &CampaignFilter, page: PageRequest) -> Result<Vec<Campaign>> {
        let mut matching: Vec<Campaign> = self
            .campaigns
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.clone())
            .collect();

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(matching
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn update(&self, id: Uuid, patch: &CampaignPatch) -> Result<Campaign> {
        validate_input(patch)?;

        let updated = {
            let mut entry = self
                .campaigns
                .get_mut(&id)
                .ok_or_else(|| AdssimsimError::not_found("campaign", id))?;
            *entry = patch.apply(entry.clone());
            entry.clone()
        };

        self.publish(ChangeKind::Update, updated.clone());
        Ok(updated)
    }

    async fn record_view(&self, id: Uuid, reward: i64) -> Result<()> {
        let updated = {
            let mut entry = self
                .campaigns
                .get_mut(&id)
                .ok_or_else(|| AdssimsimError::not_found("campaign", id))?;
            entry.impressions += 1;
            entry.rewarded_points += reward;
            entry.clone()
        };

        self.publish(ChangeKind::Update, updated);
        Ok(())
    }

    async fn record_click(&self, id: Uuid) -> Result<()> {
        let updated = {
            let mut entry = self
                .campaigns
                .get_mut(&id)
                .ok_or_else(|| AdssimsimError::not_found("campaign", id))?;
            entry.clicks += 1;
            entry.clone()
        };

        self.publish(ChangeKind::Update, updated);
        Ok(())
    }

    fn subscribe(&self, filter: CampaignFilter) -> CampaignEvents {
        CampaignEvents::new(self.events.subscribe(), filter)
    }
}
