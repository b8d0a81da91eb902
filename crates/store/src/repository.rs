//! Repository contracts for the campaign, profile, and ad view stores
//!
//! Every backend implements these traits; callers in the rewards and feed
//! crates only ever see the trait objects. Counter updates are atomic at
//! the store (`SET x = x + $n` or the in-memory equivalent), never
//! read-modify-write through a fetched row.

use async_trait::async_trait;
use uuid::Uuid;

use adssimsim_core::events::{BalanceEvents, CampaignEvents, CampaignFilter};
use adssimsim_core::models::{
    AdView, Campaign, CampaignDraft, CampaignPatch, Profile, ProfilePatch,
};
use adssimsim_core::pagination::PageRequest;
use adssimsim_core::Result;

/// Campaign catalog operations
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Persist a draft and return the authoritative row
    async fn create(&self, draft: &CampaignDraft) -> Result<Campaign>;

    async fn get(&self, id: Uuid) -> Result<Option<Campaign>>;

    /// Fetch a batch of campaigns by id; missing ids are silently skipped
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Campaign>>;

    /// List campaigns matching `filter`, newest first
    async fn list(&self, filter: &CampaignFilter, page: PageRequest) -> Result<Vec<Campaign>>;

    async fn update(&self, id: Uuid, patch: &CampaignPatch) -> Result<Campaign>;

    /// Atomically bump impressions and rewarded points for one settled view
    async fn record_view(&self, id: Uuid, reward: i64) -> Result<()>;

    /// Atomically bump the click counter
    async fn record_click(&self, id: Uuid) -> Result<()>;

    /// Subscribe to change events matching `filter`
    fn subscribe(&self, filter: CampaignFilter) -> CampaignEvents;
}

/// Ad view store, the settlement idempotency guard
#[async_trait]
pub trait AdViewStore: Send + Sync {
    /// Insert the (viewer, campaign) row unless it already exists
    ///
    /// Returns `true` when the row was inserted, `false` when the pair was
    /// already present. Implementations must decide in a single atomic
    /// step, never as a lookup followed by an insert.
    async fn insert_if_absent(&self, viewer_id: Uuid, campaign_id: Uuid) -> Result<bool>;

    /// The viewer's ad views, newest first, capped at `limit`
    async fn list_for_viewer(&self, viewer_id: Uuid, limit: u32) -> Result<Vec<AdView>>;
}

/// Profile account operations
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Profile>>;

    async fn update(&self, id: Uuid, patch: &ProfilePatch) -> Result<Profile>;

    /// Atomically add `delta` reward points; returns the new total
    async fn credit_reward_points(&self, id: Uuid, delta: i64) -> Result<i64>;

    /// Atomically subtract `delta` from the credit balance; returns the
    /// new balance, which may be negative
    async fn debit_credit_balance(&self, id: Uuid, delta: i64) -> Result<i64>;

    /// Grant the starting credit balance exactly once
    ///
    /// Returns `true` when the grant was applied, `false` when the profile
    /// has already held credit.
    async fn ensure_initial_credit(&self, id: Uuid, amount: i64) -> Result<bool>;

    /// Subscribe to balance changes for one profile
    fn subscribe(&self, profile_id: Uuid) -> BalanceEvents;
}

/// Single-transaction settlement primitive
#[async_trait]
pub trait SettlementLedger: Send + Sync {
    /// Settle one ad view in a single transaction
    ///
    /// Inserts the ad view, credits the viewer, bumps the campaign
    /// counters, and debits the advertiser; either every step lands or
    /// none do. A pre-existing (viewer, campaign) row rolls the
    /// transaction back and returns `DuplicateClaim`.
    async fn settle_atomic(
        &self,
        viewer_id: Uuid,
        campaign_id: Uuid,
        advertiser_id: Uuid,
        reward: i64,
    ) -> Result<SettlementRecord>;
}

/// Result of an atomic settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRecord {
    /// The newly inserted ad view row
    pub view_id: Uuid,
    /// The viewer's point total after the credit
    pub viewer_points: i64,
    /// The advertiser's balance after the debit
    pub advertiser_balance: i64,
}
