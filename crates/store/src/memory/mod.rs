//! In-memory backend
//!
//! Backs tests and embedding callers that run without Postgres. Maps are
//! dashmap, change events go over tokio broadcast channels, and the
//! ledger serializes multi-map transitions behind a mutex.

mod ad_views;
mod campaigns;
mod ledger;
mod profiles;

pub use ad_views::InMemoryAdViewStore;
pub use campaigns::InMemoryCampaignRepository;
pub use ledger::InMemorySettlementLedger;
pub use profiles::InMemoryProfileRepository;

/// The four in-memory stores wired over shared state
///
/// The ledger mutates the same maps the repositories read, so a settle
/// through [`InMemoryStore::ledger`] is observable through
/// [`InMemoryStore::campaigns`] and [`InMemoryStore::profiles`].
#[derive(Clone)]
pub struct InMemoryStore {
    pub campaigns: InMemoryCampaignRepository,
    pub profiles: InMemoryProfileRepository,
    pub ad_views: InMemoryAdViewStore,
    pub ledger: InMemorySettlementLedger,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let campaigns = InMemoryCampaignRepository::new();
        let profiles = InMemoryProfileRepository::new();
        let ad_views = InMemoryAdViewStore::new();
        let ledger =
            InMemorySettlementLedger::new(campaigns.clone(), profiles.clone(), ad_views.clone());

        Self {
            campaigns,
            profiles,
            ad_views,
            ledger,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
