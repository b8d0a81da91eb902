//! Storage backends for campaigns, profiles, and ad views
//!
//! [`repository`] defines the traits the rest of the workspace programs
//! against. [`memory`] backs them with sharded maps for tests and
//! single-process runs; [`postgres`] backs them with sqlx, NOTIFY
//! triggers, and a transactional settlement ledger.

pub mod memory;
pub mod postgres;
pub mod repository;

pub use memory::{
    InMemoryAdViewStore, InMemoryCampaignRepository, InMemoryProfileRepository,
    InMemorySettlementLedger, InMemoryStore,
};
pub use postgres::{
    ChangeFeed, PgAdViewStore, PgCampaignRepository, PgProfileRepository, PgSettlementLedger,
};
pub use repository::{
    AdViewStore, CampaignRepository, ProfileRepository, SettlementLedger, SettlementRecord,
};
