//! Core library for the Adssimsim watch-to-earn platform
//!
//! Shared building blocks used by the store, rewards, and feed crates:
//!
//! - `config` - Environment-based configuration loading
//! - `database` - Shared PostgreSQL connection pool
//! - `error` - Common error types
//! - `events` - Change events and filtered subscriptions
//! - `models` - Campaign, profile, and ad view data models
//! - `observability` - Logging initialization
//! - `pagination` - Offset pagination for feed listings
//! - `retry` - Exponential backoff for transient failures
//! - `validation` - Input validation helpers

pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod models;
pub mod observability;
pub mod pagination;
pub mod retry;
pub mod validation;

pub use config::{ConfigLoader, DatabaseConfig, FeedConfig, RewardsConfig};
pub use database::{DatabasePool, PoolStats};
pub use error::AdssimsimError;
pub use events::{
    BalanceChangeEvent, BalanceEvents, CampaignChangeEvent, CampaignEvents, CampaignFilter,
    ChangeKind,
};
pub use models::{
    AdView, Campaign, CampaignDraft, CampaignGoal, CampaignKind, CampaignPatch, CampaignStatus,
    CompanyInfo, Profile, ProfilePatch, Role, WatchedAd,
};
pub use pagination::PageRequest;
pub use retry::{retry_with_backoff, RetryPolicy};

/// Common result type used across Adssimsim crates
pub type Result<T> = std::result::Result<T, AdssimsimError>;
