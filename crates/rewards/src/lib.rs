//! Reward settlement and watch history
//!
//! [`SettlementCoordinator`] turns a completed ad view into a credited
//! viewer, an incremented campaign, and a debited advertiser, either
//! through one transaction or through the sequential fallback policy.
//! [`WatchHistory`] joins a viewer's dedup records back onto their
//! campaigns for display and feed exclusion.

pub mod coordinator;
pub mod history;

pub use coordinator::{SettlementCoordinator, SettlementOutcome};
pub use history::WatchHistory;
