//! In-memory profile repository

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use adssimsim_core::error::AdssimsimError;
use adssimsim_core::events::{BalanceChangeEvent, BalanceEvents};
use adssimsim_core::models::{Profile, ProfilePatch};
use adssimsim_core::validation::validate_input;
use adssimsim_core::Result;

use crate::repository::ProfileRepository;

const EVENT_CAPACITY: usize = 256;

/// A profile plus the one-shot initial credit marker
#[derive(Debug, Clone)]
struct StoredProfile {
    profile: Profile,
    credit_granted: bool,
}

#[derive(Clone)]
pub struct InMemoryProfileRepository {
    profiles: Arc<DashMap<Uuid, StoredProfile>>,
    events: broadcast::Sender<BalanceChangeEvent>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            profiles: Arc::new(DashMap::new()),
            events,
        }
    }

    /// Seed a profile
    ///
    /// A nonzero seeded balance counts as having held credit, so
    /// `ensure_initial_credit` will not grant again.
    pub fn insert(&self, profile: Profile) {
        let credit_granted = profile.credit_balance != 0;
        self.profiles.insert(
            profile.id,
            StoredProfile {
                profile,
                credit_granted,
            },
        );
    }

    fn publish(&self, profile: &Profile) {
        let _ = self.events.send(BalanceChangeEvent {
            profile_id: profile.id,
            reward_points: profile.reward_points,
            credit_balance: profile.credit_balance,
        });
    }
}

impl Default for InMemoryProfileRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn get(&self, id: Uuid) -> Result<Option<Profile>> {
        Ok(self.profiles.get(&id).map(|entry| entry.profile.clone()))
    }

    async fn update(&self, id: Uuid, patch: &ProfilePatch) -> Result<Profile> {
        validate_input(patch)?;

        let mut entry = self
            .profiles
            .get_mut(&id)
            .ok_or_else(|| AdssimsimError::not_found("profile", id))?;
        entry.profile = patch.apply(entry.profile.clone());
        Ok(entry.profile.clone())
    }

    async fn credit_reward_points(&self, id: Uuid, delta: i64) -> Result<i64> {
        let profile = {
            let mut entry = self
                .profiles
                .get_mut(&id)
                .ok_or_else(|| AdssimsimError::not_found("profile", id))?;
            entry.profile.reward_points += delta;
            entry.profile.clone()
        };

        self.publish(&profile);
        Ok(profile.reward_points)
    }

    async fn debit_credit_balance(&self, id: Uuid, delta: i64) -> Result<i64> {
        let profile = {
            let mut entry = self
                .profiles
                .get_mut(&id)
                .ok_or_else(|| AdssimsimError::not_found("profile", id))?;
            entry.profile.credit_balance -= delta;
            entry.credit_granted = true;
            entry.profile.clone()
        };

        self.publish(&profile);
        Ok(profile.credit_balance)
    }

    async fn ensure_initial_credit(&self, id: Uuid, amount: i64) -> Result<bool> {
        let granted = {
            let mut entry = self
                .profiles
                .get_mut(&id)
                .ok_or_else(|| AdssimsimError::not_found("profile", id))?;
            if entry.credit_granted {
                None
            } else {
                entry.profile.credit_balance = amount;
                entry.credit_granted = true;
                Some(entry.profile.clone())
            }
        };

        match granted {
            Some(profile) => {
                self.publish(&profile);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn subscribe(&self, profile_id: Uuid) -> BalanceEvents {
        BalanceEvents::new(self.events.subscribe(), profile_id)
    }
}
