//! Profile models for viewers and advertisers
//!
//! A single `profiles` row backs both roles. Reward points only mean
//! something for viewers, credit balance only for advertisers; the store
//! keeps both columns nullable and the row is normalized into a fully
//! populated [`Profile`] at the repository boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Advertiser,
    Viewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Advertiser => "advertiser",
            Role::Viewer => "viewer",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "advertiser" => Role::Advertiser,
            _ => Role::Viewer,
        }
    }
}

/// A viewer or advertiser account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Profile {
    pub id: Uuid,

    #[validate(length(min = 1, max = 100))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    pub role: Role,

    /// Points accumulated from settled ad views (viewers)
    pub reward_points: i64,

    /// Remaining advertising credit (advertisers); may go negative
    pub credit_balance: i64,

    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub gender: Option<String>,
    pub subscribers: i64,
}

impl Profile {
    /// Create a profile with zeroed counters and empty presentation fields
    pub fn new(id: Uuid, username: String, email: String, role: Role) -> Self {
        Self {
            id,
            username,
            email,
            role,
            reward_points: 0,
            credit_balance: 0,
            logo_url: None,
            banner_url: None,
            country: None,
            state: None,
            city: None,
            gender: None,
            subscribers: 0,
        }
    }

    pub fn is_viewer(&self) -> bool {
        self.role == Role::Viewer
    }

    pub fn is_advertiser(&self) -> bool {
        self.role == Role::Advertiser
    }
}

/// Partial profile update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProfilePatch {
    #[validate(length(min = 1, max = 100))]
    pub username: Option<String>,
    pub logo_url: Option<String>,
    pub banner_url: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub gender: Option<String>,
}

impl ProfilePatch {
    /// Apply this patch to a profile, returning the merged result
    pub fn apply(&self, mut profile: Profile) -> Profile {
        if let Some(username) = &self.username {
            profile.username = username.clone();
        }
        if let Some(logo_url) = &self.logo_url {
            profile.logo_url = Some(logo_url.clone());
        }
        if let Some(banner_url) = &self.banner_url {
            profile.banner_url = Some(banner_url.clone());
        }
        if let Some(country) = &self.country {
            profile.country = Some(country.clone());
        }
        if let Some(state) = &self.state {
            profile.state = Some(state.clone());
        }
        if let Some(city) = &self.city {
            profile.city = Some(city.clone());
        }
        if let Some(gender) = &self.gender {
            profile.gender = Some(gender.clone());
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse(Role::Advertiser.as_str()), Role::Advertiser);
        assert_eq!(Role::parse(Role::Viewer.as_str()), Role::Viewer);
        // Unknown strings degrade to the least privileged role
        assert_eq!(Role::parse("superuser"), Role::Viewer);
    }

    #[test]
    fn test_new_profile_counters_start_at_zero() {
        let profile = Profile::new(
            Uuid::new_v4(),
            "acme".to_string(),
            "ads@acme.example".to_string(),
            Role::Advertiser,
        );
        assert_eq!(profile.reward_points, 0);
        assert_eq!(profile.credit_balance, 0);
        assert!(profile.is_advertiser());
        assert!(!profile.is_viewer());
    }

    #[test]
    fn test_patch_apply_merges_only_set_fields() {
        let profile = Profile::new(
            Uuid::new_v4(),
            "watcher".to_string(),
            "watcher@example.com".to_string(),
            Role::Viewer,
        );

        let patch = ProfilePatch {
            username: Some("binger".to_string()),
            city: Some("Lagos".to_string()),
            ..Default::default()
        };

        let merged = patch.apply(profile.clone());
        assert_eq!(merged.username, "binger");
        assert_eq!(merged.city.as_deref(), Some("Lagos"));
        assert_eq!(merged.email, profile.email);
        assert_eq!(merged.reward_points, profile.reward_points);
    }

    #[test]
    fn test_patch_validation_rejects_empty_username() {
        let patch = ProfilePatch {
            username: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }
}
