//! Campaign model and lifecycle
//!
//! Campaigns are the unit of advertising spend. Impressions,
//! rewarded points, and clicks are counters maintained by the store
//! through atomic increments; they are never written back from a value
//! read on the client.
//!
//! `client_ref` carries the correlation id minted by the creating client
//! so an optimistic placeholder can be matched against the authoritative
//! row once it lands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

/// Campaign lifecycle states
///
/// `Uploading` and `UploadFailed` only ever appear on optimistic
/// placeholders; authoritative rows move between the other states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignStatus {
    Active,
    Paused,
    Finished,
    Pending,
    Rejected,
    Uploading,
    #[serde(rename = "Upload Failed")]
    UploadFailed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "Active",
            CampaignStatus::Paused => "Paused",
            CampaignStatus::Finished => "Finished",
            CampaignStatus::Pending => "Pending",
            CampaignStatus::Rejected => "Rejected",
            CampaignStatus::Uploading => "Uploading",
            CampaignStatus::UploadFailed => "Upload Failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Active" => CampaignStatus::Active,
            "Paused" => CampaignStatus::Paused,
            "Finished" => CampaignStatus::Finished,
            "Rejected" => CampaignStatus::Rejected,
            "Uploading" => CampaignStatus::Uploading,
            "Upload Failed" => CampaignStatus::UploadFailed,
            _ => CampaignStatus::Pending,
        }
    }
}

/// Creative format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignKind {
    Video,
    Shortz,
}

impl CampaignKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignKind::Video => "Video",
            CampaignKind::Shortz => "Shortz",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Shortz" => CampaignKind::Shortz,
            _ => CampaignKind::Video,
        }
    }
}

/// Advertiser objective for the campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignGoal {
    #[serde(rename = "Brand Awareness")]
    BrandAwareness,
    #[serde(rename = "Lead Generation")]
    LeadGeneration,
    Sales,
}

impl CampaignGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignGoal::BrandAwareness => "Brand Awareness",
            CampaignGoal::LeadGeneration => "Lead Generation",
            CampaignGoal::Sales => "Sales",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Lead Generation" => CampaignGoal::LeadGeneration,
            "Sales" => CampaignGoal::Sales,
            _ => CampaignGoal::BrandAwareness,
        }
    }
}

/// Sponsoring company metadata, stored as a JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl CompanyInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logo_url: None,
            website: None,
        }
    }

    /// Decode the JSON column, degrading to an unnamed company on bad shape
    pub fn from_json(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|_| Self::named(""))
    }
}

/// An advertising campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub advertiser_id: Uuid,
    pub name: String,
    pub budget: i64,
    pub reward: i64,
    pub impressions: i64,
    pub clicks: i64,
    pub rewarded_points: i64,
    pub status: CampaignStatus,
    pub kind: CampaignKind,
    pub goal: CampaignGoal,
    pub category: String,
    pub cta_text: String,
    pub landing_page_url: String,
    pub creative_url: String,
    pub thumbnail_url: Option<String>,
    pub duration: i32,
    pub company: CompanyInfo,
    pub upload_error: Option<String>,
    /// Correlation id minted by the creating client, if any
    pub client_ref: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Whether a viewer may claim a reward against this campaign
    pub fn is_claimable(&self) -> bool {
        self.status == CampaignStatus::Active
    }

    /// Case-insensitive search over name, category, and company name
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self.category.to_lowercase().contains(&query)
            || self.company.name.to_lowercase().contains(&query)
    }
}

/// Input for campaign creation
///
/// Creative and thumbnail URLs point at already-uploaded assets; upload
/// itself happens outside this library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CampaignDraft {
    pub advertiser_id: Uuid,

    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(range(min = 1))]
    pub budget: i64,

    #[validate(range(min = 1))]
    pub reward: i64,

    pub kind: CampaignKind,
    pub goal: CampaignGoal,

    #[validate(length(min = 1, max = 100))]
    pub category: String,

    #[validate(length(min = 1, max = 50))]
    pub cta_text: String,

    #[validate(url)]
    pub landing_page_url: String,

    #[validate(url)]
    pub creative_url: String,

    #[validate(url)]
    pub thumbnail_url: Option<String>,

    #[validate(range(min = 1))]
    pub duration: i32,

    pub company: CompanyInfo,

    /// Correlation id linking the optimistic placeholder to the row
    pub client_ref: Option<Uuid>,
}

impl CampaignDraft {
    /// Materialize the placeholder shown while creation is in flight
    pub fn placeholder(&self, client_ref: Uuid) -> Campaign {
        Campaign {
            id: client_ref,
            advertiser_id: self.advertiser_id,
            name: self.name.clone(),
            budget: self.budget,
            reward: self.reward,
            impressions: 0,
            clicks: 0,
            rewarded_points: 0,
            status: CampaignStatus::Uploading,
            kind: self.kind,
            goal: self.goal,
            category: self.category.clone(),
            cta_text: self.cta_text.clone(),
            landing_page_url: self.landing_page_url.clone(),
            creative_url: self.creative_url.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            duration: self.duration,
            company: self.company.clone(),
            upload_error: None,
            client_ref: Some(client_ref),
            created_at: Utc::now(),
        }
    }
}

/// Partial campaign update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CampaignPatch {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(range(min = 1))]
    pub budget: Option<i64>,

    #[validate(range(min = 1))]
    pub reward: Option<i64>,

    pub status: Option<CampaignStatus>,

    #[validate(length(min = 1, max = 50))]
    pub cta_text: Option<String>,

    #[validate(url)]
    pub landing_page_url: Option<String>,

    #[validate(url)]
    pub thumbnail_url: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,

    pub upload_error: Option<String>,
}

impl CampaignPatch {
    pub fn reward(reward: i64) -> Self {
        Self {
            reward: Some(reward),
            ..Default::default()
        }
    }

    pub fn status(status: CampaignStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Apply this patch to a campaign, returning the merged result
    pub fn apply(&self, mut campaign: Campaign) -> Campaign {
        if let Some(name) = &self.name {
            campaign.name = name.clone();
        }
        if let Some(budget) = self.budget {
            campaign.budget = budget;
        }
        if let Some(reward) = self.reward {
            campaign.reward = reward;
        }
        if let Some(status) = self.status {
            campaign.status = status;
        }
        if let Some(cta_text) = &self.cta_text {
            campaign.cta_text = cta_text.clone();
        }
        if let Some(landing_page_url) = &self.landing_page_url {
            campaign.landing_page_url = landing_page_url.clone();
        }
        if let Some(thumbnail_url) = &self.thumbnail_url {
            campaign.thumbnail_url = Some(thumbnail_url.clone());
        }
        if let Some(category) = &self.category {
            campaign.category = category.clone();
        }
        if let Some(upload_error) = &self.upload_error {
            campaign.upload_error = Some(upload_error.clone());
        }
        campaign
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> CampaignDraft {
        CampaignDraft {
            advertiser_id: Uuid::new_v4(),
            name: "Summer Launch".to_string(),
            budget: 5000,
            reward: 10,
            kind: CampaignKind::Video,
            goal: CampaignGoal::Sales,
            category: "Fashion".to_string(),
            cta_text: "Shop Now".to_string(),
            landing_page_url: "https://acme.example/launch".to_string(),
            creative_url: "https://cdn.example/launch.mp4".to_string(),
            thumbnail_url: None,
            duration: 30,
            company: CompanyInfo::named("Acme"),
            client_ref: None,
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            CampaignStatus::Active,
            CampaignStatus::Paused,
            CampaignStatus::Finished,
            CampaignStatus::Pending,
            CampaignStatus::Rejected,
            CampaignStatus::Uploading,
            CampaignStatus::UploadFailed,
        ] {
            assert_eq!(CampaignStatus::parse(status.as_str()), status);
        }
        assert_eq!(CampaignStatus::parse("garbage"), CampaignStatus::Pending);
    }

    #[test]
    fn test_upload_failed_serde_rename() {
        let json = serde_json::to_string(&CampaignStatus::UploadFailed).unwrap();
        assert_eq!(json, "\"Upload Failed\"");
        let parsed: CampaignStatus = serde_json::from_str("\"Upload Failed\"").unwrap();
        assert_eq!(parsed, CampaignStatus::UploadFailed);
    }

    #[test]
    fn test_goal_round_trip() {
        for goal in [
            CampaignGoal::BrandAwareness,
            CampaignGoal::LeadGeneration,
            CampaignGoal::Sales,
        ] {
            assert_eq!(CampaignGoal::parse(goal.as_str()), goal);
        }
    }

    #[test]
    fn test_placeholder_carries_correlation_id() {
        let client_ref = Uuid::new_v4();
        let placeholder = draft().placeholder(client_ref);

        assert_eq!(placeholder.status, CampaignStatus::Uploading);
        assert_eq!(placeholder.client_ref, Some(client_ref));
        assert_eq!(placeholder.id, client_ref);
        assert_eq!(placeholder.impressions, 0);
        assert!(!placeholder.is_claimable());
    }

    #[test]
    fn test_matches_search() {
        let campaign = draft().placeholder(Uuid::new_v4());

        assert!(campaign.matches_search(""));
        assert!(campaign.matches_search("  "));
        assert!(campaign.matches_search("summer"));
        assert!(campaign.matches_search("FASHION"));
        assert!(campaign.matches_search("acme"));
        assert!(!campaign.matches_search("winter"));
    }

    #[test]
    fn test_patch_apply() {
        let campaign = draft().placeholder(Uuid::new_v4());
        let patched = CampaignPatch::reward(25).apply(campaign.clone());

        assert_eq!(patched.reward, 25);
        assert_eq!(patched.name, campaign.name);
        assert_eq!(patched.status, campaign.status);
    }

    #[test]
    fn test_draft_validation() {
        let mut bad = draft();
        bad.landing_page_url = "not-a-url".to_string();
        assert!(bad.validate().is_err());

        let mut bad = draft();
        bad.reward = 0;
        assert!(bad.validate().is_err());

        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_company_from_json_degrades_gracefully() {
        let company = CompanyInfo::from_json(serde_json::json!({"name": "Acme"}));
        assert_eq!(company.name, "Acme");

        let company = CompanyInfo::from_json(serde_json::json!(42));
        assert_eq!(company.name, "");
    }
}
