//! Feed synchronization
//!
//! The synchronizer mirrors one filtered campaign listing. Pages are
//! pulled forward with [`load_more`]; any change signal, push or poll,
//! funnels into [`resync`], which refetches every loaded page in one
//! request and rebuilds the entry list. Placeholders sit at the head of
//! the list until an authoritative row with the same correlation id
//! supersedes them or their originating action fails.
//!
//! [`load_more`]: FeedSynchronizer::load_more
//! [`resync`]: FeedSynchronizer::resync

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use adssimsim_core::error::AdssimsimError;
use adssimsim_core::events::CampaignFilter;
use adssimsim_core::models::{Campaign, CampaignStatus};
use adssimsim_core::pagination::PageRequest;
use adssimsim_core::Result;
use adssimsim_store::repository::CampaignRepository;

/// One row of the synchronized feed
#[derive(Debug, Clone)]
pub enum FeedEntry {
    /// A row the repository has confirmed
    Authoritative(Campaign),
    /// A locally created row awaiting its authoritative counterpart
    Placeholder { client_ref: Uuid, campaign: Campaign },
}

impl FeedEntry {
    pub fn campaign(&self) -> &Campaign {
        match self {
            FeedEntry::Authoritative(campaign) => campaign,
            FeedEntry::Placeholder { campaign, .. } => campaign,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, FeedEntry::Placeholder { .. })
    }
}

struct FeedState {
    entries: Vec<FeedEntry>,
    pages_loaded: u32,
    has_more: bool,
    last_error: Option<String>,
}

pub struct FeedSynchronizer {
    repo: Arc<dyn CampaignRepository>,
    filter: CampaignFilter,
    page_size: u32,
    state: Mutex<FeedState>,
}

impl FeedSynchronizer {
    pub fn new(repo: Arc<dyn CampaignRepository>, filter: CampaignFilter, page_size: u32) -> Self {
        Self {
            repo,
            filter,
            page_size,
            state: Mutex::new(FeedState {
                entries: Vec::new(),
                pages_loaded: 0,
                has_more: true,
                last_error: None,
            }),
        }
    }

    /// Pull the next page into the feed, returning how many new rows
    /// were appended
    pub async fn load_more(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        if !state.has_more {
            return Ok(0);
        }

        let request = PageRequest::page(state.pages_loaded, self.page_size);
        let fetched = self.repo.list(&self.filter, request).await?;
        let fetched_len = fetched.len();

        let mut seen: HashSet<Uuid> = state.entries.iter().map(|e| e.campaign().id).collect();
        let mut appended = 0;
        for campaign in fetched {
            Self::supersede_placeholder(&mut state.entries, &campaign);
            if seen.insert(campaign.id) {
                state.entries.push(FeedEntry::Authoritative(campaign));
                appended += 1;
            }
        }

        state.pages_loaded += 1;
        state.has_more = !request.is_final_page(fetched_len);
        debug!(appended, pages_loaded = state.pages_loaded, "feed page loaded");
        Ok(appended)
    }

    /// Refetch every loaded page and rebuild the feed
    ///
    /// `NetworkUnavailable` is absorbed into `last_error`; the next
    /// signal retries. Any other failure propagates.
    pub async fn resync(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        let pages = state.pages_loaded.max(1);
        let request = PageRequest::first_pages(pages, self.page_size);
        let fetched = match self.repo.list(&self.filter, request).await {
            Ok(fetched) => fetched,
            Err(AdssimsimError::NetworkUnavailable { message }) => {
                warn!(%message, "resync deferred, repository unreachable");
                state.last_error = Some(message);
                return Ok(());
            }
            Err(other) => return Err(other),
        };

        let fetched_refs: HashSet<Uuid> =
            fetched.iter().filter_map(|c| c.client_ref).collect();

        let mut rebuilt: Vec<FeedEntry> = state
            .entries
            .iter()
            .filter(|entry| match entry {
                FeedEntry::Placeholder { client_ref, .. } => !fetched_refs.contains(client_ref),
                FeedEntry::Authoritative(_) => false,
            })
            .cloned()
            .collect();

        let mut seen: HashSet<Uuid> = rebuilt.iter().map(|e| e.campaign().id).collect();
        let fetched_len = fetched.len();
        for campaign in fetched {
            if seen.insert(campaign.id) {
                rebuilt.push(FeedEntry::Authoritative(campaign));
            }
        }

        state.entries = rebuilt;
        state.pages_loaded = pages;
        state.has_more = !request.is_final_page(fetched_len);
        state.last_error = None;
        debug!(entries = state.entries.len(), "feed resynced");
        Ok(())
    }

    /// Current entries matching `query` (see [`Campaign::matches_search`])
    pub async fn snapshot(&self, query: &str) -> Vec<FeedEntry> {
        let state = self.state.lock().await;
        state
            .entries
            .iter()
            .filter(|entry| entry.campaign().matches_search(query))
            .cloned()
            .collect()
    }

    pub async fn entries(&self) -> Vec<FeedEntry> {
        self.state.lock().await.entries.clone()
    }

    /// Prepend a locally created campaign awaiting confirmation
    pub async fn insert_placeholder(&self, placeholder: Campaign) {
        let client_ref = placeholder.client_ref.unwrap_or(placeholder.id);
        let mut state = self.state.lock().await;
        state.entries.insert(
            0,
            FeedEntry::Placeholder {
                client_ref,
                campaign: placeholder,
            },
        );
    }

    /// Swap a placeholder for its confirmed row, in place
    pub async fn promote_placeholder(&self, client_ref: Uuid, campaign: Campaign) {
        let mut state = self.state.lock().await;
        if let Some(position) = state.entries.iter().position(|entry| {
            matches!(entry, FeedEntry::Placeholder { client_ref: r, .. } if *r == client_ref)
        }) {
            state.entries[position] = FeedEntry::Authoritative(campaign);
        } else {
            state.entries.insert(0, FeedEntry::Authoritative(campaign));
        }
    }

    /// Mark a placeholder's originating action as failed
    ///
    /// The entry stays visible with status `UploadFailed` and the
    /// failure message attached, it does not silently vanish.
    pub async fn fail_placeholder(&self, client_ref: Uuid, message: &str) {
        let mut state = self.state.lock().await;
        for entry in state.entries.iter_mut() {
            if let FeedEntry::Placeholder { client_ref: r, campaign } = entry {
                if *r == client_ref {
                    campaign.status = CampaignStatus::UploadFailed;
                    campaign.upload_error = Some(message.to_string());
                    return;
                }
            }
        }
    }

    /// Replace an authoritative entry with a newer revision of itself
    pub async fn upsert(&self, campaign: Campaign) {
        let mut state = self.state.lock().await;
        for entry in state.entries.iter_mut() {
            if entry.campaign().id == campaign.id {
                *entry = FeedEntry::Authoritative(campaign);
                return;
            }
        }
    }

    pub async fn has_more(&self) -> bool {
        self.state.lock().await.has_more
    }

    pub async fn pages_loaded(&self) -> u32 {
        self.state.lock().await.pages_loaded
    }

    /// The absorbed failure from the most recent resync, if any
    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    fn supersede_placeholder(entries: &mut Vec<FeedEntry>, campaign: &Campaign) {
        let Some(client_ref) = campaign.client_ref else {
            return;
        };
        entries.retain(|entry| {
            !matches!(entry, FeedEntry::Placeholder { client_ref: r, .. } if *r == client_ref)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adssimsim_core::models::{
        CampaignDraft, CampaignGoal, CampaignKind, CompanyInfo,
    };
    use adssimsim_store::memory::InMemoryCampaignRepository;
    use chrono::{Duration, Utc};

    fn draft(name: &str) -> CampaignDraft {
        CampaignDraft {
            advertiser_id: Uuid::new_v4(),
            name: name.to_string(),
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
        }
    }

    fn seed(repo: &InMemoryCampaignRepository, name: &str, age_minutes: i64) -> Campaign {
        let mut campaign = draft(name).placeholder(Uuid::new_v4());
        campaign.status = CampaignStatus::Active;
        campaign.client_ref = None;
        campaign.created_at = Utc::now() - Duration::minutes(age_minutes);
        repo.insert(campaign.clone());
        campaign
    }

    fn synchronizer(repo: &InMemoryCampaignRepository, page_size: u32) -> FeedSynchronizer {
        FeedSynchronizer::new(Arc::new(repo.clone()), CampaignFilter::default(), page_size)
    }

    #[tokio::test]
    async fn test_load_more_advances_until_short_page() {
        let repo = InMemoryCampaignRepository::new();
        for i in 0..3 {
            seed(&repo, &format!("Ad {i}"), 30 - i);
        }
        let sync = synchronizer(&repo, 2);

        assert_eq!(sync.load_more().await.unwrap(), 2);
        assert!(sync.has_more().await);

        assert_eq!(sync.load_more().await.unwrap(), 1);
        assert!(!sync.has_more().await);

        // Exhausted feeds do not refetch
        assert_eq!(sync.load_more().await.unwrap(), 0);
        assert_eq!(sync.entries().await.len(), 3);
    }

    #[tokio::test]
    async fn test_resync_picks_up_external_changes_without_duplicates() {
        let repo = InMemoryCampaignRepository::new();
        let existing = seed(&repo, "Existing", 30);
        let sync = synchronizer(&repo, 10);
        sync.load_more().await.unwrap();

        let fresh = seed(&repo, "Fresh", 1);
        sync.resync().await.unwrap();

        let entries = sync.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].campaign().id, fresh.id);
        assert_eq!(entries[1].campaign().id, existing.id);

        let ids: HashSet<Uuid> = entries.iter().map(|e| e.campaign().id).collect();
        assert_eq!(ids.len(), entries.len());
    }

    #[tokio::test]
    async fn test_placeholder_prepends_and_is_superseded_by_client_ref() {
        let repo = InMemoryCampaignRepository::new();
        seed(&repo, "Existing", 30);
        let sync = synchronizer(&repo, 10);
        sync.load_more().await.unwrap();

        let client_ref = Uuid::new_v4();
        let placeholder = draft("Pending Ad").placeholder(client_ref);
        sync.insert_placeholder(placeholder).await;

        let entries = sync.entries().await;
        assert!(entries[0].is_placeholder());
        assert_eq!(entries.len(), 2);

        // The authoritative row lands with the same correlation id
        let mut confirmed = draft("Pending Ad").placeholder(Uuid::new_v4());
        confirmed.status = CampaignStatus::Active;
        confirmed.client_ref = Some(client_ref);
        repo.insert(confirmed.clone());
        sync.resync().await.unwrap();

        let entries = sync.entries().await;
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.is_placeholder()));
        assert!(entries.iter().any(|e| e.campaign().id == confirmed.id));
    }

    #[tokio::test]
    async fn test_failed_placeholder_stays_visible_with_error() {
        let repo = InMemoryCampaignRepository::new();
        let sync = synchronizer(&repo, 10);

        let client_ref = Uuid::new_v4();
        sync.insert_placeholder(draft("Doomed").placeholder(client_ref))
            .await;
        sync.fail_placeholder(client_ref, "creative rejected").await;

        let entries = sync.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].campaign().status, CampaignStatus::UploadFailed);
        assert_eq!(
            entries[0].campaign().upload_error.as_deref(),
            Some("creative rejected")
        );

        // Resync does not evict a failed placeholder
        sync.resync().await.unwrap();
        assert_eq!(sync.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_applies_search_query() {
        let repo = InMemoryCampaignRepository::new();
        seed(&repo, "Spring Sale", 10);
        seed(&repo, "Winter Clearance", 5);
        let sync = synchronizer(&repo, 10);
        sync.load_more().await.unwrap();

        let hits = sync.snapshot("spring").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].campaign().name, "Spring Sale");

        assert_eq!(sync.snapshot("").await.len(), 2);
    }
}
