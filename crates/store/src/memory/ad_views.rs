//! In-memory ad view store
//!
//! The dedup guard is the map's entry API: occupancy check and insert
//! happen under the same shard lock, so concurrent claims for one
//! (viewer, campaign) pair see exactly one winner.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use adssimsim_core::models::AdView;
use adssimsim_core::Result;

use crate::repository::AdViewStore;

#[derive(Clone)]
pub struct InMemoryAdViewStore {
    views: Arc<DashMap<(Uuid, Uuid), AdView>>,
}

impl InMemoryAdViewStore {
    pub fn new() -> Self {
        Self {
            views: Arc::new(DashMap::new()),
        }
    }

    /// The stored view for a pair, if any
    pub fn get(&self, viewer_id: Uuid, campaign_id: Uuid) -> Option<AdView> {
        self.views
            .get(&(viewer_id, campaign_id))
            .map(|entry| entry.clone())
    }
}

impl Default for InMemoryAdViewStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdViewStore for InMemoryAdViewStore {
    async fn insert_if_absent(&self, viewer_id: Uuid, campaign_id: Uuid) -> Result<bool> {
        match self.views.entry((viewer_id, campaign_id)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(AdView::new(viewer_id, campaign_id));
                Ok(true)
            }
        }
    }

    async fn list_for_viewer(&self, viewer_id: Uuid, limit: u32) -> Result<Vec<AdView>> {
        let mut views: Vec<AdView> = self
            .views
            .iter()
            .filter(|entry| entry.viewer_id == viewer_id)
            .map(|entry| entry.clone())
            .collect();

        views.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        views.truncate(limit as usize);
        Ok(views)
    }
}
