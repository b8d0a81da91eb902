//! Postgres ad view store
//!
//! Backing table (see `migrations/0001_schema.sql`):
//!
//! ```sql
//! CREATE TABLE ad_views (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     viewer_id UUID NOT NULL REFERENCES profiles(id),
//!     campaign_id UUID NOT NULL REFERENCES campaigns(id),
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     UNIQUE (viewer_id, campaign_id)
//! );
//! ```
//!
//! The UNIQUE constraint is the dedup guard: `insert_if_absent` rides
//! on `ON CONFLICT DO NOTHING`, so concurrent claims for one pair
//! resolve to exactly one inserted row without an advisory lock.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use adssimsim_core::error::AdssimsimError;
use adssimsim_core::models::AdView;
use adssimsim_core::Result;

use crate::repository::AdViewStore;

pub(crate) fn map_ad_view_row(row: &PgRow) -> Result<AdView> {
    let err = |e: sqlx::Error| AdssimsimError::from_sqlx(e, "decode_ad_view");

    Ok(AdView {
        id: row.try_get("id").map_err(err)?,
        viewer_id: row.try_get("viewer_id").map_err(err)?,
        campaign_id: row.try_get("campaign_id").map_err(err)?,
        created_at: row.try_get("created_at").map_err(err)?,
    })
}

#[derive(Clone)]
pub struct PgAdViewStore {
    pool: PgPool,
}

impl PgAdViewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdViewStore for PgAdViewStore {
    async fn insert_if_absent(&self, viewer_id: Uuid, campaign_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO ad_views (viewer_id, campaign_id)
            VALUES ($1, $2)
            ON CONFLICT (viewer_id, campaign_id) DO NOTHING
            "#,
        )
        .bind(viewer_id)
        .bind(campaign_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "insert_ad_view"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_for_viewer(&self, viewer_id: Uuid, limit: u32) -> Result<Vec<AdView>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM ad_views
            WHERE viewer_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(viewer_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "list_ad_views"))?;

        rows.iter().map(map_ad_view_row).collect()
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::postgres::test_support::{create_test_pool, insert_test_profile};
    use crate::postgres::PgCampaignRepository;
    use crate::repository::CampaignRepository;
    use adssimsim_core::models::{
        CampaignDraft, CampaignGoal, CampaignKind, CompanyInfo,
    };
    use tokio::sync::broadcast;

    async fn insert_test_campaign(pool: &PgPool, advertiser_id: Uuid) -> Uuid {
        let (events, _) = broadcast::channel(16);
        let repo = PgCampaignRepository::new(pool.clone(), events);
        repo.create(&CampaignDraft {
            advertiser_id,
            name: "View Test".to_string(),
            budget: 100,
            reward: 5,
            kind: CampaignKind::Video,
            goal: CampaignGoal::BrandAwareness,
            category: "Tech".to_string(),
            cta_text: "Go".to_string(),
            landing_page_url: "https://example.com".to_string(),
            creative_url: "https://example.com/ad.mp4".to_string(),
            thumbnail_url: None,
            duration: 15,
            company: CompanyInfo::named("Example"),
            client_ref: None,
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    #[ignore] // Requires DATABASE_URL pointing at a migrated database
    async fn test_insert_if_absent_detects_duplicate() {
        let pool = create_test_pool().await.unwrap();
        let viewer = insert_test_profile(&pool, "viewer").await.unwrap();
        let advertiser = insert_test_profile(&pool, "advertiser").await.unwrap();
        let campaign = insert_test_campaign(&pool, advertiser).await;
        let store = PgAdViewStore::new(pool);

        assert!(store.insert_if_absent(viewer, campaign).await.unwrap());
        assert!(!store.insert_if_absent(viewer, campaign).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires DATABASE_URL pointing at a migrated database
    async fn test_list_for_viewer_newest_first() {
        let pool = create_test_pool().await.unwrap();
        let viewer = insert_test_profile(&pool, "viewer").await.unwrap();
        let advertiser = insert_test_profile(&pool, "advertiser").await.unwrap();
        let store = PgAdViewStore::new(pool.clone());

        for _ in 0..3 {
            let campaign = insert_test_campaign(&pool, advertiser).await;
            store.insert_if_absent(viewer, campaign).await.unwrap();
        }

        let views = store.list_for_viewer(viewer, 2).await.unwrap();
        assert_eq!(views.len(), 2);
        assert!(views.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }
}
