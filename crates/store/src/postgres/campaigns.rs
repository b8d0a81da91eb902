//! Postgres campaign repository
//!
//! Backing table (see `migrations/0001_schema.sql`):
//!
//! ```sql
//! CREATE TABLE campaigns (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     advertiser_id UUID NOT NULL REFERENCES profiles(id),
//!     name TEXT NOT NULL,
//!     budget BIGINT,
//!     reward BIGINT,
//!     impressions BIGINT,
//!     clicks BIGINT,
//!     rewarded_points BIGINT,
//!     status TEXT NOT NULL DEFAULT 'Pending',
//!     kind TEXT NOT NULL DEFAULT 'video',
//!     goal TEXT,
//!     category TEXT,
//!     cta_text TEXT,
//!     landing_page_url TEXT,
//!     creative_url TEXT,
//!     thumbnail_url TEXT,
//!     duration INT,
//!     company JSONB,
//!     upload_error TEXT,
//!     client_ref UUID,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! Counter and text columns are nullable because upstream writers have
//! historically left them unset; [`map_campaign_row`] is the single
//! place where those rows are normalized into a [`Campaign`].

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use adssimsim_core::error::AdssimsimError;
use adssimsim_core::events::{CampaignChangeEvent, CampaignEvents, CampaignFilter};
use adssimsim_core::models::{
    Campaign, CampaignDraft, CampaignGoal, CampaignKind, CampaignPatch, CampaignStatus,
    CompanyInfo,
};
use adssimsim_core::pagination::PageRequest;
use adssimsim_core::validation::validate_input;
use adssimsim_core::Result;

use crate::repository::CampaignRepository;

/// Normalize one row into a [`Campaign`]
///
/// Every nullable column gets its default here and nowhere else.
pub(crate) fn map_campaign_row(row: &PgRow) -> Result<Campaign> {
    let err = |e: sqlx::Error| AdssimsimError::from_sqlx(e, "decode_campaign");

    let status: Option<String> = row.try_get("status").map_err(err)?;
    let kind: Option<String> = row.try_get("kind").map_err(err)?;
    let goal: Option<String> = row.try_get("goal").map_err(err)?;
    let company: Option<serde_json::Value> = row.try_get("company").map_err(err)?;

    Ok(Campaign {
        id: row.try_get("id").map_err(err)?,
        advertiser_id: row.try_get("advertiser_id").map_err(err)?,
        name: row.try_get("name").map_err(err)?,
        budget: row
            .try_get::<Option<i64>, _>("budget")
            .map_err(err)?
            .unwrap_or(0),
        reward: row
            .try_get::<Option<i64>, _>("reward")
            .map_err(err)?
            .unwrap_or(0),
        impressions: row
            .try_get::<Option<i64>, _>("impressions")
            .map_err(err)?
            .unwrap_or(0),
        clicks: row
            .try_get::<Option<i64>, _>("clicks")
            .map_err(err)?
            .unwrap_or(0),
        rewarded_points: row
            .try_get::<Option<i64>, _>("rewarded_points")
            .map_err(err)?
            .unwrap_or(0),
        status: status
            .as_deref()
            .map(CampaignStatus::parse)
            .unwrap_or(CampaignStatus::Pending),
        kind: kind
            .as_deref()
            .map(CampaignKind::parse)
            .unwrap_or(CampaignKind::Video),
        goal: goal
            .as_deref()
            .map(CampaignGoal::parse)
            .unwrap_or(CampaignGoal::BrandAwareness),
        category: row
            .try_get::<Option<String>, _>("category")
            .map_err(err)?
            .unwrap_or_default(),
        cta_text: row
            .try_get::<Option<String>, _>("cta_text")
            .map_err(err)?
            .unwrap_or_default(),
        landing_page_url: row
            .try_get::<Option<String>, _>("landing_page_url")
            .map_err(err)?
            .unwrap_or_default(),
        creative_url: row
            .try_get::<Option<String>, _>("creative_url")
            .map_err(err)?
            .unwrap_or_default(),
        thumbnail_url: row.try_get("thumbnail_url").map_err(err)?,
        duration: row
            .try_get::<Option<i32>, _>("duration")
            .map_err(err)?
            .unwrap_or(0),
        company: company
            .map(CompanyInfo::from_json)
            .unwrap_or_else(|| CompanyInfo::named("")),
        upload_error: row.try_get("upload_error").map_err(err)?,
        client_ref: row.try_get("client_ref").map_err(err)?,
        created_at: row.try_get("created_at").map_err(err)?,
    })
}

pub struct PgCampaignRepository {
    pool: PgPool,
    events: broadcast::Sender<CampaignChangeEvent>,
}

impl PgCampaignRepository {
    /// The `events` sender should come from the [`ChangeFeed`] so that
    /// subscribers see writes from every process, not just this one.
    ///
    /// [`ChangeFeed`]: crate::postgres::ChangeFeed
    pub fn new(pool: PgPool, events: broadcast::Sender<CampaignChangeEvent>) -> Self {
        Self { pool, events }
    }
}

#[async_trait]
impl CampaignRepository for PgCampaignRepository {
    async fn create(&self, draft: &CampaignDraft) -> Result<Campaign> {
        validate_input(draft)?;

        let row = sqlx::query(
            r#"
            INSERT INTO campaigns (
                advertiser_id, name, budget, reward, status, kind, goal,
                category, cta_text, landing_page_url, creative_url,
                thumbnail_url, duration, company, client_ref
            )
            VALUES ($1, $2, $3, $4, 'Active', $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(draft.advertiser_id)
        .bind(&draft.name)
        .bind(draft.budget)
        .bind(draft.reward)
        .bind(draft.kind.as_str())
        .bind(draft.goal.as_str())
        .bind(&draft.category)
        .bind(&draft.cta_text)
        .bind(&draft.landing_page_url)
        .bind(&draft.creative_url)
        .bind(&draft.thumbnail_url)
        .bind(draft.duration)
        .bind(sqlx::types::Json(&draft.company))
        .bind(draft.client_ref)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "create_campaign"))?;

        let campaign = map_campaign_row(&row)?;
        debug!(campaign_id = %campaign.id, "campaign created");
        Ok(campaign)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Campaign>> {
        let row = sqlx::query("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AdssimsimError::from_sqlx(e, "get_campaign"))?;

        row.as_ref().map(map_campaign_row).transpose()
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Campaign>> {
        let rows = sqlx::query("SELECT * FROM campaigns WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AdssimsimError::from_sqlx(e, "get_many_campaigns"))?;

        rows.iter().map(map_campaign_row).collect()
    }

    async fn list(&self, filter: &CampaignFilter, page: PageRequest) -> Result<Vec<Campaign>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM campaigns
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR advertiser_id = $2)
            ORDER BY created_at DESC, id DESC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.advertiser_id)
        .bind(page.offset as i64)
        .bind(page.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "list_campaigns"))?;

        rows.iter().map(map_campaign_row).collect()
    }

    async fn update(&self, id: Uuid, patch: &CampaignPatch) -> Result<Campaign> {
        validate_input(patch)?;

        let row = sqlx::query(
            r#"
            UPDATE campaigns SET
                name = COALESCE($2, name),
                budget = COALESCE($3, budget),
                reward = COALESCE($4, reward),
                status = COALESCE($5, status),
                cta_text = COALESCE($6, cta_text),
                landing_page_url = COALESCE($7, landing_page_url),
                thumbnail_url = COALESCE($8, thumbnail_url),
                category = COALESCE($9, category),
                upload_error = COALESCE($10, upload_error)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(patch.budget)
        .bind(patch.reward)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(&patch.cta_text)
        .bind(&patch.landing_page_url)
        .bind(&patch.thumbnail_url)
        .bind(&patch.category)
        .bind(&patch.upload_error)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "update_campaign"))?
        .ok_or_else(|| AdssimsimError::not_found("campaign", id))?;

        map_campaign_row(&row)
    }

    async fn record_view(&self, id: Uuid, reward: i64) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns SET
                impressions = COALESCE(impressions, 0) + 1,
                rewarded_points = COALESCE(rewarded_points, 0) + $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reward)
        .execute(&self.pool)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "record_view"))?;

        if result.rows_affected() == 0 {
            return Err(AdssimsimError::not_found("campaign", id));
        }
        Ok(())
    }

    async fn record_click(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE campaigns SET clicks = COALESCE(clicks, 0) + 1 WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "record_click"))?;

        if result.rows_affected() == 0 {
            return Err(AdssimsimError::not_found("campaign", id));
        }
        Ok(())
    }

    fn subscribe(&self, filter: CampaignFilter) -> CampaignEvents {
        CampaignEvents::new(self.events.subscribe(), filter)
    }
}
