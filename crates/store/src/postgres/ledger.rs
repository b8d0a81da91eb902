//! Postgres settlement ledger
//!
//! All four settlement writes happen inside a single transaction. The
//! dedup insert goes first so a duplicate claim rolls back before any
//! balance moves, and the viewer credit comes before the non-critical
//! counter and debit updates so a missing viewer aborts the whole
//! settlement rather than leaving a half-applied one.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use adssimsim_core::error::AdssimsimError;
use adssimsim_core::Result;

use crate::repository::{SettlementLedger, SettlementRecord};

#[derive(Clone)]
pub struct PgSettlementLedger {
    pool: PgPool,
}

impl PgSettlementLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettlementLedger for PgSettlementLedger {
    async fn settle_atomic(
        &self,
        viewer_id: Uuid,
        campaign_id: Uuid,
        advertiser_id: Uuid,
        reward: i64,
    ) -> Result<SettlementRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AdssimsimError::from_sqlx(e, "settle_begin"))?;

        let view_row = sqlx::query(
            r#"
            INSERT INTO ad_views (viewer_id, campaign_id)
            VALUES ($1, $2)
            ON CONFLICT (viewer_id, campaign_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(viewer_id)
        .bind(campaign_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "settle_dedup"))?;

        let view_id: Uuid = match view_row {
            Some(row) => row
                .try_get("id")
                .map_err(|e| AdssimsimError::from_sqlx(e, "settle_dedup"))?,
            None => {
                tx.rollback()
                    .await
                    .map_err(|e| AdssimsimError::from_sqlx(e, "settle_rollback"))?;
                return Err(AdssimsimError::duplicate_claim(viewer_id, campaign_id));
            }
        };

        let viewer_points: i64 = sqlx::query(
            r#"
            UPDATE profiles
            SET reward_points = COALESCE(reward_points, 0) + $2
            WHERE id = $1
            RETURNING reward_points
            "#,
        )
        .bind(viewer_id)
        .bind(reward)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "settle_credit"))?
        .ok_or_else(|| AdssimsimError::critical("viewer profile missing"))?
        .try_get("reward_points")
        .map_err(|e| AdssimsimError::from_sqlx(e, "settle_credit"))?;

        let counters = sqlx::query(
            r#"
            UPDATE campaigns SET
                impressions = COALESCE(impressions, 0) + 1,
                rewarded_points = COALESCE(rewarded_points, 0) + $2
            WHERE id = $1
            "#,
        )
        .bind(campaign_id)
        .bind(reward)
        .execute(&mut *tx)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "settle_counters"))?;

        if counters.rows_affected() == 0 {
            return Err(AdssimsimError::not_found("campaign", campaign_id));
        }

        let advertiser_balance: i64 = sqlx::query(
            r#"
            UPDATE profiles
            SET credit_balance = COALESCE(credit_balance, 0) - $2
            WHERE id = $1
            RETURNING credit_balance
            "#,
        )
        .bind(advertiser_id)
        .bind(reward)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "settle_debit"))?
        .ok_or_else(|| AdssimsimError::not_found("profile", advertiser_id))?
        .try_get("credit_balance")
        .map_err(|e| AdssimsimError::from_sqlx(e, "settle_debit"))?;

        tx.commit()
            .await
            .map_err(|e| AdssimsimError::from_sqlx(e, "settle_commit"))?;

        debug!(%viewer_id, %campaign_id, reward, "settlement committed");
        Ok(SettlementRecord {
            view_id,
            viewer_points,
            advertiser_balance,
        })
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

    async fn seeded(pool: &PgPool) -> (Uuid, Uuid, Uuid) {
        let viewer = insert_test_profile(pool, "viewer").await.unwrap();
        let advertiser = insert_test_profile(pool, "advertiser").await.unwrap();

        let (events, _) = broadcast::channel(16);
        let repo = PgCampaignRepository::new(pool.clone(), events);
        let campaign = repo
            .create(&CampaignDraft {
                advertiser_id: advertiser,
                name: "Settle Test".to_string(),
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
                company: CompanyInfo::named("Example"),
                client_ref: None,
            })
            .await
            .unwrap();

        (viewer, campaign.id, advertiser)
    }

    #[tokio::test]
    #[ignore] // Requires DATABASE_URL pointing at a migrated database
    async fn test_settle_moves_points_and_counters_together() {
        let pool = create_test_pool().await.unwrap();
        let (viewer, campaign, advertiser) = seeded(&pool).await;
        let ledger = PgSettlementLedger::new(pool);

        let record = ledger
            .settle_atomic(viewer, campaign, advertiser, 10)
            .await
            .unwrap();
        assert_eq!(record.viewer_points, 10);
        assert_eq!(record.advertiser_balance, -10);
    }

    #[tokio::test]
    #[ignore] // Requires DATABASE_URL pointing at a migrated database
    async fn test_second_settle_is_duplicate() {
        let pool = create_test_pool().await.unwrap();
        let (viewer, campaign, advertiser) = seeded(&pool).await;
        let ledger = PgSettlementLedger::new(pool);

        ledger
            .settle_atomic(viewer, campaign, advertiser, 10)
            .await
            .unwrap();
        let second = ledger.settle_atomic(viewer, campaign, advertiser, 10).await;
        assert!(matches!(second, Err(AdssimsimError::DuplicateClaim { .. })));
    }

    #[tokio::test]
    #[ignore] // Requires DATABASE_URL pointing at a migrated database
    async fn test_concurrent_settles_have_one_winner() {
        let pool = create_test_pool().await.unwrap();
        let (viewer, campaign, advertiser) = seeded(&pool).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = PgSettlementLedger::new(pool.clone());
            handles.push(tokio::spawn(async move {
                ledger.settle_atomic(viewer, campaign, advertiser, 10).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
