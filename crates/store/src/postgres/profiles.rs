//! Postgres profile repository
//!
//! Backing table (see `migrations/0001_schema.sql`):
//!
//! ```sql
//! CREATE TABLE profiles (
//!     id UUID PRIMARY KEY,
//!     username TEXT NOT NULL,
//!     email TEXT NOT NULL,
//!     role TEXT NOT NULL DEFAULT 'viewer',
//!     reward_points BIGINT,
//!     credit_balance BIGINT,
//!     logo_url TEXT,
//!     banner_url TEXT,
//!     country TEXT,
//!     state TEXT,
//!     city TEXT,
//!     gender TEXT,
//!     subscribers BIGINT,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```
//!
//! `credit_balance` is deliberately nullable with no default: NULL
//! means the one-time starter credit has never been granted, which is
//! what `ensure_initial_credit` keys on.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio::sync::broadcast;
use uuid::Uuid;

use adssimsim_core::error::AdssimsimError;
use adssimsim_core::events::{BalanceChangeEvent, BalanceEvents};
use adssimsim_core::models::{Profile, ProfilePatch, Role};
use adssimsim_core::validation::validate_input;
use adssimsim_core::Result;

use crate::repository::ProfileRepository;

/// Normalize one row into a [`Profile`]
pub(crate) fn map_profile_row(row: &PgRow) -> Result<Profile> {
    let err = |e: sqlx::Error| AdssimsimError::from_sqlx(e, "decode_profile");

    let role: Option<String> = row.try_get("role").map_err(err)?;

    Ok(Profile {
        id: row.try_get("id").map_err(err)?,
        username: row.try_get("username").map_err(err)?,
        email: row.try_get("email").map_err(err)?,
        role: role.as_deref().map(Role::parse).unwrap_or(Role::Viewer),
        reward_points: row
            .try_get::<Option<i64>, _>("reward_points")
            .map_err(err)?
            .unwrap_or(0),
        credit_balance: row
            .try_get::<Option<i64>, _>("credit_balance")
            .map_err(err)?
            .unwrap_or(0),
        logo_url: row.try_get("logo_url").map_err(err)?,
        banner_url: row.try_get("banner_url").map_err(err)?,
        country: row.try_get("country").map_err(err)?,
        state: row.try_get("state").map_err(err)?,
        city: row.try_get("city").map_err(err)?,
        gender: row.try_get("gender").map_err(err)?,
        subscribers: row
            .try_get::<Option<i64>, _>("subscribers")
            .map_err(err)?
            .unwrap_or(0),
    })
}

pub struct PgProfileRepository {
    pool: PgPool,
    events: broadcast::Sender<BalanceChangeEvent>,
}

impl PgProfileRepository {
    /// The `events` sender should come from the [`ChangeFeed`] so that
    /// balance changes from every process reach subscribers.
    ///
    /// [`ChangeFeed`]: crate::postgres::ChangeFeed
    pub fn new(pool: PgPool, events: broadcast::Sender<BalanceChangeEvent>) -> Self {
        Self { pool, events }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn get(&self, id: Uuid) -> Result<Option<Profile>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AdssimsimError::from_sqlx(e, "get_profile"))?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn update(&self, id: Uuid, patch: &ProfilePatch) -> Result<Profile> {
        validate_input(patch)?;

        let row = sqlx::query(
            r#"
            UPDATE profiles SET
                username = COALESCE($2, username),
                logo_url = COALESCE($3, logo_url),
                banner_url = COALESCE($4, banner_url),
                country = COALESCE($5, country),
                state = COALESCE($6, state),
                city = COALESCE($7, city),
                gender = COALESCE($8, gender)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.username)
        .bind(&patch.logo_url)
        .bind(&patch.banner_url)
        .bind(&patch.country)
        .bind(&patch.state)
        .bind(&patch.city)
        .bind(&patch.gender)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "update_profile"))?
        .ok_or_else(|| AdssimsimError::not_found("profile", id))?;

        map_profile_row(&row)
    }

    async fn credit_reward_points(&self, id: Uuid, delta: i64) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE profiles
            SET reward_points = COALESCE(reward_points, 0) + $2
            WHERE id = $1
            RETURNING reward_points
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "credit_reward_points"))?
        .ok_or_else(|| AdssimsimError::not_found("profile", id))?;

        row.try_get("reward_points")
            .map_err(|e| AdssimsimError::from_sqlx(e, "credit_reward_points"))
    }

    async fn debit_credit_balance(&self, id: Uuid, delta: i64) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE profiles
            SET credit_balance = COALESCE(credit_balance, 0) - $2
            WHERE id = $1
            RETURNING credit_balance
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "debit_credit_balance"))?
        .ok_or_else(|| AdssimsimError::not_found("profile", id))?;

        row.try_get("credit_balance")
            .map_err(|e| AdssimsimError::from_sqlx(e, "debit_credit_balance"))
    }

    async fn ensure_initial_credit(&self, id: Uuid, amount: i64) -> Result<bool> {
        // NULL credit_balance marks a profile that never held credit;
        // the WHERE clause makes the grant a one-shot even under races
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET credit_balance = $2
            WHERE id = $1 AND credit_balance IS NULL
            "#,
        )
        .bind(id)
        .bind(amount)
        .execute(&self.pool)
        .await
        .map_err(|e| AdssimsimError::from_sqlx(e, "ensure_initial_credit"))?;

        Ok(result.rows_affected() == 1)
    }

    fn subscribe(&self, profile_id: Uuid) -> BalanceEvents {
        BalanceEvents::new(self.events.subscribe(), profile_id)
    }
}
