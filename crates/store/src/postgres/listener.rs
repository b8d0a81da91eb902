//! LISTEN/NOTIFY bridge
//!
//! The triggers in `migrations/0002_notify_triggers.sql` fire
//! `pg_notify` on every campaign row change and every profile balance
//! change. [`ChangeFeed`] holds the listening connection, decodes the
//! JSON payloads, and rebroadcasts them on in-process channels so the
//! same subscription API works whether a write happened here or in
//! another process.

use serde::Deserialize;
use sqlx::postgres::{PgListener, PgNotification};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use adssimsim_core::error::AdssimsimError;
use adssimsim_core::events::{
    BalanceChangeEvent, BalanceEvents, CampaignChangeEvent, CampaignEvents, CampaignFilter,
    ChangeKind,
};
use adssimsim_core::models::{
    Campaign, CampaignGoal, CampaignKind, CampaignStatus, CompanyInfo,
};
use adssimsim_core::Result;

pub const CAMPAIGN_CHANNEL: &str = "campaign_changes";
pub const PROFILE_CHANNEL: &str = "profile_changes";

const EVENT_CAPACITY: usize = 256;

/// Campaign row as `row_to_json` emits it
///
/// Nullable columns arrive as JSON null, so everything the table
/// allows to be NULL is an `Option` here and normalized in
/// [`CampaignNotification::into_campaign`].
#[derive(Debug, Deserialize)]
struct CampaignRow {
    id: Uuid,
    advertiser_id: Uuid,
    name: String,
    budget: Option<i64>,
    reward: Option<i64>,
    impressions: Option<i64>,
    clicks: Option<i64>,
    rewarded_points: Option<i64>,
    status: Option<String>,
    kind: Option<String>,
    goal: Option<String>,
    category: Option<String>,
    cta_text: Option<String>,
    landing_page_url: Option<String>,
    creative_url: Option<String>,
    thumbnail_url: Option<String>,
    duration: Option<i32>,
    company: Option<serde_json::Value>,
    upload_error: Option<String>,
    client_ref: Option<Uuid>,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
struct CampaignNotification {
    kind: String,
    row: CampaignRow,
}

impl CampaignNotification {
    fn into_campaign(self) -> (ChangeKind, Campaign) {
        let row = self.row;
        let campaign = Campaign {
            id: row.id,
            advertiser_id: row.advertiser_id,
            name: row.name,
            budget: row.budget.unwrap_or(0),
            reward: row.reward.unwrap_or(0),
            impressions: row.impressions.unwrap_or(0),
            clicks: row.clicks.unwrap_or(0),
            rewarded_points: row.rewarded_points.unwrap_or(0),
            status: row
                .status
                .as_deref()
                .map(CampaignStatus::parse)
                .unwrap_or(CampaignStatus::Pending),
            kind: row
                .kind
                .as_deref()
                .map(CampaignKind::parse)
                .unwrap_or(CampaignKind::Video),
            goal: row
                .goal
                .as_deref()
                .map(CampaignGoal::parse)
                .unwrap_or(CampaignGoal::BrandAwareness),
            category: row.category.unwrap_or_default(),
            cta_text: row.cta_text.unwrap_or_default(),
            landing_page_url: row.landing_page_url.unwrap_or_default(),
            creative_url: row.creative_url.unwrap_or_default(),
            thumbnail_url: row.thumbnail_url,
            duration: row.duration.unwrap_or(0),
            company: row
                .company
                .map(CompanyInfo::from_json)
                .unwrap_or_else(|| CompanyInfo::named("")),
            upload_error: row.upload_error,
            client_ref: row.client_ref,
            created_at: row.created_at,
        };
        (ChangeKind::parse(&self.kind), campaign)
    }
}

fn parse_campaign_payload(payload: &str) -> Result<CampaignChangeEvent> {
    let notification: CampaignNotification = serde_json::from_str(payload)
        .map_err(|e| AdssimsimError::database(format!("bad campaign payload: {e}"), "notify"))?;
    let (kind, campaign) = notification.into_campaign();
    Ok(CampaignChangeEvent { kind, campaign })
}

fn parse_balance_payload(payload: &str) -> Result<BalanceChangeEvent> {
    serde_json::from_str(payload)
        .map_err(|e| AdssimsimError::database(format!("bad balance payload: {e}"), "notify"))
}

/// Bridges database NOTIFY traffic onto broadcast channels
///
/// Repositories hand out subscriptions from the same senders, so one
/// listening connection serves every subscriber in the process.
pub struct ChangeFeed {
    campaign_tx: broadcast::Sender<CampaignChangeEvent>,
    balance_tx: broadcast::Sender<BalanceChangeEvent>,
    task: JoinHandle<()>,
}

impl ChangeFeed {
    pub async fn connect(pool: &PgPool) -> Result<Self> {
        let mut listener = PgListener::connect_with(pool)
            .await
            .map_err(|e| AdssimsimError::from_sqlx(e, "listener_connect"))?;
        listener
            .listen_all([CAMPAIGN_CHANNEL, PROFILE_CHANNEL])
            .await
            .map_err(|e| AdssimsimError::from_sqlx(e, "listener_subscribe"))?;

        let (campaign_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (balance_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let task = tokio::spawn(dispatch_loop(
            listener,
            campaign_tx.clone(),
            balance_tx.clone(),
        ));

        Ok(Self {
            campaign_tx,
            balance_tx,
            task,
        })
    }

    /// Sender to hand to [`PgCampaignRepository`]
    ///
    /// [`PgCampaignRepository`]: crate::postgres::PgCampaignRepository
    pub fn campaign_sender(&self) -> broadcast::Sender<CampaignChangeEvent> {
        self.campaign_tx.clone()
    }

    /// Sender to hand to [`PgProfileRepository`]
    ///
    /// [`PgProfileRepository`]: crate::postgres::PgProfileRepository
    pub fn balance_sender(&self) -> broadcast::Sender<BalanceChangeEvent> {
        self.balance_tx.clone()
    }

    pub fn subscribe_campaigns(&self, filter: CampaignFilter) -> CampaignEvents {
        CampaignEvents::new(self.campaign_tx.subscribe(), filter)
    }

    pub fn subscribe_balance(&self, profile_id: Uuid) -> BalanceEvents {
        BalanceEvents::new(self.balance_tx.subscribe(), profile_id)
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn dispatch_loop(
    mut listener: PgListener,
    campaign_tx: broadcast::Sender<CampaignChangeEvent>,
    balance_tx: broadcast::Sender<BalanceChangeEvent>,
) {
    loop {
        let notification = match listener.recv().await {
            Ok(notification) => notification,
            Err(error) => {
                // PgListener re-establishes the connection on its own;
                // notifications sent while down are lost, the poll
                // fallback covers that window
                warn!(%error, "notify stream interrupted, awaiting reconnect");
                continue;
            }
        };
        dispatch(&notification, &campaign_tx, &balance_tx);
    }
}

fn dispatch(
    notification: &PgNotification,
    campaign_tx: &broadcast::Sender<CampaignChangeEvent>,
    balance_tx: &broadcast::Sender<BalanceChangeEvent>,
) {
    match notification.channel() {
        CAMPAIGN_CHANNEL => match parse_campaign_payload(notification.payload()) {
            Ok(event) => {
                debug!(campaign_id = %event.campaign.id, kind = ?event.kind, "campaign change");
                let _ = campaign_tx.send(event);
            }
            Err(error) => warn!(%error, "dropping undecodable campaign notification"),
        },
        PROFILE_CHANNEL => match parse_balance_payload(notification.payload()) {
            Ok(event) => {
                let _ = balance_tx.send(event);
            }
            Err(error) => warn!(%error, "dropping undecodable balance notification"),
        },
        other => warn!(channel = other, "notification on unexpected channel"),
    }
}
