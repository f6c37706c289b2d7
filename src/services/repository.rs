use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use mongodb::options::{FindOptions, ReplaceOptions};
use mongodb::Database;

use tracing::warn;

use crate::error::RepoError;
use crate::models::{Holding, NotificationSettings, TradingGoals, User};
use crate::services::schedule::ScheduleKind;

pub const USERS: &str = "users";
pub const HOLDINGS: &str = "holdings";
pub const TELEGRAM_SETTINGS: &str = "telegram_settings";
pub const TRADING_GOALS: &str = "trading_goals";

/// Persistence seen by the notification engine and its entry points.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;

    async fn find_user(&self, user_id: ObjectId) -> Result<Option<User>, RepoError>;

    async fn get_settings(&self, user_id: ObjectId) -> Result<Option<NotificationSettings>, RepoError>;

    async fn upsert_settings(&self, settings: &NotificationSettings) -> Result<(), RepoError>;

    /// Returns true when a document was removed.
    async fn delete_settings(&self, user_id: ObjectId) -> Result<bool, RepoError>;

    async fn list_active_settings(&self) -> Result<Vec<NotificationSettings>, RepoError>;

    /// Writes only the checkpoint of `kind`, leaving every other field untouched.
    async fn record_checkpoint(&self, user_id: ObjectId, kind: ScheduleKind, sent_at: i64) -> Result<(), RepoError>;

    async fn list_holdings(&self, user_id: ObjectId) -> Result<Vec<Holding>, RepoError>;

    async fn get_trading_goals(&self, user_id: ObjectId) -> Result<Option<TradingGoals>, RepoError>;
}

/// Decodes one stored settings document. A malformed document is logged and
/// skipped so it cannot stall the passes of every other user.
pub fn decode_settings(raw: Document) -> Option<NotificationSettings> {
    let id = raw.get("_id").cloned();
    match bson::from_document::<NotificationSettings>(raw).map_err(RepoError::from) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(document_id = ?id, error = %e, "skipping malformed telegram settings");
            None
        }
    }
}

#[derive(Clone)]
pub struct MongoRepository {
    db: Database,
}

impl MongoRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationRepository for MongoRepository {
    async fn ping(&self) -> Result<(), RepoError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    async fn find_user(&self, user_id: ObjectId) -> Result<Option<User>, RepoError> {
        let users = self.db.collection::<User>(USERS);
        Ok(users.find_one(doc! { "_id": user_id }, None).await?)
    }

    async fn get_settings(&self, user_id: ObjectId) -> Result<Option<NotificationSettings>, RepoError> {
        let col = self.db.collection::<NotificationSettings>(TELEGRAM_SETTINGS);
        Ok(col.find_one(doc! { "user_id": user_id }, None).await?)
    }

    async fn upsert_settings(&self, settings: &NotificationSettings) -> Result<(), RepoError> {
        let col = self.db.collection::<NotificationSettings>(TELEGRAM_SETTINGS);
        let opts = ReplaceOptions::builder().upsert(true).build();

        col.replace_one(doc! { "user_id": settings.user_id }, settings, opts)
            .await?;
        Ok(())
    }

    async fn delete_settings(&self, user_id: ObjectId) -> Result<bool, RepoError> {
        let col = self.db.collection::<NotificationSettings>(TELEGRAM_SETTINGS);
        let res = col.delete_one(doc! { "user_id": user_id }, None).await?;
        Ok(res.deleted_count > 0)
    }

    async fn list_active_settings(&self) -> Result<Vec<NotificationSettings>, RepoError> {
        // raw documents so one bad entry is skipped rather than ending the scan
        let col = self.db.collection::<Document>(TELEGRAM_SETTINGS);
        let mut cursor = col.find(doc! { "is_active": true }, None).await?;

        let mut out = Vec::new();
        while let Some(res) = cursor.next().await {
            out.extend(decode_settings(res?));
        }
        Ok(out)
    }

    async fn record_checkpoint(&self, user_id: ObjectId, kind: ScheduleKind, sent_at: i64) -> Result<(), RepoError> {
        let col = self.db.collection::<Document>(TELEGRAM_SETTINGS);

        let mut set = Document::new();
        set.insert(kind.checkpoint_field(), sent_at);
        set.insert("updated_at", Utc::now().timestamp());

        col.update_one(doc! { "user_id": user_id }, doc! { "$set": set }, None)
            .await?;
        Ok(())
    }

    async fn list_holdings(&self, user_id: ObjectId) -> Result<Vec<Holding>, RepoError> {
        let col = self.db.collection::<Holding>(HOLDINGS);
        let find_opts = FindOptions::builder().sort(doc! { "symbol": 1 }).build();

        let mut cursor = col.find(doc! { "user_id": user_id }, find_opts).await?;

        let mut out = Vec::new();
        while let Some(res) = cursor.next().await {
            out.push(res?);
        }
        Ok(out)
    }

    async fn get_trading_goals(&self, user_id: ObjectId) -> Result<Option<TradingGoals>, RepoError> {
        let col = self.db.collection::<TradingGoals>(TRADING_GOALS);
        Ok(col.find_one(doc! { "user_id": user_id }, None).await?)
    }
}
