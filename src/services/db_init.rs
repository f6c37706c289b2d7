use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

use crate::error::RepoError;
use crate::services::repository::{HOLDINGS, TELEGRAM_SETTINGS, TRADING_GOALS};

pub async fn ensure_indexes(db: &Database) -> Result<(), RepoError> {
    // telegram_settings: one document per user
    {
        let col = db.collection::<mongodb::bson::Document>(TELEGRAM_SETTINGS);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None).await?;
    }

    // telegram_settings: scheduler scan
    {
        let col = db.collection::<mongodb::bson::Document>(TELEGRAM_SETTINGS);
        let model = IndexModel::builder()
            .keys(doc! { "is_active": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // holdings: query by (user_id, symbol)
    {
        let col = db.collection::<mongodb::bson::Document>(HOLDINGS);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "symbol": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    // trading_goals: one document per user
    {
        let col = db.collection::<mongodb::bson::Document>(TRADING_GOALS);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None).await?;
    }

    Ok(())
}
