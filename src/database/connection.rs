use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};

use crate::errors::Result;
use crate::models::payment::PaymentRecord;
use super::payment_store::PAYMENTS_COLLECTION;

pub async fn get_db_client(database_url: &str, db_name: &str) -> Result<Database> {
    let client = Client::with_uri_str(database_url).await?;
    let db = client.database(db_name);

    db.run_command(doc! { "ping": 1 }).await?;
    tracing::info!(database = db_name, "Connected to MongoDB");

    ensure_indexes(&db).await?;
    Ok(db)
}

async fn ensure_indexes(db: &Database) -> Result<()> {
    let index = IndexModel::builder()
        .keys(doc! { "txnid": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();

    db.collection::<PaymentRecord>(PAYMENTS_COLLECTION)
        .create_index(index)
        .await?;
    Ok(())
}
