use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::{self, doc};
use mongodb::{Collection, Database};
use tokio::sync::RwLock;

use crate::errors::{AppError, Result};
use crate::models::payment::{PaymentOutcome, PaymentRecord, PaymentStatus};

pub const PAYMENTS_COLLECTION: &str = "payments";

/// Durable view of payment attempts. Callbacks only ever move a record that
/// already exists and whose status allows it (see
/// [`PaymentStatus::replaceable_by`]); anything else is reported as `false`.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn record_initiated(&self, record: PaymentRecord) -> Result<()>;

    async fn record_outcome(&self, txnid: &str, outcome: PaymentOutcome) -> Result<bool>;

    async fn find(&self, txnid: &str) -> Result<Option<PaymentRecord>>;
}

pub struct MongoPaymentStore {
    collection: Collection<PaymentRecord>,
}

impl MongoPaymentStore {
    pub fn new(db: &Database) -> Self {
        MongoPaymentStore {
            collection: db.collection(PAYMENTS_COLLECTION),
        }
    }
}

#[async_trait]
impl PaymentStore for MongoPaymentStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn record_initiated(&self, record: PaymentRecord) -> Result<()> {
        self.collection.insert_one(&record).await?;
        Ok(())
    }

    async fn record_outcome(&self, txnid: &str, outcome: PaymentOutcome) -> Result<bool> {
        let from: Vec<&str> = PaymentStatus::replaceable_by(outcome.status)
            .iter()
            .map(PaymentStatus::as_str)
            .collect();
        let update = doc! {
            "$set": {
                "status": outcome.status.as_str(),
                "provider_status": outcome.provider_status,
                "error": outcome.error,
                "updated_at": bson::DateTime::from_chrono(Utc::now()),
            }
        };
        let result = self
            .collection
            .update_one(doc! { "txnid": txnid, "status": { "$in": from } }, update)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn find(&self, txnid: &str) -> Result<Option<PaymentRecord>> {
        Ok(self.collection.find_one(doc! { "txnid": txnid }).await?)
    }
}

/// Process-local store used when no `DATABASE_URL` is configured.
#[derive(Default)]
pub struct InMemoryPaymentStore {
    records: RwLock<HashMap<String, PaymentRecord>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn record_initiated(&self, record: PaymentRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.txnid) {
            return Err(AppError::internal(format!("duplicate txnid {}", record.txnid)));
        }
        records.insert(record.txnid.clone(), record);
        Ok(())
    }

    async fn record_outcome(&self, txnid: &str, outcome: PaymentOutcome) -> Result<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(txnid) {
            Some(record) if PaymentStatus::replaceable_by(outcome.status).contains(&record.status) => {
                record.status = outcome.status;
                record.provider_status = outcome.provider_status;
                record.error = outcome.error;
                record.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find(&self, txnid: &str) -> Result<Option<PaymentRecord>> {
        Ok(self.records.read().await.get(txnid).cloned())
    }
}
