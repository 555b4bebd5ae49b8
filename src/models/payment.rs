use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::dtos::payment_dtos::InitPaymentData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Initiated,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Initiated => "initiated",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }

    /// States a record may be in for an outcome to overwrite it. Success is
    /// terminal; a verified success may still replace an unverified failure.
    pub fn replaceable_by(target: PaymentStatus) -> &'static [PaymentStatus] {
        match target {
            PaymentStatus::Success => &[PaymentStatus::Initiated, PaymentStatus::Failed],
            PaymentStatus::Failed | PaymentStatus::Initiated => &[PaymentStatus::Initiated],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub txnid: String,
    pub form_type: String,
    pub amount: String,
    pub productinfo: String,
    pub firstname: String,
    pub email: String,
    pub phone: String,
    pub user_id: Option<String>,

    // Status tracking
    pub status: PaymentStatus,
    pub provider_status: Option<String>,
    pub error: Option<String>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn initiated(data: &InitPaymentData, user_id: Option<String>) -> Self {
        let now = Utc::now();
        PaymentRecord {
            id: None,
            txnid: data.txnid.clone(),
            form_type: data.form_type.clone(),
            amount: data.amount.clone(),
            productinfo: data.productinfo.clone(),
            firstname: data.firstname.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            user_id,
            status: PaymentStatus::Initiated,
            provider_status: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// What a callback reports about a transaction.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub status: PaymentStatus,
    pub provider_status: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub txnid: String,
    #[serde(rename = "formType")]
    pub form_type: String,
    pub amount: String,
    pub status: PaymentStatus,
    #[serde(rename = "providerStatus")]
    pub provider_status: Option<String>,
    pub error: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl From<PaymentRecord> for PaymentStatusResponse {
    fn from(record: PaymentRecord) -> Self {
        PaymentStatusResponse {
            txnid: record.txnid,
            form_type: record.form_type,
            amount: record.amount,
            status: record.status,
            provider_status: record.provider_status,
            error: record.error,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}
