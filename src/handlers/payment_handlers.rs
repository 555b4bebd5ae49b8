// handlers/payment_handlers.rs
use axum::{
    extract::{rejection::JsonRejection, Extension, Json, Path, State},
};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::dtos::payment_dtos::{
    ApiResponse, CallbackAck, FailureAck, FailureCallback, InitPaymentData, InitPaymentRequest,
    SuccessCallback,
};
use crate::errors::{AppError, Result};
use crate::handlers::extract::CallbackBody;
use crate::middleware::auth::AuthUser;
use crate::models::payment::{PaymentOutcome, PaymentRecord, PaymentStatus, PaymentStatusResponse};
use crate::services::payu;
use crate::state::AppState;

pub async fn initialize_payment(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    payload: std::result::Result<Json<InitPaymentRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<InitPaymentData>>> {
    let user_id = auth.map(|Extension(user)| user.user_id);

    let Json(request) = payload.map_err(|e| {
        warn!(user_id = ?user_id, "Unreadable payment init body: {}", e.body_text());
        AppError::from(e)
    })?;
    let form_type = request.form_type.clone();

    let data = payu::prepare_payment(&state.config, request).map_err(|e| {
        warn!(user_id = ?user_id, form_type = ?form_type, error = %e, "Payment initialization rejected");
        e
    })?;

    info!(
        txnid = %data.txnid,
        amount = %data.amount,
        form_type = %data.form_type,
        user_id = ?user_id,
        "Payment initialized"
    );

    let record = PaymentRecord::initiated(&data, user_id);
    if let Err(e) = state.payments.record_initiated(record).await {
        error!(txnid = %data.txnid, error = %e, "Failed to store initiated payment");
    }

    Ok(Json(ApiResponse {
        status: "success",
        message: "Payment initialized successfully".to_string(),
        data,
    }))
}

pub async fn payment_success_callback(
    State(state): State<AppState>,
    CallbackBody(callback): CallbackBody<SuccessCallback>,
) -> Result<Json<ApiResponse<CallbackAck>>> {
    info!(
        txnid = ?callback.txnid,
        amount = ?callback.amount,
        status = ?callback.status,
        "Received PayU success callback"
    );

    let verified = payu::verify_callback(&state.config.payu, &callback)?;

    // The forward tag does not cover `status`, so only an explicit success settles as paid.
    let paid = verified.status.eq_ignore_ascii_case("success");
    let outcome = PaymentOutcome {
        status: if paid { PaymentStatus::Success } else { PaymentStatus::Failed },
        provider_status: Some(verified.status.clone()),
        error: None,
    };
    match state.payments.record_outcome(&verified.txnid, outcome).await {
        Ok(true) => {}
        Ok(false) => warn!(txnid = %verified.txnid, "No pending record for verified callback"),
        Err(e) => error!(txnid = %verified.txnid, error = %e, "Failed to record payment outcome"),
    }

    info!(
        txnid = %verified.txnid,
        amount = %verified.amount,
        status = %verified.status,
        "Payment callback verified"
    );

    let (status, message) = if paid {
        ("success", "Payment successful")
    } else {
        ("failed", "Payment not completed")
    };

    Ok(Json(ApiResponse {
        status,
        message: message.to_string(),
        data: CallbackAck {
            txnid: verified.txnid,
            amount: verified.amount,
            status: verified.status,
            timestamp: Utc::now().to_rfc3339(),
        },
    }))
}

/// Provider-declared failures are acknowledged without a hash check; only
/// success callbacks can move money, so only those are verified.
pub async fn payment_failure_callback(
    State(state): State<AppState>,
    payload: std::result::Result<CallbackBody<FailureCallback>, AppError>,
) -> Json<ApiResponse<FailureAck>> {
    let callback = match payload {
        Ok(CallbackBody(callback)) => callback,
        Err(e) => {
            warn!(error = %e, "Unreadable failure callback body");
            FailureCallback::default()
        }
    };

    let status = callback
        .status
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "failed".to_string());

    warn!(
        txnid = ?callback.txnid,
        amount = ?callback.amount,
        status = %status,
        error = ?callback.error,
        "Payment failed"
    );

    if let Some(txnid) = callback.txnid.as_deref() {
        let outcome = PaymentOutcome {
            status: PaymentStatus::Failed,
            provider_status: Some(status.clone()),
            error: callback.error.clone(),
        };
        match state.payments.record_outcome(txnid, outcome).await {
            Ok(true) => {}
            Ok(false) => warn!(txnid, "No pending record for failure callback"),
            Err(e) => error!(txnid, error = %e, "Failed to record payment failure"),
        }
    }

    Json(ApiResponse {
        status: "failed",
        message: "Payment failed".to_string(),
        data: FailureAck {
            txnid: callback.txnid,
            amount: callback.amount,
            status,
            error: callback.error,
            timestamp: Utc::now().to_rfc3339(),
        },
    })
}

/// Records created by a logged-in user are only visible to that user; others
/// get the same 404 as an unknown txnid.
pub async fn get_payment(
    State(state): State<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(txnid): Path<String>,
) -> Result<Json<ApiResponse<PaymentStatusResponse>>> {
    let record = state.payments.find(&txnid).await?.ok_or(AppError::NotFound)?;

    if let Some(owner) = record.user_id.as_deref() {
        let caller = auth.as_ref().map(|Extension(user)| user.user_id.as_str());
        if caller != Some(owner) {
            warn!(txnid = %txnid, caller = ?caller, "Payment lookup by non-owner");
            return Err(AppError::NotFound);
        }
    }

    Ok(Json(ApiResponse {
        status: "success",
        message: "Payment found".to_string(),
        data: record.into(),
    }))
}
