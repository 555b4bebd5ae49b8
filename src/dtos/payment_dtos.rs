use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::{Validate, ValidateEmail, ValidationError};

/// Body of `POST /api/payments/init`. Every field is optional at the wire
/// level so that missing values surface as validation errors, not 422s.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitPaymentRequest {
    pub form_type: Option<String>,
    pub form_data: Option<Value>,
    pub amount: Option<Decimal>,
    #[validate(nested)]
    pub user_info: Option<UserInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserInfo {
    pub name: Option<String>,
    #[validate(custom(function = "validate_optional_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

fn validate_optional_email(email: &String) -> Result<(), ValidationError> {
    if email.trim().is_empty() || email.validate_email() {
        return Ok(());
    }
    let mut err = ValidationError::new("email");
    err.message = Some("userInfo.email must be a valid email address".into());
    Err(err)
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub message: String,
    pub data: T,
}

/// Redirect payload handed back to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct InitPaymentData {
    pub key: String,
    pub txnid: String,
    pub amount: String,
    pub productinfo: String,
    pub firstname: String,
    pub email: String,
    pub phone: String,
    pub surl: String,
    pub furl: String,
    pub hash: String,
    #[serde(rename = "paymentUrl")]
    pub payment_url: String,
    #[serde(rename = "formData")]
    pub form_data: Value,
    #[serde(rename = "formType")]
    pub form_type: String,
}

/// Success callback as posted back by PayU.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuccessCallback {
    #[serde(default, deserialize_with = "lenient_string")]
    pub txnid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub productinfo: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub firstname: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub hash: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FailureCallback {
    #[serde(default, deserialize_with = "lenient_string")]
    pub txnid: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub txnid: String,
    pub amount: String,
    pub status: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct FailureAck {
    pub txnid: Option<String>,
    pub amount: Option<String>,
    pub status: String,
    pub error: Option<String>,
    pub timestamp: String,
}

/// Accepts strings, numbers and booleans; PayU is not consistent about
/// quoting numeric fields.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
