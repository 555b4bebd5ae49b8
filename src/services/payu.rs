// services/payu.rs
//! PayU hosted-checkout handshake.
//!
//! The integrity tag is `sha512(key|txnid|amount|productinfo|firstname|email|udf1..udf10|salt)`
//! rendered as lowercase hex. The ten user-defined slots are always empty here
//! but must stay in the string for PayU to compute the same digest.

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::{Digest, Sha512};
use thiserror::Error;
use tracing::{error, warn};
use validator::Validate;

use crate::config::{AppConfig, PayuCredentials};
use crate::dtos::payment_dtos::{InitPaymentData, InitPaymentRequest, SuccessCallback};
use crate::errors::{AppError, Result};

const EMPTY_UDF_SLOTS: usize = 10;
const TXNID_SUFFIX_LEN: usize = 5;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub const FALLBACK_NAME: &str = "Customer";
pub const FALLBACK_EMAIL: &str = "customer@example.com";
pub const FALLBACK_PHONE: &str = "9999999999";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("missing hash field: {0}")]
    MissingField(&'static str),

    #[error("hash field {0} contains the '|' delimiter")]
    Delimiter(&'static str),
}

/// Transaction fields covered by the tag, in PayU order.
#[derive(Debug, Clone, Copy)]
pub struct HashFields<'a> {
    pub key: &'a str,
    pub txnid: &'a str,
    pub amount: &'a str,
    pub productinfo: &'a str,
    pub firstname: &'a str,
    pub email: &'a str,
}

impl<'a> HashFields<'a> {
    fn ordered(&self) -> [(&'static str, &'a str); 6] {
        [
            ("key", self.key),
            ("txnid", self.txnid),
            ("amount", self.amount),
            ("productinfo", self.productinfo),
            ("firstname", self.firstname),
            ("email", self.email),
        ]
    }
}

pub fn generate_hash(fields: &HashFields<'_>, salt: &str) -> std::result::Result<String, HashError> {
    let ordered = fields.ordered();
    let salt_entry = ("salt", salt);
    for &(name, value) in ordered.iter().chain(std::iter::once(&salt_entry)) {
        if value.is_empty() {
            return Err(HashError::MissingField(name));
        }
        // A stray separator would shift every later field.
        if value.contains('|') {
            return Err(HashError::Delimiter(name));
        }
    }

    let joined = ordered.iter().map(|(_, v)| *v).collect::<Vec<_>>().join("|");
    let hash_string = format!("{}{}{}", joined, "|".repeat(EMPTY_UDF_SLOTS + 1), salt);

    let mut hasher = Sha512::new();
    hasher.update(hash_string.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Byte comparison whose running time depends only on the length.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// `TXN` + unix millis + five base-36 characters. A correlation key, not a secret.
pub fn generate_txnid() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TXNID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("TXN{}{}", Utc::now().timestamp_millis(), suffix)
}

/// Amounts must be positive with at most paise precision.
pub fn format_amount(amount: Decimal) -> Result<String> {
    if amount <= Decimal::ZERO {
        return Err(AppError::invalid_data("amount must be greater than 0"));
    }
    let normalized = amount.normalize();
    if normalized.scale() > 2 {
        return Err(AppError::invalid_data(
            "amount must have at most two decimal places",
        ));
    }
    Ok(normalized.to_string())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn form_field<'a>(form_data: &'a Value, name: &str) -> Option<&'a str> {
    non_blank(form_data.get(name).and_then(Value::as_str))
}

/// Validates an init request and builds the signed redirect payload.
pub fn prepare_payment(config: &AppConfig, request: InitPaymentRequest) -> Result<InitPaymentData> {
    request.validate()?;

    let form_type = non_blank(request.form_type.as_deref())
        .ok_or_else(|| AppError::invalid_data("formType is required"))?
        .to_string();
    let form_data = match request.form_data {
        Some(Value::Null) | None => return Err(AppError::invalid_data("formData is required")),
        Some(data) => data,
    };
    let amount = request
        .amount
        .ok_or_else(|| AppError::invalid_data("amount is required"))?;
    let amount = format_amount(amount)?;

    let user_info = request.user_info.unwrap_or_default();
    let firstname = non_blank(user_info.name.as_deref())
        .or_else(|| form_field(&form_data, "name"))
        .unwrap_or(FALLBACK_NAME)
        .to_string();
    let email = non_blank(user_info.email.as_deref())
        .or_else(|| form_field(&form_data, "email"))
        .unwrap_or(FALLBACK_EMAIL)
        .to_string();
    let phone = non_blank(user_info.phone.as_deref())
        .or_else(|| form_field(&form_data, "phone"))
        .unwrap_or(FALLBACK_PHONE)
        .to_string();

    let txnid = generate_txnid();
    let productinfo = format!("{} Form Submission", form_type);

    let fields = HashFields {
        key: &config.payu.merchant_key,
        txnid: &txnid,
        amount: &amount,
        productinfo: &productinfo,
        firstname: &firstname,
        email: &email,
    };
    let hash = generate_hash(&fields, &config.payu.merchant_salt).map_err(|e| match e {
        HashError::Delimiter(field) => {
            AppError::invalid_data(format!("{} must not contain '|'", field))
        }
        missing @ HashError::MissingField(_) => AppError::PaymentInit(missing.to_string()),
    })?;

    Ok(InitPaymentData {
        key: config.payu.merchant_key.clone(),
        txnid,
        amount,
        productinfo,
        firstname,
        email,
        phone,
        surl: config.success_url(),
        furl: config.failure_url(),
        hash,
        payment_url: config.payment_url().to_string(),
        form_data,
        form_type,
    })
}

/// A success callback whose tag matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCallback {
    pub txnid: String,
    pub amount: String,
    pub status: String,
}

/// Recomputes the tag over the callback fields as received, bound with the
/// server-held salt, and compares it with the provider's tag.
pub fn verify_callback(
    credentials: &PayuCredentials,
    callback: &SuccessCallback,
) -> Result<VerifiedCallback> {
    if credentials.merchant_key.is_empty() || credentials.merchant_salt.is_empty() {
        return Err(AppError::internal("PayU credentials are not configured"));
    }

    let txnid = callback.txnid.as_deref().unwrap_or_default();

    let provided = match non_blank(callback.hash.as_deref()) {
        Some(hash) => hash.to_ascii_lowercase(),
        None => {
            warn!(txnid, "Success callback without hash");
            return Err(AppError::HashMismatch);
        }
    };

    if let Some(key) = callback.key.as_deref() {
        if key != credentials.merchant_key {
            warn!(txnid, callback_key = key, "Success callback for a foreign merchant key");
            return Err(AppError::HashMismatch);
        }
    }

    let amount = callback.amount.as_deref().unwrap_or_default();
    let fields = HashFields {
        key: &credentials.merchant_key,
        txnid,
        amount,
        productinfo: callback.productinfo.as_deref().unwrap_or_default(),
        firstname: callback.firstname.as_deref().unwrap_or_default(),
        email: callback.email.as_deref().unwrap_or_default(),
    };

    let expected = generate_hash(&fields, &credentials.merchant_salt).map_err(|e| {
        warn!(txnid, error = %e, "Success callback fields cannot be hashed");
        AppError::HashMismatch
    })?;

    if !constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
        error!(
            txnid,
            amount,
            expected_hash = %expected,
            received_hash = %provided,
            "Payment hash mismatch"
        );
        return Err(AppError::HashMismatch);
    }

    Ok(VerifiedCallback {
        txnid: txnid.to_string(),
        amount: amount.to_string(),
        status: non_blank(callback.status.as_deref())
            .unwrap_or("unknown")
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::payment_dtos::UserInfo;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const REFERENCE_HASH: &str = "09b5daba961a488740ac724eec5f6487f527511b07d159a40b065756b34dbe1a7789e451badbd9a9d7774a64d54548c8993be3dd5f3b3f692ecddb91442b8fda";

    fn reference_fields() -> HashFields<'static> {
        HashFields {
            key: "K",
            txnid: "TXN1",
            amount: "250",
            productinfo: "sale-deed Form Submission",
            firstname: "Test",
            email: "t@example.com",
        }
    }

    fn test_config() -> AppConfig {
        AppConfig::from_lookup(|name| match name {
            "PAYU_MERCHANT_KEY" => Some("K".into()),
            "PAYU_MERCHANT_SALT" => Some("S".into()),
            "PAYU_CALLBACK_BASE_URL" => Some("https://api.example.com".into()),
            _ => None,
        })
        .unwrap()
    }

    fn signed_callback(credentials: &PayuCredentials) -> SuccessCallback {
        let mut cb = SuccessCallback {
            txnid: Some("TXN1".into()),
            amount: Some("250".into()),
            status: Some("success".into()),
            productinfo: Some("sale-deed Form Submission".into()),
            firstname: Some("Test".into()),
            email: Some("t@example.com".into()),
            phone: Some("9999999999".into()),
            hash: None,
            key: Some(credentials.merchant_key.clone()),
        };
        cb.hash = Some(generate_hash(&reference_fields(), &credentials.merchant_salt).unwrap());
        cb
    }

    #[test]
    fn reproduces_reference_vector() {
        let hash = generate_hash(&reference_fields(), "S").unwrap();
        assert_eq!(hash, REFERENCE_HASH);
        assert_eq!(hash.len(), 128);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hash_is_deterministic() {
        let a = generate_hash(&reference_fields(), "S").unwrap();
        let b = generate_hash(&reference_fields(), "S").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn every_covered_field_changes_the_hash() {
        let base = generate_hash(&reference_fields(), "S").unwrap();
        let variants = [
            HashFields { key: "K2", ..reference_fields() },
            HashFields { txnid: "TXN2", ..reference_fields() },
            HashFields { amount: "251", ..reference_fields() },
            HashFields { productinfo: "will Form Submission", ..reference_fields() },
            HashFields { firstname: "Tess", ..reference_fields() },
            HashFields { email: "u@example.com", ..reference_fields() },
        ];
        for fields in variants {
            assert_ne!(generate_hash(&fields, "S").unwrap(), base, "{:?}", fields);
        }
        assert_ne!(generate_hash(&reference_fields(), "S2").unwrap(), base);
    }

    #[test]
    fn refuses_missing_key_or_salt() {
        let fields = HashFields { key: "", ..reference_fields() };
        assert_eq!(generate_hash(&fields, "S"), Err(HashError::MissingField("key")));
        assert_eq!(
            generate_hash(&reference_fields(), ""),
            Err(HashError::MissingField("salt"))
        );
    }

    #[test]
    fn refuses_embedded_delimiter() {
        let fields = HashFields { firstname: "Te|st", ..reference_fields() };
        assert_eq!(generate_hash(&fields, "S"), Err(HashError::Delimiter("firstname")));
    }

    #[test]
    fn constant_time_eq_behaves_like_equality() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn txnid_has_expected_shape() {
        let id = generate_txnid();
        assert!(id.starts_with("TXN"));
        let (millis, suffix) = id[3..].split_at(id.len() - 3 - TXNID_SUFFIX_LEN);
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), TXNID_SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| BASE36.contains(&b)));
        assert_ne!(generate_txnid(), generate_txnid());
    }

    #[test]
    fn amount_formatting_and_bounds() {
        assert_eq!(format_amount(dec!(250)).unwrap(), "250");
        assert_eq!(format_amount(dec!(250.50)).unwrap(), "250.5");
        assert_eq!(format_amount(dec!(0.01)).unwrap(), "0.01");
        assert!(format_amount(dec!(0)).is_err());
        assert!(format_amount(dec!(-5)).is_err());
        assert!(format_amount(dec!(1.005)).is_err());
    }

    #[test]
    fn prepare_rejects_missing_form_type() {
        let request = InitPaymentRequest {
            form_type: None,
            form_data: Some(json!({ "a": 1 })),
            amount: Some(dec!(100)),
            user_info: None,
        };
        let err = prepare_payment(&test_config(), request).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn prepare_rejects_missing_amount() {
        let request = InitPaymentRequest {
            form_type: Some("x".into()),
            form_data: Some(json!({})),
            amount: None,
            user_info: None,
        };
        let err = prepare_payment(&test_config(), request).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn prepare_rejects_missing_form_data() {
        let request = InitPaymentRequest {
            form_type: Some("x".into()),
            form_data: Some(Value::Null),
            amount: Some(dec!(10)),
            user_info: None,
        };
        assert!(matches!(
            prepare_payment(&test_config(), request),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn prepare_builds_a_verifiable_payload() {
        let config = test_config();
        let request = InitPaymentRequest {
            form_type: Some("sale-deed".into()),
            form_data: Some(json!({ "propertyId": "P-9" })),
            amount: Some(dec!(250)),
            user_info: Some(UserInfo {
                name: Some("Test".into()),
                email: Some("t@example.com".into()),
                phone: None,
            }),
        };
        let data = prepare_payment(&config, request).unwrap();

        assert_eq!(data.key, "K");
        assert_eq!(data.amount, "250");
        assert_eq!(data.productinfo, "sale-deed Form Submission");
        assert_eq!(data.phone, FALLBACK_PHONE);
        assert_eq!(data.payment_url, "https://test.payu.in/_payment");
        assert_eq!(data.surl, "https://api.example.com/api/payments/success-callback");
        assert_eq!(data.form_data, json!({ "propertyId": "P-9" }));

        let expected = generate_hash(
            &HashFields {
                key: "K",
                txnid: &data.txnid,
                amount: "250",
                productinfo: "sale-deed Form Submission",
                firstname: "Test",
                email: "t@example.com",
            },
            "S",
        )
        .unwrap();
        assert_eq!(data.hash, expected);
    }

    #[test]
    fn prepare_falls_back_to_form_data_then_placeholders() {
        let request = InitPaymentRequest {
            form_type: Some("will".into()),
            form_data: Some(json!({ "name": "Asha", "phone": "9876543210" })),
            amount: Some(dec!(99.99)),
            user_info: None,
        };
        let data = prepare_payment(&test_config(), request).unwrap();
        assert_eq!(data.firstname, "Asha");
        assert_eq!(data.phone, "9876543210");
        assert_eq!(data.email, FALLBACK_EMAIL);
    }

    #[test]
    fn verifier_accepts_untampered_callback_repeatedly() {
        let creds = test_config().payu;
        let cb = signed_callback(&creds);
        let first = verify_callback(&creds, &cb).unwrap();
        let second = verify_callback(&creds, &cb).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.txnid, "TXN1");
        assert_eq!(first.amount, "250");
        assert_eq!(first.status, "success");
    }

    #[test]
    fn verifier_rejects_tampered_amount() {
        let creds = test_config().payu;
        let mut cb = signed_callback(&creds);
        cb.amount = Some("1".into());
        assert!(matches!(verify_callback(&creds, &cb), Err(AppError::HashMismatch)));
    }

    #[test]
    fn verifier_rejects_forged_hash() {
        let creds = test_config().payu;
        let mut cb = signed_callback(&creds);
        cb.hash = Some("deadbeef".repeat(16));
        assert!(matches!(verify_callback(&creds, &cb), Err(AppError::HashMismatch)));
    }

    #[test]
    fn verifier_rejects_missing_hash_or_fields() {
        let creds = test_config().payu;
        let mut cb = signed_callback(&creds);
        cb.hash = None;
        assert!(matches!(verify_callback(&creds, &cb), Err(AppError::HashMismatch)));

        let mut cb = signed_callback(&creds);
        cb.email = None;
        assert!(matches!(verify_callback(&creds, &cb), Err(AppError::HashMismatch)));
    }

    #[test]
    fn verifier_ignores_a_salt_other_than_the_servers() {
        let creds = test_config().payu;
        let mut cb = signed_callback(&creds);
        cb.hash = Some(generate_hash(&reference_fields(), "attacker-salt").unwrap());
        assert!(matches!(verify_callback(&creds, &cb), Err(AppError::HashMismatch)));
    }

    #[test]
    fn verifier_rejects_foreign_key() {
        let creds = test_config().payu;
        let mut cb = signed_callback(&creds);
        cb.key = Some("OTHER".into());
        assert!(matches!(verify_callback(&creds, &cb), Err(AppError::HashMismatch)));
    }

    #[test]
    fn verifier_accepts_uppercase_hex() {
        let creds = test_config().payu;
        let mut cb = signed_callback(&creds);
        cb.hash = cb.hash.map(|h| h.to_uppercase());
        assert!(verify_callback(&creds, &cb).is_ok());
    }

    #[test]
    fn verifier_does_not_invent_a_success_status() {
        let creds = test_config().payu;
        let mut cb = signed_callback(&creds);
        cb.status = None;
        assert_eq!(verify_callback(&creds, &cb).unwrap().status, "unknown");
    }
}
