// config.rs
use std::env;
use std::fmt;

use crate::errors::AppError;

const PAYU_TEST_URL: &str = "https://test.payu.in/_payment";
const PAYU_PRODUCTION_URL: &str = "https://secure.payu.in/_payment";

/// Merchant credentials shared with PayU. The salt never leaves the server
/// except as hash input.
#[derive(Clone)]
pub struct PayuCredentials {
    pub merchant_key: String,
    pub merchant_salt: String,
}

impl fmt::Debug for PayuCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayuCredentials")
            .field("merchant_key", &self.merchant_key)
            .field("merchant_salt", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub payu: PayuCredentials,
    pub payu_environment: String,
    pub callback_base_url: String,
    pub jwt_secret: Option<String>,
    pub database_url: Option<String>,
    pub database_name: String,
    pub port: u16,
    pub host: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let require = |name: &str| {
            get(name).ok_or_else(|| AppError::configuration(format!("{} must be set", name)))
        };

        let payu_environment = get("PAYU_ENVIRONMENT")
            .map(|value| value.trim().to_lowercase())
            .unwrap_or_else(|| "test".to_string());

        if payu_environment != "test" && payu_environment != "production" {
            return Err(AppError::configuration(format!(
                "PAYU_ENVIRONMENT must be 'test' or 'production', got '{}'",
                payu_environment
            )));
        }

        let port = match get("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::configuration(format!("PORT must be a number, got '{}'", raw)))?,
            None => 10000,
        };

        Ok(AppConfig {
            payu: PayuCredentials {
                merchant_key: require("PAYU_MERCHANT_KEY")?,
                merchant_salt: require("PAYU_MERCHANT_SALT")?,
            },
            payu_environment,
            callback_base_url: require("PAYU_CALLBACK_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            jwt_secret: get("JWT_SECRET"),
            database_url: get("DATABASE_URL"),
            database_name: get("DATABASE_NAME").unwrap_or_else(|| "legaldocs".to_string()),
            port,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.payu_environment == "production"
    }

    pub fn payment_url(&self) -> &'static str {
        if self.is_production() {
            PAYU_PRODUCTION_URL
        } else {
            PAYU_TEST_URL
        }
    }

    pub fn success_url(&self) -> String {
        format!("{}/api/payments/success-callback", self.callback_base_url)
    }

    pub fn failure_url(&self) -> String {
        format!("{}/api/payments/failure-callback", self.callback_base_url)
    }

    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "environment": self.payu_environment,
            "is_production": self.is_production(),
            "payment_url": self.payment_url(),
            "merchant_key_set": !self.payu.merchant_key.is_empty(),
            "auth_enabled": self.jwt_secret.is_some(),
            "persistent_store": self.database_url.is_some(),
            "port": self.port,
            "host": self.host,
        })
    }
}
