use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::payment_store::PaymentStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub payments: Arc<dyn PaymentStore>,
}

impl AppState {
    pub fn new(config: AppConfig, payments: Arc<dyn PaymentStore>) -> Self {
        AppState {
            config: Arc::new(config),
            payments,
        }
    }
}
