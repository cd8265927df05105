//! Application state for coupon-cloud

use std::sync::Arc;

use crate::config::Config;
use crate::db::{PgStore, Store, seed_demo_coupons};
use crate::gateway::{AlfaBankClient, PaymentGateway};
use crate::orders::{OrderService, OrderSettings};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub orders: Arc<OrderService>,
}

impl AppState {
    /// Wire the service from explicit parts (tests, alternative stores)
    pub fn from_parts(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        settings: OrderSettings,
    ) -> Self {
        Self {
            orders: Arc::new(OrderService::new(store, gateway, settings)),
        }
    }

    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let store = PgStore::connect(&config.database_url).await?;
        tracing::info!("Database ready");

        if config.seed_demo_coupons {
            seed_demo_coupons(&store).await?;
        }

        let gateway = AlfaBankClient::new(config.alfa_bank())?;
        tracing::info!(
            base_url = %config.alfa_bank_base_url,
            test_mode = config.payment_test_mode,
            "Payment gateway client ready"
        );

        Ok(Self::from_parts(
            Arc::new(store),
            Arc::new(gateway),
            OrderSettings::from(config),
        ))
    }
}
