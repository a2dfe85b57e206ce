pub mod customers;
pub mod notifications;
pub mod orders;
pub mod whatsapp;

use crate::{
    config::AppConfig,
    db::DbPool,
    gateways::{PaymentGateway, WhatsAppService},
    services::{
        boletos::BoletoService, credit::CreditService, notifications::NotificationService,
        order_deletion::OrderDeletionService, order_lifecycle::OrderLifecycleService,
        orders::OrderService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub lifecycle: Arc<OrderLifecycleService>,
    pub deletion: Arc<OrderDeletionService>,
    pub boletos: Arc<BoletoService>,
    pub credit: Arc<CreditService>,
    pub notifications: Arc<NotificationService>,
    pub whatsapp: Arc<WhatsAppService>,
}

impl AppServices {
    /// Wires every service over one pool and the given outbound gateways.
    pub fn new(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        payment_gateway: Arc<dyn PaymentGateway>,
        whatsapp: Arc<WhatsAppService>,
    ) -> Self {
        let notifications = Arc::new(NotificationService::new(
            db_pool.clone(),
            Some(whatsapp.clone()),
        ));

        Self {
            orders: Arc::new(OrderService::new(db_pool.clone())),
            lifecycle: Arc::new(OrderLifecycleService::new(
                db_pool.clone(),
                payment_gateway.clone(),
                notifications.clone(),
                config.ledger.clone(),
            )),
            deletion: Arc::new(OrderDeletionService::new(
                db_pool.clone(),
                payment_gateway.clone(),
            )),
            boletos: Arc::new(BoletoService::new(db_pool.clone(), payment_gateway)),
            credit: Arc::new(CreditService::new(db_pool)),
            notifications,
            whatsapp,
        }
    }
}
