//! Order status and payment transitions.
//!
//! One update can touch boletos, credit, the receivable, bank transactions
//! and the customer's mirrored purchase. PSP calls happen before the database
//! transaction; referral points and notifications after it.

use crate::{
    config::LedgerConfig,
    db::DbPool,
    entities::{bank_account, boleto, customer, order, order_item, BoletoStatus, OrderStatus, PaymentStatus},
    errors::ServiceError,
    gateways::PaymentGateway,
    services::{
        boletos::{cancel_open_at_gateway, mark_cancelled},
        credit,
        ledger::{self, ReceivableSync},
        notifications::NotificationService,
        purchases::{self, DeliveryOutcome},
        referral,
    },
};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub bank_account_id: Option<Uuid>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl UpdateOrderRequest {
    fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.payment_status.is_none()
            && self.bank_account_id.is_none()
            && self.notes.is_none()
    }
}

/// What an update changed beyond the order row itself.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderUpdateOutcome {
    pub order: order::Model,
    pub boletos_cancelled: usize,
    /// PSP cancellations that failed and were left for manual follow-up
    pub gateway_cancel_failures: usize,
    /// Credit restored by cancelled boletos
    pub credit_released: Decimal,
    /// Credit moved by a payment flip
    pub payment_credit_adjustment: Option<Decimal>,
    pub delivery: Option<DeliveryOutcome>,
    pub receivable: Option<ReceivableSync>,
    pub purchase_payment_mirrored: bool,
    pub referral_points_awarded: Option<i64>,
}

#[derive(Clone)]
pub struct OrderLifecycleService {
    db: Arc<DbPool>,
    gateway: Arc<dyn PaymentGateway>,
    notifications: Arc<NotificationService>,
    ledger: LedgerConfig,
}

impl OrderLifecycleService {
    pub fn new(
        db: Arc<DbPool>,
        gateway: Arc<dyn PaymentGateway>,
        notifications: Arc<NotificationService>,
        ledger: LedgerConfig,
    ) -> Self {
        Self {
            db,
            gateway,
            notifications,
            ledger,
        }
    }

    /// Applies a status and/or payment change to an order.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn update_order(
        &self,
        order_id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<OrderUpdateOutcome, ServiceError> {
        request.validate()?;
        if request.is_empty() {
            return Err(ServiceError::ValidationError(
                "at least one of status, payment_status, bank_account_id or notes is required"
                    .to_string(),
            ));
        }

        let db = &*self.db;
        let current = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let new_status = request.status.unwrap_or(current.status);
        let new_payment = request.payment_status.unwrap_or(current.payment_status);
        let bank_account_id = request.bank_account_id.or(current.bank_account_id);

        if let Some(requested) = request.bank_account_id {
            bank_account::Entity::find_by_id(requested)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Bank account {} not found", requested))
                })?;
        }
        if request.payment_status == Some(PaymentStatus::Paid)
            && new_status.tracks_receivable()
            && bank_account_id.is_none()
        {
            return Err(ServiceError::ValidationError(
                "bank account is required to mark an order as paid".to_string(),
            ));
        }

        let status_changed = new_status != current.status;
        let entering_cancelled = status_changed && new_status == OrderStatus::Cancelled;
        let entering_delivered = status_changed && new_status == OrderStatus::Delivered;
        let payment_changed = new_payment != current.payment_status;

        // PSP first, outside the transaction
        let mut pending_boletos = Vec::new();
        let mut gateway_cancel_failures = 0;
        if entering_cancelled {
            pending_boletos = boleto::Entity::find()
                .filter(boleto::Column::OrderId.eq(order_id))
                .filter(boleto::Column::Status.eq(BoletoStatus::Pending))
                .all(db)
                .await?;
            gateway_cancel_failures =
                cancel_open_at_gateway(self.gateway.as_ref(), &pending_boletos).await;
        }

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order update");
            ServiceError::DatabaseError(e)
        })?;

        let mut active = current.clone().into_active_model();
        active.status = Set(new_status);
        active.payment_status = Set(new_payment);
        active.bank_account_id = Set(bank_account_id);
        if let Some(notes) = request.notes.clone() {
            active.notes = Set(Some(notes));
        }
        let updated = active.update(&txn).await.map_err(|e| {
            error!(error = %e, "Failed to update order");
            ServiceError::DatabaseError(e)
        })?;

        let mut credit_released = Decimal::ZERO;
        if entering_cancelled {
            credit_released = mark_cancelled(&txn, &pending_boletos).await?;
            credit::credit(&txn, updated.customer_id, credit_released).await?;
        }

        let customer = customer::Entity::find_by_id(updated.customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", updated.customer_id))
            })?;

        let delivery = if entering_delivered {
            let items = order_item::Entity::find()
                .filter(order_item::Column::OrderId.eq(order_id))
                .all(&txn)
                .await?;
            Some(
                purchases::mirror_delivery(
                    &txn,
                    &updated,
                    &items,
                    new_payment,
                    bank_account_id,
                    &self.ledger.factory_supplier_name,
                )
                .await?,
            )
        } else {
            None
        };

        let receivable = match request.payment_status {
            Some(payment_status) if new_status.tracks_receivable() => Some(
                ledger::sync_receivable(
                    &txn,
                    &updated,
                    &customer,
                    payment_status,
                    bank_account_id,
                    &self.ledger,
                )
                .await?,
            ),
            _ => None,
        };

        let payment_credit_adjustment =
            credit::payment_flip_adjustment(current.payment_status, new_payment, current.total);
        if let Some(delta) = payment_credit_adjustment {
            credit::credit(&txn, updated.customer_id, delta).await?;
        }

        let purchase_payment_mirrored = if payment_changed && delivery.is_none() {
            purchases::mirror_payment(&txn, &updated, new_payment, bank_account_id).await?
        } else {
            false
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit order update");
            ServiceError::DatabaseError(e)
        })?;

        let referral_points_awarded = if entering_delivered {
            match referral::award_referral_bonus(db, &updated, self.ledger.referral_bonus_points)
                .await
            {
                Ok(awarded) => awarded.map(|tx| tx.points),
                Err(e) => {
                    counter!("orders.referral_bonus_failures", 1);
                    warn!(error = %e, "referral bonus failed; delivery kept");
                    None
                }
            }
        } else {
            None
        };

        if status_changed {
            self.notifications.notify_order_update(&updated).await;
            counter!("orders.status_transitions", 1, "to" => new_status.to_string());
        }

        info!(
            from_status = %current.status,
            to_status = %new_status,
            from_payment = %current.payment_status,
            to_payment = %new_payment,
            "order updated"
        );

        Ok(OrderUpdateOutcome {
            order: updated,
            boletos_cancelled: pending_boletos.len(),
            gateway_cancel_failures,
            credit_released,
            payment_credit_adjustment,
            delivery,
            receivable,
            purchase_payment_mirrored,
            referral_points_awarded,
        })
    }
}
