use crate::{
    db::DbPool,
    entities::{
        boleto, customer, order, receivable, BoletoStatus, OrderStatus, PaymentStatus,
        ReceivableStatus,
    },
    errors::ServiceError,
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lowers the customer's stored available credit by `amount`.
pub async fn debit<C>(conn: &C, customer_id: Uuid, amount: Decimal) -> Result<Decimal, ServiceError>
where
    C: ConnectionTrait,
{
    adjust(conn, customer_id, -amount).await
}

/// Raises the customer's stored available credit by `amount`.
pub async fn credit<C>(conn: &C, customer_id: Uuid, amount: Decimal) -> Result<Decimal, ServiceError>
where
    C: ConnectionTrait,
{
    adjust(conn, customer_id, amount).await
}

/// Read-modify-write on `available_credit`; returns the new value.
async fn adjust<C>(conn: &C, customer_id: Uuid, delta: Decimal) -> Result<Decimal, ServiceError>
where
    C: ConnectionTrait,
{
    let customer = customer::Entity::find_by_id(customer_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

    if delta.is_zero() {
        return Ok(customer.available_credit);
    }

    let updated = customer.available_credit + delta;
    let mut active = customer.into_active_model();
    active.available_credit = Set(updated);
    active.update(conn).await.map_err(|e| {
        error!(error = %e, customer_id = %customer_id, "Failed to adjust available credit");
        ServiceError::DatabaseError(e)
    })?;

    info!(customer_id = %customer_id, delta = %delta, available_credit = %updated, "available credit adjusted");
    Ok(updated)
}

/// Credit movement caused by a payment status change.
///
/// Paying an order gives its total back to the customer's available credit;
/// reverting the payment takes it again. Other transitions leave credit alone.
pub fn payment_flip_adjustment(
    old: PaymentStatus,
    new: PaymentStatus,
    total: Decimal,
) -> Option<Decimal> {
    match (old, new) {
        (PaymentStatus::Unpaid, PaymentStatus::Paid) => Some(total),
        (PaymentStatus::Paid, PaymentStatus::Unpaid) => Some(-total),
        _ => None,
    }
}

/// Available credit derived from open obligations rather than the stored balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CreditExposure {
    pub credit_limit: Decimal,
    pub exposure: Decimal,
    pub available: Decimal,
}

/// Computes `credit_limit - exposure` for one customer.
///
/// Per order, open boletos take precedence over the open receivable, which in
/// turn takes precedence over the order total. An order with neither counts
/// only while it is unpaid and not cancelled. Overdue items are still owed.
pub fn compute_exposure(
    credit_limit: Decimal,
    orders: &[order::Model],
    receivables: &[receivable::Model],
    boletos: &[boleto::Model],
) -> CreditExposure {
    let mut boleto_totals: HashMap<Uuid, Decimal> = HashMap::new();
    let mut exposure = Decimal::ZERO;

    for slip in boletos.iter().filter(|b| b.status.is_outstanding()) {
        match slip.order_id {
            Some(order_id) => *boleto_totals.entry(order_id).or_default() += slip.amount,
            None => exposure += slip.amount,
        }
    }

    let mut receivable_totals: HashMap<Uuid, Decimal> = HashMap::new();
    for owed in receivables.iter().filter(|r| r.status.is_outstanding()) {
        *receivable_totals.entry(owed.order_id).or_default() += owed.amount;
    }

    let order_index: HashMap<Uuid, &order::Model> = orders.iter().map(|o| (o.id, o)).collect();
    let order_ids: BTreeSet<Uuid> = order_index
        .keys()
        .chain(boleto_totals.keys())
        .chain(receivable_totals.keys())
        .copied()
        .collect();

    for order_id in order_ids {
        if let Some(amount) = boleto_totals.get(&order_id) {
            exposure += *amount;
        } else if let Some(amount) = receivable_totals.get(&order_id) {
            exposure += *amount;
        } else if let Some(order) = order_index.get(&order_id) {
            if order.payment_status != PaymentStatus::Paid && order.status != OrderStatus::Cancelled {
                exposure += order.total;
            }
        }
    }

    CreditExposure {
        credit_limit,
        exposure,
        available: credit_limit - exposure,
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreditSummary {
    pub customer_id: Uuid,
    pub credit_limit: Decimal,
    /// Running balance stored on the customer row
    pub stored_available: Decimal,
    /// Balance recomputed from open orders, receivables and boletos
    pub computed_available: Decimal,
    pub exposure: Decimal,
    /// `stored_available - computed_available`; non-zero means the ledger drifted
    pub drift: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReconcileOutcome {
    pub summary: CreditSummary,
    pub previous_stored: Decimal,
    pub drift_corrected: Decimal,
}

/// Read and repair side of the credit ledger.
#[derive(Clone)]
pub struct CreditService {
    db: Arc<DbPool>,
}

impl CreditService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    async fn load_summary<C>(conn: &C, customer_id: Uuid) -> Result<CreditSummary, ServiceError>
    where
        C: ConnectionTrait,
    {
        let customer = customer::Entity::find_by_id(customer_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

        let orders = order::Entity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .all(conn)
            .await?;
        let receivables = receivable::Entity::find()
            .filter(receivable::Column::CustomerId.eq(customer_id))
            .filter(receivable::Column::Status.ne(ReceivableStatus::Paid))
            .all(conn)
            .await?;
        let boletos = boleto::Entity::find()
            .filter(boleto::Column::CustomerId.eq(customer_id))
            .filter(boleto::Column::Status.is_in([BoletoStatus::Pending, BoletoStatus::Overdue]))
            .all(conn)
            .await?;

        let computed = compute_exposure(customer.credit_limit, &orders, &receivables, &boletos);
        Ok(CreditSummary {
            customer_id,
            credit_limit: customer.credit_limit,
            stored_available: customer.available_credit,
            computed_available: computed.available,
            exposure: computed.exposure,
            drift: customer.available_credit - computed.available,
        })
    }

    #[instrument(skip(self))]
    pub async fn credit_summary(&self, customer_id: Uuid) -> Result<CreditSummary, ServiceError> {
        let summary = Self::load_summary(&*self.db, customer_id).await?;
        if !summary.drift.is_zero() {
            warn!(customer_id = %customer_id, drift = %summary.drift, "stored available credit has drifted");
        }
        Ok(summary)
    }

    /// Overwrites the stored balance with the computed one.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, customer_id: Uuid) -> Result<ReconcileOutcome, ServiceError> {
        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for credit reconciliation");
            ServiceError::DatabaseError(e)
        })?;

        let before = Self::load_summary(&txn, customer_id).await?;
        if !before.drift.is_zero() {
            customer::ActiveModel {
                id: Set(customer_id),
                available_credit: Set(before.computed_available),
                updated_at: Set(Some(Utc::now())),
                ..Default::default()
            }
            .update(&txn)
            .await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, customer_id = %customer_id, "Failed to commit credit reconciliation");
            ServiceError::DatabaseError(e)
        })?;

        if !before.drift.is_zero() {
            counter!("credit.drift_corrected", 1);
        }
        info!(customer_id = %customer_id, drift = %before.drift, "available credit reconciled");
        Ok(ReconcileOutcome {
            previous_stored: before.stored_available,
            drift_corrected: before.drift,
            summary: CreditSummary {
                stored_available: before.computed_available,
                drift: Decimal::ZERO,
                ..before
            },
        })
    }
}
