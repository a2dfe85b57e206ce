use crate::{
    db::DbPool,
    entities::{boleto, customer, order, BoletoStatus, OrderStatus, PaymentStatus},
    errors::ServiceError,
    gateways::{BoletoIssueRequest, PaymentGateway},
};
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct IssueBoletosRequest {
    #[validate(range(min = 1, max = 12, message = "Installments must be between 1 and 12"))]
    pub installments: u32,
    /// Defaults to `interval_days` from today
    pub first_due_date: Option<DateTime<Utc>>,
    #[serde(default = "default_interval_days")]
    #[validate(range(min = 1, max = 120))]
    pub interval_days: i64,
}

fn default_interval_days() -> i64 {
    30
}

/// Splits `total` into `installments` parts of whole cents; the last part
/// absorbs the remainder.
pub fn split_installments(total: Decimal, installments: u32) -> Vec<Decimal> {
    if installments == 0 {
        return Vec::new();
    }
    let count = Decimal::from(installments);
    let share = (total / count).round_dp_with_strategy(2, rust_decimal::RoundingStrategy::ToZero);
    let mut parts = vec![share; installments as usize];
    let allocated = share * Decimal::from(installments - 1);
    if let Some(last) = parts.last_mut() {
        *last = total - allocated;
    }
    parts
}

/// Cancels each outstanding slip that reached the PSP. Failures are logged
/// and counted, never returned.
pub async fn cancel_open_at_gateway(
    gateway: &dyn PaymentGateway,
    boletos: &[boleto::Model],
) -> usize {
    let mut failures = 0;
    for slip in boletos.iter().filter(|b| b.status.is_outstanding()) {
        let Some(gateway_id) = slip.pix_payment_id.as_deref() else {
            continue;
        };
        if let Err(e) = gateway.cancel_boleto(gateway_id).await {
            failures += 1;
            counter!("boletos.gateway_cancel_failures", 1);
            warn!(boleto_id = %slip.id, gateway_id, error = %e, "failed to cancel boleto at gateway");
        }
    }
    failures
}

/// Marks the outstanding slips cancelled; returns the amount they covered.
pub async fn mark_cancelled<C>(conn: &C, boletos: &[boleto::Model]) -> Result<Decimal, ServiceError>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let mut released = Decimal::ZERO;
    for slip in boletos.iter().filter(|b| b.status.is_outstanding()) {
        let mut active = slip.clone().into_active_model();
        active.status = Set(BoletoStatus::Cancelled);
        active.cancelled_at = Set(Some(now));
        active.update(conn).await?;
        released += slip.amount;
    }
    Ok(released)
}

/// Issues installment boletos for orders
#[derive(Clone)]
pub struct BoletoService {
    db: Arc<DbPool>,
    gateway: Arc<dyn PaymentGateway>,
}

impl BoletoService {
    pub fn new(db: Arc<DbPool>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { db, gateway }
    }

    #[instrument(skip(self, request))]
    pub async fn issue_boletos(
        &self,
        order_id: Uuid,
        request: IssueBoletosRequest,
    ) -> Result<Vec<boleto::Model>, ServiceError> {
        request.validate()?;
        let db = &*self.db;

        let order = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if order.status == OrderStatus::Cancelled {
            return Err(ServiceError::BadRequest(format!(
                "Order {} is cancelled",
                order.number_tag()
            )));
        }
        if order.payment_status == PaymentStatus::Paid {
            return Err(ServiceError::BadRequest(format!(
                "Order {} is already paid",
                order.number_tag()
            )));
        }

        let has_outstanding = boleto::Entity::find()
            .filter(boleto::Column::OrderId.eq(order_id))
            .all(db)
            .await?
            .iter()
            .any(|b| b.status.is_outstanding());
        if has_outstanding {
            return Err(ServiceError::BadRequest(format!(
                "Order {} already has outstanding boletos",
                order.number_tag()
            )));
        }

        let customer = customer::Entity::find_by_id(order.customer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", order.customer_id))
            })?;

        let interval = Duration::days(request.interval_days);
        let first_due = request.first_due_date.unwrap_or_else(|| Utc::now() + interval);
        let amounts = split_installments(order.total, request.installments);
        let count = amounts.len();

        let mut issued: Vec<(i32, Decimal, DateTime<Utc>, String)> = Vec::with_capacity(count);
        for (index, amount) in amounts.into_iter().enumerate() {
            let number = index as i32 + 1;
            let due_date = first_due + interval * index as i32;
            let issue = BoletoIssueRequest {
                code: format!("ORDER-{}-{}", order.order_number, number),
                customer_name: customer.name.clone(),
                description: format!("Order {} installment {}/{}", order.number_tag(), number, count),
                amount,
                due_date,
            };
            match self.gateway.issue_boleto(&issue).await {
                Ok(slip) => issued.push((number, amount, due_date, slip.gateway_id)),
                Err(e) => {
                    error!(order_id = %order_id, installment = number, error = %e, "boleto issuance failed");
                    for (_, _, _, gateway_id) in &issued {
                        if let Err(cancel_err) = self.gateway.cancel_boleto(gateway_id).await {
                            warn!(gateway_id = %gateway_id, error = %cancel_err, "failed to roll back issued boleto");
                        }
                    }
                    return Err(e);
                }
            }
        }

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for boleto issuance");
            ServiceError::DatabaseError(e)
        })?;
        let now = Utc::now();
        let mut created = Vec::with_capacity(issued.len());
        for (number, amount, due_date, gateway_id) in issued {
            let model = boleto::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(Some(order.id)),
                customer_id: Set(order.customer_id),
                installment_number: Set(number),
                amount: Set(amount),
                due_date: Set(due_date),
                status: Set(BoletoStatus::Pending),
                pix_payment_id: Set(Some(gateway_id)),
                cancelled_at: Set(None),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            created.push(model);
        }
        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit boletos");
            ServiceError::DatabaseError(e)
        })?;

        counter!("boletos.issued", created.len() as u64);
        info!(order_id = %order_id, installments = created.len(), "boletos issued");
        Ok(created)
    }

    pub async fn list_boletos(&self, order_id: Uuid) -> Result<Vec<boleto::Model>, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        Ok(boleto::Entity::find()
            .filter(boleto::Column::OrderId.eq(order_id))
            .order_by_asc(boleto::Column::InstallmentNumber)
            .all(&*self.db)
            .await?)
    }
}
