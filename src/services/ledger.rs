//! Receivables and bank transactions.
//!
//! Marking an order paid writes income to a bank account. Because staff also
//! record the same deposit by hand, a recent income row that looks like the
//! same payment is linked instead of duplicated.

use crate::{
    config::LedgerConfig,
    entities::{
        bank_account, customer, order, receivable, transaction, PaymentStatus, ReceivableStatus,
        ReferenceType, TransactionKind,
    },
    errors::ServiceError,
};
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use tracing::{debug, error, info};
use utoipa::ToSchema;
use uuid::Uuid;

static ORDER_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\d+)").expect("order tag pattern"));

/// True when `description` quotes `#<order_number>` as a whole token, so that
/// `#12` is not found inside `#123`.
pub fn mentions_order_number(description: &str, order_number: i64) -> bool {
    ORDER_TAG
        .captures_iter(description)
        .filter_map(|caps| caps.get(1))
        .any(|m| m.as_str().parse::<i64>().ok() == Some(order_number))
}

/// Heuristic identity of an income row with an order payment.
pub fn looks_like_payment(
    tx: &transaction::Model,
    amount: Decimal,
    tolerance: Decimal,
    first_name: Option<&str>,
    order_number: i64,
) -> bool {
    if tx.kind != TransactionKind::Income || (tx.amount - amount).abs() > tolerance {
        return false;
    }
    let by_name = first_name
        .filter(|name| !name.is_empty())
        .map(|name| tx.description.to_lowercase().contains(&name.to_lowercase()))
        .unwrap_or(false);
    by_name || mentions_order_number(&tx.description, order_number)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", content = "transaction_id", rename_all = "snake_case")]
pub enum IncomeOutcome {
    /// An existing deposit was recognised as this payment
    Linked(Uuid),
    /// A new income row was written and the balance raised
    Created(Uuid),
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReceivableSync {
    pub receivable_id: Uuid,
    pub status: ReceivableStatus,
    pub income: Option<IncomeOutcome>,
}

/// Adds `delta` to the account balance.
pub async fn adjust_balance<C>(
    conn: &C,
    bank_account_id: Uuid,
    delta: Decimal,
) -> Result<Decimal, ServiceError>
where
    C: ConnectionTrait,
{
    let account = bank_account::Entity::find_by_id(bank_account_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Bank account {} not found", bank_account_id))
        })?;

    let balance = account.balance + delta;
    let mut active = account.into_active_model();
    active.balance = Set(balance);
    active.updated_at = Set(Some(Utc::now()));
    active.update(conn).await?;
    Ok(balance)
}

/// Finds the order's receivable, creating a pending one for the full total.
pub async fn ensure_receivable<C>(
    conn: &C,
    order: &order::Model,
    due_days: i64,
) -> Result<receivable::Model, ServiceError>
where
    C: ConnectionTrait,
{
    if let Some(existing) = receivable::Entity::find()
        .filter(receivable::Column::OrderId.eq(order.id))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let now = Utc::now();
    let created = receivable::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        customer_id: Set(order.customer_id),
        amount: Set(order.total),
        status: Set(ReceivableStatus::Pending),
        due_date: Set(now + Duration::days(due_days)),
        bank_account_id: Set(None),
        paid_at: Set(None),
        description: Set(format!("Order {}", order.number_tag())),
        created_at: Set(now),
        updated_at: Set(None),
    }
    .insert(conn)
    .await
    .map_err(|e| {
        error!(error = %e, order_id = %order.id, "Failed to create receivable");
        ServiceError::DatabaseError(e)
    })?;

    info!(order_id = %order.id, receivable_id = %created.id, "receivable created");
    Ok(created)
}

/// Income already booked against the order or its receivable, on any account.
pub async fn find_booked_income<C>(
    conn: &C,
    order_id: Uuid,
    receivable_id: Uuid,
) -> Result<Option<transaction::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    Ok(transaction::Entity::find()
        .filter(transaction::Column::Kind.eq(TransactionKind::Income))
        .filter(transaction::Column::ReferenceId.is_in([order_id, receivable_id]))
        .order_by_asc(transaction::Column::CreatedAt)
        .one(conn)
        .await?)
}

/// Looks for a recent income on `bank_account_id` matching this order's payment.
///
/// Rows already referencing another order or receivable are never candidates.
pub async fn find_matching_income<C>(
    conn: &C,
    bank_account_id: Uuid,
    order: &order::Model,
    receivable_id: Uuid,
    customer: &customer::Model,
    config: &LedgerConfig,
    now: DateTime<Utc>,
) -> Result<Option<transaction::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let since = now - Duration::hours(config.duplicate_window_hours);
    let candidates = transaction::Entity::find()
        .filter(transaction::Column::BankAccountId.eq(bank_account_id))
        .filter(transaction::Column::Kind.eq(TransactionKind::Income))
        .filter(transaction::Column::CreatedAt.gte(since))
        .order_by_desc(transaction::Column::CreatedAt)
        .all(conn)
        .await?;

    Ok(candidates.into_iter().find(|tx| {
        let unclaimed = tx
            .reference_id
            .map_or(true, |id| id == order.id || id == receivable_id);
        unclaimed
            && looks_like_payment(
                tx,
                order.total,
                config.duplicate_amount_tolerance,
                customer.first_name(),
                order.order_number,
            )
    }))
}

/// Writes the payment as income, unless a matching deposit is already there.
pub async fn record_order_income<C>(
    conn: &C,
    order: &order::Model,
    customer: &customer::Model,
    receivable: &receivable::Model,
    bank_account_id: Uuid,
    config: &LedgerConfig,
) -> Result<IncomeOutcome, ServiceError>
where
    C: ConnectionTrait,
{
    if let Some(booked) = find_booked_income(conn, order.id, receivable.id).await? {
        debug!(order_id = %order.id, transaction_id = %booked.id, "payment already booked");
        return Ok(IncomeOutcome::Linked(booked.id));
    }

    let now = Utc::now();
    if let Some(existing) =
        find_matching_income(conn, bank_account_id, order, receivable.id, customer, config, now)
            .await?
    {
        if existing.reference_id.is_none() {
            let mut active = existing.clone().into_active_model();
            active.reference_id = Set(Some(order.id));
            active.reference_type = Set(Some(ReferenceType::Order));
            active.update(conn).await?;
        }
        counter!("ledger.income_linked", 1);
        info!(order_id = %order.id, transaction_id = %existing.id, "payment matched an existing deposit");
        return Ok(IncomeOutcome::Linked(existing.id));
    }

    let created = transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        bank_account_id: Set(bank_account_id),
        kind: Set(TransactionKind::Income),
        amount: Set(order.total),
        description: Set(format!(
            "Payment for order {} - {}",
            order.number_tag(),
            customer.name
        )),
        reference_id: Set(Some(receivable.id)),
        reference_type: Set(Some(ReferenceType::Receivable)),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|e| {
        error!(error = %e, order_id = %order.id, "Failed to record income");
        ServiceError::DatabaseError(e)
    })?;

    adjust_balance(conn, bank_account_id, order.total).await?;
    counter!("ledger.income_created", 1);
    info!(order_id = %order.id, transaction_id = %created.id, bank_account_id = %bank_account_id, "income recorded");
    Ok(IncomeOutcome::Created(created.id))
}

/// Brings the order's receivable in line with its payment status.
pub async fn sync_receivable<C>(
    conn: &C,
    order: &order::Model,
    customer: &customer::Model,
    payment_status: PaymentStatus,
    bank_account_id: Option<Uuid>,
    config: &LedgerConfig,
) -> Result<ReceivableSync, ServiceError>
where
    C: ConnectionTrait,
{
    let current = ensure_receivable(conn, order, config.receivable_due_days).await?;
    let receivable_id = current.id;

    match payment_status {
        PaymentStatus::Paid => {
            let bank_account_id = bank_account_id.ok_or_else(|| {
                ServiceError::ValidationError(
                    "bank account is required to mark an order as paid".to_string(),
                )
            })?;

            let mut active = current.clone().into_active_model();
            active.status = Set(ReceivableStatus::Paid);
            active.bank_account_id = Set(Some(bank_account_id));
            active.paid_at = Set(Some(Utc::now()));
            active.updated_at = Set(Some(Utc::now()));
            let paid = active.update(conn).await?;

            let income =
                record_order_income(conn, order, customer, &paid, bank_account_id, config).await?;
            Ok(ReceivableSync {
                receivable_id,
                status: ReceivableStatus::Paid,
                income: Some(income),
            })
        }
        PaymentStatus::Unpaid | PaymentStatus::Partial => {
            if current.status == ReceivableStatus::Paid {
                let mut active = current.into_active_model();
                active.status = Set(ReceivableStatus::Pending);
                active.bank_account_id = Set(None);
                active.paid_at = Set(None);
                active.updated_at = Set(Some(Utc::now()));
                active.update(conn).await?;
                debug!(receivable_id = %receivable_id, "receivable reopened");
                Ok(ReceivableSync {
                    receivable_id,
                    status: ReceivableStatus::Pending,
                    income: None,
                })
            } else {
                Ok(ReceivableSync {
                    receivable_id,
                    status: current.status,
                    income: None,
                })
            }
        }
    }
}

/// Undoes a bank transaction: restores the balance and deletes the row.
pub async fn reverse_transaction<C>(conn: &C, tx: &transaction::Model) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let delta = match tx.kind {
        TransactionKind::Income => -tx.amount,
        TransactionKind::Expense => tx.amount,
    };
    adjust_balance(conn, tx.bank_account_id, delta).await?;
    transaction::Entity::delete_by_id(tx.id).exec(conn).await?;
    debug!(transaction_id = %tx.id, delta = %delta, "bank transaction reversed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn income(amount: Decimal, description: &str) -> transaction::Model {
        transaction::Model {
            id: Uuid::new_v4(),
            bank_account_id: Uuid::new_v4(),
            kind: TransactionKind::Income,
            amount,
            description: description.to_string(),
            reference_id: None,
            reference_type: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn order_tag_is_matched_as_a_whole_number() {
        assert!(mentions_order_number("PIX ref #12", 12));
        assert!(mentions_order_number("orders #11, #12 and #13", 12));
        assert!(!mentions_order_number("PIX ref #123", 12));
        assert!(!mentions_order_number("PIX ref #1", 12));
        assert!(!mentions_order_number("order 12", 12));
    }

    #[test]
    fn matching_requires_amount_within_tolerance() {
        let tx = income(dec!(101.50), "Deposit Maria");
        assert!(looks_like_payment(&tx, dec!(100), dec!(2), Some("Maria"), 7));
        assert!(!looks_like_payment(&tx, dec!(99), dec!(2), Some("Maria"), 7));
    }

    #[test]
    fn matching_accepts_first_name_case_insensitively_or_order_tag() {
        let by_name = income(dec!(100), "PIX RECEBIDO MARIA SOUZA");
        assert!(looks_like_payment(&by_name, dec!(100), dec!(2), Some("maria"), 7));

        let by_tag = income(dec!(100), "transfer for #7");
        assert!(looks_like_payment(&by_tag, dec!(100), dec!(2), Some("Joana"), 7));

        let unrelated = income(dec!(100), "transfer for #70");
        assert!(!looks_like_payment(&unrelated, dec!(100), dec!(2), Some("Joana"), 7));
    }

    #[test]
    fn expenses_never_match() {
        let mut tx = income(dec!(100), "#7 Maria");
        tx.kind = TransactionKind::Expense;
        assert!(!looks_like_payment(&tx, dec!(100), dec!(2), Some("Maria"), 7));
    }
}
