//! Status and payment transitions end to end, against in-memory SQLite.

mod common;

use assert_matches::assert_matches;
use backoffice_api::{
    entities::{
        boleto, client_inventory, expense, notification, point_transaction, purchase, receivable,
        transaction, BoletoStatus, OrderStatus, PaymentStatus, PurchaseStatus, ReceivableStatus,
        ReferenceType, TransactionKind,
    },
    errors::ServiceError,
    services::{
        boletos::IssueBoletosRequest, ledger::IncomeOutcome,
        order_lifecycle::UpdateOrderRequest,
    },
};
use chrono::Utc;
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

fn status(status: OrderStatus) -> UpdateOrderRequest {
    UpdateOrderRequest {
        status: Some(status),
        ..Default::default()
    }
}

fn paid(status: Option<OrderStatus>, bank_account_id: Uuid) -> UpdateOrderRequest {
    UpdateOrderRequest {
        status,
        payment_status: Some(PaymentStatus::Paid),
        bank_account_id: Some(bank_account_id),
        notes: None,
    }
}

#[tokio::test]
async fn paying_a_confirmed_order_records_one_income_and_raises_the_balance() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Maria Souza", dec!(1000)).await;
    let product = app.seed_product("SKU-PAY", dec!(50)).await;
    let account = app.seed_bank_account("Main", dec!(200)).await;
    let order = app.create_order(customer.id, product.id, 2).await.order;

    let outcome = app
        .state
        .services
        .lifecycle
        .update_order(order.id, paid(Some(OrderStatus::Confirmed), account.id))
        .await
        .expect("mark paid");

    let sync = outcome.receivable.expect("receivable synced");
    assert_eq!(sync.status, ReceivableStatus::Paid);
    assert_matches!(sync.income, Some(IncomeOutcome::Created(_)));

    let incomes = transaction::Entity::find()
        .filter(transaction::Column::BankAccountId.eq(account.id))
        .all(app.db())
        .await
        .unwrap();
    assert_eq!(incomes.len(), 1);
    assert_eq!(incomes[0].kind, TransactionKind::Income);
    assert_eq!(incomes[0].amount, dec!(100));
    assert_eq!(incomes[0].reference_type, Some(ReferenceType::Receivable));
    assert!(incomes[0].description.contains(&order.number_tag()));
    assert_eq!(app.bank_account(account.id).await.balance, dec!(300));
}

#[tokio::test]
async fn paying_twice_does_not_duplicate_the_income() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Joana Lima", dec!(1000)).await;
    let product = app.seed_product("SKU-TWICE", dec!(40)).await;
    let account = app.seed_bank_account("Main", dec!(0)).await;
    let order = app.create_order(customer.id, product.id, 1).await.order;
    let lifecycle = app.state.services.lifecycle.clone();

    lifecycle
        .update_order(order.id, paid(Some(OrderStatus::Confirmed), account.id))
        .await
        .unwrap();
    let second = lifecycle
        .update_order(order.id, paid(None, account.id))
        .await
        .unwrap();

    assert_matches!(
        second.receivable.and_then(|r| r.income),
        Some(IncomeOutcome::Linked(_))
    );
    let count = transaction::Entity::find()
        .filter(transaction::Column::BankAccountId.eq(account.id))
        .all(app.db())
        .await
        .unwrap()
        .len();
    assert_eq!(count, 1);
    assert_eq!(app.bank_account(account.id).await.balance, dec!(40));
}

#[tokio::test]
async fn paying_again_on_another_account_keeps_the_first_income() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Paula Reis", dec!(1000)).await;
    let product = app.seed_product("SKU-SWITCH", dec!(100)).await;
    let first_account = app.seed_bank_account("Main", dec!(0)).await;
    let second_account = app.seed_bank_account("Savings", dec!(0)).await;
    let order = app.create_order(customer.id, product.id, 1).await.order;
    let lifecycle = app.state.services.lifecycle.clone();

    let first = lifecycle
        .update_order(order.id, paid(Some(OrderStatus::Confirmed), first_account.id))
        .await
        .unwrap();
    let Some(IncomeOutcome::Created(income_id)) = first.receivable.and_then(|r| r.income) else {
        panic!("first payment should book income");
    };

    let second = lifecycle
        .update_order(order.id, paid(None, second_account.id))
        .await
        .unwrap();

    assert_eq!(
        second.receivable.and_then(|r| r.income),
        Some(IncomeOutcome::Linked(income_id))
    );
    assert_eq!(transaction::Entity::find().all(app.db()).await.unwrap().len(), 1);
    assert_eq!(app.bank_account(first_account.id).await.balance, dec!(100));
    assert_eq!(app.bank_account(second_account.id).await.balance, dec!(0));
}

#[tokio::test]
async fn same_value_orders_of_one_customer_each_book_their_income() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Maria Souza", dec!(1000)).await;
    let product = app.seed_product("SKU-TWIN", dec!(100)).await;
    let account = app.seed_bank_account("Main", dec!(0)).await;
    let first = app.create_order(customer.id, product.id, 1).await.order;
    let second = app.create_order(customer.id, product.id, 1).await.order;
    let lifecycle = app.state.services.lifecycle.clone();

    let first_outcome = lifecycle
        .update_order(first.id, paid(Some(OrderStatus::Confirmed), account.id))
        .await
        .unwrap();
    let second_outcome = lifecycle
        .update_order(second.id, paid(Some(OrderStatus::Confirmed), account.id))
        .await
        .unwrap();

    assert_matches!(
        first_outcome.receivable.and_then(|r| r.income),
        Some(IncomeOutcome::Created(_))
    );
    assert_matches!(
        second_outcome.receivable.and_then(|r| r.income),
        Some(IncomeOutcome::Created(_))
    );
    let incomes = transaction::Entity::find()
        .filter(transaction::Column::BankAccountId.eq(account.id))
        .all(app.db())
        .await
        .unwrap();
    assert_eq!(incomes.len(), 2);
    assert_eq!(app.bank_account(account.id).await.balance, dec!(200));
}

#[tokio::test]
async fn a_manual_deposit_is_linked_instead_of_duplicated() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Carla Dias", dec!(1000)).await;
    let product = app.seed_product("SKU-MANUAL", dec!(100)).await;
    let account = app.seed_bank_account("Main", dec!(101)).await;
    let order = app.create_order(customer.id, product.id, 1).await.order;

    let manual = transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        bank_account_id: Set(account.id),
        kind: Set(TransactionKind::Income),
        amount: Set(dec!(101)),
        description: Set("PIX RECEBIDO CARLA".to_string()),
        reference_id: Set(None),
        reference_type: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(app.db())
    .await
    .unwrap();

    let outcome = app
        .state
        .services
        .lifecycle
        .update_order(order.id, paid(Some(OrderStatus::Confirmed), account.id))
        .await
        .unwrap();

    assert_eq!(
        outcome.receivable.and_then(|r| r.income),
        Some(IncomeOutcome::Linked(manual.id))
    );
    let linked = transaction::Entity::find_by_id(manual.id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(linked.reference_id, Some(order.id));
    assert_eq!(linked.reference_type, Some(ReferenceType::Order));
    assert_eq!(app.bank_account(account.id).await.balance, dec!(101));
}

#[tokio::test]
async fn paid_without_a_bank_account_is_rejected() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Ana", dec!(1000)).await;
    let product = app.seed_product("SKU-NOBANK", dec!(10)).await;
    let order = app.create_order(customer.id, product.id, 1).await.order;

    let result = app
        .state
        .services
        .lifecycle
        .update_order(
            order.id,
            UpdateOrderRequest {
                status: Some(OrderStatus::Confirmed),
                payment_status: Some(PaymentStatus::Paid),
                ..Default::default()
            },
        )
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("bank account"));
    assert_eq!(app.customer(customer.id).await.available_credit, dec!(990));
}

#[tokio::test]
async fn empty_update_is_rejected() {
    let app = TestApp::new().await;
    let result = app
        .state
        .services
        .lifecycle
        .update_order(Uuid::new_v4(), UpdateOrderRequest::default())
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn payment_flips_move_credit_symmetrically() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Bruna", dec!(500)).await;
    let product = app.seed_product("SKU-FLIP", dec!(100)).await;
    let account = app.seed_bank_account("Main", dec!(0)).await;
    let order = app.create_order(customer.id, product.id, 1).await.order;
    let lifecycle = app.state.services.lifecycle.clone();
    assert_eq!(app.customer(customer.id).await.available_credit, dec!(400));

    let outcome = lifecycle
        .update_order(order.id, paid(None, account.id))
        .await
        .unwrap();
    assert_eq!(outcome.payment_credit_adjustment, Some(dec!(100)));
    assert_eq!(app.customer(customer.id).await.available_credit, dec!(500));

    let outcome = lifecycle
        .update_order(
            order.id,
            UpdateOrderRequest {
                payment_status: Some(PaymentStatus::Unpaid),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.payment_credit_adjustment, Some(dec!(-100)));
    assert_eq!(app.customer(customer.id).await.available_credit, dec!(400));
}

#[tokio::test]
async fn reverting_payment_reopens_the_receivable() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Rita", dec!(500)).await;
    let product = app.seed_product("SKU-REOPEN", dec!(30)).await;
    let account = app.seed_bank_account("Main", dec!(0)).await;
    let order = app.create_order(customer.id, product.id, 1).await.order;
    let lifecycle = app.state.services.lifecycle.clone();

    lifecycle
        .update_order(order.id, paid(Some(OrderStatus::Confirmed), account.id))
        .await
        .unwrap();
    lifecycle
        .update_order(
            order.id,
            UpdateOrderRequest {
                payment_status: Some(PaymentStatus::Unpaid),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let owed = receivable::Entity::find()
        .filter(receivable::Column::OrderId.eq(order.id))
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(owed.status, ReceivableStatus::Pending);
    assert!(owed.bank_account_id.is_none());
    assert!(owed.paid_at.is_none());
}

#[tokio::test]
async fn cancelling_cancels_boletos_locally_even_when_the_psp_fails() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Paula", dec!(1000)).await;
    let product = app.seed_product("SKU-CANCEL", dec!(90)).await;
    let order = app.create_order(customer.id, product.id, 1).await.order;

    let issued = app
        .state
        .services
        .boletos
        .issue_boletos(
            order.id,
            IssueBoletosRequest {
                installments: 3,
                first_due_date: None,
                interval_days: 30,
            },
        )
        .await
        .expect("issue boletos");
    assert_eq!(issued.len(), 3);

    app.gateway.fail_cancellations();
    let outcome = app
        .state
        .services
        .lifecycle
        .update_order(order.id, status(OrderStatus::Cancelled))
        .await
        .expect("cancellation succeeds despite psp failure");

    assert_eq!(outcome.boletos_cancelled, 3);
    assert_eq!(outcome.gateway_cancel_failures, 3);
    assert_eq!(app.gateway.cancel_calls(), 3);
    assert_eq!(outcome.credit_released, dec!(90));

    let slips = boleto::Entity::find()
        .filter(boleto::Column::OrderId.eq(order.id))
        .all(app.db())
        .await
        .unwrap();
    assert!(slips.iter().all(|b| b.status == BoletoStatus::Cancelled));
    assert!(slips.iter().all(|b| b.cancelled_at.is_some()));
    assert_eq!(app.customer(customer.id).await.available_credit, dec!(1000));
}

#[tokio::test]
async fn delivery_mirrors_a_purchase_and_stock_only_once() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Loja Centro", dec!(1000)).await;
    let product = app.seed_product("SKU-DELIVER", dec!(20)).await;
    let order = app.create_order(customer.id, product.id, 5).await.order;
    let lifecycle = app.state.services.lifecycle.clone();

    let first = lifecycle
        .update_order(order.id, status(OrderStatus::Delivered))
        .await
        .unwrap();
    let delivery = first.delivery.expect("delivery ran");
    assert!(delivery.purchase_created);
    assert_eq!(delivery.units_received, 5);

    // Leave and re-enter DELIVERED
    lifecycle
        .update_order(order.id, status(OrderStatus::Confirmed))
        .await
        .unwrap();
    let again = lifecycle
        .update_order(order.id, status(OrderStatus::Delivered))
        .await
        .unwrap();
    let repeat = again.delivery.expect("delivery branch ran again");
    assert!(!repeat.purchase_created);
    assert_eq!(repeat.units_received, 0);

    let purchases = purchase::Entity::find()
        .filter(purchase::Column::CustomerId.eq(customer.id))
        .all(app.db())
        .await
        .unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].invoice_number, order.order_number.to_string());
    assert_eq!(purchases[0].status, PurchaseStatus::Pending);

    let stock = client_inventory::Entity::find()
        .filter(client_inventory::Column::CustomerId.eq(customer.id))
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stock.current_stock, 5);
}

#[tokio::test]
async fn payment_after_delivery_is_mirrored_onto_the_purchase() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Loja Norte", dec!(1000)).await;
    let product = app.seed_product("SKU-MIRROR", dec!(25)).await;
    let account = app.seed_bank_account("Main", dec!(0)).await;
    let order = app.create_order(customer.id, product.id, 2).await.order;
    let lifecycle = app.state.services.lifecycle.clone();

    lifecycle
        .update_order(order.id, status(OrderStatus::Delivered))
        .await
        .unwrap();
    let outcome = lifecycle
        .update_order(order.id, paid(None, account.id))
        .await
        .unwrap();
    assert!(outcome.purchase_payment_mirrored);

    let mirrored = purchase::Entity::find()
        .filter(purchase::Column::CustomerId.eq(customer.id))
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mirrored.status, PurchaseStatus::Paid);
    assert_eq!(mirrored.bank_account_id, Some(account.id));
    let expenses = expense::Entity::find()
        .filter(expense::Column::PurchaseId.eq(mirrored.id))
        .all(app.db())
        .await
        .unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].amount, dec!(50));

    lifecycle
        .update_order(
            order.id,
            UpdateOrderRequest {
                payment_status: Some(PaymentStatus::Unpaid),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let reverted = purchase::Entity::find_by_id(mirrored.id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reverted.status, PurchaseStatus::Pending);
    assert!(reverted.bank_account_id.is_none());
    assert!(expense::Entity::find()
        .filter(expense::Column::PurchaseId.eq(mirrored.id))
        .all(app.db())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn delivery_awards_the_referral_bonus_once() {
    let app = TestApp::new().await;
    let referrer = app.seed_customer("Referrer", dec!(100)).await;
    let customer = app
        .seed_referred_customer("Referred", dec!(1000), referrer.id)
        .await;
    let product = app.seed_product("SKU-REF", dec!(10)).await;
    let order = app.create_order(customer.id, product.id, 1).await.order;
    let lifecycle = app.state.services.lifecycle.clone();
    let bonus = app.state.config.ledger.referral_bonus_points;

    let first = lifecycle
        .update_order(order.id, status(OrderStatus::Delivered))
        .await
        .unwrap();
    assert_eq!(first.referral_points_awarded, Some(bonus));

    lifecycle
        .update_order(order.id, status(OrderStatus::Confirmed))
        .await
        .unwrap();
    let again = lifecycle
        .update_order(order.id, status(OrderStatus::Delivered))
        .await
        .unwrap();
    assert_eq!(again.referral_points_awarded, None);

    let awards = point_transaction::Entity::find()
        .filter(point_transaction::Column::OrderId.eq(order.id))
        .all(app.db())
        .await
        .unwrap();
    assert_eq!(awards.len(), 1);
    let referrer = app.customer(referrer.id).await;
    assert_eq!(referrer.points_balance, bonus);
    assert_eq!(referrer.lifetime_points, bonus);
}

#[tokio::test]
async fn status_changes_notify_the_customer() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Notified", dec!(1000)).await;
    let product = app.seed_product("SKU-NOTIFY", dec!(10)).await;
    let order = app.create_order(customer.id, product.id, 1).await.order;

    app.state
        .services
        .lifecycle
        .update_order(order.id, status(OrderStatus::Confirmed))
        .await
        .unwrap();

    let notes = notification::Entity::find()
        .filter(notification::Column::RecipientId.eq(customer.id))
        .all(app.db())
        .await
        .unwrap();
    assert_eq!(notes.len(), 1);
    assert!(notes[0].title.contains(&order.number_tag()));
    assert!(!notes[0].is_read);
}
