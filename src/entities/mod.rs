pub mod bank_account;
pub mod boleto;
pub mod client_inventory;
pub mod client_inventory_movement;
pub mod client_product;
pub mod customer;
pub mod expense;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod point_transaction;
pub mod product;
pub mod purchase;
pub mod purchase_item;
pub mod receivable;
pub mod seller;
pub mod supplier;
pub mod transaction;

pub use boleto::BoletoStatus;
pub use client_inventory_movement::MovementKind;
pub use notification::{NotificationCategory, RecipientType};
pub use order::{OrderStatus, PaymentStatus};
pub use point_transaction::PointKind;
pub use purchase::PurchaseStatus;
pub use receivable::ReceivableStatus;
pub use transaction::{ReferenceType, TransactionKind};
