// Order flows
pub mod order_deletion;
pub mod order_lifecycle;
pub mod orders;

// Money
pub mod boletos;
pub mod credit;
pub mod ledger;

// Customer-side mirrors
pub mod purchases;
pub mod referral;

// Messaging
pub mod notifications;
