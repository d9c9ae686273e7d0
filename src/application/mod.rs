//! Application layer orchestrating the storefront's use cases.
//!
//! [`Storefront`] is the single entry point used by the HTTP and CLI
//! interfaces. It owns the storage ports and the payment gateway and keeps
//! every business rule (cart validation, order creation, payment status
//! reconciliation) out of the interfaces.

pub mod accounts;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod storefront;

pub use storefront::Storefront;
