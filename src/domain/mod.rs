//! Domain model: catalog, accounts, cart, orders and the gateway vocabulary,
//! plus the storage and payment ports the application layer depends on.

pub mod cart;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod product;
pub mod user;
