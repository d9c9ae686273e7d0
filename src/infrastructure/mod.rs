//! Adapters behind the domain ports: storage backends, the Mercado Pago
//! client and local image uploads.

pub mod in_memory;
pub mod mercadopago;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod uploads;
