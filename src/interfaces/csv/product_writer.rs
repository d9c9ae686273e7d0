use crate::domain::product::Product;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct ProductRecord<'a> {
    id: u64,
    name: &'a str,
    price: String,
    available: bool,
}

/// Writes a catalog summary as `id,name,price,available` CSV.
pub struct ProductWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ProductWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_products<'a>(&mut self, products: impl IntoIterator<Item = &'a Product>) -> Result<()> {
        for product in products {
            self.writer.serialize(ProductRecord {
                id: product.id,
                name: &product.name,
                price: format!("{:.2}", product.price.value()),
                available: product.available,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
