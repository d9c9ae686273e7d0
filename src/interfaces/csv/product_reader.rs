use crate::domain::money::Price;
use crate::domain::product::ProductDraft;
use crate::error::{Result, ShopError};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct ProductRow {
    name: String,
    #[serde(default)]
    description: String,
    price: String,
    #[serde(default)]
    available: Option<bool>,
    #[serde(default)]
    image_url: Option<String>,
}

impl TryFrom<ProductRow> for ProductDraft {
    type Error = ShopError;

    fn try_from(row: ProductRow) -> Result<Self> {
        let draft = ProductDraft {
            name: row.name,
            description: row.description,
            price: Price::parse(&row.price)?,
            available: row.available.unwrap_or(true),
            image_url: row.image_url.filter(|url| !url.is_empty()),
        };
        draft.validate()?;
        Ok(draft)
    }
}

/// Reads catalog entries from a CSV source.
///
/// Expects the columns `name, description, price, available, image_url`; only
/// `name` and `price` are required. Whitespace is trimmed and short records
/// are accepted.
pub struct ProductReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ProductReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and validates each row as a product draft.
    pub fn products(self) -> impl Iterator<Item = Result<ProductDraft>> {
        self.reader
            .into_deserialize::<ProductRow>()
            .map(|row| row.map_err(ShopError::from).and_then(ProductDraft::try_from))
    }
}
