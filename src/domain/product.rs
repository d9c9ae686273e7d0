use super::money::Price;
use crate::error::ShopError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ProductId = u64;

/// Image shown for products created without an upload.
pub const PLACEHOLDER_IMAGE: &str = "/static/images/placeholder.png";

const MAX_NAME_LEN: usize = 100;

/// A cupcake offered in the catalog.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image_url: String,
    /// Whether customers can see and buy the product.
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set on soft delete. Deleted products are invisible to every listing.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Merchant-supplied product fields, used for both creation and edits.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default = "default_available")]
    pub available: bool,
    /// New image; `None` keeps the current one (or the placeholder on creation).
    #[serde(default)]
    pub image_url: Option<String>,
}

fn default_available() -> bool {
    true
}

impl ProductDraft {
    pub fn validate(&self) -> Result<(), ShopError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ShopError::ValidationError(
                "O nome do cupcake é obrigatório.".to_string(),
            ));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ShopError::ValidationError(format!(
                "O nome do cupcake deve ter no máximo {MAX_NAME_LEN} caracteres."
            )));
        }
        Ok(())
    }
}

impl Product {
    pub fn from_draft(id: ProductId, draft: ProductDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
            description: draft.description,
            price: draft.price,
            image_url: draft
                .image_url
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            available: draft.available,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Overwrites the editable fields, keeping identity and creation time.
    pub fn apply(&mut self, draft: ProductDraft, now: DateTime<Utc>) {
        self.name = draft.name.trim().to_string();
        self.description = draft.description;
        self.price = draft.price;
        if let Some(image_url) = draft.image_url {
            self.image_url = image_url;
        }
        self.available = draft.available;
        self.updated_at = now;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_purchasable(&self) -> bool {
        self.available && !self.is_deleted()
    }

    pub fn has_custom_image(&self) -> bool {
        !self.image_url.is_empty() && self.image_url != PLACEHOLDER_IMAGE
    }
}
