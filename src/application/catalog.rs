use super::storefront::Storefront;
use crate::domain::cart::{Cart, PricedCart};
use crate::domain::product::{Product, ProductDraft, ProductId};
use crate::error::{Result, ShopError};
use chrono::Utc;
use tracing::info;

impl Storefront {
    /// Products customers can buy, newest first.
    pub async fn showcase(&self) -> Result<Vec<Product>> {
        self.products.list(true).await
    }

    /// Every non-deleted product, newest first.
    pub async fn all_products(&self) -> Result<Vec<Product>> {
        self.products.list(false).await
    }

    pub async fn product(&self, id: ProductId) -> Result<Product> {
        self.products
            .get(id)
            .await?
            .ok_or(ShopError::NotFound("Product"))
    }

    /// Fails with `NotFound` unless the product exists and is purchasable.
    pub async fn available_product(&self, id: ProductId) -> Result<Product> {
        self.products
            .get_available(&[id])
            .await?
            .into_iter()
            .next()
            .ok_or(ShopError::NotFound("Product"))
    }

    pub async fn add_product(&self, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;
        let product = self.products.insert(draft).await?;
        info!(product_id = product.id, name = %product.name, "product created");
        Ok(product)
    }

    /// Updates a product. Returns it along with the image URL it replaced, if any.
    pub async fn update_product(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<(Product, Option<String>)> {
        draft.validate()?;
        let mut product = self.product(id).await?;
        let previous_image = product.image_url.clone();

        product.apply(draft, Utc::now());
        self.products.update(product.clone()).await?;
        info!(product_id = id, "product updated");

        let replaced = (previous_image != product.image_url).then_some(previous_image);
        Ok((product, replaced))
    }

    /// Soft-deletes a product and returns it as it was.
    pub async fn delete_product(&self, id: ProductId) -> Result<Product> {
        let product = self
            .products
            .soft_delete(id)
            .await?
            .ok_or(ShopError::NotFound("Product"))?;
        info!(product_id = id, "product deleted");
        Ok(product)
    }

    /// Prices a cart against the currently purchasable catalog.
    pub async fn price_cart(&self, cart: &Cart) -> Result<PricedCart> {
        if cart.is_empty() {
            return Ok(PricedCart::default());
        }
        let products = self.products.get_available(&cart.product_ids()).await?;
        Ok(cart.price(&products))
    }
}
