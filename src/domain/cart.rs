use super::money::Money;
use super::product::{Product, ProductId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Product quantities chosen by a visitor, kept in the session.
///
/// Every stored quantity is at least one; decreasing the last unit drops the entry.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: BTreeMap<ProductId, u32>,
}

/// One cart entry priced against the current catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub subtotal: Money,
}

/// A cart priced against the available catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PricedCart {
    /// Lines sorted by product name.
    pub lines: Vec<CartLine>,
    pub total: Money,
    /// Ids in the cart that are no longer available for purchase.
    pub missing: Vec<ProductId>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: ProductId) {
        *self.items.entry(id).or_insert(0) += 1;
    }

    pub fn remove(&mut self, id: ProductId) {
        self.items.remove(&id);
    }

    pub fn decrease(&mut self, id: ProductId) {
        if let Some(quantity) = self.items.get_mut(&id) {
            if *quantity > 1 {
                *quantity -= 1;
            } else {
                self.items.remove(&id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn quantity(&self, id: ProductId) -> u32 {
        self.items.get(&id).copied().unwrap_or(0)
    }

    pub fn total_quantity(&self) -> u32 {
        self.items.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items.keys().copied().collect()
    }

    /// Prices the cart with the given purchasable products. Products missing from
    /// `catalog` end up in [`PricedCart::missing`] and do not count toward the total.
    pub fn price(&self, catalog: &[Product]) -> PricedCart {
        let by_id: HashMap<ProductId, &Product> = catalog
            .iter()
            .filter(|p| p.is_purchasable())
            .map(|p| (p.id, p))
            .collect();

        let mut priced = PricedCart::default();
        for (&id, &quantity) in &self.items {
            match by_id.get(&id) {
                Some(product) => {
                    let subtotal = product.price.times(quantity);
                    priced.total += subtotal;
                    priced.lines.push(CartLine {
                        product: (*product).clone(),
                        quantity,
                        subtotal,
                    });
                }
                None => priced.missing.push(id),
            }
        }

        priced
            .lines
            .sort_by(|a, b| a.product.name.cmp(&b.product.name));
        priced
    }
}

impl PricedCart {
    /// Every cart entry is still purchasable and there is something to buy.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && !self.lines.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}
