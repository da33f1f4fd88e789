use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::models::product::Product;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CartError {
    #[error("Quantity must be at least 1, got {quantity}")]
    InvalidQuantity { quantity: u32 },

    #[error("Quantity for product {id} would exceed the maximum line quantity")]
    QuantityOverflow { id: Uuid },

    #[error("Product {id} has a negative price")]
    InvalidPrice { id: Uuid },

    #[error("Cart total would exceed the maximum amount when adding product {id}")]
    AmountOverflow { id: Uuid },
}

/// One product entry in the cart. The price is captured when the product is
/// first added and is not refreshed from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub quantity: u32,
}

impl LineItem {
    /// Price times quantity. Cannot overflow for a line held by a `Cart`.
    pub fn line_total(&self) -> Decimal {
        self.checked_line_total().unwrap_or(Decimal::MAX)
    }

    pub fn checked_line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Cart ledger for a single session.
///
/// Items keep insertion order. `total` is derived from the items and is
/// recomputed after every mutation. Every line has a non-negative price and
/// the total always fits in a `Decimal`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CartRecord")]
pub struct Cart {
    items: Vec<LineItem>,
    total: Decimal,
}

// On-disk shape; any stored total is ignored and recomputed.
#[derive(Deserialize)]
struct CartRecord {
    #[serde(default)]
    items: Vec<LineItem>,
}

impl From<CartRecord> for Cart {
    fn from(record: CartRecord) -> Self {
        let mut cart = Cart::new();
        for item in record.items {
            if item.quantity < 1 || item.price < Decimal::ZERO {
                warn!("Dropping stored cart line {} ({} x {})", item.id, item.quantity, item.price);
                continue;
            }

            let id = item.id;
            let restored = match cart.position(&id) {
                Some(index) => cart.grow_line(index, item.quantity),
                None => cart.push_line(item),
            };
            if let Err(e) = restored {
                warn!("Dropping stored cart line {}: {}", id, e);
            }
        }
        cart
    }
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` units of `product`. An existing line for the same
    /// product is incremented; otherwise a new line is appended using the
    /// product's current sale price. On error the cart is unchanged.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<&LineItem, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        let index = match self.position(&product.id) {
            Some(index) => {
                self.grow_line(index, quantity)?;
                index
            }
            None => {
                if product.sale_rate < Decimal::ZERO {
                    return Err(CartError::InvalidPrice { id: product.id });
                }
                self.push_line(LineItem {
                    id: product.id,
                    name: product.name.clone(),
                    price: product.sale_rate,
                    image: product.featured_image.clone(),
                    quantity,
                })?;
                self.items.len() - 1
            }
        };

        Ok(&self.items[index])
    }

    /// Remove the line for `id`. Returns the removed line, or `None` when
    /// the product was not in the cart.
    pub fn remove_item(&mut self, id: &Uuid) -> Option<LineItem> {
        let removed = self.position(id).map(|index| self.items.remove(index));
        self.recalculate_total();
        removed
    }

    /// Set the quantity of an existing line. A quantity below 1 is rejected
    /// and leaves the cart untouched. Returns `Ok(None)` when `id` is not in
    /// the cart.
    pub fn set_quantity(&mut self, id: &Uuid, quantity: u32) -> Result<Option<&LineItem>, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity { quantity });
        }

        let Some(index) = self.position(id) else {
            return Ok(None);
        };

        let item = &self.items[index];
        let new_line = item
            .price
            .checked_mul(Decimal::from(quantity))
            .ok_or(CartError::AmountOverflow { id: *id })?;
        let total = (self.total - item.line_total())
            .checked_add(new_line)
            .ok_or(CartError::AmountOverflow { id: *id })?;

        self.items[index].quantity = quantity;
        self.total = total;
        Ok(Some(&self.items[index]))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.total = Decimal::ZERO;
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn get(&self, id: &Uuid) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == *id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    fn position(&self, id: &Uuid) -> Option<usize> {
        self.items.iter().position(|item| item.id == *id)
    }

    fn grow_line(&mut self, index: usize, quantity: u32) -> Result<(), CartError> {
        let item = &self.items[index];
        let new_quantity = item
            .quantity
            .checked_add(quantity)
            .ok_or(CartError::QuantityOverflow { id: item.id })?;
        let total = item
            .price
            .checked_mul(Decimal::from(quantity))
            .and_then(|extra| self.total.checked_add(extra))
            .ok_or(CartError::AmountOverflow { id: item.id })?;

        self.items[index].quantity = new_quantity;
        self.total = total;
        Ok(())
    }

    fn push_line(&mut self, item: LineItem) -> Result<(), CartError> {
        let total = item
            .checked_line_total()
            .and_then(|line| self.total.checked_add(line))
            .ok_or(CartError::AmountOverflow { id: item.id })?;

        self.items.push(item);
        self.total = total;
        Ok(())
    }

    // Lines are non-negative and their full sum fits, so any subset does too.
    fn recalculate_total(&mut self) {
        self.total = self.items.iter().map(LineItem::line_total).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(name: &str, sale_rate: i64) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            short_description: None,
            long_description: None,
            purchase_rate: Decimal::ZERO,
            sale_rate: Decimal::from(sale_rate),
            quantity: 100,
            featured_image: Some(format!("{}-image", name)),
            images: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_new_item_copies_product_data() {
        let mut cart = Cart::new();
        let gift_box = product("Gift Box", 850);

        let item = cart.add_item(&gift_box, 1).unwrap().clone();

        assert_eq!(item.id, gift_box.id);
        assert_eq!(item.name, "Gift Box");
        assert_eq!(item.price, Decimal::from(850));
        assert_eq!(item.image.as_deref(), Some("Gift Box-image"));
        assert_eq!(cart.total(), Decimal::from(850));
    }

    #[test]
    fn test_add_existing_item_merges_quantity() {
        let mut cart = Cart::new();
        let hamper = product("Hamper", 950);

        cart.add_item(&hamper, 2).unwrap();
        cart.add_item(&hamper, 3).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.total(), Decimal::from(4750));
    }

    #[test]
    fn test_price_is_captured_at_add_time() {
        let mut cart = Cart::new();
        let mut frame = product("Photo Frame", 500);

        cart.add_item(&frame, 1).unwrap();
        frame.sale_rate = Decimal::from(700);
        cart.add_item(&frame, 1).unwrap();

        assert_eq!(cart.items()[0].price, Decimal::from(500));
        assert_eq!(cart.total(), Decimal::from(1000));
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let mut cart = Cart::new();
        let mug = product("Mug", 300);
        cart.add_item(&mug, 2).unwrap();

        assert_eq!(
            cart.add_item(&mug, 0).unwrap_err(),
            CartError::InvalidQuantity { quantity: 0 }
        );
        assert_eq!(
            cart.set_quantity(&mug.id, 0).unwrap_err(),
            CartError::InvalidQuantity { quantity: 0 }
        );
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.total(), Decimal::from(600));
    }

    #[test]
    fn test_quantity_overflow_leaves_cart_unchanged() {
        let mut cart = Cart::new();
        let mug = product("Mug", 1);
        cart.add_item(&mug, u32::MAX).unwrap();

        let result = cart.add_item(&mug, 1);

        assert!(matches!(result, Err(CartError::QuantityOverflow { .. })));
        assert_eq!(cart.items()[0].quantity, u32::MAX);
    }

    #[test]
    fn test_set_quantity_on_absent_item_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(&product("Card", 50), 1).unwrap();
        let before = cart.clone();

        let updated = cart.set_quantity(&Uuid::new_v4(), 4).unwrap();

        assert!(updated.is_none());
        assert_eq!(cart, before);
    }

    #[test]
    fn test_items_keep_insertion_order() {
        let mut cart = Cart::new();
        let first = product("First", 10);
        let second = product("Second", 20);
        let third = product("Third", 30);

        cart.add_item(&first, 1).unwrap();
        cart.add_item(&second, 1).unwrap();
        cart.add_item(&third, 1).unwrap();
        cart.add_item(&first, 1).unwrap();
        cart.remove_item(&second.id);

        let names: Vec<&str> = cart.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Third"]);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_deserialize_recomputes_total() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"items":[{{"id":"{}","name":"Candle","price":"120.50","image":null,"quantity":2}}],"total":"9999"}}"#,
            id
        );

        let cart: Cart = serde_json::from_str(&json).unwrap();

        assert_eq!(cart.total(), Decimal::new(24100, 2));
        assert_eq!(cart.get(&id).map(|i| i.quantity), Some(2));
    }

    #[test]
    fn test_deserialize_drops_negative_and_oversized_prices() {
        let negative = Uuid::new_v4();
        let huge = Uuid::new_v4();
        let kept = Uuid::new_v4();
        let json = format!(
            r#"{{"items":[
                {{"id":"{}","name":"Refund","price":"-5","image":null,"quantity":1}},
                {{"id":"{}","name":"Diamond","price":"79228162514264337593543950335","image":null,"quantity":2}},
                {{"id":"{}","name":"Card","price":"40","image":null,"quantity":3}}
            ]}}"#,
            negative, huge, kept
        );

        let cart: Cart = serde_json::from_str(&json).unwrap();

        assert!(cart.get(&negative).is_none());
        assert!(cart.get(&huge).is_none());
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total(), Decimal::from(120));
    }

    #[test]
    fn test_amount_overflow_leaves_cart_unchanged() {
        let mut cart = Cart::new();
        let mut diamond = product("Diamond", 0);
        diamond.sale_rate = Decimal::MAX;
        cart.add_item(&diamond, 1).unwrap();

        assert_eq!(
            cart.add_item(&diamond, 1).unwrap_err(),
            CartError::AmountOverflow { id: diamond.id }
        );
        assert_eq!(
            cart.set_quantity(&diamond.id, 2).unwrap_err(),
            CartError::AmountOverflow { id: diamond.id }
        );
        assert_eq!(cart.items()[0].quantity, 1);
        assert_eq!(cart.total(), Decimal::MAX);
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let mut cart = Cart::new();
        let voucher = product("Voucher", -10);

        assert_eq!(
            cart.add_item(&voucher, 1).unwrap_err(),
            CartError::InvalidPrice { id: voucher.id }
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear_resets_total() {
        let mut cart = Cart::new();
        cart.add_item(&product("Bouquet", 1200), 2).unwrap();

        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }
}
