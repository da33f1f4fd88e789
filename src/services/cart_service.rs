use anyhow::Context;
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    database::repositories::{ProductRepository, ProductRepositoryError},
    models::{
        cart::{Cart, CartError, LineItem},
        order::shipping_fee_for,
    },
};

#[derive(Error, Debug)]
pub enum CartServiceError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Product {id} is not in the cart")]
    NotInCart { id: Uuid },

    #[error("Only {available} units of {name} are in stock")]
    InsufficientStock { name: String, available: i32 },

    #[error("Cart error: {0}")]
    CartError(#[from] CartError),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] ProductRepositoryError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Amounts shown on the cart page and at checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSummary {
    pub item_count: u64,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
}

/// Loads and stores carts and applies catalog-aware mutations to them. The
/// cart itself is owned by the caller and passed in by reference.
///
/// Each signed-in user has their own cart file in the session directory;
/// `cart.json` holds the guest cart.
pub struct CartService {
    product_repository: Arc<dyn ProductRepository>,
    session_dir: PathBuf,
    shipping_fee: Decimal,
}

impl CartService {
    pub fn new(
        product_repository: Arc<dyn ProductRepository>,
        session_dir: &Path,
        shipping_fee: Decimal,
    ) -> Result<Self, CartServiceError> {
        if !session_dir.exists() {
            fs::create_dir_all(session_dir).context("Failed to create session directory")?;
        }

        Ok(Self {
            product_repository,
            session_dir: session_dir.to_path_buf(),
            shipping_fee,
        })
    }

    pub fn cart_file_path(&self, owner: Option<&Uuid>) -> PathBuf {
        match owner {
            Some(user_id) => self.session_dir.join(format!("cart-{}.json", user_id)),
            None => self.session_dir.join("cart.json"),
        }
    }

    /// Read the cart of `owner` (the guest cart for `None`); a missing file
    /// is an empty cart.
    pub fn load_cart(&self, owner: Option<&Uuid>) -> Result<Cart, CartServiceError> {
        let path = self.cart_file_path(owner);
        if !path.exists() {
            return Ok(Cart::new());
        }

        let json_data = fs::read_to_string(&path)?;
        let cart: Cart = serde_json::from_str(&json_data)?;

        debug!("Loaded cart with {} lines from {}", cart.items().len(), path.display());
        Ok(cart)
    }

    pub fn save_cart(&self, owner: Option<&Uuid>, cart: &Cart) -> Result<(), CartServiceError> {
        let path = self.cart_file_path(owner);
        let json_data = serde_json::to_string_pretty(cart)?;
        fs::write(&path, json_data)?;

        debug!("Saved cart with {} lines to {}", cart.items().len(), path.display());
        Ok(())
    }

    /// Hand the guest cart to `user_id` after login. Only happens when the
    /// user's own cart is empty; the guest cart file is removed once claimed.
    /// Returns the number of lines taken over.
    pub fn claim_guest_cart(&self, user_id: &Uuid) -> Result<usize, CartServiceError> {
        let guest_cart = self.load_cart(None)?;
        if guest_cart.is_empty() || !self.load_cart(Some(user_id))?.is_empty() {
            return Ok(0);
        }

        self.save_cart(Some(user_id), &guest_cart)?;
        fs::remove_file(self.cart_file_path(None))?;

        info!("Moved guest cart with {} lines to user {}", guest_cart.items().len(), user_id);
        Ok(guest_cart.items().len())
    }

    /// Add `quantity` units of a catalog product. The line may not hold more
    /// units than the product has in stock.
    pub async fn add_to_cart(
        &self,
        cart: &mut Cart,
        product_id: &Uuid,
        quantity: u32,
    ) -> Result<LineItem, CartServiceError> {
        let product = self
            .product_repository
            .find_by_id(product_id)
            .await?
            .ok_or(CartServiceError::ProductNotFound)?;

        let in_cart = cart.get(product_id).map(|item| item.quantity).unwrap_or(0);
        let requested = in_cart.saturating_add(quantity);
        if !product.has_stock_for(requested) {
            warn!(
                "Rejected add of {} x {}: {} in stock",
                quantity, product.name, product.quantity
            );
            return Err(CartServiceError::InsufficientStock {
                name: product.name,
                available: product.quantity,
            });
        }

        let item = cart.add_item(&product, quantity)?.clone();
        info!("Added {} x {} to cart", quantity, item.name);
        Ok(item)
    }

    pub async fn update_quantity(
        &self,
        cart: &mut Cart,
        product_id: &Uuid,
        quantity: u32,
    ) -> Result<LineItem, CartServiceError> {
        if cart.get(product_id).is_none() {
            return Err(CartServiceError::NotInCart { id: *product_id });
        }

        if quantity >= 1 {
            let product = self
                .product_repository
                .find_by_id(product_id)
                .await?
                .ok_or(CartServiceError::ProductNotFound)?;
            if !product.has_stock_for(quantity) {
                return Err(CartServiceError::InsufficientStock {
                    name: product.name,
                    available: product.quantity,
                });
            }
        }

        let item = cart
            .set_quantity(product_id, quantity)?
            .cloned()
            .ok_or(CartServiceError::NotInCart { id: *product_id })?;

        info!("Set quantity of {} to {}", item.name, item.quantity);
        Ok(item)
    }

    pub fn remove_from_cart(&self, cart: &mut Cart, product_id: &Uuid) -> Result<LineItem, CartServiceError> {
        let removed = cart
            .remove_item(product_id)
            .ok_or(CartServiceError::NotInCart { id: *product_id })?;

        info!("Removed {} from cart", removed.name);
        Ok(removed)
    }

    pub fn clear_cart(&self, cart: &mut Cart) {
        cart.clear();
        info!("Cart cleared");
    }

    pub fn summarize(&self, cart: &Cart) -> CartSummary {
        let subtotal = cart.total();
        let shipping_fee = shipping_fee_for(cart, self.shipping_fee);

        CartSummary {
            item_count: cart.item_count(),
            subtotal,
            shipping_fee,
            total: subtotal.saturating_add(shipping_fee),
        }
    }
}
