use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    database::repositories::{OrderRepository, OrderRepositoryError},
    models::{
        cart::Cart,
        order::{generate_order_number, Order, OrderError, OrderStatus, ShippingAddress},
        user::UserResponse,
    },
};

#[derive(Error, Debug)]
pub enum OrderServiceError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Order not found: {order_number}")]
    OrderNotFound { order_number: String },

    #[error("You do not have access to order {order_number}")]
    AccessDenied { order_number: String },

    #[error("Admin privileges required")]
    AdminRequired,

    #[error("Not enough stock left for product {product_id}")]
    InsufficientStock { product_id: Uuid },

    #[error("Repository error: {0}")]
    RepositoryError(#[from] OrderRepositoryError),
}

impl From<OrderError> for OrderServiceError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::EmptyCart => OrderServiceError::EmptyCart,
            other => OrderServiceError::ValidationError {
                message: other.to_string(),
            },
        }
    }
}

// Fresh order numbers tried before giving up on a collision.
const ORDER_NUMBER_ATTEMPTS: u32 = 5;

pub struct OrderService {
    order_repository: Arc<dyn OrderRepository>,
    shipping_fee: Decimal,
}

impl OrderService {
    pub fn new(order_repository: Arc<dyn OrderRepository>, shipping_fee: Decimal) -> Self {
        Self {
            order_repository,
            shipping_fee,
        }
    }

    /// Turn the cart into an order for `user`. The cart is emptied only once
    /// the order has been stored.
    pub async fn place_order(
        &self,
        user: &UserResponse,
        cart: &mut Cart,
        shipping_address: ShippingAddress,
    ) -> Result<Order, OrderServiceError> {
        info!("Placing order for user {} ({} lines)", user.email, cart.items().len());

        let mut order = Order::from_cart(cart, user.id, shipping_address, self.shipping_fee)?;

        let mut attempt = 1;
        let stored = loop {
            match self.order_repository.store(&order).await {
                Ok(stored) => break stored,
                Err(OrderRepositoryError::DuplicateOrderNumber { order_number })
                    if attempt < ORDER_NUMBER_ATTEMPTS =>
                {
                    attempt += 1;
                    order.order_number = generate_order_number();
                    warn!("Order number {} taken, retrying as {}", order_number, order.order_number);
                }
                Err(OrderRepositoryError::InsufficientStock { product_id }) => {
                    warn!("Order rejected, product {} ran out of stock", product_id);
                    return Err(OrderServiceError::InsufficientStock { product_id });
                }
                Err(other) => {
                    error!("Failed to store order {}: {}", order.order_number, other);
                    return Err(OrderServiceError::RepositoryError(other));
                }
            }
        };

        cart.clear();

        info!("Order {} placed, total {}", stored.order_number, stored.total);
        Ok(stored)
    }

    /// Orders of `user`, newest first.
    pub async fn list_orders(&self, user: &UserResponse) -> Result<Vec<Order>, OrderServiceError> {
        Ok(self.order_repository.find_by_user_id(&user.id).await?)
    }

    pub async fn list_all_orders(&self, user: &UserResponse) -> Result<Vec<Order>, OrderServiceError> {
        if !user.is_admin() {
            return Err(OrderServiceError::AdminRequired);
        }

        Ok(self.order_repository.find_all().await?)
    }

    pub async fn get_order(&self, user: &UserResponse, order_number: &str) -> Result<Order, OrderServiceError> {
        let order_number = order_number.trim().to_uppercase();
        let order = self
            .order_repository
            .find_by_order_number(&order_number)
            .await?
            .ok_or_else(|| OrderServiceError::OrderNotFound {
                order_number: order_number.clone(),
            })?;

        if order.user_id != user.id && !user.is_admin() {
            warn!("User {} tried to view order {}", user.email, order_number);
            return Err(OrderServiceError::AccessDenied { order_number });
        }

        Ok(order)
    }

    pub async fn update_status(
        &self,
        user: &UserResponse,
        order_number: &str,
        status: OrderStatus,
    ) -> Result<Order, OrderServiceError> {
        if !user.is_admin() {
            return Err(OrderServiceError::AdminRequired);
        }

        let order_number = order_number.trim().to_uppercase();
        let order = self
            .order_repository
            .update_status(&order_number, status)
            .await
            .map_err(|e| match e {
                OrderRepositoryError::NotFound => OrderServiceError::OrderNotFound {
                    order_number: order_number.clone(),
                },
                other => OrderServiceError::RepositoryError(other),
            })?;

        info!("Order {} is now {}", order.order_number, order.status);
        Ok(order)
    }
}
