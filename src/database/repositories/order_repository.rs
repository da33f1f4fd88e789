use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::order::{Order, OrderItem, OrderStatus};

#[derive(Error, Debug)]
pub enum OrderRepositoryError {
    #[error("Order not found")]
    NotFound,
    #[error("Insufficient stock for product {product_id}")]
    InsufficientStock { product_id: Uuid },
    #[error("Order number {order_number} is already taken")]
    DuplicateOrderNumber { order_number: String },
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Order repository trait for order placement and history
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist `order` with its items and take the ordered units out of
    /// stock. Either everything is written or nothing is.
    async fn store(&self, order: &Order) -> Result<Order, OrderRepositoryError>;
    async fn find_by_order_number(&self, order_number: &str) -> Result<Option<Order>, OrderRepositoryError>;
    async fn find_by_user_id(&self, user_id: &Uuid) -> Result<Vec<Order>, OrderRepositoryError>;
    async fn find_all(&self) -> Result<Vec<Order>, OrderRepositoryError>;
    async fn update_status(&self, order_number: &str, status: OrderStatus) -> Result<Order, OrderRepositoryError>;
}

/// PostgreSQL implementation of OrderRepository
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, subtotal, shipping_fee, total, shipping_name, street, city, state, zip_code, phone, created_at, updated_at";

fn is_order_number_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error().map_or(false, |db_err| {
        db_err.is_unique_violation() && db_err.constraint().map_or(true, |name| name.contains("order_number"))
    })
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn store(&self, order: &Order) -> Result<Order, OrderRepositoryError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO orders ({columns})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {columns}
            "#,
            columns = ORDER_COLUMNS
        );

        let address = &order.shipping_address;
        let mut stored = sqlx::query_as::<_, Order>(&query)
            .bind(order.id)
            .bind(&order.order_number)
            .bind(order.user_id)
            .bind(order.status)
            .bind(order.subtotal)
            .bind(order.shipping_fee)
            .bind(order.total)
            .bind(&address.name)
            .bind(&address.street)
            .bind(&address.city)
            .bind(&address.state)
            .bind(&address.zip_code)
            .bind(&address.phone)
            .bind(order.created_at)
            .bind(order.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_order_number_conflict(&e) {
                    tracing::warn!("Order number {} already exists", order.order_number);
                    return OrderRepositoryError::DuplicateOrderNumber {
                        order_number: order.order_number.clone(),
                    };
                }
                tracing::error!("Failed to create order {}: {}", order.order_number, e);
                OrderRepositoryError::DatabaseError(e)
            })?;

        for item in &order.items {
            let reserved = sqlx::query(
                r#"
                UPDATE products
                SET quantity = quantity - $2, updated_at = NOW()
                WHERE id = $1 AND quantity >= $2
                "#,
            )
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;

            if reserved.rows_affected() == 0 {
                tracing::warn!(
                    "Order {} rejected: not enough stock for product {}",
                    order.order_number,
                    item.product_id
                );
                tx.rollback().await?;
                return Err(OrderRepositoryError::InsufficientStock {
                    product_id: item.product_id,
                });
            }

            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, name, price, quantity)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(stored.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.price)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        stored.items = order.items.clone();
        Ok(stored)
    }

    async fn find_by_order_number(&self, order_number: &str) -> Result<Option<Order>, OrderRepositoryError> {
        let query = format!("SELECT {} FROM orders WHERE order_number = $1", ORDER_COLUMNS);
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        match order {
            Some(order) => Ok(self.with_items(vec![order]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_user_id(&self, user_id: &Uuid) -> Result<Vec<Order>, OrderRepositoryError> {
        let query = format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        self.with_items(orders).await
    }

    async fn find_all(&self) -> Result<Vec<Order>, OrderRepositoryError> {
        let query = format!("SELECT {} FROM orders ORDER BY created_at DESC", ORDER_COLUMNS);
        let orders = sqlx::query_as::<_, Order>(&query)
            .fetch_all(&self.pool)
            .await?;

        self.with_items(orders).await
    }

    async fn update_status(&self, order_number: &str, status: OrderStatus) -> Result<Order, OrderRepositoryError> {
        let query = format!(
            r#"
            UPDATE orders
            SET status = $2, updated_at = $3
            WHERE order_number = $1
            RETURNING {}
            "#,
            ORDER_COLUMNS
        );

        let updated = sqlx::query_as::<_, Order>(&query)
            .bind(order_number)
            .bind(status)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(OrderRepositoryError::NotFound)?;

        self.with_items(vec![updated])
            .await?
            .pop()
            .ok_or(OrderRepositoryError::NotFound)
    }
}

impl PostgresOrderRepository {
    /// Load the items of `orders` in one query and attach them.
    async fn with_items(&self, mut orders: Vec<Order>) -> Result<Vec<Order>, OrderRepositoryError> {
        if orders.is_empty() {
            return Ok(orders);
        }

        let ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT order_id, product_id, name, price, quantity
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for item in items {
            grouped.entry(item.order_id).or_default().push(item);
        }

        for order in &mut orders {
            order.items = grouped.remove(&order.id).unwrap_or_default();
        }

        Ok(orders)
    }
}
