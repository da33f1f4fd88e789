use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::models::product::{Product, ProductError, StoreProductRequest, UpdateProductRequest};

#[derive(Error, Debug)]
pub enum ProductRepositoryError {
    #[error("Product not found")]
    NotFound,
    #[error("Validation error: {0}")]
    ValidationError(#[from] ProductError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Product repository trait for catalog data access
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn store(&self, request: StoreProductRequest) -> Result<Product, ProductRepositoryError>;
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Product>, ProductRepositoryError>;
    async fn find_all(&self) -> Result<Vec<Product>, ProductRepositoryError>;
    async fn search(&self, search_term: &str) -> Result<Vec<Product>, ProductRepositoryError>;
    async fn update(&self, id: &Uuid, request: UpdateProductRequest) -> Result<Product, ProductRepositoryError>;
    async fn delete(&self, id: &Uuid) -> Result<bool, ProductRepositoryError>;
    async fn count(&self) -> Result<i64, ProductRepositoryError>;
}

/// PostgreSQL implementation of ProductRepository
pub struct PostgresProductRepository {
    pool: PgPool,
}

impl PostgresProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, short_description, long_description, purchase_rate, sale_rate, quantity, featured_image, images, created_at, updated_at";

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    async fn store(&self, request: StoreProductRequest) -> Result<Product, ProductRepositoryError> {
        let product = Product::new(request)?;

        let query = format!(
            r#"
            INSERT INTO products ({columns})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {columns}
            "#,
            columns = PRODUCT_COLUMNS
        );

        let stored = sqlx::query_as::<_, Product>(&query)
            .bind(product.id)
            .bind(&product.name)
            .bind(&product.short_description)
            .bind(&product.long_description)
            .bind(product.purchase_rate)
            .bind(product.sale_rate)
            .bind(product.quantity)
            .bind(&product.featured_image)
            .bind(&product.images)
            .bind(product.created_at)
            .bind(product.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create product: {}", e);
                ProductRepositoryError::DatabaseError(e)
            })?;

        Ok(stored)
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Product>, ProductRepositoryError> {
        let query = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    async fn find_all(&self) -> Result<Vec<Product>, ProductRepositoryError> {
        let query = format!("SELECT {} FROM products ORDER BY created_at DESC", PRODUCT_COLUMNS);
        let products = sqlx::query_as::<_, Product>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    async fn search(&self, search_term: &str) -> Result<Vec<Product>, ProductRepositoryError> {
        let query = format!(
            r#"
            SELECT {} FROM products
            WHERE name ILIKE '%' || $1 || '%'
               OR short_description ILIKE '%' || $1 || '%'
               OR long_description ILIKE '%' || $1 || '%'
            ORDER BY created_at DESC
            "#,
            PRODUCT_COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&query)
            .bind(search_term)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    async fn update(&self, id: &Uuid, request: UpdateProductRequest) -> Result<Product, ProductRepositoryError> {
        request
            .validate()
            .map_err(|e| ProductRepositoryError::ValidationError(e.into()))?;

        let mut product = self
            .find_by_id(id)
            .await?
            .ok_or(ProductRepositoryError::NotFound)?;
        product.update(request);

        let query = format!(
            r#"
            UPDATE products
            SET name = $2,
                short_description = $3,
                long_description = $4,
                purchase_rate = $5,
                sale_rate = $6,
                quantity = $7,
                featured_image = $8,
                images = $9,
                updated_at = $10
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );

        let updated = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(&product.name)
            .bind(&product.short_description)
            .bind(&product.long_description)
            .bind(product.purchase_rate)
            .bind(product.sale_rate)
            .bind(product.quantity)
            .bind(&product.featured_image)
            .bind(&product.images)
            .bind(product.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        updated.ok_or(ProductRepositoryError::NotFound)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, ProductRepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, ProductRepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
