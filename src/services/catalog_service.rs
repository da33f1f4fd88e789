use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    database::repositories::{ProductRepository, ProductRepositoryError},
    models::product::{Product, ProductFilter, StoreProductRequest, UpdateProductRequest},
};

#[derive(Error, Debug)]
pub enum CatalogServiceError {
    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Product not found")]
    ProductNotFound,

    #[error("Repository error: {0}")]
    RepositoryError(#[from] ProductRepositoryError),
}

pub struct CatalogService {
    product_repository: Arc<dyn ProductRepository>,
}

impl CatalogService {
    pub fn new(product_repository: Arc<dyn ProductRepository>) -> Self {
        Self { product_repository }
    }

    /// List products matching `filter`, newest first.
    pub async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, CatalogServiceError> {
        debug!("Listing products with filter: {:?}", filter);

        let mut products = match filter.search_term.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => self.product_repository.search(term).await?,
            _ => self.product_repository.find_all().await?,
        };
        products.retain(|product| filter.matches(product));

        debug!("Catalog returned {} products", products.len());
        Ok(products)
    }

    pub async fn get_product(&self, product_id: &Uuid) -> Result<Product, CatalogServiceError> {
        self.product_repository
            .find_by_id(product_id)
            .await?
            .ok_or(CatalogServiceError::ProductNotFound)
    }

    pub async fn create_product(&self, request: StoreProductRequest) -> Result<Product, CatalogServiceError> {
        info!("Creating product '{}'", request.name);

        request
            .validate()
            .map_err(|e| CatalogServiceError::ValidationError {
                message: format!("Product validation failed: {}", e),
            })?;

        let product = self.product_repository.store(request).await.map_err(|e| {
            error!("Failed to create product in repository: {}", e);
            CatalogServiceError::RepositoryError(e)
        })?;

        info!("Successfully created product with ID: {}", product.id);
        Ok(product)
    }

    pub async fn update_product(
        &self,
        product_id: &Uuid,
        request: UpdateProductRequest,
    ) -> Result<Product, CatalogServiceError> {
        info!("Updating product {}", product_id);

        request
            .validate()
            .map_err(|e| CatalogServiceError::ValidationError {
                message: format!("Product update validation failed: {}", e),
            })?;

        let product = self
            .product_repository
            .update(product_id, request)
            .await
            .map_err(|e| match e {
                ProductRepositoryError::NotFound => CatalogServiceError::ProductNotFound,
                other => CatalogServiceError::RepositoryError(other),
            })?;

        info!("Successfully updated product: {}", product_id);
        Ok(product)
    }

    pub async fn delete_product(&self, product_id: &Uuid) -> Result<bool, CatalogServiceError> {
        info!("Deleting product {}", product_id);

        let deleted = self.product_repository.delete(product_id).await?;
        if !deleted {
            warn!("Product not found for deletion: {}", product_id);
        }

        Ok(deleted)
    }
}
