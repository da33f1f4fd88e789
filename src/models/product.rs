use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub purchase_rate: Decimal,
    pub sale_rate: Decimal,
    /// Units in stock.
    pub quantity: i32,
    pub featured_image: Option<String>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// request dto
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct StoreProductRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    #[validate(custom = "validate_name")]
    pub name: String,

    #[validate(length(max = 500, message = "Short description must be less than 500 characters"))]
    pub short_description: Option<String>,

    #[validate(length(max = 5000, message = "Long description must be less than 5000 characters"))]
    pub long_description: Option<String>,

    #[validate(custom = "validate_rate")]
    pub purchase_rate: Decimal,

    #[validate(custom = "validate_rate")]
    pub sale_rate: Decimal,

    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub quantity: i32,

    pub featured_image: Option<String>,

    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, Default)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Short description must be less than 500 characters"))]
    pub short_description: Option<String>,

    #[validate(length(max = 5000, message = "Long description must be less than 5000 characters"))]
    pub long_description: Option<String>,

    #[validate(custom = "validate_rate")]
    pub purchase_rate: Option<Decimal>,

    #[validate(custom = "validate_rate")]
    pub sale_rate: Option<Decimal>,

    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub quantity: Option<i32>,

    pub featured_image: Option<String>,

    pub images: Option<Vec<String>>,
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new("Name is required"));
    }
    Ok(())
}

fn validate_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if *rate < Decimal::ZERO {
        return Err(ValidationError::new("rate_negative"));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl Product {
    pub fn new(request: StoreProductRequest) -> Result<Self, ProductError> {
        request.validate()?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            short_description: request.short_description.map(|d| d.trim().to_string()),
            long_description: request.long_description.map(|d| d.trim().to_string()),
            purchase_rate: request.purchase_rate,
            sale_rate: request.sale_rate,
            quantity: request.quantity,
            featured_image: request.featured_image,
            images: request.images,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply the fields present in `request`; `updated_at` moves only when
    /// something actually changed.
    pub fn update(&mut self, request: UpdateProductRequest) {
        let mut updated = false;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if !name.is_empty() && self.name != name {
                self.name = name;
                updated = true;
            }
        }

        if request.short_description.is_some() && self.short_description != request.short_description {
            self.short_description = request.short_description;
            updated = true;
        }

        if request.long_description.is_some() && self.long_description != request.long_description {
            self.long_description = request.long_description;
            updated = true;
        }

        if let Some(rate) = request.purchase_rate {
            if self.purchase_rate != rate {
                self.purchase_rate = rate;
                updated = true;
            }
        }

        if let Some(rate) = request.sale_rate {
            if self.sale_rate != rate {
                self.sale_rate = rate;
                updated = true;
            }
        }

        if let Some(quantity) = request.quantity {
            if self.quantity != quantity {
                self.quantity = quantity;
                updated = true;
            }
        }

        if request.featured_image.is_some() && self.featured_image != request.featured_image {
            self.featured_image = request.featured_image;
            updated = true;
        }

        if let Some(images) = request.images {
            if self.images != images {
                self.images = images;
                updated = true;
            }
        }

        if updated {
            self.updated_at = Utc::now();
        }
    }

    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }

    /// Whether `requested` units can be taken from stock.
    pub fn has_stock_for(&self, requested: u32) -> bool {
        i64::from(self.quantity) >= i64::from(requested)
    }

    pub fn matches_term(&self, term: &str) -> bool {
        let term_lower = term.to_lowercase();
        let in_name = self.name.to_lowercase().contains(&term_lower);
        let in_description = [&self.short_description, &self.long_description]
            .iter()
            .filter_map(|d| d.as_ref())
            .any(|d| d.to_lowercase().contains(&term_lower));
        in_name || in_description
    }
}

// Product filter for catalog browsing
#[derive(Debug, Default, Clone)]
pub struct ProductFilter {
    pub search_term: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock_only: bool,
}

impl ProductFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, term: String) -> Self {
        self.search_term = Some(term);
        self
    }

    pub fn with_price_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn in_stock_only(mut self) -> Self {
        self.in_stock_only = true;
        self
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(min) = self.min_price {
            if product.sale_rate < min {
                return false;
            }
        }

        if let Some(max) = self.max_price {
            if product.sale_rate > max {
                return false;
            }
        }

        if self.in_stock_only && !product.in_stock() {
            return false;
        }

        match self.search_term.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => product.matches_term(term),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, sale_rate: i64, quantity: i32) -> StoreProductRequest {
        StoreProductRequest {
            name: name.to_string(),
            short_description: Some("A lovely gift".to_string()),
            long_description: None,
            purchase_rate: Decimal::from(sale_rate / 2),
            sale_rate: Decimal::from(sale_rate),
            quantity,
            featured_image: None,
            images: Vec::new(),
        }
    }

    #[test]
    fn test_valid_product() {
        let product = Product::new(request("  Birthday Gift Box ", 850, 10)).unwrap();
        assert_eq!(product.name, "Birthday Gift Box");
        assert!(product.in_stock());
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(Product::new(request("   ", 850, 10)).is_err());
    }

    #[test]
    fn test_negative_price_rejected() {
        assert!(Product::new(request("Card", -5, 10)).is_err());
    }

    #[test]
    fn test_negative_stock_rejected() {
        assert!(Product::new(request("Card", 50, -1)).is_err());
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let mut product = Product::new(request("Card", 50, 10)).unwrap();
        let before = product.updated_at;

        product.update(UpdateProductRequest {
            sale_rate: Some(Decimal::from(60)),
            ..Default::default()
        });

        assert_eq!(product.sale_rate, Decimal::from(60));
        assert_eq!(product.name, "Card");
        assert_eq!(product.short_description.as_deref(), Some("A lovely gift"));
        assert!(product.updated_at >= before);
    }

    #[test]
    fn test_filter_matches() {
        let product = Product::new(request("Chocolate Hamper", 950, 0)).unwrap();

        assert!(ProductFilter::new().with_search("choco".to_string()).matches(&product));
        assert!(ProductFilter::new().with_search("lovely".to_string()).matches(&product));
        assert!(!ProductFilter::new().with_search("frame".to_string()).matches(&product));
        assert!(!ProductFilter::new().in_stock_only().matches(&product));
        assert!(ProductFilter::new()
            .with_price_range(Some(Decimal::from(900)), Some(Decimal::from(1000)))
            .matches(&product));
        assert!(!ProductFilter::new()
            .with_price_range(None, Some(Decimal::from(500)))
            .matches(&product));
    }
}
