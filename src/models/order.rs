use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres, Type};
use uuid::Uuid;
use validator::Validate;

use crate::models::cart::Cart;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i16)]
pub enum OrderStatus {
    #[default]
    Pending = 0,
    Processing = 1,
    Shipped = 2,
    Delivered = 3,
    Cancelled = 4,
}

impl From<OrderStatus> for i16 {
    fn from(status: OrderStatus) -> Self {
        status as i16
    }
}

impl TryFrom<i16> for OrderStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OrderStatus::Pending),
            1 => Ok(OrderStatus::Processing),
            2 => Ok(OrderStatus::Shipped),
            3 => Ok(OrderStatus::Delivered),
            4 => Ok(OrderStatus::Cancelled),
            _ => Err(()),
        }
    }
}

// SQLx implementations for OrderStatus
impl Type<Postgres> for OrderStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for OrderStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, Box<dyn std::error::Error + 'static + Send + Sync>> {
        let int_val = <i16 as Decode<Postgres>>::decode(value)?;
        OrderStatus::try_from(int_val).map_err(|_| "Invalid OrderStatus value".into())
    }
}

impl<'q> Encode<'q, Postgres> for OrderStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <i16 as Encode<Postgres>>::encode_by_ref(&(*self as i16), buf)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Processing => write!(f, "Processing"),
            OrderStatus::Shipped => write!(f, "Shipped"),
            OrderStatus::Delivered => write!(f, "Delivered"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

lazy_static::lazy_static! {
    static ref PHONE_REGEX: Regex = Regex::new(r"^[0-9]{10}$").unwrap();
    static ref ZIP_CODE_REGEX: Regex = Regex::new(r"^[0-9]{6}$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct ShippingAddress {
    #[sqlx(rename = "shipping_name")]
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, max = 255, message = "Street address is required"))]
    pub street: String,

    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 1, max = 100, message = "State is required"))]
    pub state: String,

    #[validate(regex(path = "ZIP_CODE_REGEX", message = "Please enter a valid 6-digit PIN code"))]
    pub zip_code: String,

    #[validate(regex(path = "PHONE_REGEX", message = "Please enter a valid 10-digit phone number"))]
    pub phone: String,
}

/// A cart line frozen into an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    #[sqlx(flatten)]
    pub shipping_address: ShippingAddress,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Cannot place an order from an empty cart")]
    EmptyCart,

    #[error("Line quantity {quantity} for {name} is too large")]
    QuantityTooLarge { name: String, quantity: u32 },

    #[error("Order total is too large")]
    TotalTooLarge,

    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Flat shipping charged on any cart with at least one line, whatever its
/// subtotal.
pub fn shipping_fee_for(cart: &Cart, flat_fee: Decimal) -> Decimal {
    if cart.is_empty() {
        Decimal::ZERO
    } else {
        flat_fee
    }
}

/// `ORD` followed by six random digits.
pub fn generate_order_number() -> String {
    let digits: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("ORD{}", digits)
}

impl Order {
    /// Snapshot `cart` into a new pending order. The cart itself is not
    /// modified.
    pub fn from_cart(
        cart: &Cart,
        user_id: Uuid,
        shipping_address: ShippingAddress,
        flat_shipping_fee: Decimal,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        shipping_address.validate()?;

        let id = Uuid::new_v4();
        let items = cart
            .items()
            .iter()
            .map(|line| {
                let quantity = i32::try_from(line.quantity).map_err(|_| OrderError::QuantityTooLarge {
                    name: line.name.clone(),
                    quantity: line.quantity,
                })?;
                Ok(OrderItem {
                    order_id: id,
                    product_id: line.id,
                    name: line.name.clone(),
                    price: line.price,
                    quantity,
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        let subtotal = cart.total();
        let shipping_fee = shipping_fee_for(cart, flat_shipping_fee);
        let total = subtotal.checked_add(shipping_fee).ok_or(OrderError::TotalTooLarge)?;
        let now = Utc::now();

        Ok(Self {
            id,
            order_number: generate_order_number(),
            user_id,
            status: OrderStatus::Pending,
            subtotal,
            shipping_fee,
            total,
            shipping_address,
            items,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    pub fn counts_as_revenue(&self) -> bool {
        self.status != OrderStatus::Cancelled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub sold: i64,
    pub revenue: Decimal,
}

// Admin dashboard DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStatistics {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub total_products: i64,
    pub total_revenue: Decimal,
    pub recent_orders: Vec<Order>,
    pub top_products: Vec<TopProduct>,
}
