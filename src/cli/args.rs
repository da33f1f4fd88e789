use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::fmt;

use crate::models::order::OrderStatus as ModelOrderStatus;

#[derive(Parser)]
#[command(name = "gift-shop")]
#[command(about = "Gift shop storefront: browse products, manage your cart and place orders")]
#[command(version = "0.1.0")]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authentication related commands
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Browse the catalog
    Product {
        #[command(subcommand)]
        command: ProductCommands,
    },
    /// Manage the shopping cart
    Cart {
        #[command(subcommand)]
        command: CartCommands,
    },
    /// Place an order for everything in the cart
    Checkout(CheckoutArgs),
    /// Order history
    Order {
        #[command(subcommand)]
        command: OrderCommands,
    },
    /// Store administration
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Register a new user account
    Register,
    /// Login to an existing account
    Login,
    /// Logout from current session
    Logout,
    /// Show current authentication status
    Status,
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// List products with optional filtering
    List {
        /// Search keyword
        #[arg(short, long)]
        search: Option<String>,
        /// Minimum price
        #[arg(long)]
        min_price: Option<Decimal>,
        /// Maximum price
        #[arg(long)]
        max_price: Option<Decimal>,
        /// Show products in stock only
        #[arg(long)]
        in_stock: bool,
    },
    /// Show detailed information about a product
    Show {
        /// Product ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum CartCommands {
    /// Show the cart contents and totals
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        id: String,
        /// Number of units
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a cart line
    Update {
        /// Product ID
        id: String,
        /// New quantity
        quantity: u32,
    },
    /// Remove a product from the cart
    Remove {
        /// Product ID
        id: String,
    },
    /// Empty the cart
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

/// Shipping details; anything left out is prompted for.
#[derive(clap::Args)]
pub struct CheckoutArgs {
    /// Recipient name
    #[arg(long)]
    pub name: Option<String>,
    /// Street address
    #[arg(long)]
    pub street: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    /// 6-digit PIN code
    #[arg(long)]
    pub zip: Option<String>,
    /// 10-digit phone number
    #[arg(long)]
    pub phone: Option<String>,
}

#[derive(Subcommand)]
pub enum OrderCommands {
    /// List your orders
    List {
        /// List every customer's orders (admin only)
        #[arg(long)]
        all: bool,
    },
    /// Show an order
    Show {
        /// Order number, e.g. ORD123456
        order_number: String,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Store statistics
    Dashboard,
    /// Add a product to the catalog
    AddProduct {
        /// Product name
        name: String,
        /// Sale price
        #[arg(long)]
        price: Decimal,
        /// Purchase price
        #[arg(long, default_value = "0")]
        cost: Decimal,
        /// Units in stock
        #[arg(long, default_value_t = 0)]
        stock: i32,
        /// Short description
        #[arg(long)]
        summary: Option<String>,
        /// Long description
        #[arg(short, long)]
        description: Option<String>,
        /// Featured image URL or file id
        #[arg(long)]
        image: Option<String>,
    },
    /// Update an existing product
    UpdateProduct {
        /// Product ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<Decimal>,
        #[arg(long)]
        cost: Option<Decimal>,
        #[arg(long)]
        stock: Option<i32>,
        #[arg(long)]
        summary: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Delete a product
    DeleteProduct {
        /// Product ID
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Change the status of an order
    SetStatus {
        /// Order number
        order_number: String,
        /// New status
        status: OrderStatus,
    },
}

#[derive(Clone, ValueEnum)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Processing => write!(f, "processing"),
            OrderStatus::Shipped => write!(f, "shipped"),
            OrderStatus::Delivered => write!(f, "delivered"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<OrderStatus> for ModelOrderStatus {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => ModelOrderStatus::Pending,
            OrderStatus::Processing => ModelOrderStatus::Processing,
            OrderStatus::Shipped => ModelOrderStatus::Shipped,
            OrderStatus::Delivered => ModelOrderStatus::Delivered,
            OrderStatus::Cancelled => ModelOrderStatus::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cart_add() {
        let args = Args::try_parse_from(["gift-shop", "cart", "add", "some-id", "-q", "3"]).unwrap();
        match args.command {
            Commands::Cart {
                command: CartCommands::Add { id, quantity },
            } => {
                assert_eq!(id, "some-id");
                assert_eq!(quantity, 3);
            }
            _ => panic!("expected cart add"),
        }
    }

    #[test]
    fn test_parse_product_filters() {
        let args = Args::try_parse_from([
            "gift-shop", "product", "list", "--search", "mug", "--max-price", "499.50", "--in-stock",
        ])
        .unwrap();
        match args.command {
            Commands::Product {
                command: ProductCommands::List { search, min_price, max_price, in_stock },
            } => {
                assert_eq!(search.as_deref(), Some("mug"));
                assert_eq!(min_price, None);
                assert_eq!(max_price, Some(Decimal::new(49950, 2)));
                assert!(in_stock);
            }
            _ => panic!("expected product list"),
        }
    }

    #[test]
    fn test_negative_quantity_rejected() {
        assert!(Args::try_parse_from(["gift-shop", "cart", "update", "some-id", "-1"]).is_err());
    }
}
