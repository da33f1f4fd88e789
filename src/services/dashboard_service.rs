use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::{
    database::repositories::{
        OrderRepository, OrderRepositoryError, ProductRepository, ProductRepositoryError,
    },
    models::order::{DashboardStatistics, Order, OrderStatus, TopProduct},
};

const RECENT_ORDER_LIMIT: usize = 5;
const TOP_PRODUCT_LIMIT: usize = 5;

#[derive(Error, Debug)]
pub enum DashboardServiceError {
    #[error("Order repository error: {0}")]
    OrderRepositoryError(#[from] OrderRepositoryError),

    #[error("Product repository error: {0}")]
    ProductRepositoryError(#[from] ProductRepositoryError),
}

pub struct DashboardService {
    order_repository: Arc<dyn OrderRepository>,
    product_repository: Arc<dyn ProductRepository>,
}

impl DashboardService {
    pub fn new(order_repository: Arc<dyn OrderRepository>, product_repository: Arc<dyn ProductRepository>) -> Self {
        Self {
            order_repository,
            product_repository,
        }
    }

    pub async fn get_statistics(&self) -> Result<DashboardStatistics, DashboardServiceError> {
        let orders = self.order_repository.find_all().await?;
        let total_products = self.product_repository.count().await?;

        let total_revenue = orders
            .iter()
            .filter(|order| order.counts_as_revenue())
            .map(|order| order.total)
            .sum::<Decimal>();
        let pending_orders = orders
            .iter()
            .filter(|order| order.status == OrderStatus::Pending)
            .count() as i64;

        debug!("Computing dashboard over {} orders", orders.len());

        Ok(DashboardStatistics {
            total_orders: orders.len() as i64,
            pending_orders,
            total_products,
            total_revenue,
            top_products: top_products(&orders),
            recent_orders: orders.into_iter().take(RECENT_ORDER_LIMIT).collect(),
        })
    }
}

/// Best sellers by units across non-cancelled orders; ties go to revenue,
/// then name.
fn top_products(orders: &[Order]) -> Vec<TopProduct> {
    let mut totals: HashMap<Uuid, TopProduct> = HashMap::new();

    for item in orders
        .iter()
        .filter(|order| order.counts_as_revenue())
        .flat_map(|order| order.items.iter())
    {
        let entry = totals.entry(item.product_id).or_insert_with(|| TopProduct {
            product_id: item.product_id,
            name: item.name.clone(),
            sold: 0,
            revenue: Decimal::ZERO,
        });
        entry.sold += i64::from(item.quantity);
        entry.revenue += item.line_total();
    }

    let mut ranked: Vec<TopProduct> = totals.into_values().collect();
    ranked.sort_by(|a, b| {
        b.sold
            .cmp(&a.sold)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(TOP_PRODUCT_LIMIT);
    ranked
}
