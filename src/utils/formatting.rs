use chrono::{DateTime, Local, Utc};
use console::style;
use rust_decimal::Decimal;
use tabled::{
    settings::{Alignment, Style},
    Table, Tabled,
};

use crate::models::{
    cart::LineItem,
    order::{DashboardStatistics, Order, OrderStatus, TopProduct},
    product::Product,
};
use crate::services::CartSummary;

#[derive(Tabled)]
struct ProductTableRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Stock")]
    stock: String,
}

#[derive(Tabled)]
struct CartTableRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Item")]
    name: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Qty")]
    quantity: u32,
    #[tabled(rename = "Line Total")]
    line_total: String,
}

#[derive(Tabled)]
struct OrderTableRow {
    #[tabled(rename = "Order")]
    order_number: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Items")]
    items: i64,
    #[tabled(rename = "Total")]
    total: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct TopProductTableRow {
    #[tabled(rename = "Product")]
    name: String,
    #[tabled(rename = "Sold")]
    sold: i64,
    #[tabled(rename = "Revenue")]
    revenue: String,
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::rounded()).with(Alignment::left());
    table.to_string()
}

pub fn format_product_table(products: &[Product]) -> String {
    if products.is_empty() {
        return String::new();
    }

    let rows: Vec<ProductTableRow> = products
        .iter()
        .map(|product| ProductTableRow {
            id: product.id.to_string(),
            name: truncate(&product.name, 30),
            price: format_money(product.sale_rate),
            stock: format_stock(product.quantity),
        })
        .collect();

    render(rows)
}

pub fn format_product_detail(product: &Product, image_base_url: Option<&str>) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}: {}\n", style("ID").bold(), style(product.id).cyan()));
    output.push_str(&format!("{}: {}\n", style("Name").bold(), style(&product.name).green()));
    output.push_str(&format!(
        "{}: {}\n",
        style("Price").bold(),
        style(format_money(product.sale_rate)).yellow()
    ));
    output.push_str(&format!("{}: {}\n", style("Stock").bold(), format_stock(product.quantity)));

    if let Some(short) = &product.short_description {
        output.push_str(&format!("{}: {}\n", style("Summary").bold(), short));
    }

    if let Some(long) = &product.long_description {
        output.push_str(&format!("{}:\n{}\n", style("Description").bold(), style(long).dim()));
    }

    if let Some(image) = &product.featured_image {
        output.push_str(&format!(
            "{}: {}\n",
            style("Image").bold(),
            image_url(image_base_url, image)
        ));
    }

    for image in &product.images {
        output.push_str(&format!("  - {}\n", style(image_url(image_base_url, image)).dim()));
    }

    output
}

pub fn format_cart_table(items: &[LineItem]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let rows: Vec<CartTableRow> = items
        .iter()
        .map(|item| CartTableRow {
            id: item.id.to_string(),
            name: truncate(&item.name, 30),
            price: format_money(item.price),
            quantity: item.quantity,
            line_total: format_money(item.line_total()),
        })
        .collect();

    render(rows)
}

pub fn format_cart_summary(summary: &CartSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}: {}\n", style("Items").bold(), summary.item_count));
    output.push_str(&format!("{}: {}\n", style("Subtotal").bold(), format_money(summary.subtotal)));
    output.push_str(&format!("{}: {}\n", style("Shipping").bold(), format_money(summary.shipping_fee)));
    output.push_str(&format!(
        "{}: {}\n",
        style("Total").bold(),
        style(format_money(summary.total)).green().bold()
    ));

    output
}

pub fn format_order_table(orders: &[Order]) -> String {
    if orders.is_empty() {
        return String::new();
    }

    let rows: Vec<OrderTableRow> = orders
        .iter()
        .map(|order| OrderTableRow {
            order_number: order.order_number.clone(),
            date: format_date_short(&order.created_at),
            items: order.item_count(),
            total: format_money(order.total),
            status: format_status(&order.status),
        })
        .collect();

    render(rows)
}

pub fn format_order_detail(order: &Order) -> String {
    let mut output = String::new();
    let address = &order.shipping_address;

    output.push_str(&format!("{}: {}\n", style("Order").bold(), style(&order.order_number).cyan()));
    output.push_str(&format!("{}: {}\n", style("Status").bold(), format_status(&order.status)));
    output.push_str(&format!("{}: {}\n", style("Placed").bold(), style(format_date(&order.created_at)).dim()));
    output.push_str(&format!(
        "{}: {}, {}, {}, {} - {}\n",
        style("Ship to").bold(),
        address.name,
        address.street,
        address.city,
        address.state,
        address.zip_code
    ));
    output.push_str(&format!("{}: {}\n\n", style("Phone").bold(), address.phone));

    for item in &order.items {
        output.push_str(&format!(
            "  {} x {} @ {} = {}\n",
            item.quantity,
            item.name,
            format_money(item.price),
            format_money(item.line_total())
        ));
    }

    output.push('\n');
    output.push_str(&format!("{}: {}\n", style("Subtotal").bold(), format_money(order.subtotal)));
    output.push_str(&format!("{}: {}\n", style("Shipping").bold(), format_money(order.shipping_fee)));
    output.push_str(&format!(
        "{}: {}\n",
        style("Total").bold(),
        style(format_money(order.total)).green().bold()
    ));

    output
}

pub fn format_dashboard(stats: &DashboardStatistics) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}: {}\n", style("Total orders").bold(), stats.total_orders));
    output.push_str(&format!(
        "{}: {}\n",
        style("Pending orders").bold(),
        style(stats.pending_orders).yellow()
    ));
    output.push_str(&format!("{}: {}\n", style("Products").bold(), stats.total_products));
    output.push_str(&format!(
        "{}: {}\n",
        style("Revenue").bold(),
        style(format_money(stats.total_revenue)).green()
    ));

    if !stats.recent_orders.is_empty() {
        output.push_str(&format!("\n{}\n", style("Recent orders").bold().underlined()));
        output.push_str(&format_order_table(&stats.recent_orders));
        output.push('\n');
    }

    if !stats.top_products.is_empty() {
        output.push_str(&format!("\n{}\n", style("Top products").bold().underlined()));
        output.push_str(&format_top_products(&stats.top_products));
        output.push('\n');
    }

    output
}

fn format_top_products(products: &[TopProduct]) -> String {
    let rows: Vec<TopProductTableRow> = products
        .iter()
        .map(|product| TopProductTableRow {
            name: truncate(&product.name, 30),
            sold: product.sold,
            revenue: format_money(product.revenue),
        })
        .collect();

    render(rows)
}

pub fn format_money(amount: Decimal) -> String {
    format!("₹{:.2}", amount.round_dp(2))
}

/// Resolve a stored image reference. Absolute URLs pass through; bare file
/// ids are joined onto `base` when one is configured.
pub fn image_url(base: Option<&str>, image: &str) -> String {
    if image.starts_with("http://") || image.starts_with("https://") {
        return image.to_string();
    }

    match base {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), image.trim_start_matches('/')),
        None => image.to_string(),
    }
}

pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_date_short(dt: &DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

fn format_stock(quantity: i32) -> String {
    if quantity > 0 {
        style(quantity).green().to_string()
    } else {
        style("Out of stock").red().to_string()
    }
}

fn format_status(status: &OrderStatus) -> String {
    match status {
        OrderStatus::Pending => style("Pending").yellow().to_string(),
        OrderStatus::Processing => style("Processing").cyan().to_string(),
        OrderStatus::Shipped => style("Shipped").blue().to_string(),
        OrderStatus::Delivered => style("Delivered").green().to_string(),
        OrderStatus::Cancelled => style("Cancelled").red().to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::from(500)), "₹500.00");
        assert_eq!(format_money(Decimal::new(12346, 3)), "₹12.35");
    }

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url(Some("https://cdn.example.com/"), "abc123"),
            "https://cdn.example.com/abc123"
        );
        assert_eq!(image_url(None, "abc123"), "abc123");
        assert_eq!(
            image_url(Some("https://cdn.example.com"), "https://other.example.com/x.png"),
            "https://other.example.com/x.png"
        );
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 30), "short");
        let long = "é".repeat(40);
        assert_eq!(truncate(&long, 10).chars().count(), 10);
    }
}
