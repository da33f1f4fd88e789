mod common;

use rust_decimal::Decimal;

use gift_shop::database::repositories::{
    OrderRepository, OrderRepositoryError, PostgresOrderRepository, PostgresProductRepository,
    ProductRepository,
};
use gift_shop::models::cart::Cart;
use gift_shop::models::order::{Order, OrderStatus, ShippingAddress};

use common::{create_user, product_request, setup_test_db};

fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Anita Rao".to_string(),
        street: "4 Park Street".to_string(),
        city: "Kolkata".to_string(),
        state: "West Bengal".to_string(),
        zip_code: "700016".to_string(),
        phone: "9830012345".to_string(),
    }
}

#[tokio::test]
async fn test_store_order_takes_stock() {
    let Some(db) = setup_test_db().await else { return };
    let products = PostgresProductRepository::new(db.pool.clone());
    let orders = PostgresOrderRepository::new(db.pool.clone());
    let user = create_user(&db.pool, "anita@example.com").await;

    let hamper = products.store(product_request("Hamper", 950, 5)).await.unwrap();
    let card = products.store(product_request("Card", 50, 20)).await.unwrap();

    let mut cart = Cart::new();
    cart.add_item(&hamper, 2).unwrap();
    cart.add_item(&card, 3).unwrap();
    let order = Order::from_cart(&cart, user.id, address(), Decimal::from(50)).unwrap();

    let stored = orders.store(&order).await.unwrap();
    assert_eq!(stored.order_number, order.order_number);
    assert_eq!(stored.total, Decimal::from(2100));
    assert_eq!(stored.items.len(), 2);

    assert_eq!(products.find_by_id(&hamper.id).await.unwrap().unwrap().quantity, 3);
    assert_eq!(products.find_by_id(&card.id).await.unwrap().unwrap().quantity, 17);

    let found = orders
        .find_by_order_number(&order.order_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.shipping_address, address());
    assert_eq!(found.item_count(), 5);
    assert_eq!(found.status, OrderStatus::Pending);

    db.teardown().await;
}

#[tokio::test]
async fn test_insufficient_stock_rolls_back() {
    let Some(db) = setup_test_db().await else { return };
    let products = PostgresProductRepository::new(db.pool.clone());
    let orders = PostgresOrderRepository::new(db.pool.clone());
    let user = create_user(&db.pool, "anita@example.com").await;

    let plenty = products.store(product_request("Card", 50, 20)).await.unwrap();
    let scarce = products.store(product_request("Hamper", 950, 1)).await.unwrap();

    let mut cart = Cart::new();
    cart.add_item(&plenty, 2).unwrap();
    cart.add_item(&scarce, 2).unwrap();
    let order = Order::from_cart(&cart, user.id, address(), Decimal::from(50)).unwrap();

    let result = orders.store(&order).await;
    assert!(matches!(
        result,
        Err(OrderRepositoryError::InsufficientStock { product_id }) if product_id == scarce.id
    ));

    assert_eq!(products.find_by_id(&plenty.id).await.unwrap().unwrap().quantity, 20);
    assert!(orders
        .find_by_order_number(&order.order_number)
        .await
        .unwrap()
        .is_none());

    db.teardown().await;
}

#[tokio::test]
async fn test_taken_order_number_is_reported() {
    let Some(db) = setup_test_db().await else { return };
    let products = PostgresProductRepository::new(db.pool.clone());
    let orders = PostgresOrderRepository::new(db.pool.clone());
    let user = create_user(&db.pool, "anita@example.com").await;

    let card = products.store(product_request("Card", 50, 20)).await.unwrap();
    let mut cart = Cart::new();
    cart.add_item(&card, 1).unwrap();

    let first = Order::from_cart(&cart, user.id, address(), Decimal::from(50)).unwrap();
    orders.store(&first).await.unwrap();
    let mut second = Order::from_cart(&cart, user.id, address(), Decimal::from(50)).unwrap();
    second.order_number = first.order_number.clone();

    let result = orders.store(&second).await;
    assert!(matches!(
        result,
        Err(OrderRepositoryError::DuplicateOrderNumber { ref order_number }) if *order_number == first.order_number
    ));
    assert_eq!(products.find_by_id(&card.id).await.unwrap().unwrap().quantity, 19);

    db.teardown().await;
}

#[tokio::test]
async fn test_history_and_status() {
    let Some(db) = setup_test_db().await else { return };
    let products = PostgresProductRepository::new(db.pool.clone());
    let orders = PostgresOrderRepository::new(db.pool.clone());
    let anita = create_user(&db.pool, "anita@example.com").await;
    let ravi = create_user(&db.pool, "ravi@example.com").await;

    let card = products.store(product_request("Card", 50, 20)).await.unwrap();
    let mut cart = Cart::new();
    cart.add_item(&card, 1).unwrap();

    let first = Order::from_cart(&cart, anita.id, address(), Decimal::from(50)).unwrap();
    orders.store(&first).await.unwrap();
    let mut second = Order::from_cart(&cart, anita.id, address(), Decimal::from(50)).unwrap();
    second.created_at = first.created_at + chrono::Duration::seconds(1);
    orders.store(&second).await.unwrap();
    let other = Order::from_cart(&cart, ravi.id, address(), Decimal::from(50)).unwrap();
    orders.store(&other).await.unwrap();

    let history = orders.find_by_user_id(&anita.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id);
    assert!(history.iter().all(|o| o.items.len() == 1));
    assert_eq!(orders.find_all().await.unwrap().len(), 3);

    let shipped = orders
        .update_status(&first.order_number, OrderStatus::Shipped)
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert_eq!(shipped.items.len(), 1);

    let missing = orders.update_status("ORD000000", OrderStatus::Cancelled).await;
    assert!(matches!(missing, Err(OrderRepositoryError::NotFound)));

    db.teardown().await;
}
