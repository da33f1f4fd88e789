#![allow(dead_code)]

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool};
use url::Url;
use uuid::Uuid;

use gift_shop::database::repositories::{PostgresUserRepository, UserRepository};
use gift_shop::models::product::StoreProductRequest;
use gift_shop::models::user::{StoreUserRequest, User};

pub struct TestDb {
    pub pool: PgPool,
    schema: String,
    base_url: String,
}

/// Connect to `TEST_DATABASE_URL` inside a fresh schema with the migrations
/// applied. Returns `None` when no test database is configured.
pub async fn setup_test_db() -> Option<TestDb> {
    let Ok(base_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL is not set, skipping database test");
        return None;
    };

    // Create a unique schema per test
    let schema = format!("test_{}", Uuid::new_v4().simple());

    let admin_pool = PgPool::connect(&base_url)
        .await
        .expect("Failed to connect to test database");
    admin_pool
        .execute(&*format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
        .await
        .unwrap();
    admin_pool.close().await;

    // Build a URL that sets search_path to the new schema
    let mut url = Url::parse(&base_url).expect("Invalid TEST_DATABASE_URL");
    let mut qp: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    qp.push(("options".to_string(), format!("-csearch_path={},public", schema)));
    url.query_pairs_mut()
        .clear()
        .extend_pairs(qp.iter().map(|(k, v)| (&**k, &**v)));

    let pool = PgPool::connect(url.as_str())
        .await
        .expect("Failed to connect to test database with search_path");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(TestDb {
        pool,
        schema,
        base_url,
    })
}

impl TestDb {
    pub async fn teardown(self) {
        self.pool.close().await;
        if let Ok(admin_pool) = PgPool::connect(&self.base_url).await {
            let _ = admin_pool
                .execute(&*format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
                .await;
        }
    }
}

pub fn user_request(email: &str) -> StoreUserRequest {
    StoreUserRequest::new(
        "Test Customer".to_string(),
        email.to_string(),
        "password123".to_string(),
    )
    .unwrap()
}

pub async fn create_user(pool: &PgPool, email: &str) -> User {
    PostgresUserRepository::new(pool.clone())
        .store(user_request(email))
        .await
        .unwrap()
}

pub fn product_request(name: &str, sale_rate: i64, quantity: i32) -> StoreProductRequest {
    StoreProductRequest {
        name: name.to_string(),
        short_description: Some(format!("{} short", name)),
        long_description: None,
        purchase_rate: Decimal::from(sale_rate / 2),
        sale_rate: Decimal::from(sale_rate),
        quantity,
        featured_image: None,
        images: vec!["front.png".to_string(), "back.png".to_string()],
    }
}
