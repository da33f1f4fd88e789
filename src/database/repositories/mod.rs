pub mod order_repository;
pub mod product_repository;
pub mod user_repository;

pub use order_repository::*;
pub use product_repository::*;
pub use user_repository::*;
