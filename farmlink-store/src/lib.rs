pub mod app_config;
pub mod database;
pub mod user_repo;
pub mod catalog_repo;
pub mod order_repo;
pub mod memory;

use std::sync::Arc;

use farmlink_catalog::{CatalogLookup, ProductRepository};
use farmlink_core::UserRepository;
use farmlink_order::OrderRepository;
use sqlx::PgPool;

pub use catalog_repo::StoreProductRepository;
pub use database::DbClient;
pub use memory::InMemoryStore;
pub use order_repo::StoreOrderRepository;
pub use user_repo::StoreUserRepository;

/// The set of repository handles the services are built from.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub catalog: Arc<dyn CatalogLookup>,
    pub orders: Arc<dyn OrderRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        let products = Arc::new(StoreProductRepository::new(pool.clone()));
        Self {
            users: Arc::new(StoreUserRepository::new(pool.clone())),
            products: products.clone(),
            catalog: products,
            orders: Arc::new(StoreOrderRepository::new(pool)),
        }
    }

    /// Every handle backed by one shared in-process store.
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(InMemoryStore::new()))
    }

    pub fn from_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            users: store.clone(),
            products: store.clone(),
            catalog: store.clone(),
            orders: store,
        }
    }
}
