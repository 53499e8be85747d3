//! In-process store used by tests and local runs without Postgres.
//!
//! Every repository operation takes the single state lock once, so a multi-row write such
//! as order creation is observed either completely or not at all.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farmlink_catalog::{Product, ProductFilter, ProductRepository};
use farmlink_core::{RepoResult, StoreError, User, UserRepository};
use farmlink_order::{Order, OrderRepository, OrderScope, OrderStatus};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, Uuid)) {
    items.sort_by(|a, b| {
        let (a_at, a_id) = key(a);
        let (b_at, b_id) = key(b);
        b_at.cmp(&a_at).then(a_id.cmp(&b_id))
    });
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: &User) -> RepoResult<()> {
        let mut state = self.state.write().await;
        let taken = state
            .users
            .values()
            .any(|existing| !existing.is_deleted() && existing.phone == user.phone);
        if taken || state.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("phone {} already registered", user.phone)));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_phone(&self, phone: &str) -> RepoResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|user| !user.is_deleted() && user.phone == phone)
            .cloned())
    }

    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).filter(|user| !user.is_deleted()).cloned())
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn create_product(&self, product: &Product) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!("product {} exists", product.id)));
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        let state = self.state.read().await;
        Ok(state
            .products
            .get(&id)
            .filter(|product| product.deleted_at.is_none())
            .cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> RepoResult<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|product| product.is_orderable() && filter.matches(product))
            .cloned()
            .collect();
        newest_first(&mut products, |p| (p.created_at, p.id));
        Ok(products)
    }

    async fn list_products_for_farmer(&self, farmer_id: Uuid) -> RepoResult<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|product| product.farmer_id == farmer_id && product.deleted_at.is_none())
            .cloned()
            .collect();
        newest_first(&mut products, |p| (p.created_at, p.id));
        Ok(products)
    }

    async fn update_product(&self, product: &Product) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if let Some(stored) = state
            .products
            .get_mut(&product.id)
            .filter(|stored| stored.deleted_at.is_none())
        {
            stored.quantity = product.quantity;
            stored.price_per_unit = product.price_per_unit;
            stored.status = product.status;
            stored.updated_at = product.updated_at;
        }
        Ok(())
    }

    async fn soft_delete_product(
        &self,
        id: Uuid,
        farmer_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        match state.products.get_mut(&id) {
            Some(product) if product.farmer_id == farmer_id && product.deleted_at.is_none() => {
                product.deleted_at = Some(deleted_at);
                product.updated_at = deleted_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn create_order(&self, order: &Order) -> RepoResult<()> {
        let mut state = self.state.write().await;
        if state.orders.contains_key(&order.id) {
            return Err(StoreError::Conflict(format!("order {} exists", order.id)));
        }
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_order(&self, id: Uuid, scope: OrderScope) -> RepoResult<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).filter(|order| scope.admits(order)).cloned())
    }

    async fn list_orders(&self, scope: OrderScope) -> RepoResult<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| scope.admits(order))
            .cloned()
            .collect();
        newest_first(&mut orders, |o| (o.created_at, o.id));
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        farmer_id: Uuid,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        match state.orders.get_mut(&id) {
            Some(order) if order.farmer_id == farmer_id && order.status == expected => {
                order.status = status;
                order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
