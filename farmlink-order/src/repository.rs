use async_trait::async_trait;
use farmlink_core::RepoResult;
use uuid::Uuid;

use crate::models::{Order, OrderStatus};

/// Visibility filter applied to order reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    Any,
    Buyer(Uuid),
    Farmer(Uuid),
}

impl OrderScope {
    pub fn admits(&self, order: &Order) -> bool {
        match self {
            OrderScope::Any => true,
            OrderScope::Buyer(id) => order.buyer_id == *id,
            OrderScope::Farmer(id) => order.farmer_id == *id,
        }
    }
}

/// Repository trait for order data access.
///
/// Every read returns orders with their items loaded.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist the order header and all of its items as one unit: either every row is
    /// written or none is.
    async fn create_order(&self, order: &Order) -> RepoResult<()>;

    async fn find_order(&self, id: Uuid, scope: OrderScope) -> RepoResult<Option<Order>>;

    /// Newest first by `created_at`.
    async fn list_orders(&self, scope: OrderScope) -> RepoResult<Vec<Order>>;

    /// Single-row conditional update of `status` and `updated_at`.
    ///
    /// Applies only while the row still belongs to `farmer_id` and still holds `expected`;
    /// returns whether a row changed.
    async fn update_order_status(
        &self,
        id: Uuid,
        farmer_id: Uuid,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> RepoResult<bool>;
}
