use std::sync::Arc;

use farmlink_catalog::{CatalogLookup, ProductStatus};
use farmlink_core::{Caller, Role, StoreError};
use farmlink_shared::{fits_currency_scale, line_total, CURRENCY_SCALE};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Order, OrderItem, OrderStatus, PlaceOrder};
use crate::repository::{OrderRepository, OrderScope};
use crate::transitions::{check_transition, TransitionDenied};

const ORDER_NOT_FOUND: &str = "Order not found or you don't have permission to access it";

/// Manages order lifecycle and state transitions.
///
/// Holds no entity state of its own: every call reads from and writes to the repository.
pub struct OrderManager {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogLookup>,
}

impl OrderManager {
    pub fn new(orders: Arc<dyn OrderRepository>, catalog: Arc<dyn CatalogLookup>) -> Self {
        Self { orders, catalog }
    }

    /// Place a pending order for a single product.
    ///
    /// The order header and its item are written by one repository call, so readers see
    /// both rows or neither.
    pub async fn create_order(&self, caller: &Caller, request: PlaceOrder) -> Result<Order, OrderError> {
        if !caller.is(Role::Buyer) {
            return Err(OrderError::Forbidden("Only buyers can place orders".into()));
        }
        if request.quantity <= Decimal::ZERO {
            return Err(OrderError::Validation("Quantity must be greater than 0".into()));
        }
        // Persisted quantities carry the currency scale; anything finer would be rounded on write
        if !fits_currency_scale(request.quantity) {
            return Err(OrderError::Validation(format!(
                "Quantity must have at most {} decimal places",
                CURRENCY_SCALE
            )));
        }

        let product = self
            .catalog
            .lookup_product(request.product_id)
            .await?
            .ok_or_else(|| OrderError::NotFound("Product not found".into()))?;

        if product.status != ProductStatus::Active {
            return Err(OrderError::InvalidState(format!(
                "Product is not available for ordering (status: {})",
                product.status
            )));
        }

        let total = line_total(request.quantity, product.price_per_unit)
            .ok_or_else(|| OrderError::Validation("Order amount is out of range".into()))?;

        let mut order = Order::new(caller.id, product.farmer_id, request.delivery_mode, total);
        let item = OrderItem::new(order.id, product.id, request.quantity, product.price_per_unit);
        order.add_item(item);

        self.orders.create_order(&order).await?;
        info!(
            "Order {} placed by buyer {} with farmer {} for {}",
            order.id, order.buyer_id, order.farmer_id, order.total_amount
        );

        self.reload(order.id).await
    }

    /// Fetch one order the caller is party to.
    ///
    /// Foreign and nonexistent orders are both `NotFound`.
    pub async fn get_order(&self, order_id: Uuid, caller: &Caller) -> Result<Order, OrderError> {
        let scope = match caller.role {
            Role::Buyer => OrderScope::Buyer(caller.id),
            Role::Farmer => OrderScope::Farmer(caller.id),
            Role::Admin => return Err(OrderError::Forbidden("Invalid role".into())),
        };

        self.orders
            .find_order(order_id, scope)
            .await?
            .ok_or_else(|| OrderError::NotFound(ORDER_NOT_FOUND.into()))
    }

    pub async fn list_orders_for_buyer(&self, caller: &Caller) -> Result<Vec<Order>, OrderError> {
        if !caller.is(Role::Buyer) {
            return Err(OrderError::Forbidden("Only buyers can access this endpoint".into()));
        }
        Ok(self.orders.list_orders(OrderScope::Buyer(caller.id)).await?)
    }

    pub async fn list_orders_for_farmer(&self, caller: &Caller) -> Result<Vec<Order>, OrderError> {
        if !caller.is(Role::Farmer) {
            return Err(OrderError::Forbidden("Only farmers can access this endpoint".into()));
        }
        Ok(self.orders.list_orders(OrderScope::Farmer(caller.id)).await?)
    }

    /// Move an order along the transition graph on behalf of its farmer.
    ///
    /// Only `status` and `updated_at` are written, and only if the stored status is still the
    /// one the transition was validated against.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        caller: &Caller,
        requested: OrderStatus,
    ) -> Result<Order, OrderError> {
        if !caller.is(Role::Farmer) {
            return Err(OrderError::Forbidden("Only farmers can update order status".into()));
        }

        let order = self.find_for_farmer(order_id, caller.id).await?;

        if let Err(denied) = check_transition(order.status, requested) {
            warn!("Order {}: rejected transition {} -> {}", order_id, order.status, requested);
            return Err(denied.into());
        }

        let applied = self
            .orders
            .update_order_status(order_id, caller.id, order.status, requested)
            .await?;

        if !applied {
            // Another writer moved the order after we read it
            let fresh = self.find_for_farmer(order_id, caller.id).await?;
            warn!(
                "Order {}: status changed concurrently to {}, dropping {} -> {}",
                order_id, fresh.status, order.status, requested
            );
            return Err(TransitionDenied::new(fresh.status, requested).into());
        }

        info!("Order {} moved {} -> {}", order_id, order.status, requested);
        self.reload(order_id).await
    }

    async fn find_for_farmer(&self, order_id: Uuid, farmer_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .find_order(order_id, OrderScope::Farmer(farmer_id))
            .await?
            .ok_or_else(|| {
                OrderError::NotFound("Order not found or you don't have permission to update it".into())
            })
    }

    async fn reload(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .find_order(order_id, OrderScope::Any)
            .await?
            .ok_or_else(|| OrderError::NotFound(ORDER_NOT_FOUND.into()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidState(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionDenied),

    #[error("{0}")]
    Validation(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeliveryMode;
    use async_trait::async_trait;
    use farmlink_catalog::ProductListing;
    use farmlink_core::RepoResult;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCatalog {
        products: Mutex<HashMap<Uuid, ProductListing>>,
    }

    impl FakeCatalog {
        fn stock(&self, farmer_id: Uuid, price: Decimal, status: ProductStatus) -> Uuid {
            let id = Uuid::new_v4();
            self.products.lock().unwrap().insert(
                id,
                ProductListing { id, farmer_id, price_per_unit: price, status },
            );
            id
        }

        fn reprice(&self, id: Uuid, price: Decimal) {
            if let Some(p) = self.products.lock().unwrap().get_mut(&id) {
                p.price_per_unit = price;
            }
        }
    }

    #[async_trait]
    impl CatalogLookup for FakeCatalog {
        async fn lookup_product(&self, id: Uuid) -> RepoResult<Option<ProductListing>> {
            Ok(self.products.lock().unwrap().get(&id).cloned())
        }
    }

    #[derive(Default)]
    struct FakeOrders {
        orders: Mutex<Vec<Order>>,
        fail_writes: AtomicBool,
        /// Status a simulated concurrent writer applies right before our conditional update
        interloper: Mutex<Option<OrderStatus>>,
        /// Conditional updates that matched no row
        stale_updates: AtomicUsize,
    }

    #[async_trait]
    impl OrderRepository for FakeOrders {
        async fn create_order(&self, order: &Order) -> RepoResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::backend(std::io::Error::other("disk full")));
            }
            self.orders.lock().unwrap().push(order.clone());
            Ok(())
        }

        async fn find_order(&self, id: Uuid, scope: OrderScope) -> RepoResult<Option<Order>> {
            let found = self
                .orders
                .lock()
                .unwrap()
                .iter()
                .find(|o| o.id == id && scope.admits(o))
                .cloned();
            // Hand the snapshot back only after other tasks had a chance to run
            tokio::task::yield_now().await;
            Ok(found)
        }

        async fn list_orders(&self, scope: OrderScope) -> RepoResult<Vec<Order>> {
            let mut found: Vec<Order> =
                self.orders.lock().unwrap().iter().filter(|o| scope.admits(o)).cloned().collect();
            found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(found)
        }

        async fn update_order_status(
            &self,
            id: Uuid,
            farmer_id: Uuid,
            expected: OrderStatus,
            status: OrderStatus,
        ) -> RepoResult<bool> {
            let mut orders = self.orders.lock().unwrap();
            let Some(order) = orders.iter_mut().find(|o| o.id == id && o.farmer_id == farmer_id) else {
                return Ok(false);
            };
            if let Some(competing) = self.interloper.lock().unwrap().take() {
                order.status = competing;
            }
            if order.status != expected {
                self.stale_updates.fetch_add(1, Ordering::SeqCst);
                return Ok(false);
            }
            order.status = status;
            order.updated_at = chrono::Utc::now();
            Ok(true)
        }
    }

    struct Fixture {
        manager: OrderManager,
        orders: Arc<FakeOrders>,
        catalog: Arc<FakeCatalog>,
        buyer: Caller,
        farmer: Caller,
    }

    fn fixture() -> Fixture {
        let orders = Arc::new(FakeOrders::default());
        let catalog = Arc::new(FakeCatalog::default());
        Fixture {
            manager: OrderManager::new(orders.clone(), catalog.clone()),
            orders,
            catalog,
            buyer: Caller::new(Uuid::new_v4(), Role::Buyer),
            farmer: Caller::new(Uuid::new_v4(), Role::Farmer),
        }
    }

    fn place(product_id: Uuid, quantity: Decimal) -> PlaceOrder {
        PlaceOrder { product_id, quantity, delivery_mode: DeliveryMode::Pickup }
    }

    #[tokio::test]
    async fn test_total_is_exact_decimal() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(50.00), ProductStatus::Active);

        let order = fx.manager.create_order(&fx.buyer, place(product, dec!(3))).await.unwrap();

        assert_eq!(order.total_amount, dec!(150.00));
        assert_eq!(order.total_amount.to_string(), "150.00");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.farmer_id, fx.farmer.id);
        assert_eq!(order.buyer_id, fx.buyer.id);
    }

    #[tokio::test]
    async fn test_only_buyers_place_orders() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(10), ProductStatus::Active);

        let result = fx.manager.create_order(&fx.farmer, place(product, dec!(1))).await;
        assert!(matches!(result, Err(OrderError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_non_positive_quantity_is_rejected() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(10), ProductStatus::Active);

        for quantity in [dec!(0), dec!(-2)] {
            let result = fx.manager.create_order(&fx.buyer, place(product, quantity)).await;
            assert!(matches!(result, Err(OrderError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_sub_minor_unit_quantity_is_rejected() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(100.00), ProductStatus::Active);

        // 1.254 would persist as 1.25 and 0.001 as 0.00
        for quantity in [dec!(1.254), dec!(0.001)] {
            let result = fx.manager.create_order(&fx.buyer, place(product, quantity)).await;
            assert!(matches!(result, Err(OrderError::Validation(_))), "accepted {}", quantity);
        }
        assert!(fx.orders.orders.lock().unwrap().is_empty());

        let order = fx.manager.create_order(&fx.buyer, place(product, dec!(1.250))).await.unwrap();
        assert_eq!(order.total_amount, dec!(125.00));
        assert_eq!(order.items[0].quantity * order.items[0].price_per_unit, order.total_amount);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let fx = fixture();
        let result = fx.manager.create_order(&fx.buyer, place(Uuid::new_v4(), dec!(1))).await;
        assert!(matches!(result, Err(OrderError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_closed_product_writes_nothing() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(50.00), ProductStatus::Closed);

        let result = fx.manager.create_order(&fx.buyer, place(product, dec!(3))).await;

        assert!(matches!(result, Err(OrderError::InvalidState(_))));
        assert!(fx.orders.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_and_leaves_no_order() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(20), ProductStatus::Active);
        fx.orders.fail_writes.store(true, Ordering::SeqCst);

        let result = fx.manager.create_order(&fx.buyer, place(product, dec!(2))).await;

        assert!(matches!(result, Err(OrderError::Storage(_))));
        assert!(fx.manager.list_orders_for_buyer(&fx.buyer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_item_price_is_a_snapshot() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(50.00), ProductStatus::Active);

        let created = fx.manager.create_order(&fx.buyer, place(product, dec!(3))).await.unwrap();
        fx.catalog.reprice(product, dec!(75.00));

        let fetched = fx.manager.get_order(created.id, &fx.buyer).await.unwrap();
        assert_eq!(fetched.items.len(), 1);
        assert_eq!(fetched.items[0].quantity, dec!(3));
        assert_eq!(fetched.items[0].price_per_unit, dec!(50.00));
        assert_eq!(fetched.items[0].product_id, product);
        assert_eq!(fetched.total_amount, dec!(150.00));
    }

    #[tokio::test]
    async fn test_foreign_and_missing_orders_look_the_same() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(5), ProductStatus::Active);
        let order = fx.manager.create_order(&fx.buyer, place(product, dec!(1))).await.unwrap();

        let stranger = Caller::new(Uuid::new_v4(), Role::Buyer);
        let foreign = fx.manager.get_order(order.id, &stranger).await.unwrap_err();
        let missing = fx.manager.get_order(Uuid::new_v4(), &stranger).await.unwrap_err();

        assert!(matches!(foreign, OrderError::NotFound(_)));
        assert!(matches!(missing, OrderError::NotFound(_)));
        assert_eq!(foreign.to_string(), missing.to_string());

        // The owning farmer can see it; an admin is turned away
        assert!(fx.manager.get_order(order.id, &fx.farmer).await.is_ok());
        let admin = Caller::new(Uuid::new_v4(), Role::Admin);
        assert!(matches!(fx.manager.get_order(order.id, &admin).await, Err(OrderError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_buyer_listing_is_newest_first() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(5), ProductStatus::Active);

        let mut placed = Vec::new();
        for _ in 0..3 {
            placed.push(fx.manager.create_order(&fx.buyer, place(product, dec!(1))).await.unwrap().id);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let listed: Vec<Uuid> = fx
            .manager
            .list_orders_for_buyer(&fx.buyer)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        placed.reverse();
        assert_eq!(listed, placed);

        let other = Caller::new(Uuid::new_v4(), Role::Buyer);
        assert!(fx.manager.list_orders_for_buyer(&other).await.unwrap().is_empty());
        assert!(matches!(
            fx.manager.list_orders_for_buyer(&fx.farmer).await,
            Err(OrderError::Forbidden(_))
        ));
        assert_eq!(fx.manager.list_orders_for_farmer(&fx.farmer).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(12.5), ProductStatus::Active);
        let order = fx.manager.create_order(&fx.buyer, place(product, dec!(4))).await.unwrap();

        for next in [OrderStatus::Accepted, OrderStatus::Shipped, OrderStatus::Delivered] {
            let updated = fx.manager.update_order_status(order.id, &fx.farmer, next).await.unwrap();
            assert_eq!(updated.status, next);
            assert_eq!(updated.total_amount, dec!(50.00));
            assert_eq!(updated.items.len(), 1);
        }

        let result = fx.manager.update_order_status(order.id, &fx.farmer, OrderStatus::Accepted).await;
        match result {
            Err(OrderError::InvalidTransition(denied)) => assert!(denied.valid_next.is_empty()),
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skip_transition_reports_valid_next_states() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(1), ProductStatus::Active);
        let order = fx.manager.create_order(&fx.buyer, place(product, dec!(1))).await.unwrap();

        let result = fx.manager.update_order_status(order.id, &fx.farmer, OrderStatus::Shipped).await;

        match result {
            Err(OrderError::InvalidTransition(denied)) => {
                assert_eq!(denied.current, OrderStatus::Pending);
                assert_eq!(denied.valid_next, vec![OrderStatus::Accepted, OrderStatus::Rejected]);
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
        let stored = fx.manager.get_order(order.id, &fx.farmer).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_status_update_is_scoped_to_owning_farmer() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(1), ProductStatus::Active);
        let order = fx.manager.create_order(&fx.buyer, place(product, dec!(1))).await.unwrap();

        let other_farmer = Caller::new(Uuid::new_v4(), Role::Farmer);
        let result = fx.manager.update_order_status(order.id, &other_farmer, OrderStatus::Accepted).await;
        assert!(matches!(result, Err(OrderError::NotFound(_))));

        let result = fx.manager.update_order_status(order.id, &fx.buyer, OrderStatus::Accepted).await;
        assert!(matches!(result, Err(OrderError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_lost_race_reports_fresh_status() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(1), ProductStatus::Active);
        let order = fx.manager.create_order(&fx.buyer, place(product, dec!(1))).await.unwrap();

        *fx.orders.interloper.lock().unwrap() = Some(OrderStatus::Rejected);
        let result = fx.manager.update_order_status(order.id, &fx.farmer, OrderStatus::Accepted).await;

        match result {
            Err(OrderError::InvalidTransition(denied)) => {
                assert_eq!(denied.current, OrderStatus::Rejected);
                assert!(denied.valid_next.is_empty());
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
        let stored = fx.manager.get_order(order.id, &fx.farmer).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Rejected);
    }

    #[tokio::test]
    async fn test_concurrent_updates_from_same_state_admit_one() {
        let fx = fixture();
        let product = fx.catalog.stock(fx.farmer.id, dec!(1), ProductStatus::Active);
        let order = fx.manager.create_order(&fx.buyer, place(product, dec!(1))).await.unwrap();

        let (accept, reject) = tokio::join!(
            fx.manager.update_order_status(order.id, &fx.farmer, OrderStatus::Accepted),
            fx.manager.update_order_status(order.id, &fx.farmer, OrderStatus::Rejected),
        );

        let winners = [accept.is_ok(), reject.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(winners, 1);
        // Both read `pending`; the loser was turned away by the conditional write
        assert_eq!(fx.orders.stale_updates.load(Ordering::SeqCst), 1);

        let (winner, loser) = if accept.is_ok() { (accept, reject) } else { (reject, accept) };
        let winner = winner.unwrap();
        match loser {
            Err(OrderError::InvalidTransition(denied)) => assert_eq!(denied.current, winner.status),
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
        let stored = fx.manager.get_order(order.id, &fx.farmer).await.unwrap();
        assert_eq!(stored.status, winner.status);
    }
}
