use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farmlink_core::RepoResult;
use farmlink_order::{DeliveryMode, Order, OrderItem, OrderRepository, OrderScope, OrderStatus};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::database::{decode_err, store_err};

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load items for a batch of orders in one round trip, grouped by order id.
    async fn items_for(&self, order_ids: &[Uuid]) -> RepoResult<HashMap<Uuid, Vec<OrderItem>>> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, product_id, quantity, price_per_unit, created_at, updated_at
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY created_at, id
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn with_items(&self, rows: Vec<OrderRow>) -> RepoResult<Vec<Order>> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    buyer_id: Uuid,
    farmer_id: Uuid,
    status: String,
    delivery_mode: String,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> RepoResult<Order> {
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|_| decode_err("orders.status", &self.status))?;
        let delivery_mode: DeliveryMode = self
            .delivery_mode
            .parse()
            .map_err(|_| decode_err("orders.delivery_mode", &self.delivery_mode))?;

        Ok(Order {
            id: self.id,
            buyer_id: self.buyer_id,
            farmer_id: self.farmer_id,
            status,
            delivery_mode,
            total_amount: self.total_amount,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    price_per_unit: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            price_per_unit: row.price_per_unit,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ORDER_COLUMNS: &str =
    "id, buyer_id, farmer_id, status, delivery_mode, total_amount, created_at, updated_at";

/// SQL predicate and bound owner id for a scope. `$1` is reserved for the order id.
fn scope_clause(scope: OrderScope, param: usize) -> (String, Option<Uuid>) {
    match scope {
        OrderScope::Any => ("TRUE".to_string(), None),
        OrderScope::Buyer(id) => (format!("buyer_id = ${}", param), Some(id)),
        OrderScope::Farmer(id) => (format!("farmer_id = ${}", param), Some(id)),
    }
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn create_order(&self, order: &Order) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, buyer_id, farmer_id, status, delivery_mode, total_amount, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id)
        .bind(order.buyer_id)
        .bind(order.farmer_id)
        .bind(order.status.as_str())
        .bind(order.delivery_mode.as_str())
        .bind(order.total_amount)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, price_per_unit, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(item.id)
            .bind(order.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price_per_unit)
            .bind(item.created_at)
            .bind(item.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        // Dropping `tx` on any early return above rolls both inserts back
        tx.commit().await.map_err(store_err)?;
        debug!("Persisted order {} with {} item(s)", order.id, order.items.len());

        Ok(())
    }

    async fn find_order(&self, id: Uuid, scope: OrderScope) -> RepoResult<Option<Order>> {
        let (predicate, owner) = scope_clause(scope, 2);
        let sql = format!("SELECT {} FROM orders WHERE id = $1 AND {}", ORDER_COLUMNS, predicate);

        let mut query = sqlx::query_as::<_, OrderRow>(&sql).bind(id);
        if let Some(owner) = owner {
            query = query.bind(owner);
        }

        let Some(row) = query.fetch_optional(&self.pool).await.map_err(store_err)? else {
            return Ok(None);
        };

        let items = self.items_for(&[row.id]).await?.remove(&row.id).unwrap_or_default();
        row.into_order(items).map(Some)
    }

    async fn list_orders(&self, scope: OrderScope) -> RepoResult<Vec<Order>> {
        let (predicate, owner) = scope_clause(scope, 1);
        let sql = format!(
            "SELECT {} FROM orders WHERE {} ORDER BY created_at DESC, id",
            ORDER_COLUMNS, predicate
        );

        let mut query = sqlx::query_as::<_, OrderRow>(&sql);
        if let Some(owner) = owner {
            query = query.bind(owner);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(store_err)?;
        self.with_items(rows).await
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        farmer_id: Uuid,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 AND farmer_id = $3 AND status = $4",
        )
        .bind(status.as_str())
        .bind(id)
        .bind(farmer_id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected() == 1)
    }
}
