use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farmlink_catalog::{Product, ProductFilter, ProductRepository, ProductStatus};
use farmlink_core::{RepoResult, StoreError};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::{decode_err, store_err};

pub struct StoreProductRepository {
    pool: PgPool,
}

impl StoreProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PRODUCT_COLUMNS: &str = "id, farmer_id, crop_name, quantity, unit, price_per_unit, state, city, pincode, \
     status, created_at, updated_at, deleted_at";

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    farmer_id: Uuid,
    crop_name: String,
    quantity: Decimal,
    unit: String,
    price_per_unit: Decimal,
    state: String,
    city: String,
    pincode: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let status: ProductStatus = row
            .status
            .parse()
            .map_err(|_| decode_err("products.status", &row.status))?;
        Ok(Product {
            id: row.id,
            farmer_id: row.farmer_id,
            crop_name: row.crop_name,
            quantity: row.quantity,
            unit: row.unit,
            price_per_unit: row.price_per_unit,
            state: row.state,
            city: row.city,
            pincode: row.pincode,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

/// `ILIKE` pattern matching `needle` literally anywhere in the value.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn into_products(rows: Vec<ProductRow>) -> RepoResult<Vec<Product>> {
    rows.into_iter().map(Product::try_from).collect()
}

#[async_trait]
impl ProductRepository for StoreProductRepository {
    async fn create_product(&self, product: &Product) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, farmer_id, crop_name, quantity, unit, price_per_unit, state, city, pincode, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(product.id)
        .bind(product.farmer_id)
        .bind(&product.crop_name)
        .bind(product.quantity)
        .bind(&product.unit)
        .bind(product.price_per_unit)
        .bind(&product.state)
        .bind(&product.city)
        .bind(&product.pincode)
        .bind(product.status.as_str())
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn get_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = $1 AND deleted_at IS NULL", PRODUCT_COLUMNS);
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(Product::try_from)
            .transpose()
    }

    async fn list_products(&self, filter: &ProductFilter) -> RepoResult<Vec<Product>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM products WHERE deleted_at IS NULL AND status = 'active'",
            PRODUCT_COLUMNS
        ));

        if let Some(crop_name) = &filter.crop_name {
            qb.push(" AND crop_name ILIKE ")
                .push_bind(contains_pattern(crop_name))
                .push(" ESCAPE '\\'");
        }
        if let Some(pincode) = &filter.pincode {
            qb.push(" AND pincode = ").push_bind(pincode.clone());
        }
        if let Some(city) = &filter.city {
            qb.push(" AND city = ").push_bind(city.clone());
        }
        if let Some(state) = &filter.state {
            qb.push(" AND state = ").push_bind(state.clone());
        }
        if let Some(min) = filter.min_price {
            qb.push(" AND price_per_unit >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            qb.push(" AND price_per_unit <= ").push_bind(max);
        }
        qb.push(" ORDER BY created_at DESC, id");

        let rows = qb
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        into_products(rows)
    }

    async fn list_products_for_farmer(&self, farmer_id: Uuid) -> RepoResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE farmer_id = $1 AND deleted_at IS NULL ORDER BY created_at DESC, id",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(farmer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        into_products(rows)
    }

    async fn update_product(&self, product: &Product) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET quantity = $1, price_per_unit = $2, status = $3, updated_at = $4
            WHERE id = $5 AND deleted_at IS NULL
            "#,
        )
        .bind(product.quantity)
        .bind(product.price_per_unit)
        .bind(product.status.as_str())
        .bind(product.updated_at)
        .bind(product.id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn soft_delete_product(
        &self,
        id: Uuid,
        farmer_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET deleted_at = $1, updated_at = $1 WHERE id = $2 AND farmer_id = $3 AND deleted_at IS NULL",
        )
        .bind(deleted_at)
        .bind(id)
        .bind(farmer_id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("rice"), "%rice%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }
}
