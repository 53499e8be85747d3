use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farmlink_core::RepoResult;
use uuid::Uuid;

use crate::product::{Product, ProductFilter, ProductListing};

/// Repository trait for product catalog access.
///
/// Soft-deleted rows are invisible to every read.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create_product(&self, product: &Product) -> RepoResult<()>;

    async fn get_product(&self, id: Uuid) -> RepoResult<Option<Product>>;

    /// Active listings matching `filter`, newest first.
    async fn list_products(&self, filter: &ProductFilter) -> RepoResult<Vec<Product>>;

    /// Every listing of one farmer regardless of status, newest first.
    async fn list_products_for_farmer(&self, farmer_id: Uuid) -> RepoResult<Vec<Product>>;

    /// Persist quantity, price, status and updated_at of an existing listing.
    async fn update_product(&self, product: &Product) -> RepoResult<()>;

    /// Returns false when no live listing matched (id, farmer_id).
    async fn soft_delete_product(
        &self,
        id: Uuid,
        farmer_id: Uuid,
        deleted_at: DateTime<Utc>,
    ) -> RepoResult<bool>;
}

/// Read-only product lookup consumed by the order lifecycle.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn lookup_product(&self, id: Uuid) -> RepoResult<Option<ProductListing>>;
}

#[async_trait]
impl<T> CatalogLookup for T
where
    T: ProductRepository,
{
    async fn lookup_product(&self, id: Uuid) -> RepoResult<Option<ProductListing>> {
        Ok(self.get_product(id).await?.map(|product| product.listing()))
    }
}
