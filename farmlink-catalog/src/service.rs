use std::sync::Arc;

use chrono::Utc;
use farmlink_core::{Caller, Role, StoreError};
use farmlink_shared::{fits_currency_scale, CURRENCY_SCALE};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use crate::product::{NewProduct, Product, ProductFilter, ProductUpdate};
use crate::repository::ProductRepository;

/// Farmer-facing listing management plus public browsing
pub struct ProductService {
    products: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    pub async fn create(&self, caller: &Caller, fields: NewProduct) -> Result<Product, CatalogError> {
        require_farmer(caller, "Only farmers can create products")?;
        validate_new(&fields)?;

        let product = Product::new(caller.id, fields);
        self.products.create_product(&product).await?;

        info!("Farmer {} listed product {} ({})", caller.id, product.id, product.crop_name);
        Ok(product)
    }

    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.list_products(filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, CatalogError> {
        self.products
            .get_product(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound("Product not found".into()))
    }

    pub async fn list_mine(&self, caller: &Caller) -> Result<Vec<Product>, CatalogError> {
        require_farmer(caller, "Only farmers can access this endpoint")?;
        Ok(self.products.list_products_for_farmer(caller.id).await?)
    }

    pub async fn update(
        &self,
        caller: &Caller,
        id: Uuid,
        update: ProductUpdate,
    ) -> Result<Product, CatalogError> {
        require_farmer(caller, "Only farmers can update products")?;

        let mut product = self.owned_product(caller, id, "update").await?;

        if update.quantity.is_some_and(|q| q <= Decimal::ZERO) {
            return Err(CatalogError::Validation("Quantity must be greater than 0".into()));
        }
        if update.price_per_unit.is_some_and(|p| p <= Decimal::ZERO) {
            return Err(CatalogError::Validation("Price per unit must be greater than 0".into()));
        }
        check_scale(update.quantity, update.price_per_unit)?;
        if !product.apply(&update) {
            return Err(CatalogError::Validation("No fields to update".into()));
        }

        self.products.update_product(&product).await?;
        Ok(product)
    }

    pub async fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), CatalogError> {
        require_farmer(caller, "Only farmers can delete products")?;

        if !self.products.soft_delete_product(id, caller.id, Utc::now()).await? {
            return Err(CatalogError::NotFound(
                "Product not found or you don't have permission to delete it".into(),
            ));
        }

        info!("Farmer {} removed product {}", caller.id, id);
        Ok(())
    }

    /// A listing owned by someone else is reported as missing.
    async fn owned_product(&self, caller: &Caller, id: Uuid, action: &str) -> Result<Product, CatalogError> {
        self.products
            .get_product(id)
            .await?
            .filter(|p| p.farmer_id == caller.id)
            .ok_or_else(|| {
                CatalogError::NotFound(format!(
                    "Product not found or you don't have permission to {} it",
                    action
                ))
            })
    }
}

fn require_farmer(caller: &Caller, message: &str) -> Result<(), CatalogError> {
    if caller.is(Role::Farmer) {
        Ok(())
    } else {
        Err(CatalogError::Forbidden(message.to_string()))
    }
}

fn validate_new(fields: &NewProduct) -> Result<(), CatalogError> {
    let required = [
        ("crop_name", &fields.crop_name),
        ("unit", &fields.unit),
        ("state", &fields.state),
        ("city", &fields.city),
        ("pincode", &fields.pincode),
    ];
    if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(CatalogError::Validation(format!("{} is required", name)));
    }
    if fields.quantity <= Decimal::ZERO {
        return Err(CatalogError::Validation("Quantity must be greater than 0".into()));
    }
    if fields.price_per_unit <= Decimal::ZERO {
        return Err(CatalogError::Validation("Price per unit must be greater than 0".into()));
    }
    check_scale(Some(fields.quantity), Some(fields.price_per_unit))
}

/// Quantities and prices are stored at the currency scale and must not need rounding.
fn check_scale(quantity: Option<Decimal>, price_per_unit: Option<Decimal>) -> Result<(), CatalogError> {
    if quantity.is_some_and(|q| !fits_currency_scale(q)) {
        return Err(CatalogError::Validation(format!(
            "Quantity must have at most {} decimal places",
            CURRENCY_SCALE
        )));
    }
    if price_per_unit.is_some_and(|p| !fits_currency_scale(p)) {
        return Err(CatalogError::Validation(format!(
            "Price per unit must have at most {} decimal places",
            CURRENCY_SCALE
        )));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use farmlink_core::RepoResult;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProducts {
        rows: Mutex<Vec<Product>>,
    }

    #[async_trait]
    impl ProductRepository for FakeProducts {
        async fn create_product(&self, product: &Product) -> RepoResult<()> {
            self.rows.lock().unwrap().push(product.clone());
            Ok(())
        }

        async fn get_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
            Ok(self.rows.lock().unwrap().iter().find(|p| p.id == id && p.deleted_at.is_none()).cloned())
        }

        async fn list_products(&self, filter: &ProductFilter) -> RepoResult<Vec<Product>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.is_orderable() && filter.matches(p))
                .cloned()
                .collect())
        }

        async fn list_products_for_farmer(&self, farmer_id: Uuid) -> RepoResult<Vec<Product>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.farmer_id == farmer_id && p.deleted_at.is_none())
                .cloned()
                .collect())
        }

        async fn update_product(&self, product: &Product) -> RepoResult<()> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|p| p.id == product.id) {
                *row = product.clone();
            }
            Ok(())
        }

        async fn soft_delete_product(&self, id: Uuid, farmer_id: Uuid, deleted_at: DateTime<Utc>) -> RepoResult<bool> {
            let mut rows = self.rows.lock().unwrap();
            match rows.iter_mut().find(|p| p.id == id && p.farmer_id == farmer_id && p.deleted_at.is_none()) {
                Some(row) => {
                    row.deleted_at = Some(deleted_at);
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    fn onions() -> NewProduct {
        NewProduct {
            crop_name: "Red Onion".into(),
            quantity: dec!(120),
            unit: "kg".into(),
            price_per_unit: dec!(30.00),
            state: "Maharashtra".into(),
            city: "Nashik".into(),
            pincode: "422001".into(),
        }
    }

    fn farmer() -> Caller {
        Caller::new(Uuid::new_v4(), Role::Farmer)
    }

    #[tokio::test]
    async fn test_only_farmers_create() {
        let service = ProductService::new(Arc::new(FakeProducts::default()));
        let buyer = Caller::new(Uuid::new_v4(), Role::Buyer);

        assert!(matches!(service.create(&buyer, onions()).await, Err(CatalogError::Forbidden(_))));

        let owner = farmer();
        let product = service.create(&owner, onions()).await.unwrap();
        assert_eq!(product.farmer_id, owner.id);
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_price() {
        let service = ProductService::new(Arc::new(FakeProducts::default()));
        let mut fields = onions();
        fields.price_per_unit = dec!(0);

        assert!(matches!(service.create(&farmer(), fields).await, Err(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn test_amounts_finer_than_minor_unit_are_rejected() {
        let service = ProductService::new(Arc::new(FakeProducts::default()));
        let owner = farmer();

        let mut fields = onions();
        fields.price_per_unit = dec!(24.999);
        assert!(matches!(service.create(&owner, fields).await, Err(CatalogError::Validation(_))));

        let mut fields = onions();
        fields.quantity = dec!(0.001);
        assert!(matches!(service.create(&owner, fields).await, Err(CatalogError::Validation(_))));

        let product = service.create(&owner, onions()).await.unwrap();
        let update = ProductUpdate { price_per_unit: Some(dec!(30.125)), ..Default::default() };
        assert!(matches!(
            service.update(&owner, product.id, update).await,
            Err(CatalogError::Validation(_))
        ));
        assert_eq!(service.get(product.id).await.unwrap().price_per_unit, product.price_per_unit);
    }

    #[tokio::test]
    async fn test_update_scoped_to_owner() {
        let service = ProductService::new(Arc::new(FakeProducts::default()));
        let owner = farmer();
        let product = service.create(&owner, onions()).await.unwrap();

        let update = ProductUpdate { price_per_unit: Some(dec!(35.00)), ..Default::default() };
        let stranger = farmer();
        assert!(matches!(
            service.update(&stranger, product.id, update.clone()).await,
            Err(CatalogError::NotFound(_))
        ));

        let updated = service.update(&owner, product.id, update).await.unwrap();
        assert_eq!(updated.price_per_unit, dec!(35.00));

        assert!(matches!(
            service.update(&owner, product.id, ProductUpdate::default()).await,
            Err(CatalogError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_soft_deleted_products_disappear() {
        let service = ProductService::new(Arc::new(FakeProducts::default()));
        let owner = farmer();
        let product = service.create(&owner, onions()).await.unwrap();

        service.delete(&owner, product.id).await.unwrap();

        assert!(matches!(service.get(product.id).await, Err(CatalogError::NotFound(_))));
        assert!(service.list_mine(&owner).await.unwrap().is_empty());
        assert!(matches!(service.delete(&owner, product.id).await, Err(CatalogError::NotFound(_))));
    }
}
