use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Listing availability
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Closed,
    Sold,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Closed => "closed",
            ProductStatus::Sold => "sold",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProductStatus::Active),
            "closed" => Ok(ProductStatus::Closed),
            "sold" => Ok(ProductStatus::Sold),
            other => Err(format!("Status must be one of: active, closed, sold (got '{}')", other)),
        }
    }
}

/// A crop listing published by a farmer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub crop_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub price_per_unit: Decimal,
    pub state: String,
    pub city: String,
    pub pincode: String,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(farmer_id: Uuid, fields: NewProduct) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            farmer_id,
            crop_name: fields.crop_name,
            quantity: fields.quantity,
            unit: fields.unit,
            price_per_unit: fields.price_per_unit,
            state: fields.state,
            city: fields.city,
            pincode: fields.pincode,
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// The view the order lifecycle needs: owner, price and availability.
    pub fn listing(&self) -> ProductListing {
        ProductListing {
            id: self.id,
            farmer_id: self.farmer_id,
            price_per_unit: self.price_per_unit,
            status: self.status,
        }
    }

    /// Apply a partial update. Returns false when the update carried no fields.
    pub fn apply(&mut self, update: &ProductUpdate) -> bool {
        if update.is_empty() {
            return false;
        }
        if let Some(quantity) = update.quantity {
            self.quantity = quantity;
        }
        if let Some(price) = update.price_per_unit {
            self.price_per_unit = price;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
        true
    }

    pub fn is_orderable(&self) -> bool {
        self.status == ProductStatus::Active && self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub crop_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub price_per_unit: Decimal,
    pub state: String,
    pub city: String,
    pub pincode: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub quantity: Option<Decimal>,
    pub price_per_unit: Option<Decimal>,
    pub status: Option<ProductStatus>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.price_per_unit.is_none() && self.status.is_none()
    }
}

/// Public search filters. Text filters other than `crop_name` match exactly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub crop_name: Option<String>,
    pub pincode: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl ProductFilter {
    /// Whether an active product satisfies every supplied filter.
    pub fn matches(&self, product: &Product) -> bool {
        let crop_ok = self.crop_name.as_deref().map_or(true, |needle| {
            product.crop_name.to_lowercase().contains(&needle.to_lowercase())
        });
        let exact = |wanted: &Option<String>, actual: &str| wanted.as_deref().map_or(true, |w| w == actual);

        crop_ok
            && exact(&self.pincode, &product.pincode)
            && exact(&self.city, &product.city)
            && exact(&self.state, &product.state)
            && self.min_price.map_or(true, |min| product.price_per_unit >= min)
            && self.max_price.map_or(true, |max| product.price_per_unit <= max)
    }
}

/// What the catalog hands to the order lifecycle
#[derive(Debug, Clone, PartialEq)]
pub struct ProductListing {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub price_per_unit: Decimal,
    pub status: ProductStatus,
}
