use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Rejected,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Accepted,
        OrderStatus::Rejected,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
        }
    }

    pub fn is_terminal(&self) -> bool {
        crate::transitions::valid_next_states(*self).is_empty()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Pickup,
    Courier,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Pickup => "pickup",
            DeliveryMode::Courier => "courier",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pickup" => Ok(DeliveryMode::Pickup),
            "courier" => Ok(DeliveryMode::Courier),
            other => Err(format!("unknown delivery mode '{}'", other)),
        }
    }
}

/// A buyer's purchase from one farmer.
///
/// `total_amount` is fixed at creation; only `status` and `updated_at` change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub farmer_id: Uuid,
    pub status: OrderStatus,
    pub delivery_mode: DeliveryMode,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    pub fn new(buyer_id: Uuid, farmer_id: Uuid, delivery_mode: DeliveryMode, total_amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            buyer_id,
            farmer_id,
            status: OrderStatus::Pending,
            delivery_mode,
            total_amount,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        }
    }

    pub fn add_item(&mut self, item: OrderItem) {
        self.items.push(item);
    }
}

/// A single product line with the unit price captured at order time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn new(order_id: Uuid, product_id: Uuid, quantity: Decimal, price_per_unit: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_id,
            quantity,
            price_per_unit,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A buyer's request to order one product
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrder {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub delivery_mode: DeliveryMode,
}
