//! Order status transition graph.
//!
//! ```text
//! pending   -> accepted | rejected
//! accepted  -> shipped
//! shipped   -> delivered
//! rejected, delivered: terminal
//! ```
//!
//! Self-transitions, skips and backward moves are all invalid.

use crate::models::OrderStatus;

/// Whether a farmer may move an order from `current` to `requested`.
pub fn is_valid_transition(current: OrderStatus, requested: OrderStatus) -> bool {
    matches!(
        (current, requested),
        (OrderStatus::Pending, OrderStatus::Accepted)
            | (OrderStatus::Pending, OrderStatus::Rejected)
            | (OrderStatus::Accepted, OrderStatus::Shipped)
            | (OrderStatus::Shipped, OrderStatus::Delivered)
    )
}

/// Every status reachable from `current` in one step, in declaration order.
pub fn valid_next_states(current: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|&requested| is_valid_transition(current, requested))
        .collect()
}

/// Validate a transition, describing the legal alternatives on denial.
pub fn check_transition(current: OrderStatus, requested: OrderStatus) -> Result<(), TransitionDenied> {
    if is_valid_transition(current, requested) {
        Ok(())
    } else {
        Err(TransitionDenied::new(current, requested))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status transition from {current} to {requested}")]
pub struct TransitionDenied {
    pub current: OrderStatus,
    pub requested: OrderStatus,
    pub valid_next: Vec<OrderStatus>,
}

impl TransitionDenied {
    pub fn new(current: OrderStatus, requested: OrderStatus) -> Self {
        Self {
            current,
            requested,
            valid_next: valid_next_states(current),
        }
    }
}
