pub mod models;
pub mod transitions;
pub mod repository;
pub mod manager;

pub use models::{DeliveryMode, Order, OrderItem, OrderStatus, PlaceOrder};
pub use manager::{OrderError, OrderManager};
pub use repository::{OrderRepository, OrderScope};
pub use transitions::{is_valid_transition, valid_next_states, TransitionDenied};
