pub mod money;
pub mod pii;

pub use money::{fits_currency_scale, line_total, round_currency, CURRENCY_SCALE};
pub use pii::Masked;
