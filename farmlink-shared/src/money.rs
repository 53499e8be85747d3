use rust_decimal::{Decimal, RoundingStrategy};

/// Minor-unit precision of every persisted amount (paise/cents).
pub const CURRENCY_SCALE: u32 = 2;

/// Round to the currency minor unit and pin the scale so `150` renders as `150.00`.
pub fn round_currency(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}

/// `quantity × unit_price` in currency units. `None` on decimal overflow.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Option<Decimal> {
    quantity.checked_mul(unit_price).map(round_currency)
}

/// Whether `amount` is representable in the minor unit without rounding.
///
/// Trailing zeros do not count, so `1.500` fits while `1.254` does not.
pub fn fits_currency_scale(amount: Decimal) -> bool {
    amount.normalize().scale() <= CURRENCY_SCALE
}
