use rust_decimal::Decimal;

/// Price of `seats` seats at `unit_price`, rounded to cents.
///
/// Computed once when a booking is created; the stored value is never
/// recomputed afterwards.
pub fn total_price(unit_price: Decimal, seats: u32) -> Result<Decimal, PricingError> {
    if unit_price.is_sign_negative() && !unit_price.is_zero() {
        return Err(PricingError::NegativePrice(unit_price));
    }
    if seats == 0 {
        return Err(PricingError::NoSeats);
    }

    unit_price
        .checked_mul(Decimal::from(seats))
        .map(|total| total.round_dp(2))
        .ok_or(PricingError::Overflow)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("Unit price cannot be negative: {0}")]
    NegativePrice(Decimal),
    #[error("Cannot price a booking without seats")]
    NoSeats,
    #[error("Price calculation overflowed")]
    Overflow,
}
