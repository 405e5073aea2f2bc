//! Fixed-point scaling helpers

use rust_decimal::Decimal;

/// 10^exp as a `Decimal`. On-chain health factors arrive as integer
/// words with a known decimal count and get divided down by this.
pub fn pow10(exp: u32) -> Decimal {
    let mut value = Decimal::ONE;
    for _ in 0..exp {
        value *= Decimal::TEN;
    }
    value
}
