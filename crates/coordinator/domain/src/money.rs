//! Fixed-point monetary conventions.
//!
//! Every monetary field in the settlement core is a [`Decimal`] with at most
//! two decimal digits. Amounts are validated at the request boundary and
//! re-checked before each balance mutation.

use rust_decimal::Decimal;

/// Maximum number of decimal digits a monetary amount may carry.
pub const MONEY_DP: u32 = 2;

/// Returns `true` if `amount` is non-negative with at most 2 decimal digits.
pub fn is_amount(amount: Decimal) -> bool {
    !amount.is_sign_negative() && amount.normalize().scale() <= MONEY_DP
}

/// Returns `true` if `amount` is strictly positive with at most 2 decimal
/// digits.
pub fn is_positive_amount(amount: Decimal) -> bool {
    amount > Decimal::ZERO && amount.normalize().scale() <= MONEY_DP
}
