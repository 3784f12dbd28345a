//! The program's bonding curve, reproduced for quoting swaps off-chain.

/// Steepness of the exponential curve.
const CURVE_K: f64 = 20.0;
/// The curve is integrated in this many equal steps.
const CURVE_STEPS: u128 = 10;
/// Token amounts are in base units of a 6-decimal mint.
pub const TOKEN_UNITS_PER_WHOLE: u128 = 1_000_000;

fn spot_price(amount: u128, initial_supply: u128, base_price: f64) -> f64 {
    let remaining_supply = initial_supply.saturating_sub(amount);
    let supply_ratio = remaining_supply as f64 / initial_supply as f64;
    base_price * (CURVE_K * (1.0 - supply_ratio)).exp()
}

/// Total price of `amount` base units, as the program computes it for both buys and sells.
///
/// The program integrates from a current supply of zero on every call, so the quote only depends
/// on `amount`, `available_tokens` and `base_price`.
pub fn quote(amount: u128, available_tokens: u128, base_price: f64) -> f64 {
    let amount_per_step = amount / CURVE_STEPS;
    (0..CURVE_STEPS)
        .map(|step| {
            let current_amount = step * amount_per_step;
            spot_price(current_amount, available_tokens, base_price)
                * (amount_per_step as f64 / TOKEN_UNITS_PER_WHOLE as f64)
        })
        .sum()
}
