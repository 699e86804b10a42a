// Per-turn stochastic inventory change

use crate::rng::SimRng;

const AMOUNT_EPSILON: f64 = 1e-4;

/// Probability that production adds stock this turn.
///
/// Falls to 0 as `amount` reaches `max_amount`.
pub fn increment_probability(amount: f64, max_amount: f64) -> f64 {
    ((max_amount - amount) / (amount + AMOUNT_EPSILON)).clamp(0.0, 1.0)
}

/// Probability that some stock spoils or is consumed this turn.
pub fn decrement_probability(amount: f64, max_amount: f64) -> f64 {
    let r = amount / max_amount;
    (0.25 + 0.5 * r / (1.0 + (1.0 - r).abs())).clamp(0.0, 1.0)
}

/// Net change in a good's stock for one turn, before clamping.
///
/// The increment is exponential around `prod_rate` and self-limits near
/// capacity; the decrement is a 5-25% fraction of current holdings. The
/// caller clamps the resulting amount to `[0, max_amount]`.
pub fn sample_good_delta(rng: &mut SimRng, prod_rate: f64, amount: f64, max_amount: f64) -> f64 {
    let mut increment = 0.0;
    if rng.chance(increment_probability(amount, max_amount)) {
        increment = if prod_rate <= 0.0 {
            0.0
        } else if prod_rate <= 1.0 {
            rng.exponential(prod_rate).round()
        } else {
            (rng.exponential(prod_rate + 1.0) - 1.0).round().max(0.0)
        };
    }

    let mut decrement = 0.0;
    if rng.chance(decrement_probability(amount, max_amount)) {
        let u1 = rng.uniform();
        let u2 = rng.uniform();
        decrement = (0.05 + 0.2 * u1 * u2) * amount;
    }

    increment - decrement
}
