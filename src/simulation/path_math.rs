//! Path-level pricing
//!
//! Composes per-pool pricing along a path:
//! - Amount propagation hop by hop (forward for exact-in, backward for exact-out)
//! - Spot price after swap and its first derivative with respect to the amount
//! - Effective price used to rank paths during allocation
//!
//! Pool failures are localized: an exact-in hop that cannot be priced yields
//! zero output, an exact-out hop yields `Decimal::MAX` as input.

use rust_decimal::Decimal;

use crate::config::thresholds::INFINITESIMAL;
use crate::error::{Result, RouterError};
use crate::pools::{Pool, PoolArena, PoolPairData};
use crate::types::{Path, PathSegment, SwapType};

fn segment_pool<'a>(arena: &'a PoolArena, segment: &PathSegment) -> Result<&'a dyn Pool> {
    arena
        .get(segment.pool)
        .ok_or_else(|| RouterError::UnknownPool(segment.pool_id.clone()))
}

/// Result of a single pool swap; never fails
pub fn output_amount_swap(
    pool: &dyn Pool,
    pair: &PoolPairData,
    swap_type: SwapType,
    amount: Decimal,
) -> Decimal {
    match swap_type {
        SwapType::ExactIn => {
            if pair.balance_in.is_zero() || amount.is_zero() {
                return Decimal::ZERO;
            }
            pool.exact_token_in_for_token_out(pair, amount)
                .unwrap_or_else(|e| {
                    tracing::trace!("Pool {} exact-in failed: {}", pair.pool_id, e);
                    Decimal::ZERO
                })
        }
        SwapType::ExactOut => {
            if amount.is_zero() {
                return Decimal::ZERO;
            }
            if amount >= pair.balance_out {
                return Decimal::MAX;
            }
            pool.token_in_for_exact_token_out(pair, amount)
                .unwrap_or_else(|e| {
                    tracing::trace!("Pool {} exact-out failed: {}", pair.pool_id, e);
                    Decimal::MAX
                })
        }
    }
}

/// Amounts at every token of the path: `amounts[i]` enters hop `i`, `amounts[i + 1]` leaves it
pub fn amounts_along_path(
    arena: &PoolArena,
    path: &Path,
    swap_type: SwapType,
    amount: Decimal,
) -> Vec<Decimal> {
    let hops = path.swaps.len();
    let mut amounts = vec![Decimal::ZERO; hops + 1];

    match swap_type {
        SwapType::ExactIn => {
            amounts[0] = amount;
            for (i, segment) in path.swaps.iter().enumerate() {
                amounts[i + 1] = match segment_pool(arena, segment) {
                    Ok(pool) => output_amount_swap(pool, &segment.pair, swap_type, amounts[i]),
                    Err(_) => Decimal::ZERO,
                };
            }
        }
        SwapType::ExactOut => {
            amounts[hops] = amount;
            for (i, segment) in path.swaps.iter().enumerate().rev() {
                amounts[i] = if amounts[i + 1] == Decimal::MAX {
                    Decimal::MAX
                } else {
                    match segment_pool(arena, segment) {
                        Ok(pool) => {
                            output_amount_swap(pool, &segment.pair, swap_type, amounts[i + 1])
                        }
                        Err(_) => Decimal::MAX,
                    }
                };
            }
        }
    }

    amounts
}

/// Final output (exact-in) or required input (exact-out) of a path
pub fn output_amount_swap_for_path(
    arena: &PoolArena,
    path: &Path,
    swap_type: SwapType,
    amount: Decimal,
) -> Decimal {
    let amounts = amounts_along_path(arena, path, swap_type, amount);
    match swap_type {
        SwapType::ExactIn => amounts.last().copied().unwrap_or(Decimal::ZERO),
        SwapType::ExactOut => amounts.first().copied().unwrap_or(Decimal::MAX),
    }
}

/// Per-hop spot prices after swapping `amount` through the path
fn hop_spot_prices(
    arena: &PoolArena,
    path: &Path,
    swap_type: SwapType,
    amounts: &[Decimal],
) -> Result<Vec<Decimal>> {
    path.swaps
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let pool = segment_pool(arena, segment)?;
            match swap_type {
                SwapType::ExactIn => pool
                    .spot_price_after_swap_exact_token_in_for_token_out(&segment.pair, amounts[i]),
                SwapType::ExactOut => pool.spot_price_after_swap_token_in_for_exact_token_out(
                    &segment.pair,
                    amounts[i + 1],
                ),
            }
        })
        .collect()
}

fn hop_spot_price_derivatives(
    arena: &PoolArena,
    path: &Path,
    swap_type: SwapType,
    amounts: &[Decimal],
) -> Result<Vec<Decimal>> {
    path.swaps
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            let pool = segment_pool(arena, segment)?;
            match swap_type {
                SwapType::ExactIn => pool
                    .derivative_spot_price_after_swap_exact_token_in_for_token_out(
                        &segment.pair,
                        amounts[i],
                    ),
                SwapType::ExactOut => pool
                    .derivative_spot_price_after_swap_token_in_for_exact_token_out(
                        &segment.pair,
                        amounts[i + 1],
                    ),
            }
        })
        .collect()
}

fn product(values: &[Decimal]) -> Result<Decimal> {
    values.iter().try_fold(Decimal::ONE, |acc, v| {
        acc.checked_mul(*v).ok_or(RouterError::Overflow("path price product"))
    })
}

/// Spot price of the whole path (token in per token out) after swapping `amount`
pub fn spot_price_after_swap_for_path(
    arena: &PoolArena,
    path: &Path,
    swap_type: SwapType,
    amount: Decimal,
) -> Result<Decimal> {
    let amounts = amounts_along_path(arena, path, swap_type, amount);
    let prices = hop_spot_prices(arena, path, swap_type, &amounts)?;
    product(&prices)
}

/// Derivative of the path spot price with respect to `amount`
pub fn derivative_spot_price_after_swap_for_path(
    arena: &PoolArena,
    path: &Path,
    swap_type: SwapType,
    amount: Decimal,
) -> Result<Decimal> {
    let amounts = amounts_along_path(arena, path, swap_type, amount);
    let prices = hop_spot_prices(arena, path, swap_type, &amounts)?;
    let derivatives = hop_spot_price_derivatives(arena, path, swap_type, &amounts)?;

    let overflow = || RouterError::Overflow("path price derivative");
    let mut total = Decimal::ZERO;
    for (i, derivative) in derivatives.iter().enumerate() {
        let after = product(&prices[i + 1..])?;
        let term = match swap_type {
            // d(a_i)/d(a) = 1 / prod(SP_j, j < i)
            SwapType::ExactIn => derivative.checked_mul(after).ok_or_else(overflow)?,
            // d(b_i)/d(b) = prod(SP_j, j > i)
            SwapType::ExactOut => {
                let before = product(&prices[..i])?;
                let after_sq = after.checked_mul(after).ok_or_else(overflow)?;
                derivative
                    .checked_mul(before)
                    .and_then(|v| v.checked_mul(after_sq))
                    .ok_or_else(overflow)?
            }
        };
        total = total.checked_add(term).ok_or_else(overflow)?;
    }
    Ok(total)
}

/// Average price paid for `amount`, or the spot price for infinitesimal amounts
pub fn effective_price_for_path(
    arena: &PoolArena,
    path: &Path,
    swap_type: SwapType,
    amount: Decimal,
) -> Decimal {
    if amount < INFINITESIMAL {
        return spot_price_after_swap_for_path(arena, path, swap_type, Decimal::ZERO)
            .unwrap_or(Decimal::MAX);
    }

    let result = output_amount_swap_for_path(arena, path, swap_type, amount);
    let price = match swap_type {
        SwapType::ExactIn => amount.checked_div(result),
        SwapType::ExactOut if result == Decimal::MAX => None,
        SwapType::ExactOut => result.checked_div(amount),
    };
    price.unwrap_or(Decimal::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{path_through, weighted_arena};
    use rust_decimal_macros::dec;

    const CHAIN: [(&str, &str, &str, Decimal, Decimal); 4] = [
        ("p0", "t0", "t1", dec!(1000), dec!(2000)),
        ("p1", "t1", "t2", dec!(3000), dec!(1500)),
        ("p2", "t2", "t3", dec!(800), dec!(1200)),
        ("p3", "t3", "t4", dec!(5000), dec!(4000)),
    ];

    fn chain(hops: usize) -> (PoolArena, Path) {
        let arena = weighted_arena(&CHAIN[..hops]);
        let route: Vec<_> = CHAIN[..hops].iter().map(|(id, a, b, _, _)| (*id, *a, *b)).collect();
        let path = path_through(&arena, &route);
        (arena, path)
    }

    fn assert_close(actual: Decimal, expected: Decimal, rel_tol: Decimal) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= rel_tol * expected.abs(),
            "Expected {} to be within {} of {}",
            actual,
            rel_tol,
            expected
        );
    }

    #[test]
    fn test_spot_price_matches_finite_difference_exact_in() {
        let a = dec!(10);
        let h = dec!(0.001);
        for hops in 1..=4 {
            let (arena, path) = chain(hops);
            let up = output_amount_swap_for_path(&arena, &path, SwapType::ExactIn, a + h);
            let down = output_amount_swap_for_path(&arena, &path, SwapType::ExactIn, a - h);
            // Output per input is the inverse of the spot price
            let numeric = (dec!(2) * h) / (up - down);
            let sp = spot_price_after_swap_for_path(&arena, &path, SwapType::ExactIn, a).unwrap();
            assert_close(sp, numeric, dec!(0.00001));
        }
    }

    #[test]
    fn test_spot_price_matches_finite_difference_exact_out() {
        let b = dec!(5);
        let h = dec!(0.001);
        for hops in 1..=4 {
            let (arena, path) = chain(hops);
            let up = output_amount_swap_for_path(&arena, &path, SwapType::ExactOut, b + h);
            let down = output_amount_swap_for_path(&arena, &path, SwapType::ExactOut, b - h);
            let numeric = (up - down) / (dec!(2) * h);
            let sp = spot_price_after_swap_for_path(&arena, &path, SwapType::ExactOut, b).unwrap();
            assert_close(sp, numeric, dec!(0.00001));
        }
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let amount = dec!(10);
        let h = dec!(0.01);
        for swap_type in [SwapType::ExactIn, SwapType::ExactOut] {
            for hops in 1..=4 {
                let (arena, path) = chain(hops);
                let up = spot_price_after_swap_for_path(&arena, &path, swap_type, amount + h).unwrap();
                let down =
                    spot_price_after_swap_for_path(&arena, &path, swap_type, amount - h).unwrap();
                let numeric = (up - down) / (dec!(2) * h);
                let analytic =
                    derivative_spot_price_after_swap_for_path(&arena, &path, swap_type, amount)
                        .unwrap();
                assert_close(analytic, numeric, dec!(0.0001));
            }
        }
    }

    #[test]
    fn test_exact_out_beyond_balance_is_sentinel() {
        let (arena, path) = chain(1);
        let input = output_amount_swap_for_path(&arena, &path, SwapType::ExactOut, dec!(2000));
        assert_eq!(input, Decimal::MAX);
        assert_eq!(
            effective_price_for_path(&arena, &path, SwapType::ExactOut, dec!(2000)),
            Decimal::MAX
        );
    }

    #[test]
    fn test_effective_price_of_tiny_amount_is_spot_price() {
        let (arena, path) = chain(2);
        let sp = spot_price_after_swap_for_path(&arena, &path, SwapType::ExactIn, Decimal::ZERO)
            .unwrap();
        assert_eq!(
            effective_price_for_path(&arena, &path, SwapType::ExactIn, Decimal::ZERO),
            sp
        );

        // Slippage makes the average price worse than the marginal one at zero
        let effective = effective_price_for_path(&arena, &path, SwapType::ExactIn, dec!(50));
        assert!(effective > sp);
    }
}
