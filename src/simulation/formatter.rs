//! Execution of an allocation against a pool snapshot
//!
//! Paths run one after another on the same arena, so pools shared by
//! several paths see the balance changes of earlier paths.

use rust_decimal::Decimal;

use super::path_math::{output_amount_swap, spot_price_after_swap_for_path};
use crate::error::{Result, RouterError};
use crate::pools::math::round_down;
use crate::pools::PoolArena;
use crate::types::{HopSwap, Path, SwapType};

/// Executed allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedSwaps {
    /// Executed hops per path, in path order
    pub paths: Vec<Vec<HopSwap>>,
    /// Sum of the path amounts after rounding, equal to the request
    pub swap_amount: Decimal,
    /// Total output (exact-in) or total input (exact-out)
    pub return_amount: Decimal,
    /// Zero-amount spot price of the largest path after execution
    pub market_sp: Decimal,
}

/// Decimals of the token the path amount is denominated in
pub(crate) fn amount_decimals(path: &Path, swap_type: SwapType) -> Option<u32> {
    match swap_type {
        SwapType::ExactIn => path.swaps.first().map(|s| s.pair.decimals_in),
        SwapType::ExactOut => path.swaps.last().map(|s| s.pair.decimals_out),
    }
}

/// Round amounts toward zero at token precision; the remainder goes to the first path
fn rounded_amounts(paths: &[Path], swap_type: SwapType) -> Vec<Decimal> {
    let total: Decimal = paths.iter().map(|p| p.swap_amount).sum();
    let mut amounts: Vec<Decimal> = paths
        .iter()
        .map(|p| match amount_decimals(p, swap_type) {
            Some(decimals) => round_down(p.swap_amount, decimals),
            None => p.swap_amount,
        })
        .collect();

    let assigned: Decimal = amounts.iter().copied().sum();
    if let Some(first) = amounts.first_mut() {
        *first += total - assigned;
    }
    amounts
}

/// Swap `amount` through `path`, updating pool balances in `arena`
fn execute_path(
    arena: &mut PoolArena,
    path: &Path,
    swap_type: SwapType,
    amount: Decimal,
) -> Result<(Vec<HopSwap>, Decimal)> {
    let mut hops: Vec<HopSwap> = Vec::with_capacity(path.swaps.len());

    match swap_type {
        SwapType::ExactIn => {
            let mut amount_in = amount;
            for segment in &path.swaps {
                let pool = arena
                    .get_mut(segment.pool)
                    .ok_or_else(|| RouterError::UnknownPool(segment.pool_id.clone()))?;
                let pair = pool.parse_pool_pair_data(&segment.token_in, &segment.token_out)?;
                let amount_out = output_amount_swap(pool, &pair, swap_type, amount_in);

                pool.update_token_balance(&pair.token_in, pair.balance_in + amount_in)?;
                pool.update_token_balance(&pair.token_out, pair.balance_out - amount_out)?;

                hops.push(HopSwap {
                    pool_id: segment.pool_id.clone(),
                    token_in: pair.token_in,
                    token_out: pair.token_out,
                    swap_amount: amount_in,
                    return_amount: amount_out,
                });
                amount_in = amount_out;
            }
            Ok((hops, amount_in))
        }
        SwapType::ExactOut => {
            let mut amount_out = amount;
            for segment in path.swaps.iter().rev() {
                let pool = arena
                    .get_mut(segment.pool)
                    .ok_or_else(|| RouterError::UnknownPool(segment.pool_id.clone()))?;
                let pair = pool.parse_pool_pair_data(&segment.token_in, &segment.token_out)?;
                let amount_in = output_amount_swap(pool, &pair, swap_type, amount_out);
                if amount_in == Decimal::MAX {
                    return Err(RouterError::InsufficientBalance(segment.pool_id.clone()));
                }

                pool.update_token_balance(&pair.token_in, pair.balance_in + amount_in)?;
                pool.update_token_balance(&pair.token_out, pair.balance_out - amount_out)?;

                hops.push(HopSwap {
                    pool_id: segment.pool_id.clone(),
                    token_in: pair.token_in,
                    token_out: pair.token_out,
                    swap_amount: amount_in,
                    return_amount: amount_out,
                });
                amount_out = amount_in;
            }
            hops.reverse();
            Ok((hops, amount_out))
        }
    }
}

/// Copy of `path` with pair data re-read from the current pool state
fn refreshed(arena: &PoolArena, path: &Path) -> Result<Path> {
    let mut path = path.clone();
    for segment in path.swaps.iter_mut() {
        let pool = arena
            .get(segment.pool)
            .ok_or_else(|| RouterError::UnknownPool(segment.pool_id.clone()))?;
        segment.pair = pool.parse_pool_pair_data(&segment.token_in, &segment.token_out)?;
    }
    Ok(path)
}

/// Execute allocated `paths` on `arena` (a snapshot the caller may discard)
pub fn format_swaps(arena: &mut PoolArena, paths: &[Path], swap_type: SwapType) -> Result<FormattedSwaps> {
    let amounts = rounded_amounts(paths, swap_type);

    let mut executed = Vec::with_capacity(paths.len());
    let mut return_amount = Decimal::ZERO;
    for (path, amount) in paths.iter().zip(amounts.iter()) {
        let (hops, result) = execute_path(arena, path, swap_type, *amount)?;
        tracing::trace!("Executed {} with {} -> {}", path.id, amount, result);
        return_amount += result;
        executed.push(hops);
    }

    let largest = paths
        .iter()
        .zip(amounts.iter())
        .fold(None, |best: Option<(&Path, Decimal)>, (path, amount)| match best {
            Some((_, a)) if a >= *amount => best,
            _ => Some((path, *amount)),
        });
    let market_sp = match largest {
        Some((path, _)) => {
            let path = refreshed(arena, path)?;
            spot_price_after_swap_for_path(arena, &path, swap_type, Decimal::ZERO).unwrap_or_else(|e| {
                tracing::warn!("Market spot price unavailable for {}: {}", path.id, e);
                Decimal::ZERO
            })
        }
        None => Decimal::ZERO,
    };

    Ok(FormattedSwaps {
        paths: executed,
        swap_amount: amounts.iter().copied().sum(),
        return_amount,
        market_sp,
    })
}
