//! Path capacity
//!
//! A path can carry no more than its tightest hop allows once every other
//! hop's capacity is translated into the same token.

use rust_decimal::Decimal;

use super::path_math::output_amount_swap;
use crate::pools::PoolArena;
use crate::types::{Path, SwapType};

/// Largest amount `path` can take (exact-in) or deliver (exact-out)
pub fn get_limit_amount_swap_for_path(arena: &PoolArena, path: &Path, swap_type: SwapType) -> Decimal {
    let hops: Vec<_> = match path
        .swaps
        .iter()
        .map(|s| arena.get(s.pool).map(|pool| (pool, &s.pair)))
        .collect::<Option<Vec<_>>>()
    {
        Some(hops) if !hops.is_empty() => hops,
        _ => return Decimal::ZERO,
    };

    match swap_type {
        SwapType::ExactIn => {
            let (last_pool, last_pair) = hops[hops.len() - 1];
            let mut limit = last_pool.limit_amount_swap(last_pair, SwapType::ExactIn);

            // Pull the running limit back through each earlier hop
            for &(pool, pair) in hops[..hops.len() - 1].iter().rev() {
                let limit_in = pool.limit_amount_swap(pair, SwapType::ExactIn);
                let limit_out = pool.limit_amount_swap(pair, SwapType::ExactOut);
                limit = if limit_out <= limit {
                    limit_in
                } else {
                    let pulled = output_amount_swap(pool, pair, SwapType::ExactOut, limit);
                    pulled.min(limit_in)
                };
            }
            limit
        }
        SwapType::ExactOut => {
            let (first_pool, first_pair) = hops[0];
            let mut limit = first_pool.limit_amount_swap(first_pair, SwapType::ExactOut);

            // Push the running limit forward through each later hop
            for &(pool, pair) in &hops[1..] {
                let limit_in = pool.limit_amount_swap(pair, SwapType::ExactIn);
                let limit_out = pool.limit_amount_swap(pair, SwapType::ExactOut);
                limit = if limit_in <= limit {
                    limit_out
                } else {
                    let pushed = output_amount_swap(pool, pair, SwapType::ExactIn, limit);
                    pushed.min(limit_out)
                };
            }
            limit
        }
    }
}

/// Attach limits, sort by limit descending (stable) and return the limit sum
pub fn calculate_path_limits(
    arena: &PoolArena,
    paths: Vec<Path>,
    swap_type: SwapType,
) -> (Vec<Path>, Decimal) {
    let mut paths = paths;
    let mut total = Decimal::ZERO;

    for path in paths.iter_mut() {
        path.limit_amount = get_limit_amount_swap_for_path(arena, path, swap_type);
        total = total.saturating_add(path.limit_amount);
        tracing::trace!("Path {} limit {}", path.id, path.limit_amount);
    }

    paths.sort_by(|a, b| b.limit_amount.cmp(&a.limit_amount));
    (paths, total)
}
