//! Multi-path amount allocation
//!
//! Splits a requested amount across candidate paths so that marginal
//! prices equalize:
//! - Grows the number of paths one at a time while the net result improves
//! - For each path count, greedily matches amounts to the cheapest paths
//! - Newton steps move amounts toward the derivative-weighted average spot price
//! - Amounts are clamped to `[0, limit]` and the surplus is redistributed
//!
//! The net result subtracts (exact-in) or adds (exact-out) a fixed cost per hop.

use rust_decimal::Decimal;
use std::collections::HashSet;

use super::formatter::amount_decimals;
use super::path_math::{
    derivative_spot_price_after_swap_for_path, effective_price_for_path,
    output_amount_swap_for_path, spot_price_after_swap_for_path,
};
use crate::config::thresholds::{MAX_ITERATIONS, MAX_REDISTRIBUTION_ROUNDS, PRICE_ERROR_TOLERANCE};
use crate::pools::math::round_down;
use crate::pools::PoolArena;
use crate::types::{Path, SwapType};

/// Precision used when the amount token's decimals are unknown
const DEFAULT_AMOUNT_DECIMALS: u32 = 18;

/// Allocation chosen for one request
#[derive(Debug, Clone)]
pub struct SwapAllocation {
    /// Selected paths with `swap_amount` set; amounts sum to the request
    pub paths: Vec<Path>,
    /// Total output (exact-in) or total input (exact-out)
    pub total_return: Decimal,
    /// `total_return` net of the per-hop cost
    pub total_return_considering_fees: Decimal,
}

impl SwapAllocation {
    pub fn empty() -> Self {
        Self {
            paths: Vec::new(),
            total_return: Decimal::ZERO,
            total_return_considering_fees: Decimal::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Amounts after the Newton loop, before settling to the request
struct Converged<'p> {
    selected: Vec<&'p Path>,
    amounts: Vec<Decimal>,
}

/// Settled amounts for a fixed number of paths
struct Iteration<'p> {
    selected: Vec<&'p Path>,
    amounts: Vec<Decimal>,
    total_return: Decimal,
}

/// Splits swap amounts across candidate paths
#[derive(Debug, Clone)]
pub struct SwapAllocator {
    max_pools: usize,
    cost_per_hop: Decimal,
}

impl SwapAllocator {
    pub fn new(max_pools: usize, cost_per_hop: Decimal) -> Self {
        Self {
            max_pools: max_pools.max(1),
            cost_per_hop,
        }
    }

    /// Allocate `total` across `paths`, which must carry their limits.
    ///
    /// Returns an empty allocation when the best `max_pools` paths together
    /// cannot absorb `total`.
    pub fn allocate(
        &self,
        arena: &PoolArena,
        paths: &[Path],
        swap_type: SwapType,
        total: Decimal,
    ) -> SwapAllocation {
        if paths.is_empty() || total <= Decimal::ZERO {
            return SwapAllocation::empty();
        }

        let mut candidates: Vec<&Path> = paths.iter().collect();
        candidates.sort_by(|a, b| b.limit_amount.cmp(&a.limit_amount));

        let highest_limits: Vec<Decimal> = candidates
            .iter()
            .take(self.max_pools)
            .map(|p| p.limit_amount)
            .collect();

        // Smallest prefix of paths whose limits cover the request
        let mut covering_sum = Decimal::ZERO;
        let mut initial_paths = None;
        for (i, limit) in highest_limits.iter().enumerate() {
            covering_sum = covering_sum.saturating_add(*limit);
            if covering_sum >= total {
                initial_paths = Some(i + 1);
                break;
            }
        }
        let Some(initial_paths) = initial_paths else {
            tracing::debug!(
                "Insufficient liquidity: {} requested, {} available on {} paths",
                total,
                covering_sum,
                highest_limits.len()
            );
            return SwapAllocation::empty();
        };

        let mut amounts = initial_amounts(&highest_limits[..initial_paths], covering_sum, total);
        let decimals = candidates
            .first()
            .and_then(|p| amount_decimals(p, swap_type))
            .unwrap_or(DEFAULT_AMOUNT_DECIMALS);

        let max_paths = candidates.len().min(self.max_pools);
        let mut best: Option<(Decimal, Iteration<'_>)> = None;

        for b in initial_paths..=max_paths {
            if b != initial_paths {
                // Seed the new path and shrink the others proportionally
                let new_amount = (total / Decimal::from(b)).min(highest_limits[b - 1]);
                let scale = Decimal::ONE - new_amount / total;
                for amount in amounts.iter_mut() {
                    *amount *= scale;
                }
                amounts.push(new_amount);
            }

            let converged = self.iterate_swap_amounts(arena, &candidates, swap_type, amounts.clone());
            if converged.selected.is_empty() {
                break;
            }
            let Some(settled) = settle_amounts(&converged.selected, &converged.amounts, total, decimals) else {
                tracing::trace!("{} paths cannot carry {} within their limits", b, total);
                amounts = converged.amounts;
                continue;
            };
            amounts = settled.clone();

            let iteration = Iteration {
                total_return: total_return(arena, &converged.selected, swap_type, &settled),
                selected: converged.selected,
                amounts: settled,
            };

            let hops: usize = iteration
                .selected
                .iter()
                .zip(iteration.amounts.iter())
                .filter(|(_, amount)| **amount > Decimal::ZERO)
                .map(|(path, _)| path.hop_count())
                .sum();
            let cost = self.cost_per_hop.saturating_mul(Decimal::from(hops));
            let net = match swap_type {
                SwapType::ExactIn => iteration.total_return.saturating_sub(cost),
                SwapType::ExactOut => iteration.total_return.saturating_add(cost),
            };

            tracing::trace!(
                "{} paths: return {} ({} net of {} hops)",
                b,
                iteration.total_return,
                net,
                hops
            );

            let improved = match (&best, swap_type) {
                (_, SwapType::ExactOut) if iteration.total_return == Decimal::MAX => false,
                (None, _) => true,
                (Some((best_net, _)), SwapType::ExactIn) => net > *best_net,
                (Some((best_net, _)), SwapType::ExactOut) => net < *best_net,
            };
            if !improved {
                break;
            }
            best = Some((net, iteration));
        }

        let Some((net, best)) = best else {
            return SwapAllocation::empty();
        };

        let paths = finalize_amounts(best.selected, best.amounts);
        tracing::debug!(
            "Allocated {} {} across {} paths, return {}",
            total,
            swap_type,
            paths.len(),
            best.total_return
        );

        SwapAllocation {
            paths,
            total_return: best.total_return,
            total_return_considering_fees: net,
        }
    }

    /// Converge amounts for a fixed number of paths
    fn iterate_swap_amounts<'p>(
        &self,
        arena: &PoolArena,
        candidates: &[&'p Path],
        swap_type: SwapType,
        initial: Vec<Decimal>,
    ) -> Converged<'p> {
        let mut amounts = initial;
        let mut selected: Vec<&'p Path> = Vec::new();
        let mut history: HashSet<Vec<String>> = HashSet::new();
        let mut current_ids: Option<Vec<String>> = None;

        for iteration in 0..MAX_ITERATIONS {
            let mut sorted = amounts.clone();
            sorted.sort_by(|a, b| b.cmp(a));

            let (picked, mut exceeding) = best_paths_for_amounts(arena, candidates, swap_type, &sorted);
            if picked.is_empty() {
                break;
            }

            let mut ids: Vec<String> = picked.iter().map(|p| p.id.clone()).collect();
            ids.sort();
            if current_ids.as_ref() != Some(&ids) {
                if !history.insert(ids.clone()) {
                    tracing::trace!("Path selection cycled after {} iterations", iteration);
                    break;
                }
                current_ids = Some(ids);
            }

            selected = picked;
            amounts = sorted;

            let error = price_error(arena, &selected, swap_type, &amounts, &exceeding);
            if error <= PRICE_ERROR_TOLERANCE {
                break;
            }

            let derivatives = newton_step(arena, &selected, swap_type, &mut amounts, &mut exceeding);
            redistribute(&mut amounts, &mut exceeding, &derivatives);
        }

        Converged { selected, amounts }
    }
}

/// Summed output (exact-in) or input (exact-out) of `amounts` on `paths`
fn total_return(arena: &PoolArena, paths: &[&Path], swap_type: SwapType, amounts: &[Decimal]) -> Decimal {
    paths
        .iter()
        .zip(amounts.iter())
        .filter(|(_, amount)| **amount > Decimal::ZERO)
        .fold(Decimal::ZERO, |acc, (path, amount)| {
            acc.saturating_add(output_amount_swap_for_path(arena, path, swap_type, *amount))
        })
}

/// Split `total` proportionally to the covering limits; the last share absorbs rounding
fn initial_amounts(limits: &[Decimal], limit_sum: Decimal, total: Decimal) -> Vec<Decimal> {
    let mut amounts: Vec<Decimal> = Vec::with_capacity(limits.len());
    let mut assigned = Decimal::ZERO;
    for (i, limit) in limits.iter().enumerate() {
        let amount = if i + 1 == limits.len() {
            total - assigned
        } else {
            (*limit * total).checked_div(limit_sum).unwrap_or(Decimal::ZERO)
        };
        assigned += amount;
        amounts.push(amount);
    }
    amounts
}

/// Greedily match descending `amounts` to the cheapest unused path able to carry them.
///
/// Returns the picked paths and `amount - limit` per pick.
fn best_paths_for_amounts<'p>(
    arena: &PoolArena,
    candidates: &[&'p Path],
    swap_type: SwapType,
    amounts: &[Decimal],
) -> (Vec<&'p Path>, Vec<Decimal>) {
    let mut remaining: Vec<&'p Path> = candidates.to_vec();
    let mut picked = Vec::with_capacity(amounts.len());
    let mut exceeding = Vec::with_capacity(amounts.len());

    for amount in amounts {
        if remaining.is_empty() {
            return (Vec::new(), Vec::new());
        }

        // Ranked by (maxed out, effective price): a maxed-out path is picked
        // only when nothing with spare capacity fits
        let mut best_rank = (true, Decimal::MAX);
        let mut best_index = None;
        for (j, path) in remaining.iter().enumerate() {
            if path.limit_amount < *amount {
                continue;
            }
            let rank = (
                path.limit_amount == *amount,
                effective_price_for_path(arena, path, swap_type, *amount),
            );
            if rank <= best_rank {
                best_rank = rank;
                best_index = Some(j);
            }
        }

        // No path fits: take the widest remaining one and let clamping resolve it
        let index = best_index.unwrap_or_else(|| {
            remaining
                .iter()
                .enumerate()
                .fold((0, Decimal::MIN), |(bi, bl), (j, p)| {
                    if p.limit_amount > bl {
                        (j, p.limit_amount)
                    } else {
                        (bi, bl)
                    }
                })
                .0
        });

        let path = remaining.remove(index);
        exceeding.push(*amount - path.limit_amount);
        picked.push(path);
    }

    (picked, exceeding)
}

fn is_viable(amount: Decimal, exceeding: Decimal) -> bool {
    amount > Decimal::ZERO && exceeding < Decimal::ZERO
}

/// Move viable amounts toward the derivative-weighted average spot price.
///
/// Returns the price derivative per path, `None` where it is unusable.
fn newton_step(
    arena: &PoolArena,
    paths: &[&Path],
    swap_type: SwapType,
    amounts: &mut [Decimal],
    exceeding: &mut [Decimal],
) -> Vec<Option<Decimal>> {
    let mut prices: Vec<Option<(Decimal, Decimal)>> = Vec::with_capacity(paths.len());
    let mut sum_inverse = Decimal::ZERO;
    let mut sum_weighted = Decimal::ZERO;

    for (i, path) in paths.iter().enumerate() {
        if !is_viable(amounts[i], exceeding[i]) {
            prices.push(None);
            continue;
        }
        let sp = spot_price_after_swap_for_path(arena, path, swap_type, amounts[i]).ok();
        let dsp = derivative_spot_price_after_swap_for_path(arena, path, swap_type, amounts[i]).ok();
        let terms = match (sp, dsp) {
            (Some(sp), Some(dsp)) if dsp > Decimal::ZERO => Decimal::ONE
                .checked_div(dsp)
                .zip(sp.checked_div(dsp))
                .and_then(|(inverse, weighted)| {
                    Some((
                        sum_inverse.checked_add(inverse)?,
                        sum_weighted.checked_add(weighted)?,
                    ))
                }),
            _ => None,
        };
        match terms {
            Some((inverse, weighted)) => {
                sum_inverse = inverse;
                sum_weighted = weighted;
                prices.push(sp.zip(dsp));
            }
            None => prices.push(None),
        }
    }

    let derivatives: Vec<Option<Decimal>> = prices.iter().map(|p| p.map(|(_, d)| d)).collect();
    let Some(target) = sum_weighted.checked_div(sum_inverse) else {
        return derivatives;
    };

    for (i, price) in prices.iter().enumerate() {
        if let Some((sp, dsp)) = price {
            if let Some(delta) = (target - *sp).checked_div(*dsp) {
                amounts[i] += delta;
                exceeding[i] += delta;
            }
        }
    }

    derivatives
}

/// Clamp amounts to `[0, limit]` and spread the difference over the viable paths
fn redistribute(amounts: &mut [Decimal], exceeding: &mut [Decimal], derivatives: &[Option<Decimal>]) {
    for _ in 0..MAX_REDISTRIBUTION_ROUNDS {
        let below_zero = amounts.iter().any(|a| *a < Decimal::ZERO);
        let above_limit = exceeding.iter().any(|e| *e > Decimal::ZERO);
        if !below_zero && !above_limit {
            return;
        }

        let mut delta_total = Decimal::ZERO;
        let mut sum_inverse = Decimal::ZERO;
        for i in 0..amounts.len() {
            if amounts[i] <= Decimal::ZERO {
                delta_total += amounts[i];
                exceeding[i] -= amounts[i];
                amounts[i] = Decimal::ZERO;
            } else if exceeding[i] >= Decimal::ZERO {
                amounts[i] -= exceeding[i];
                delta_total += exceeding[i];
                exceeding[i] = Decimal::ZERO;
            } else if let Some(inverse) = derivatives[i].and_then(|d| Decimal::ONE.checked_div(d)) {
                sum_inverse = sum_inverse.saturating_add(inverse);
            }
        }

        if sum_inverse.is_zero() {
            let unplaced = spill(amounts, exceeding, delta_total);
            if !unplaced.is_zero() {
                tracing::trace!("No path has room left for {}", unplaced);
            }
            return;
        }

        for i in 0..amounts.len() {
            if !is_viable(amounts[i], exceeding[i]) {
                continue;
            }
            let share = derivatives[i]
                .and_then(|d| Decimal::ONE.checked_div(d))
                .and_then(|w| w.checked_div(sum_inverse))
                .and_then(|w| w.checked_mul(delta_total));
            if let Some(share) = share {
                amounts[i] += share;
                exceeding[i] += share;
            }
        }
    }
}

/// Place `delta` on paths in order, keeping each within `[0, limit]`.
///
/// Returns the part of `delta` no path could take.
fn spill(amounts: &mut [Decimal], exceeding: &mut [Decimal], delta: Decimal) -> Decimal {
    let mut delta = delta;
    for i in 0..amounts.len() {
        if delta.is_zero() {
            break;
        }
        // Room below the limit when adding, amount held when removing
        let change = if delta > Decimal::ZERO {
            delta.min(-exceeding[i]).max(Decimal::ZERO)
        } else {
            delta.max(-amounts[i]).min(Decimal::ZERO)
        };
        amounts[i] += change;
        exceeding[i] += change;
        delta -= change;
    }
    delta
}

/// Clamp amounts to `[0, limit]` at `decimals` precision and move the
/// difference to `total` onto paths with room, largest amount first.
///
/// `None` when the paths cannot carry exactly `total`.
fn settle_amounts(paths: &[&Path], amounts: &[Decimal], total: Decimal, decimals: u32) -> Option<Vec<Decimal>> {
    let mut settled: Vec<Decimal> = paths
        .iter()
        .zip(amounts.iter())
        .map(|(path, amount)| round_down((*amount).max(Decimal::ZERO).min(path.limit_amount), decimals))
        .collect();
    let assigned = settled.iter().try_fold(Decimal::ZERO, |acc, a| acc.checked_add(*a))?;
    let remainder = total.checked_sub(assigned)?;

    let mut order: Vec<usize> = (0..settled.len()).collect();
    order.sort_by(|a, b| settled[*b].cmp(&settled[*a]));
    let mut by_size: Vec<Decimal> = order.iter().map(|i| settled[*i]).collect();
    let mut by_size_exceeding: Vec<Decimal> = order
        .iter()
        .map(|i| settled[*i].checked_sub(paths[*i].limit_amount))
        .collect::<Option<_>>()?;
    if !spill(&mut by_size, &mut by_size_exceeding, remainder).is_zero() {
        return None;
    }
    for (slot, i) in order.iter().enumerate() {
        settled[*i] = by_size[slot];
    }

    let sum = settled.iter().try_fold(Decimal::ZERO, |acc, a| acc.checked_add(*a))?;
    (sum == total).then_some(settled)
}

/// `max / min - 1` over the spot prices of viable paths
fn price_error(
    arena: &PoolArena,
    paths: &[&Path],
    swap_type: SwapType,
    amounts: &[Decimal],
    exceeding: &[Decimal],
) -> Decimal {
    let prices: Vec<Decimal> = paths
        .iter()
        .enumerate()
        .filter(|(i, _)| is_viable(amounts[*i], exceeding[*i]))
        .filter_map(|(i, path)| spot_price_after_swap_for_path(arena, path, swap_type, amounts[i]).ok())
        .collect();

    let (Some(max), Some(min)) = (prices.iter().max(), prices.iter().min()) else {
        return Decimal::ZERO;
    };
    match max.checked_div(*min) {
        Some(ratio) => ratio - Decimal::ONE,
        None => Decimal::MAX,
    }
}

/// Attach settled amounts to their paths and drop empty ones
fn finalize_amounts(selected: Vec<&Path>, amounts: Vec<Decimal>) -> Vec<Path> {
    selected
        .into_iter()
        .zip(amounts)
        .filter(|(_, amount)| *amount > Decimal::ZERO)
        .map(|(path, amount)| {
            let mut path = path.clone();
            path.swap_amount = amount;
            path
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::limits::calculate_path_limits;
    use crate::test_utils::{path_through, weighted_arena};
    use rust_decimal_macros::dec;

    fn two_pool_setup(
        balances: [(Decimal, Decimal); 2],
        swap_type: SwapType,
    ) -> (PoolArena, Vec<Path>) {
        let arena = weighted_arena(&[
            ("p1", "a", "b", balances[0].0, balances[0].1),
            ("p2", "a", "b", balances[1].0, balances[1].1),
        ]);
        let paths = vec![
            path_through(&arena, &[("p1", "a", "b")]),
            path_through(&arena, &[("p2", "a", "b")]),
        ];
        let (paths, _) = calculate_path_limits(&arena, paths, swap_type);
        (arena, paths)
    }

    fn three_pool_setup(balances: [(Decimal, Decimal); 3], swap_type: SwapType) -> (PoolArena, Vec<Path>) {
        let arena = weighted_arena(&[
            ("p1", "a", "b", balances[0].0, balances[0].1),
            ("p2", "a", "b", balances[1].0, balances[1].1),
            ("p3", "a", "b", balances[2].0, balances[2].1),
        ]);
        let paths = ["p1", "p2", "p3"]
            .iter()
            .map(|id| path_through(&arena, &[(*id, "a", "b")]))
            .collect();
        let (paths, _) = calculate_path_limits(&arena, paths, swap_type);
        (arena, paths)
    }

    fn amount_sum(allocation: &SwapAllocation) -> Decimal {
        allocation.paths.iter().map(|p| p.swap_amount).sum()
    }

    #[test]
    fn test_identical_pools_split_evenly() {
        let (arena, paths) = two_pool_setup(
            [(dec!(1000), dec!(1000)), (dec!(1000), dec!(1000))],
            SwapType::ExactIn,
        );
        let allocator = SwapAllocator::new(4, Decimal::ZERO);

        let allocation = allocator.allocate(&arena, &paths, SwapType::ExactIn, dec!(100));

        assert_eq!(allocation.paths.len(), 2);
        assert_eq!(allocation.paths[0].swap_amount, dec!(50));
        assert_eq!(allocation.paths[1].swap_amount, dec!(50));
    }

    #[test]
    fn test_amounts_sum_to_request() {
        for (swap_type, total) in [(SwapType::ExactIn, dec!(500)), (SwapType::ExactOut, dec!(200))] {
            let (arena, paths) = two_pool_setup(
                [(dec!(1000), dec!(1000)), (dec!(3000), dec!(3000))],
                swap_type,
            );
            let allocator = SwapAllocator::new(4, Decimal::ZERO);

            let allocation = allocator.allocate(&arena, &paths, swap_type, total);

            assert!(!allocation.is_empty());
            assert_eq!(amount_sum(&allocation), total);
            for path in &allocation.paths {
                assert!(path.swap_amount > Decimal::ZERO);
            }
        }
    }

    #[test]
    fn test_deeper_pool_takes_larger_share() {
        let (arena, paths) = two_pool_setup(
            [(dec!(1000), dec!(1000)), (dec!(3000), dec!(3000))],
            SwapType::ExactIn,
        );
        let allocation = SwapAllocator::new(4, Decimal::ZERO).allocate(&arena, &paths, SwapType::ExactIn, dec!(400));

        assert_eq!(allocation.paths.len(), 2);
        let deep = allocation.paths.iter().find(|p| p.id == "p2-a-b").unwrap();
        let shallow = allocation.paths.iter().find(|p| p.id == "p1-a-b").unwrap();
        assert!(deep.swap_amount > shallow.swap_amount);
    }

    #[test]
    fn test_more_pools_never_worse() {
        for swap_type in [SwapType::ExactIn, SwapType::ExactOut] {
            let (arena, paths) = two_pool_setup(
                [(dec!(1000), dec!(1000)), (dec!(3000), dec!(3000))],
                swap_type,
            );
            let one = SwapAllocator::new(1, Decimal::ZERO).allocate(&arena, &paths, swap_type, dec!(200));
            let two = SwapAllocator::new(2, Decimal::ZERO).allocate(&arena, &paths, swap_type, dec!(200));

            match swap_type {
                SwapType::ExactIn => assert!(
                    two.total_return_considering_fees >= one.total_return_considering_fees
                ),
                SwapType::ExactOut => assert!(
                    two.total_return_considering_fees <= one.total_return_considering_fees
                ),
            }
        }
    }

    #[test]
    fn test_hop_cost_keeps_single_path() {
        let (arena, paths) = two_pool_setup(
            [(dec!(1000), dec!(1000)), (dec!(1000), dec!(1000))],
            SwapType::ExactIn,
        );
        // Splitting gains far less than one extra hop costs
        let allocation = SwapAllocator::new(4, dec!(10)).allocate(&arena, &paths, SwapType::ExactIn, dec!(10));

        assert_eq!(allocation.paths.len(), 1);
        assert_eq!(allocation.paths[0].swap_amount, dec!(10));
        assert_eq!(
            allocation.total_return_considering_fees,
            allocation.total_return - dec!(10)
        );
    }

    #[test]
    fn test_amount_at_limit_sum() {
        let (arena, paths) = two_pool_setup(
            [(dec!(1000), dec!(1000)), (dec!(1000), dec!(1000))],
            SwapType::ExactIn,
        );
        let allocator = SwapAllocator::new(4, Decimal::ZERO);

        // Each pool takes at most 300
        let full = allocator.allocate(&arena, &paths, SwapType::ExactIn, dec!(600));
        assert_eq!(full.paths.len(), 2);
        assert_eq!(amount_sum(&full), dec!(600));

        let over = allocator.allocate(&arena, &paths, SwapType::ExactIn, dec!(601));
        assert!(over.is_empty());
    }

    #[test]
    fn test_max_pools_caps_usable_liquidity() {
        let (arena, paths) = two_pool_setup(
            [(dec!(1000), dec!(1000)), (dec!(1000), dec!(1000))],
            SwapType::ExactIn,
        );
        let allocation = SwapAllocator::new(1, Decimal::ZERO).allocate(&arena, &paths, SwapType::ExactIn, dec!(400));
        assert!(allocation.is_empty());
    }

    #[test]
    fn test_uneven_pools_stay_within_limits() {
        for swap_type in [SwapType::ExactIn, SwapType::ExactOut] {
            let (arena, paths) = three_pool_setup(
                [(dec!(100), dec!(200)), (dec!(100), dec!(100)), (dec!(150), dec!(50))],
                swap_type,
            );

            let allocation = SwapAllocator::new(4, Decimal::ZERO).allocate(&arena, &paths, swap_type, dec!(52.5));

            assert!(!allocation.is_empty());
            assert_eq!(amount_sum(&allocation), dec!(52.5));
            for path in &allocation.paths {
                assert!(path.swap_amount <= path.limit_amount, "{} over its limit", path.id);
            }
            let executed = allocation.paths.iter().fold(Decimal::ZERO, |acc, p| {
                acc.saturating_add(output_amount_swap_for_path(&arena, p, swap_type, p.swap_amount))
            });
            assert_eq!(allocation.total_return, executed);
        }
    }

    #[test]
    fn test_exact_out_awkward_total_sums_exactly() {
        let (arena, paths) = three_pool_setup(
            [(dec!(200), dec!(200)), (dec!(200), dec!(200)), (dec!(100), dec!(100))],
            SwapType::ExactOut,
        );

        let allocation = SwapAllocator::new(4, Decimal::ZERO).allocate(&arena, &paths, SwapType::ExactOut, dec!(99.75));

        assert!(!allocation.is_empty());
        assert_eq!(amount_sum(&allocation), dec!(99.75));
        for path in &allocation.paths {
            assert!(path.swap_amount <= path.limit_amount);
        }
    }

    #[test]
    fn test_maxed_out_paths_ranked_by_price() {
        // Both pools accept at most 30 a; p1 pays twice as much b
        let (arena, paths) = two_pool_setup(
            [(dec!(100), dec!(200)), (dec!(100), dec!(100))],
            SwapType::ExactIn,
        );

        let allocation = SwapAllocator::new(1, Decimal::ZERO).allocate(&arena, &paths, SwapType::ExactIn, dec!(30));

        assert_eq!(allocation.paths.len(), 1);
        assert_eq!(allocation.paths[0].id, "p1-a-b");
        assert_eq!(allocation.paths[0].swap_amount, dec!(30));
    }

    #[test]
    fn test_redistribute_keeps_clamped_surplus() {
        // Limits of 30 each; neither path is left with a usable derivative
        let mut amounts = vec![dec!(-5), dec!(40)];
        let mut exceeding = vec![dec!(-35), dec!(10)];

        redistribute(&mut amounts, &mut exceeding, &[None, None]);

        assert_eq!(amounts, vec![dec!(5), dec!(30)]);
        assert_eq!(exceeding, vec![dec!(-25), Decimal::ZERO]);
    }

    #[test]
    fn test_settle_rejects_paths_without_room() {
        let arena = weighted_arena(&[("p1", "a", "b", dec!(100), dec!(100))]);
        let (paths, _) = calculate_path_limits(&arena, vec![path_through(&arena, &[("p1", "a", "b")])], SwapType::ExactIn);
        let selected: Vec<&Path> = paths.iter().collect();

        assert_eq!(settle_amounts(&selected, &[dec!(29)], dec!(30), 18), Some(vec![dec!(30)]));
        assert_eq!(settle_amounts(&selected, &[dec!(30)], dec!(31), 18), None);
    }

    #[test]
    fn test_initial_amounts_sum_exactly() {
        let amounts = initial_amounts(&[dec!(3), dec!(3), dec!(3)], dec!(9), dec!(1));
        assert_eq!(amounts.iter().copied().sum::<Decimal>(), dec!(1));
    }
}
