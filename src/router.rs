//! Swap router facade
//!
//! Ties the pieces together for a single quote:
//! 1. Propose candidate paths (cached per token pair, direction and epoch)
//! 2. Allocate the amount across the best paths
//! 3. Execute the allocation on a pool snapshot
//! 4. Emit batch-swap instructions

use rust_decimal::Decimal;

use crate::config::RouterConfig;
use crate::pools::PoolArena;
use crate::proposer::RouteProposer;
use crate::route_cache::RouteCache;
use crate::simulation::{format_swaps, FormattedSwaps, SwapAllocator};
use crate::types::{normalize_token, Path, SwapInfo, SwapInstruction, SwapOptions, SwapType};

#[derive(Debug, Clone)]
pub struct Router {
    arena: PoolArena,
    proposer: RouteProposer,
    config: RouterConfig,
}

impl Router {
    /// Create a router over `arena` and build its path graph
    pub fn new(arena: PoolArena, config: RouterConfig) -> Self {
        let mut proposer = RouteProposer::new(config.path_graph);
        proposer.init_path_graph_with_pools(&arena);
        tracing::info!(
            "Router ready with {} pools ({} tokens)",
            arena.len(),
            proposer.path_graph().node_count()
        );
        Self {
            arena,
            proposer,
            config,
        }
    }

    pub fn arena(&self) -> &PoolArena {
        &self.arena
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Replace the pool set; cached routes refer to the old one and are dropped
    pub fn set_pools(&mut self, arena: PoolArena, cache: &RouteCache) {
        self.arena = arena;
        self.proposer.init_path_graph_with_pools(&self.arena);
        cache.clear();
        tracing::info!("Pool set replaced: {} pools", self.arena.len());
    }

    /// Per-query options seeded from the router configuration
    pub fn default_options(&self) -> SwapOptions {
        SwapOptions {
            max_pools: self.config.max_pools,
            cost_per_hop: self.config.cost_per_hop,
            ..SwapOptions::default()
        }
    }

    /// Best split of `amount` from `token_in` to `token_out`.
    ///
    /// Returns an empty `SwapInfo` when no route can fill the request.
    pub fn get_swaps(
        &mut self,
        token_in: &str,
        token_out: &str,
        swap_type: SwapType,
        amount: Decimal,
        options: &SwapOptions,
        cache: &RouteCache,
    ) -> SwapInfo {
        let token_in = normalize_token(token_in);
        let token_out = normalize_token(token_out);
        let empty = SwapInfo::empty(&token_in, &token_out);

        if amount <= Decimal::ZERO || token_in == token_out {
            return empty;
        }

        let paths = self.proposer.get_candidate_paths(
            &token_in,
            &token_out,
            swap_type,
            &self.arena,
            options,
            cache,
        );
        if paths.is_empty() {
            tracing::debug!("No paths from {} to {}", token_in, token_out);
            return empty;
        }

        let allocator = SwapAllocator::new(options.max_pools, options.cost_per_hop);
        let allocation = allocator.allocate(&self.arena, &paths, swap_type, amount);
        if allocation.is_empty() {
            return empty;
        }

        let mut snapshot = self.arena.snapshot();
        let formatted = match format_swaps(&mut snapshot, &allocation.paths, swap_type) {
            Ok(formatted) => formatted,
            Err(e) => {
                tracing::warn!("Failed to execute allocation {} -> {}: {}", token_in, token_out, e);
                return empty;
            }
        };
        if formatted.return_amount.is_zero() {
            return empty;
        }

        let hops: usize = allocation.paths.iter().map(|p| p.hop_count()).sum();
        let cost = options.cost_per_hop.saturating_mul(Decimal::from(hops));
        let return_amount_considering_fees = match swap_type {
            SwapType::ExactIn => formatted.return_amount.saturating_sub(cost),
            SwapType::ExactOut => formatted.return_amount.saturating_add(cost),
        };

        let (token_addresses, swaps) = batch_instructions(&allocation.paths, &formatted, swap_type);

        tracing::info!(
            "Quote {} {} {} -> {}: return {} over {} paths",
            swap_type,
            formatted.swap_amount,
            token_in,
            token_out,
            formatted.return_amount,
            allocation.paths.len()
        );

        SwapInfo {
            token_addresses,
            swaps,
            swap_amount: formatted.swap_amount,
            return_amount: formatted.return_amount,
            return_amount_considering_fees,
            token_in,
            token_out,
            market_sp: formatted.market_sp,
        }
    }
}

/// Index of `token` in `addresses`, appending it when new
fn asset_index(addresses: &mut Vec<String>, token: &str) -> usize {
    match addresses.iter().position(|a| a == token) {
        Some(index) => index,
        None => {
            addresses.push(token.to_string());
            addresses.len() - 1
        }
    }
}

/// Flatten executed paths into batch-swap instructions.
///
/// Only the hop that fixes the path amount carries a non-zero amount: the
/// first hop for exact-in, the final hop (emitted first) for exact-out.
fn batch_instructions(
    paths: &[Path],
    formatted: &FormattedSwaps,
    swap_type: SwapType,
) -> (Vec<String>, Vec<SwapInstruction>) {
    let mut addresses: Vec<String> = Vec::new();
    let mut instructions = Vec::with_capacity(paths.iter().map(|p| p.hop_count()).sum());

    for hops in &formatted.paths {
        let ordered: Vec<_> = match swap_type {
            SwapType::ExactIn => hops.iter().collect(),
            SwapType::ExactOut => hops.iter().rev().collect(),
        };

        for (i, hop) in ordered.into_iter().enumerate() {
            let asset_in_index = asset_index(&mut addresses, &hop.token_in);
            let asset_out_index = asset_index(&mut addresses, &hop.token_out);
            let amount = match (i, swap_type) {
                (0, SwapType::ExactIn) => hop.swap_amount,
                (0, SwapType::ExactOut) => hop.return_amount,
                _ => Decimal::ZERO,
            };
            instructions.push(SwapInstruction {
                pool_id: hop.pool_id.clone(),
                asset_in_index,
                asset_out_index,
                amount,
            });
        }
    }

    (addresses, instructions)
}
