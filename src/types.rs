//! Shared value types: swap direction, paths and the quote result surface.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pools::{PoolHandle, PoolKind, PoolPairData};

/// Direction of a swap request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapType {
    /// The input amount is fixed, the output is maximized
    ExactIn,
    /// The output amount is fixed, the input is minimized
    ExactOut,
}

impl fmt::Display for SwapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapType::ExactIn => write!(f, "exact-in"),
            SwapType::ExactOut => write!(f, "exact-out"),
        }
    }
}

/// Canonical form of a token identifier (trimmed, lower case)
pub fn normalize_token(token: &str) -> String {
    token.trim().to_lowercase()
}

/// One hop of a path
#[derive(Debug, Clone)]
pub struct PathSegment {
    pub pool: PoolHandle,
    pub pool_id: String,
    pub pool_address: String,
    pub token_in: String,
    pub token_out: String,
    pub pair: PoolPairData,
    pub is_phantom_hop: bool,
}

/// Ordered sequence of hops from the query's input token to its output token
#[derive(Debug, Clone)]
pub struct Path {
    pub id: String,
    pub swaps: Vec<PathSegment>,
    pub limit_amount: Decimal,
    pub swap_amount: Decimal,
}

impl Path {
    pub fn new(swaps: Vec<PathSegment>) -> Self {
        let id = path_id(&swaps);
        Self {
            id,
            swaps,
            limit_amount: Decimal::ZERO,
            swap_amount: Decimal::ZERO,
        }
    }

    pub fn hop_count(&self) -> usize {
        self.swaps.len()
    }

    pub fn token_in(&self) -> Option<&str> {
        self.swaps.first().map(|s| s.token_in.as_str())
    }

    pub fn token_out(&self) -> Option<&str> {
        self.swaps.last().map(|s| s.token_out.as_str())
    }

    /// A path is boosted when at least one hop trades a pool's own token
    pub fn is_boosted(&self) -> bool {
        self.swaps.iter().any(|s| s.is_phantom_hop)
    }

    /// Human readable token route, e.g. `a -> b -> c`
    pub fn token_path(&self) -> String {
        let mut tokens: Vec<&str> = self.swaps.iter().map(|s| s.token_in.as_str()).collect();
        if let Some(last) = self.token_out() {
            tokens.push(last);
        }
        tokens.join(" -> ")
    }
}

/// Underscore-joined `poolId-tokenIn-tokenOut` per hop
pub fn path_id(swaps: &[PathSegment]) -> String {
    swaps
        .iter()
        .map(|s| format!("{}-{}-{}", s.pool_id, s.token_in, s.token_out))
        .collect::<Vec<_>>()
        .join("_")
}

/// Restricts which pool kinds may appear in proposed paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PoolTypeFilter {
    #[default]
    All,
    Weighted,
    Stable,
}

impl PoolTypeFilter {
    pub fn allows(&self, kind: PoolKind) -> bool {
        match self {
            PoolTypeFilter::All => true,
            PoolTypeFilter::Weighted => kind == PoolKind::Weighted,
            PoolTypeFilter::Stable => kind == PoolKind::Stable,
        }
    }
}

/// Per-query options
#[derive(Debug, Clone)]
pub struct SwapOptions {
    /// Maximum number of paths the allocator may split across
    pub max_pools: usize,
    /// Execution cost of one hop, in units of the return token
    pub cost_per_hop: Decimal,
    /// Time epoch of the pool snapshot, part of the route cache key
    pub timestamp: i64,
    /// Skip the route cache and recompute candidate paths
    pub force_refresh: bool,
    pub pool_type_filter: PoolTypeFilter,
}

impl Default for SwapOptions {
    fn default() -> Self {
        Self {
            max_pools: crate::config::DEFAULT_MAX_POOLS,
            cost_per_hop: Decimal::ZERO,
            timestamp: chrono::Utc::now().timestamp(),
            force_refresh: false,
            pool_type_filter: PoolTypeFilter::All,
        }
    }
}

/// Result of executing one hop during formatting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HopSwap {
    pub pool_id: String,
    pub token_in: String,
    pub token_out: String,
    /// Amount sent into the pool
    pub swap_amount: Decimal,
    /// Amount received from the pool
    pub return_amount: Decimal,
}

/// Batch-swap style instruction referencing `SwapInfo::token_addresses`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInstruction {
    pub pool_id: String,
    pub asset_in_index: usize,
    pub asset_out_index: usize,
    /// Zero for hops that consume the previous hop's result
    pub amount: Decimal,
}

/// Final quote returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
    pub token_addresses: Vec<String>,
    pub swaps: Vec<SwapInstruction>,
    pub swap_amount: Decimal,
    pub return_amount: Decimal,
    pub return_amount_considering_fees: Decimal,
    pub token_in: String,
    pub token_out: String,
    pub market_sp: Decimal,
}

impl SwapInfo {
    /// Result signalling that the request cannot be filled
    pub fn empty(token_in: &str, token_out: &str) -> Self {
        Self {
            token_addresses: Vec::new(),
            swaps: Vec::new(),
            swap_amount: Decimal::ZERO,
            return_amount: Decimal::ZERO,
            return_amount_considering_fees: Decimal::ZERO,
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            market_sp: Decimal::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.swaps.is_empty()
    }
}
