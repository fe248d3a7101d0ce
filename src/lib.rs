//! Multi-path swap router for AMM liquidity pools
//!
//! - Path discovery over a token/pool multigraph
//! - Per-path capacity limits
//! - Newton-style split of a swap across the best paths
//! - Batch-swap instructions from the executed split

pub mod config;
pub mod error;
pub mod graph;
pub mod pools;
pub mod proposer;
pub mod route_cache;
pub mod router;
pub mod simulation;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{PathGraphConfig, RouterConfig};
pub use error::{Result, RouterError};
pub use graph::PathGraph;
pub use pools::{Pool, PoolArena, PoolHandle, PoolKind, PoolRecord, StablePool, WeightedPool};
pub use proposer::RouteProposer;
pub use route_cache::{RouteCache, RouteKey};
pub use router::Router;
pub use simulation::{SwapAllocation, SwapAllocator};
pub use types::{HopSwap, Path, PoolTypeFilter, SwapInfo, SwapInstruction, SwapOptions, SwapType};
