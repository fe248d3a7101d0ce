//! Swap Router Configuration

use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

use crate::error::{Result, RouterError};

// Path discovery defaults
pub const DEFAULT_MAX_DEPTH: usize = 6;
pub const DEFAULT_MAX_NON_BOOSTED_PATH_DEPTH: usize = 3;
pub const DEFAULT_MAX_NON_BOOSTED_SEGMENTS_IN_BOOSTED_PATH: usize = 2;
pub const DEFAULT_APPROX_PATHS_TO_RETURN: usize = 5;
pub const DEFAULT_MAX_PATHS_PER_TOKEN_PAIR: usize = 2;

// Allocation defaults
pub const DEFAULT_MAX_POOLS: usize = 4;

/// Allocator convergence limits
pub mod thresholds {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Relative spread between max and min spot price that ends the Newton loop
    pub const PRICE_ERROR_TOLERANCE: Decimal = dec!(0.00001);

    /// Hard cap on Newton iterations per path set
    pub const MAX_ITERATIONS: usize = 100;

    /// Hard cap on clamp/redistribute rounds inside one Newton step
    pub const MAX_REDISTRIBUTION_ROUNDS: usize = 100;

    /// Amounts below this are priced with the zero-amount spot price
    pub const INFINITESIMAL: Decimal = dec!(0.000000000000000001);
}

/// Reference pool parameters
pub mod pool_limits {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Weighted pools accept at most 30% of the in-balance per swap
    pub const WEIGHTED_MAX_IN_RATIO: Decimal = dec!(0.3);

    /// Weighted pools release at most 30% of the out-balance per swap
    pub const WEIGHTED_MAX_OUT_RATIO: Decimal = dec!(0.3);

    /// Stable pools release at most 99% of the out-balance per swap
    pub const STABLE_MAX_OUT_RATIO: Decimal = dec!(0.99);

    /// Newton iterations for the stable invariant
    pub const STABLE_MAX_ITERATIONS: usize = 255;

    /// Convergence threshold for the stable invariant
    pub const STABLE_CONVERGENCE: Decimal = dec!(0.000000000000000001);
}

/// Graph traversal limits used by path discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathGraphConfig {
    pub max_depth: usize,
    pub max_non_boosted_path_depth: usize,
    pub max_non_boosted_segments_in_boosted_path: usize,
    pub approx_paths_to_return: usize,
    pub max_paths_per_token_pair: usize,
}

impl Default for PathGraphConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_non_boosted_path_depth: DEFAULT_MAX_NON_BOOSTED_PATH_DEPTH,
            max_non_boosted_segments_in_boosted_path:
                DEFAULT_MAX_NON_BOOSTED_SEGMENTS_IN_BOOSTED_PATH,
            approx_paths_to_return: DEFAULT_APPROX_PATHS_TO_RETURN,
            max_paths_per_token_pair: DEFAULT_MAX_PATHS_PER_TOKEN_PAIR,
        }
    }
}

/// Main configuration for the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub path_graph: PathGraphConfig,
    pub max_pools: usize,
    pub cost_per_hop: Decimal,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            path_graph: PathGraphConfig::default(),
            max_pools: DEFAULT_MAX_POOLS,
            cost_per_hop: Decimal::ZERO,
        }
    }
}

impl RouterConfig {
    /// Load from the environment (and `.env` if present), falling back to defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let path_graph = PathGraphConfig {
            max_depth: env_or("SOR_MAX_DEPTH", defaults.path_graph.max_depth)?,
            max_non_boosted_path_depth: env_or(
                "SOR_MAX_NON_BOOSTED_PATH_DEPTH",
                defaults.path_graph.max_non_boosted_path_depth,
            )?,
            max_non_boosted_segments_in_boosted_path: env_or(
                "SOR_MAX_NON_BOOSTED_SEGMENTS_IN_BOOSTED_PATH",
                defaults.path_graph.max_non_boosted_segments_in_boosted_path,
            )?,
            approx_paths_to_return: env_or(
                "SOR_APPROX_PATHS_TO_RETURN",
                defaults.path_graph.approx_paths_to_return,
            )?,
            max_paths_per_token_pair: env_or(
                "SOR_MAX_PATHS_PER_TOKEN_PAIR",
                defaults.path_graph.max_paths_per_token_pair,
            )?,
        };

        let config = Self {
            path_graph,
            max_pools: env_or("SOR_MAX_POOLS", defaults.max_pools)?,
            cost_per_hop: env_or("SOR_COST_PER_HOP", defaults.cost_per_hop)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make discovery or allocation a no-op
    pub fn validate(&self) -> Result<()> {
        if self.max_pools == 0 {
            return Err(RouterError::Config {
                key: "SOR_MAX_POOLS",
                value: self.max_pools.to_string(),
            });
        }
        if self.path_graph.max_paths_per_token_pair == 0 {
            return Err(RouterError::Config {
                key: "SOR_MAX_PATHS_PER_TOKEN_PAIR",
                value: self.path_graph.max_paths_per_token_pair.to_string(),
            });
        }
        if self.cost_per_hop.is_sign_negative() {
            return Err(RouterError::Config {
                key: "SOR_COST_PER_HOP",
                value: self.cost_per_hop.to_string(),
            });
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| RouterError::Config { key, value: raw }),
        Err(_) => Ok(default),
    }
}
