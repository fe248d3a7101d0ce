//! Candidate path proposal
//!
//! Owns the path graph and turns a token pair into limit-sorted candidate
//! paths, consulting the caller's route cache first.

use crate::config::PathGraphConfig;
use crate::graph::PathGraph;
use crate::pools::PoolArena;
use crate::route_cache::{RouteCache, RouteKey};
use crate::simulation::calculate_path_limits;
use crate::types::{normalize_token, Path, SwapOptions, SwapType};

#[derive(Debug, Clone, Default)]
pub struct RouteProposer {
    path_graph: PathGraph,
    config: PathGraphConfig,
}

impl RouteProposer {
    pub fn new(config: PathGraphConfig) -> Self {
        Self {
            path_graph: PathGraph::new(),
            config,
        }
    }

    pub fn config(&self) -> &PathGraphConfig {
        &self.config
    }

    pub fn path_graph(&self) -> &PathGraph {
        &self.path_graph
    }

    /// (Re)build the graph from a complete pool snapshot
    pub fn init_path_graph_with_pools(&mut self, arena: &PoolArena) {
        self.path_graph
            .build_graph(arena, self.config.max_paths_per_token_pair);
    }

    /// Candidate paths for a swap, sorted by limit descending.
    ///
    /// `arena` must be the pool set the graph was built from.
    pub fn get_candidate_paths(
        &mut self,
        token_in: &str,
        token_out: &str,
        swap_type: SwapType,
        arena: &PoolArena,
        options: &SwapOptions,
        cache: &RouteCache,
    ) -> Vec<Path> {
        if arena.is_empty() {
            return Vec::new();
        }

        let token_in = normalize_token(token_in);
        let token_out = normalize_token(token_out);
        let key = RouteKey::new(&token_in, &token_out, swap_type, options.timestamp)
            .with_pool_type_filter(options.pool_type_filter);

        if !options.force_refresh {
            if let Some(paths) = cache.get(&key) {
                tracing::debug!("Route cache hit for {} -> {} ({})", token_in, token_out, swap_type);
                return paths;
            }
        }

        if !self.path_graph.is_initialized() {
            self.init_path_graph_with_pools(arena);
        }

        let paths = self.path_graph.traverse_graph_and_find_best_paths(
            &token_in,
            &token_out,
            &self.config,
            options.pool_type_filter,
        );
        let (paths, total_limit) = calculate_path_limits(arena, paths, swap_type);

        tracing::debug!(
            "Proposed {} paths for {} -> {} ({}), total limit {}",
            paths.len(),
            token_in,
            token_out,
            swap_type,
            total_limit
        );

        cache.insert(key, paths.clone());
        paths
    }
}
