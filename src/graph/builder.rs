use std::collections::{BTreeMap, HashMap};

use super::types::EdgeData;
use crate::pools::{PoolArena, PoolHandle, PoolKind};

/// Directed multigraph of tokens connected by pool edges.
///
/// Successor lists keep insertion order and parallel edges between the
/// same ordered pair are ranked by normalized liquidity, most liquid first.
#[derive(Debug, Clone, Default)]
pub struct PathGraph {
    adjacency: HashMap<String, Vec<String>>,
    edges: HashMap<(String, String), Vec<EdgeData>>,
    edge_ranks: HashMap<(String, String, String), usize>,
    pool_kinds: HashMap<String, PoolKind>,
    max_paths_per_token_pair: usize,
    initialized: bool,
}

impl PathGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)build the graph from a complete pool snapshot
    pub fn build_graph(&mut self, arena: &PoolArena, max_paths_per_token_pair: usize) {
        *self = Self::new();
        self.max_paths_per_token_pair = max_paths_per_token_pair.max(1);

        // Group pools by unordered token pair; BTreeMap keeps edge insertion deterministic
        let mut token_pairs: BTreeMap<(String, String), Vec<PoolHandle>> = BTreeMap::new();
        for (handle, pool) in arena.iter() {
            self.pool_kinds.insert(pool.address().to_string(), pool.kind());

            let tokens = pool.tokens();
            for i in 0..tokens.len() {
                for j in (i + 1)..tokens.len() {
                    let key = if tokens[i] <= tokens[j] {
                        (tokens[i].clone(), tokens[j].clone())
                    } else {
                        (tokens[j].clone(), tokens[i].clone())
                    };
                    token_pairs.entry(key).or_default().push(handle);
                }
            }
        }

        for ((token_a, token_b), handles) in &token_pairs {
            self.add_edges_for_direction(arena, token_a, token_b, handles);
            self.add_edges_for_direction(arena, token_b, token_a, handles);
        }

        self.initialized = true;
        tracing::debug!(
            "Built path graph with {} tokens, {} edges from {} pools",
            self.node_count(),
            self.edge_count(),
            arena.len()
        );
    }

    /// Rank candidate pools for one direction and keep the top ones plus phantom hops
    fn add_edges_for_direction(
        &mut self,
        arena: &PoolArena,
        token_in: &str,
        token_out: &str,
        handles: &[PoolHandle],
    ) {
        let mut candidates: Vec<EdgeData> = Vec::with_capacity(handles.len());
        for &handle in handles {
            let Some(pool) = arena.get(handle) else {
                continue;
            };
            match pool.parse_pool_pair_data(token_in, token_out) {
                Ok(pair) => {
                    let liquidity = pool.normalized_liquidity(&pair);
                    candidates.push(EdgeData::new(handle, pair, liquidity));
                }
                Err(e) => {
                    tracing::warn!("Skipping pool {} for {} -> {}: {}", pool.id(), token_in, token_out, e);
                }
            }
        }

        candidates.sort_by(|a, b| b.normalized_liquidity.cmp(&a.normalized_liquidity));

        for (rank, edge) in candidates.into_iter().enumerate() {
            // A phantom hop is the only way into its pool, so it is never ranked out
            if rank < self.max_paths_per_token_pair || edge.is_phantom_hop {
                self.add_edge(edge);
            } else {
                tracing::trace!(
                    "Dropping edge {} - rank {} beyond {}",
                    edge.key(),
                    rank,
                    self.max_paths_per_token_pair
                );
            }
        }
    }

    fn add_edge(&mut self, edge: EdgeData) {
        let token_in = edge.token_in.clone();
        let token_out = edge.token_out.clone();

        let successors = self.adjacency.entry(token_in.clone()).or_default();
        if !successors.contains(&token_out) {
            successors.push(token_out.clone());
        }
        self.adjacency.entry(token_out.clone()).or_default();

        let parallel = self
            .edges
            .entry((token_in.clone(), token_out.clone()))
            .or_default();
        self.edge_ranks.insert(
            (token_in, token_out, edge.pool_id.clone()),
            parallel.len(),
        );
        parallel.push(edge);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn max_paths_per_token_pair(&self) -> usize {
        self.max_paths_per_token_pair
    }

    pub fn has_node(&self, token: &str) -> bool {
        self.adjacency.contains_key(token)
    }

    /// Successor tokens of `token`, in insertion order
    pub fn successors(&self, token: &str) -> &[String] {
        self.adjacency.get(token).map(|s| s.as_slice()).unwrap_or(&[])
    }

    /// Parallel edges `token_in -> token_out`, most liquid first
    pub fn parallel_edges(&self, token_in: &str, token_out: &str) -> &[EdgeData] {
        self.edges
            .get(&(token_in.to_string(), token_out.to_string()))
            .map(|e| e.as_slice())
            .unwrap_or(&[])
    }

    /// Look up a single edge by its endpoints and pool id
    pub fn edge(&self, token_in: &str, token_out: &str, pool_id: &str) -> Option<&EdgeData> {
        let rank = self.edge_ranks.get(&(
            token_in.to_string(),
            token_out.to_string(),
            pool_id.to_string(),
        ))?;
        self.parallel_edges(token_in, token_out).get(*rank)
    }

    pub fn pool_kind(&self, pool_address: &str) -> Option<PoolKind> {
        self.pool_kinds.get(pool_address).copied()
    }

    /// Get the number of nodes (tokens) in the graph
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Get the number of directed edges in the graph
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|e| e.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::WeightedPool;
    use crate::test_utils::{token, weighted_arena};
    use rust_decimal_macros::dec;

    #[test]
    fn test_parallel_edges_ranked_by_liquidity() {
        let arena = weighted_arena(&[
            ("low", "a", "b", dec!(100), dec!(100)),
            ("high", "a", "b", dec!(10000), dec!(10000)),
        ]);
        let mut graph = PathGraph::new();
        graph.build_graph(&arena, 2);

        let edges = graph.parallel_edges("a", "b");
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].pool_id, "high");
        assert_eq!(edges[1].pool_id, "low");
        assert_eq!(graph.edge("a", "b", "low").unwrap().pool_id, "low");
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_fan_out_capped_per_token_pair() {
        let arena = weighted_arena(&[
            ("p1", "a", "b", dec!(3000), dec!(3000)),
            ("p2", "a", "b", dec!(2000), dec!(2000)),
            ("p3", "a", "b", dec!(1000), dec!(1000)),
        ]);
        let mut graph = PathGraph::new();
        graph.build_graph(&arena, 2);

        let ids: Vec<_> = graph.parallel_edges("b", "a").iter().map(|e| e.pool_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert!(graph.edge("a", "b", "p3").is_none());
    }

    #[test]
    fn test_phantom_hop_always_added() {
        let mut arena = weighted_arena(&[
            ("p1", "a", "pool3", dec!(3000), dec!(3000)),
            ("p2", "a", "pool3", dec!(2000), dec!(2000)),
        ]);
        // Pool whose own token is tradable, with the least liquidity
        let phantom = WeightedPool::new(
            "pool3",
            "pool3",
            dec!(0.001),
            vec![
                token("a", dec!(10), Some(dec!(0.5))),
                token("pool3", dec!(10), Some(dec!(0.5))),
            ],
        )
        .unwrap();
        arena.insert(Box::new(phantom)).unwrap();

        let mut graph = PathGraph::new();
        graph.build_graph(&arena, 1);

        let edge = graph.edge("a", "pool3", "pool3").unwrap();
        assert!(edge.is_phantom_hop);
        assert!(graph.edge("a", "pool3", "p2").is_none());
        assert_eq!(graph.parallel_edges("a", "pool3").len(), 2);
    }

    #[test]
    fn test_rebuild_replaces_previous_graph() {
        let mut graph = PathGraph::new();
        assert!(!graph.is_initialized());

        graph.build_graph(&weighted_arena(&[("p1", "a", "b", dec!(1), dec!(1))]), 2);
        assert!(graph.has_node("a"));

        graph.build_graph(&weighted_arena(&[("p2", "c", "d", dec!(1), dec!(1))]), 2);
        assert!(!graph.has_node("a"));
        assert!(graph.has_node("c"));
        assert!(graph.is_initialized());
    }
}
