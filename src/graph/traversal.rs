//! Heuristic depth-first path discovery
//!
//! Finds a bounded number of distinct simple paths between two tokens:
//! - Rank rounds prefer the N-th most liquid parallel edge at every hop
//! - A one-step lookahead tries successors that reach the target first
//! - Pools used by accepted paths are excluded from later searches, with
//!   weighted pools released again when a round falls short

use std::collections::HashSet;

use super::builder::PathGraph;
use super::types::EdgeData;
use crate::config::PathGraphConfig;
use crate::types::{Path, PoolTypeFilter};

impl PathGraph {
    /// Return up to `approx_paths_to_return` distinct paths from `token_in` to `token_out`
    pub fn traverse_graph_and_find_best_paths(
        &self,
        token_in: &str,
        token_out: &str,
        config: &PathGraphConfig,
        filter: PoolTypeFilter,
    ) -> Vec<Path> {
        if token_in == token_out || !self.has_node(token_in) || !self.has_node(token_out) {
            tracing::debug!("No route possible from {} to {}", token_in, token_out);
            return Vec::new();
        }

        let mut search = PathSearch {
            graph: self,
            token_out,
            config,
            filter,
            selected: Vec::new(),
            selected_ids: HashSet::new(),
            seen_pool_addresses: HashSet::new(),
        };
        search.run(token_in);

        let paths: Vec<Path> = search
            .selected
            .into_iter()
            .map(|edges| Path::new(edges.iter().map(|e| e.to_segment()).collect()))
            .collect();

        tracing::debug!(
            "Found {} paths from {} to {}",
            paths.len(),
            token_in,
            token_out
        );
        paths
    }
}

struct PathSearch<'a> {
    graph: &'a PathGraph,
    token_out: &'a str,
    config: &'a PathGraphConfig,
    filter: PoolTypeFilter,
    selected: Vec<Vec<&'a EdgeData>>,
    selected_ids: HashSet<String>,
    seen_pool_addresses: HashSet<String>,
}

impl<'a> PathSearch<'a> {
    fn run(&mut self, token_in: &str) {
        let target = self.config.approx_paths_to_return;
        if target == 0 {
            return;
        }

        loop {
            let found_before = self.selected.len();

            for rank in 0..self.graph.max_paths_per_token_pair() {
                while let Some(edges) = self.find_path(token_in, rank) {
                    self.accept(edges);
                    if self.selected.len() >= target {
                        return;
                    }
                }
            }

            if self.selected.len() == found_before {
                break;
            }

            // Release weighted pools so the next round can share them
            if !self.seen_pool_addresses.is_empty() {
                let graph = self.graph;
                self.seen_pool_addresses
                    .retain(|address| graph.pool_kind(address).is_some_and(|k| !k.is_default()));
            }
        }
    }

    fn accept(&mut self, edges: Vec<&'a EdgeData>) {
        let id = edges_id(&edges);
        tracing::trace!("Selected path {}", id);

        for edge in &edges {
            self.seen_pool_addresses.insert(edge.pool_address.clone());
        }
        self.selected_ids.insert(id);
        self.selected.push(edges);
    }

    fn find_path(&self, token_in: &str, rank: usize) -> Option<Vec<&'a EdgeData>> {
        let mut token_path = vec![token_in.to_string()];
        self.search_from(&mut token_path, rank)
    }

    /// Depth-first search extending `token_path`; the first valid path wins
    fn search_from(&self, token_path: &mut Vec<String>, rank: usize) -> Option<Vec<&'a EdgeData>> {
        if token_path.len() > self.config.max_depth {
            return None;
        }

        let graph: &'a PathGraph = self.graph;
        let current = token_path.last()?.clone();
        let successors: Vec<&'a String> = graph
            .successors(&current)
            .iter()
            .filter(|token| !token_path.contains(*token))
            .collect();

        if successors.iter().any(|token| token.as_str() == self.token_out) {
            token_path.push(self.token_out.to_string());
            let direct = self.build_path(token_path, rank);
            token_path.pop();

            if let Some(edges) = direct {
                if self.is_valid_path(&edges) {
                    return Some(edges);
                }
            }
        }

        let mut remaining: Vec<&'a String> = successors
            .into_iter()
            .filter(|token| token.as_str() != self.token_out)
            .collect();
        // Stable sort: tokens with a direct edge to the target come first
        remaining.sort_by_key(|token| {
            !graph
                .successors(token)
                .iter()
                .any(|next| next.as_str() == self.token_out)
        });

        for next in remaining {
            token_path.push(next.clone());
            let found = self.search_from(token_path, rank);
            token_path.pop();

            if found.is_some() {
                return found;
            }
        }

        None
    }

    /// Pick the `rank`-th parallel edge per hop, falling back to the most liquid
    fn build_path(&self, token_path: &[String], rank: usize) -> Option<Vec<&'a EdgeData>> {
        let graph: &'a PathGraph = self.graph;
        let mut edges = Vec::with_capacity(token_path.len().saturating_sub(1));
        let mut used_rank = false;

        for hop in token_path.windows(2) {
            let parallel = graph.parallel_edges(&hop[0], &hop[1]);
            let edge = match parallel.get(rank) {
                Some(edge) => {
                    used_rank = true;
                    edge
                }
                None => parallel.first()?,
            };
            edges.push(edge);
        }

        // Without a rank-th edge this is the rank-0 path again
        if edges.is_empty() || !used_rank {
            return None;
        }
        Some(edges)
    }

    fn is_valid_path(&self, edges: &[&EdgeData]) -> bool {
        let mut pools = HashSet::new();
        if !edges.iter().all(|e| pools.insert(e.pool_address.as_str())) {
            return false;
        }

        if !edges.iter().all(|e| self.filter.allows(e.pair.kind)) {
            return false;
        }

        let phantom_hops = edges.iter().filter(|e| e.is_phantom_hop).count();
        let non_phantom_hops = edges.len() - phantom_hops;
        if phantom_hops == 0 && edges.len() > self.config.max_non_boosted_path_depth {
            return false;
        }
        if phantom_hops > 0
            && non_phantom_hops > self.config.max_non_boosted_segments_in_boosted_path
        {
            return false;
        }

        if edges
            .iter()
            .any(|e| self.seen_pool_addresses.contains(&e.pool_address))
        {
            return false;
        }

        !self.selected_ids.contains(&edges_id(edges))
    }
}

fn edges_id(edges: &[&EdgeData]) -> String {
    edges.iter().map(|e| e.key()).collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::{PoolArena, WeightedPool};
    use crate::test_utils::{stable_pool, token, weighted_arena};
    use rust_decimal_macros::dec;

    fn build(arena: &PoolArena, max_paths_per_token_pair: usize) -> PathGraph {
        let mut graph = PathGraph::new();
        graph.build_graph(arena, max_paths_per_token_pair);
        graph
    }

    fn ids(paths: &[Path]) -> Vec<String> {
        paths.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_parallel_pools_yield_one_path_each() {
        let arena = weighted_arena(&[
            ("p1", "a", "b", dec!(10000), dec!(10000)),
            ("p2", "a", "b", dec!(1000), dec!(1000)),
            ("p3", "b", "c", dec!(5000), dec!(5000)),
        ]);
        let graph = build(&arena, 2);
        let config = PathGraphConfig {
            approx_paths_to_return: 2,
            ..PathGraphConfig::default()
        };

        let paths = graph.traverse_graph_and_find_best_paths("a", "c", &config, PoolTypeFilter::All);

        assert_eq!(
            ids(&paths),
            vec!["p1-a-b_p3-b-c".to_string(), "p2-a-b_p3-b-c".to_string()]
        );
    }

    #[test]
    fn test_paths_are_distinct_and_never_reuse_a_pool() {
        let arena = weighted_arena(&[
            ("p1", "a", "b", dec!(10000), dec!(10000)),
            ("p2", "a", "b", dec!(1000), dec!(1000)),
            ("p3", "b", "c", dec!(5000), dec!(5000)),
            ("p4", "a", "c", dec!(3000), dec!(3000)),
            ("p5", "a", "d", dec!(3000), dec!(3000)),
            ("p6", "d", "c", dec!(3000), dec!(3000)),
        ]);
        let graph = build(&arena, 2);
        let config = PathGraphConfig {
            approx_paths_to_return: 10,
            ..PathGraphConfig::default()
        };

        let paths = graph.traverse_graph_and_find_best_paths("a", "c", &config, PoolTypeFilter::All);
        assert!(paths.len() >= 3);

        let unique: HashSet<_> = paths.iter().map(|p| p.id.clone()).collect();
        assert_eq!(unique.len(), paths.len());

        for path in &paths {
            let pools: HashSet<_> = path.swaps.iter().map(|s| s.pool_address.clone()).collect();
            assert_eq!(pools.len(), path.swaps.len());
            assert_eq!(path.token_in(), Some("a"));
            assert_eq!(path.token_out(), Some("c"));
        }
        // Direct hop is tried first
        assert_eq!(paths[0].id, "p4-a-c");
    }

    #[test]
    fn test_only_weighted_pools_released_between_rounds() {
        let config = PathGraphConfig::default();
        let parallel_tail = [
            ("w1", "b", "c", dec!(5000), dec!(5000)),
            ("w2", "b", "c", dec!(1000), dec!(1000)),
        ];

        // Weighted head pool: shared again once the first round is exhausted
        let mut weighted_head = parallel_tail.to_vec();
        weighted_head.push(("w0", "a", "b", dec!(1000), dec!(1000)));
        let graph = build(&weighted_arena(&weighted_head), 2);
        let paths = graph.traverse_graph_and_find_best_paths("a", "c", &config, PoolTypeFilter::All);
        assert_eq!(
            ids(&paths),
            vec!["w0-a-b_w1-b-c".to_string(), "w0-a-b_w2-b-c".to_string()]
        );

        // Stable head pool: stays excluded, so the w2 tail is never reached
        let mut arena = weighted_arena(&parallel_tail);
        arena
            .insert(Box::new(stable_pool("s1", &["a", "b"], dec!(100), dec!(1000), dec!(0.0004))))
            .unwrap();
        let graph = build(&arena, 2);
        let paths = graph.traverse_graph_and_find_best_paths("a", "c", &config, PoolTypeFilter::All);
        assert_eq!(ids(&paths), vec!["s1-a-b_w1-b-c".to_string()]);
    }

    #[test]
    fn test_non_boosted_depth_limit() {
        let arena = weighted_arena(&[
            ("p1", "a", "b", dec!(1000), dec!(1000)),
            ("p2", "b", "c", dec!(1000), dec!(1000)),
            ("p3", "c", "d", dec!(1000), dec!(1000)),
            ("p4", "d", "e", dec!(1000), dec!(1000)),
        ]);
        let graph = build(&arena, 2);
        let config = PathGraphConfig::default();

        let found = graph.traverse_graph_and_find_best_paths("a", "d", &config, PoolTypeFilter::All);
        assert_eq!(ids(&found), vec!["p1-a-b_p2-b-c_p3-c-d".to_string()]);

        let too_long = graph.traverse_graph_and_find_best_paths("a", "e", &config, PoolTypeFilter::All);
        assert!(too_long.is_empty());
    }

    #[test]
    fn test_boosted_path_allows_extra_phantom_hops() {
        let mut arena = weighted_arena(&[
            ("p1", "a", "b", dec!(1000), dec!(1000)),
            ("p2", "b", "c", dec!(1000), dec!(1000)),
        ]);
        let bpt = WeightedPool::new(
            "lp",
            "lp",
            dec!(0.001),
            vec![
                token("c", dec!(1000), Some(dec!(0.5))),
                token("lp", dec!(1000), Some(dec!(0.5))),
            ],
        )
        .unwrap();
        arena.insert(Box::new(bpt)).unwrap();
        let graph = build(&arena, 2);

        let config = PathGraphConfig {
            max_non_boosted_path_depth: 2,
            ..PathGraphConfig::default()
        };
        let paths = graph.traverse_graph_and_find_best_paths("a", "lp", &config, PoolTypeFilter::All);

        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_boosted());
        assert_eq!(paths[0].hop_count(), 3);
    }

    #[test]
    fn test_missing_token_yields_nothing() {
        let arena = weighted_arena(&[("p1", "a", "b", dec!(1000), dec!(1000))]);
        let graph = build(&arena, 2);
        let config = PathGraphConfig::default();

        assert!(graph
            .traverse_graph_and_find_best_paths("a", "z", &config, PoolTypeFilter::All)
            .is_empty());
        assert!(graph
            .traverse_graph_and_find_best_paths("a", "a", &config, PoolTypeFilter::All)
            .is_empty());
    }

    #[test]
    fn test_pool_type_filter() {
        let mut arena = weighted_arena(&[("w1", "a", "b", dec!(1000), dec!(1000))]);
        arena
            .insert(Box::new(stable_pool("s1", &["a", "b"], dec!(100), dec!(1000), dec!(0.0004))))
            .unwrap();
        let graph = build(&arena, 2);
        let config = PathGraphConfig::default();

        let stable_only =
            graph.traverse_graph_and_find_best_paths("a", "b", &config, PoolTypeFilter::Stable);
        assert_eq!(ids(&stable_only), vec!["s1-a-b".to_string()]);

        let all = graph.traverse_graph_and_find_best_paths("a", "b", &config, PoolTypeFilter::All);
        assert_eq!(all.len(), 2);
    }
}
