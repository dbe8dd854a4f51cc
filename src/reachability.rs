//! Time-bounded reachability ("ego graph") over a [`TimeWeightedNetwork`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::time::Instant;

use log::debug;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::{Error, Result};
use crate::graph::TimeWeightedNetwork;

#[derive(Copy, Clone, PartialEq)]
pub(crate) struct State {
    pub(crate) cost: f64,
    pub(crate) node: NodeIndex,
}

impl Eq for State {}

// Implement Ord for State to use in BinaryHeap
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by cost, ties broken by node index
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Node-induced subgraph of everything reachable from a source within a time
/// budget. Holds indices into the network it was computed on.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachableSubgraph {
    source: NodeIndex,
    budget: f64,
    times: BTreeMap<NodeIndex, f64>,
    segments: Vec<EdgeIndex>,
}

impl ReachableSubgraph {
    pub fn source(&self) -> NodeIndex {
        self.source
    }

    pub fn budget(&self) -> f64 {
        self.budget
    }

    /// Reachable nodes in ascending index order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.times.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.times.len()
    }

    pub fn contains(&self, node: NodeIndex) -> bool {
        self.times.contains_key(&node)
    }

    /// Shortest travel time (minutes) from the source to `node`.
    pub fn time_to(&self, node: NodeIndex) -> Option<f64> {
        self.times.get(&node).copied()
    }

    /// Segments between reachable nodes in ascending index order.
    pub fn segments(&self) -> &[EdgeIndex] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn contains_segment(&self, edge: EdgeIndex) -> bool {
        self.segments.binary_search(&edge).is_ok()
    }

    /// The part of this subgraph that lies within a smaller `budget`.
    pub fn restrict(&self, network: &TimeWeightedNetwork, budget: f64) -> Result<Self> {
        validate_budget(budget)?;
        if budget >= self.budget {
            return Ok(self.clone());
        }

        let times = self
            .times
            .iter()
            .filter(|&(_, &time)| time <= budget)
            .map(|(&node, &time)| (node, time))
            .collect();

        Ok(Self::induced(network, self.source, budget, times))
    }

    fn induced(
        network: &TimeWeightedNetwork,
        source: NodeIndex,
        budget: f64,
        times: BTreeMap<NodeIndex, f64>,
    ) -> Self {
        let graph = network.graph();
        let mut segments: Vec<EdgeIndex> = times
            .keys()
            .flat_map(|&node| graph.edges(node))
            .filter(|edge| times.contains_key(&edge.target()))
            .map(|edge| edge.id())
            .collect();
        segments.sort_unstable();

        Self {
            source,
            budget,
            times,
            segments,
        }
    }
}

/// Computes every node whose shortest travel time from `source` is at most
/// `budget` minutes, along with the segments joining them.
///
/// A node exactly at the budget is included; paths are cut as soon as their
/// cost would exceed it, so the search never explores beyond the ball.
pub fn reachable(
    network: &TimeWeightedNetwork,
    source: NodeIndex,
    budget: f64,
) -> Result<ReachableSubgraph> {
    validate_budget(budget)?;
    if !network.contains(source) {
        return Err(Error::NodeNotFound(format!("index {}", source.index())));
    }

    let start_time = Instant::now();
    let times: BTreeMap<NodeIndex, f64> = bounded_travel_times(network, source, budget)
        .into_iter()
        .collect();
    let subgraph = ReachableSubgraph::induced(network, source, budget, times);

    debug!(
        "Reached {} nodes and {} segments within {budget} min in {:?}",
        subgraph.node_count(),
        subgraph.segment_count(),
        start_time.elapsed()
    );

    Ok(subgraph)
}

/// Dijkstra over segment travel times, pruned at `max_cost`.
fn bounded_travel_times(
    network: &TimeWeightedNetwork,
    start: NodeIndex,
    max_cost: f64,
) -> HashMap<NodeIndex, f64> {
    let graph = network.graph();
    let mut distances: HashMap<NodeIndex, f64> = HashMap::new();
    let mut heap = BinaryHeap::new();

    distances.insert(start, 0.0);
    heap.push(State {
        cost: 0.0,
        node: start,
    });

    while let Some(State { cost, node }) = heap.pop() {
        // Skip if we've found a better path
        if distances.get(&node).is_some_and(|&best| cost > best) {
            continue;
        }

        for edge in graph.edges(node) {
            let next = edge.target();
            let next_cost = cost + edge.weight().travel_time;
            if next_cost > max_cost {
                continue;
            }

            if distances.get(&next).map_or(true, |&best| next_cost < best) {
                distances.insert(next, next_cost);
                heap.push(State {
                    cost: next_cost,
                    node: next,
                });
            }
        }
    }

    distances
}

fn validate_budget(budget: f64) -> Result<()> {
    if budget.is_finite() && budget >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidBudget(budget))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{RawNetwork, RawSegment};

    // 60 km/h makes 1000m take exactly one minute.
    const SPEED: f64 = 60.0;

    /// 1 -> 2 -> 3 -> 4 chain (1, 2 and 3 minutes), a 1 -> 3 shortcut of
    /// 2.5 minutes, and node 5 with no connection at all.
    fn chain_network() -> TimeWeightedNetwork {
        let mut raw = RawNetwork::new();
        raw.add_node(1, 0.0, 0.0)
            .add_node(2, 0.0, 0.01)
            .add_node(3, 0.0, 0.02)
            .add_node(4, 0.0, 0.03)
            .add_node(5, 1.0, 1.0)
            .add_segment(RawSegment::new(1, 2, 1000.0))
            .add_segment(RawSegment::new(2, 3, 2000.0))
            .add_segment(RawSegment::new(3, 4, 3000.0))
            .add_segment(RawSegment::new(1, 3, 2500.0))
            .add_segment(RawSegment::new(4, 1, 1000.0));
        TimeWeightedNetwork::new(raw, SPEED).unwrap()
    }

    fn ids(network: &TimeWeightedNetwork, subgraph: &ReachableSubgraph) -> Vec<i64> {
        subgraph.nodes().map(|n| network.graph()[n].id).collect()
    }

    #[test]
    fn test_zero_budget_is_source_only() {
        let network = chain_network();
        let source = network.node_index(1).unwrap();
        let subgraph = reachable(&network, source, 0.0).unwrap();

        assert_eq!(ids(&network, &subgraph), vec![1]);
        assert_eq!(subgraph.segment_count(), 0);
        assert_eq!(subgraph.time_to(source), Some(0.0));
    }

    #[test]
    fn test_isolated_source_is_singleton() {
        let network = chain_network();
        let source = network.node_index(5).unwrap();
        let subgraph = reachable(&network, source, 1_000.0).unwrap();

        assert_eq!(ids(&network, &subgraph), vec![5]);
        assert!(subgraph.segments().is_empty());
    }

    #[test]
    fn test_budget_boundary_is_inclusive() {
        let network = chain_network();
        let source = network.node_index(1).unwrap();

        let subgraph = reachable(&network, source, 2.5).unwrap();
        assert_eq!(ids(&network, &subgraph), vec![1, 2, 3]);
        assert_eq!(subgraph.time_to(network.node_index(3).unwrap()), Some(2.5));

        let subgraph = reachable(&network, source, 2.4).unwrap();
        assert_eq!(ids(&network, &subgraph), vec![1, 2]);
    }

    #[test]
    fn test_segments_are_node_induced() {
        let network = chain_network();
        let source = network.node_index(1).unwrap();
        let subgraph = reachable(&network, source, 3.0).unwrap();

        // 1->2, 2->3 and 1->3; 3->4 leads beyond the budget
        assert_eq!(subgraph.segment_count(), 3);
        for &edge in subgraph.segments() {
            let (from, to) = network.graph().edge_endpoints(edge).unwrap();
            assert!(subgraph.contains(from) && subgraph.contains(to));
        }
        assert!(subgraph.contains_segment(EdgeIndex::new(3)));
        assert!(!subgraph.contains_segment(EdgeIndex::new(2)));
    }

    #[test]
    fn test_reachable_set_grows_with_budget() {
        let network = chain_network();
        let source = network.node_index(1).unwrap();

        let mut previous = reachable(&network, source, 0.0).unwrap();
        for budget in [0.5, 1.0, 2.0, 2.5, 4.0, 5.5, 100.0] {
            let current = reachable(&network, source, budget).unwrap();
            assert!(previous.nodes().all(|n| current.contains(n)));
            previous = current;
        }
        assert_eq!(ids(&network, &previous), vec![1, 2, 3, 4]);
        assert_eq!(previous.segment_count(), 5);
    }

    #[test]
    fn test_restrict_matches_direct_computation() {
        let network = chain_network();
        let source = network.node_index(1).unwrap();
        let full = reachable(&network, source, 10.0).unwrap();

        for budget in [0.0, 1.0, 2.5, 5.5, 10.0] {
            let direct = reachable(&network, source, budget).unwrap();
            assert_eq!(full.restrict(&network, budget).unwrap(), direct);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let network = chain_network();
        let source = network.node_index(1).unwrap();

        assert_eq!(
            reachable(&network, source, -1.0).unwrap_err(),
            Error::InvalidBudget(-1.0)
        );
        assert!(matches!(
            reachable(&network, NodeIndex::new(42), 5.0),
            Err(Error::NodeNotFound(_))
        ));
    }
}
