use std::fmt;

use geo::Point;
use petgraph::graph::NodeIndex;
use rstar::primitives::GeomWithData;
use rstar::RTree;

pub type IndexedNode = GeomWithData<[f64; 2], NodeIndex>;

/// R-tree over node positions answering planar nearest-node queries in
/// (lon, lat) space.
#[derive(Clone)]
pub struct NodeSpatialIndex {
    tree: RTree<IndexedNode>,
}

impl NodeSpatialIndex {
    pub fn new<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = (NodeIndex, Point<f64>)>,
    {
        let entries = nodes
            .into_iter()
            .map(|(index, position)| IndexedNode::new([position.x(), position.y()], index))
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Closest indexed node to `point`, or `None` when the index is empty.
    pub fn nearest(&self, point: Point<f64>) -> Option<NodeIndex> {
        self.tree
            .nearest_neighbor(&[point.x(), point.y()])
            .map(|node| node.data)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl fmt::Debug for NodeSpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpatialIndex")
            .field("len", &self.len())
            .finish()
    }
}
