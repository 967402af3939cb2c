use std::collections::HashMap;

use self::osm::{Node, OsmId, Way};

pub mod osm;

/// Map data as defined in the .osm file. Relations and other elements are
/// discarded, nodes and ways are kept without any processing.
#[derive(Debug, Default, Clone)]
pub struct OsmMapData {
    pub nodes: HashMap<OsmId, Node>,
    pub ways: HashMap<OsmId, Way>,
    /// Way ids in document order, so output is deterministic.
    pub way_order: Vec<OsmId>,
    /// Node ids in document order.
    pub node_order: Vec<OsmId>,
}

impl OsmMapData {
    pub fn add_node(&mut self, node: Node) {
        let id = node.meta.id;
        if self.nodes.insert(id, node).is_none() {
            self.node_order.push(id);
        }
    }

    pub fn add_way(&mut self, way: Way) {
        let id = way.meta.id;
        if self.ways.insert(id, way).is_none() {
            self.way_order.push(id);
        }
    }

    pub fn nodes_in_order(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn ways_in_order(&self) -> impl Iterator<Item = &Way> {
        self.way_order.iter().filter_map(|id| self.ways.get(id))
    }
}
