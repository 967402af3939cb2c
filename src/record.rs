use std::collections::HashMap;

use crate::data::osm::{EntityMeta, Node, OsmId, Tag, Way};
use crate::errors::Result;
use crate::schema::{self, Coordinate, FieldValue};
use crate::tags;

const NODE_REF_SEPARATOR: char = ';';

/// Joins way node references into the `nodes` field value, e.g. `1;2;3`.
pub fn encode_node_refs(refs: &[OsmId]) -> String {
    refs.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(&NODE_REF_SEPARATOR.to_string())
}

pub fn decode_node_refs(encoded: &str) -> Result<Vec<OsmId>> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }
    let mut refs = Vec::new();
    for token in encoded.split(NODE_REF_SEPARATOR) {
        refs.push(token.parse()?);
    }
    Ok(refs)
}

/// A node stored against the node schema.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: OsmId,
    pub visible: bool,
    pub version: i32,
    pub timestamp: i64,
    pub tags: Option<String>,
    pub changeset: i64,
    pub user: String,
    pub location: Coordinate,
}

impl NodeRecord {
    pub fn values(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("visible", FieldValue::Boolean(self.visible)),
            ("version", FieldValue::Integer(self.version)),
            ("timestamp", FieldValue::Long(self.timestamp)),
            ("tags", FieldValue::String(self.tags.clone())),
            ("changeset", FieldValue::Long(self.changeset)),
            ("user", FieldValue::String(Some(self.user.clone()))),
            ("location", FieldValue::Point(self.location)),
        ]
    }

    pub fn tags(&self) -> Vec<Tag> {
        tags::decode(self.tags.as_deref())
    }
}

/// A way stored against the way schema.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub struct WayRecord {
    pub id: OsmId,
    pub visible: bool,
    pub version: i32,
    pub timestamp: i64,
    pub tags: Option<String>,
    pub changeset: i64,
    pub user: String,
    pub nodes: String,
    pub way: Vec<Coordinate>,
}

impl WayRecord {
    pub fn values(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("visible", FieldValue::Boolean(self.visible)),
            ("version", FieldValue::Integer(self.version)),
            ("timestamp", FieldValue::Long(self.timestamp)),
            ("tags", FieldValue::String(self.tags.clone())),
            ("changeset", FieldValue::Long(self.changeset)),
            ("user", FieldValue::String(Some(self.user.clone()))),
            ("nodes", FieldValue::String(Some(self.nodes.clone()))),
            ("way", FieldValue::LineString(self.way.clone())),
        ]
    }

    pub fn tags(&self) -> Vec<Tag> {
        tags::decode(self.tags.as_deref())
    }

    pub fn node_refs(&self) -> Result<Vec<OsmId>> {
        decode_node_refs(&self.nodes)
    }
}

/// Every record produced by one import.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Default, Clone)]
pub struct RecordSet {
    pub nodes: Vec<NodeRecord>,
    pub ways: Vec<WayRecord>,
}

pub fn node_record(node: &Node) -> Result<NodeRecord> {
    let EntityMeta { id, visible, version, timestamp, changeset, ref user } = node.meta;
    let record = NodeRecord {
        id,
        visible,
        version,
        timestamp,
        tags: tags::encode(&node.tags),
        changeset,
        user: user.clone(),
        location: Coordinate { lon: node.lon, lat: node.lat },
    };
    schema::node_schema()?.check(&record.values())?;
    Ok(record)
}

/// Builds a way record, resolving its geometry from `nodes`.
///
/// Fails if a referenced node is unknown or the line has fewer than two
/// points.
pub fn way_record(way: &Way, nodes: &HashMap<OsmId, Node>) -> Result<WayRecord> {
    let mut line = Vec::with_capacity(way.nodes.len());
    for node_id in &way.nodes {
        let node = nodes
            .get(node_id)
            .ok_or_else(|| format!("way {} references missing node {}", way.meta.id, node_id))?;
        line.push(Coordinate { lon: node.lon, lat: node.lat });
    }
    if line.len() < 2 {
        return Err(format!("way {} has {} nodes, need at least 2", way.meta.id, line.len()).into());
    }

    let EntityMeta { id, visible, version, timestamp, changeset, ref user } = way.meta;
    let record = WayRecord {
        id,
        visible,
        version,
        timestamp,
        tags: tags::encode(&way.tags),
        changeset,
        user: user.clone(),
        nodes: encode_node_refs(&way.nodes),
        way: line,
    };
    schema::way_schema()?.check(&record.values())?;
    Ok(record)
}
