/// Element id. Editors such as JOSM give not-yet-uploaded elements
/// negative ids.
pub type OsmId = i64;

/// A single `k`/`v` pair from an OSM element. The key may be empty.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Tag {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Attributes shared by every OSM element.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub struct EntityMeta {
    pub id: OsmId,
    pub visible: bool,
    pub version: i32,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    pub changeset: i64,
    pub user: String,
}

impl EntityMeta {
    pub fn new(id: OsmId) -> Self {
        EntityMeta {
            id,
            visible: true,
            version: 0,
            timestamp: 0,
            changeset: 0,
            user: String::new(),
        }
    }
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub struct Node {
    pub meta: EntityMeta,
    pub lon: f64,
    pub lat: f64,
    pub tags: Vec<Tag>,
}

#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, PartialEq)]
pub struct Way {
    pub meta: EntityMeta,
    /// Node references in way order.
    pub nodes: Vec<OsmId>,
    pub tags: Vec<Tag>,
}
