use log::info;
use once_cell::sync::OnceCell;

use super::crs::decode_crs;
use super::spec::parse_type_spec;
use super::{
    CoordinateReferenceSystem, SchemaDescriptor, SchemaError, GEOMETRY_CRS, NAMESPACE,
    NODE_TYPE_NAME, NODE_TYPE_SPEC, WAY_TYPE_NAME, WAY_TYPE_SPEC,
};

/// Builds the pieces a schema is made of.
pub(crate) trait SchemaFactory {
    fn create_type(&self, namespace: &str, name: &str, spec: &str) -> Result<SchemaDescriptor, SchemaError>;

    fn decode_crs(&self, code: &str, longitude_first: bool) -> Result<CoordinateReferenceSystem, SchemaError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DefaultSchemaFactory;

impl SchemaFactory for DefaultSchemaFactory {
    fn create_type(&self, namespace: &str, name: &str, spec: &str) -> Result<SchemaDescriptor, SchemaError> {
        parse_type_spec(namespace, name, spec)
    }

    fn decode_crs(&self, code: &str, longitude_first: bool) -> Result<CoordinateReferenceSystem, SchemaError> {
        decode_crs(code, longitude_first)
    }
}

/// Lazily built node and way schemas.
///
/// Each schema sits in its own cell: concurrent first requests for one kind
/// wait for a single construction, and a failed construction publishes
/// nothing so the next request tries again.
pub(crate) struct SchemaRegistry<F = DefaultSchemaFactory> {
    factory: F,
    node: OnceCell<SchemaDescriptor>,
    way: OnceCell<SchemaDescriptor>,
}

impl<F> SchemaRegistry<F> {
    pub(crate) const fn new(factory: F) -> Self {
        SchemaRegistry {
            factory,
            node: OnceCell::new(),
            way: OnceCell::new(),
        }
    }
}

impl<F: SchemaFactory> SchemaRegistry<F> {
    pub(crate) fn node_schema(&self) -> Result<&SchemaDescriptor, SchemaError> {
        self.node
            .get_or_try_init(|| self.build(NODE_TYPE_NAME, NODE_TYPE_SPEC))
    }

    pub(crate) fn way_schema(&self) -> Result<&SchemaDescriptor, SchemaError> {
        self.way
            .get_or_try_init(|| self.build(WAY_TYPE_NAME, WAY_TYPE_SPEC))
    }

    fn build(&self, name: &str, spec: &str) -> Result<SchemaDescriptor, SchemaError> {
        info!(schema = name; "Building schema");
        let schema = self.factory.create_type(NAMESPACE, name, spec)?;
        let crs = self.factory.decode_crs(GEOMETRY_CRS, true)?;
        schema.with_crs(crs)
    }
}

static REGISTRY: SchemaRegistry = SchemaRegistry::new(DefaultSchemaFactory);

/// The process-wide node schema.
///
/// This is the only node schema a process can hold; the registry behind it
/// can't be constructed from outside the crate.
///
/// ```compile_fail
/// use osm_records::schema::registry::{DefaultSchemaFactory, SchemaRegistry};
///
/// let second = SchemaRegistry::new(DefaultSchemaFactory);
/// ```
///
/// ```
/// let node = osm_records::schema::node_schema().unwrap();
/// assert!(std::ptr::eq(node, osm_records::schema::node_schema().unwrap()));
/// ```
pub fn node_schema() -> Result<&'static SchemaDescriptor, SchemaError> {
    REGISTRY.node_schema()
}

/// The process-wide way schema.
pub fn way_schema() -> Result<&'static SchemaDescriptor, SchemaError> {
    REGISTRY.way_schema()
}
