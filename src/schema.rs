//! Typed record schemas for OSM nodes and ways.
//!
//! The two descriptors are built lazily, once per process, and shared
//! read-only afterwards through [`node_schema`] and [`way_schema`].

use std::fmt;

pub mod crs;
pub mod registry;
pub mod spec;

pub use self::crs::{decode_crs, AxisOrder, CoordinateReferenceSystem, CrsKind};
pub use self::registry::{node_schema, way_schema};
pub use self::spec::parse_type_spec;

pub const NAMESPACE: &str = "www.openstreetmap.org";
pub const NODE_TYPE_NAME: &str = "node";
pub const WAY_TYPE_NAME: &str = "way";

pub const NODE_TYPE_SPEC: &str = "visible:Boolean,version:Integer,timestamp:Long,tags:String,\
     changeset:Long,user:String,location:Point:srid=4326";
pub const WAY_TYPE_SPEC: &str = "visible:Boolean,version:Integer,timestamp:Long,tags:String,\
     changeset:Long,user:String,nodes:String,way:LineString:srid=4326";

/// Reference system stamped onto both schemas' geometry fields.
pub const GEOMETRY_CRS: &str = "EPSG:4326";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    EmptySpec,
    InvalidField(String),
    UnknownType(String),
    InvalidOption(String),
    DuplicateField(String),
    InvalidCrs(String),
    UnknownCrs(String),
    NoGeometry(String),
    FieldMismatch(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::EmptySpec => write!(f, "Empty field specification"),
            SchemaError::InvalidField(s) => write!(f, "Invalid field definition: {}", s),
            SchemaError::UnknownType(s) => write!(f, "Unknown field type: {}", s),
            SchemaError::InvalidOption(s) => write!(f, "Invalid field option: {}", s),
            SchemaError::DuplicateField(s) => write!(f, "Duplicate field: {}", s),
            SchemaError::InvalidCrs(s) => write!(f, "Invalid reference system identifier: {}", s),
            SchemaError::UnknownCrs(s) => write!(f, "Unknown reference system: {}", s),
            SchemaError::NoGeometry(s) => write!(f, "Schema {} has no geometry field", s),
            SchemaError::FieldMismatch(s) => write!(f, "Record does not match schema: {}", s),
        }
    }
}

impl std::error::Error for SchemaError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Boolean,
    Integer,
    Long,
    Double,
    String,
    Point,
    LineString,
}

impl FieldType {
    pub fn is_geometry(self) -> bool {
        matches!(self, FieldType::Point | FieldType::LineString)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub srid: Option<u32>,
    pub crs: Option<CoordinateReferenceSystem>,
}

/// A longitude/latitude pair.
#[derive(rkyv::Archive, rkyv::Deserialize, rkyv::Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

/// A value for one schema field. Strings are nullable.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Double(f64),
    String(Option<String>),
    Point(Coordinate),
    LineString(Vec<Coordinate>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::Integer(_) => FieldType::Integer,
            FieldValue::Long(_) => FieldType::Long,
            FieldValue::Double(_) => FieldType::Double,
            FieldValue::String(_) => FieldType::String,
            FieldValue::Point(_) => FieldType::Point,
            FieldValue::LineString(_) => FieldType::LineString,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    namespace: String,
    name: String,
    fields: Vec<FieldDescriptor>,
    crs: Option<CoordinateReferenceSystem>,
}

impl SchemaDescriptor {
    pub fn new(namespace: &str, name: &str, fields: Vec<FieldDescriptor>) -> Self {
        SchemaDescriptor {
            namespace: namespace.to_string(),
            name: name.to_string(),
            fields,
            crs: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The first geometry-typed field.
    pub fn geometry_field(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.field_type.is_geometry())
    }

    pub fn crs(&self) -> Option<&CoordinateReferenceSystem> {
        self.crs.as_ref()
    }

    /// Returns a copy of this schema with `crs` applied to the schema and to
    /// every geometry field.
    pub fn with_crs(mut self, crs: CoordinateReferenceSystem) -> Result<Self, SchemaError> {
        if self.geometry_field().is_none() {
            return Err(SchemaError::NoGeometry(self.name));
        }
        for field in self.fields.iter_mut().filter(|f| f.field_type.is_geometry()) {
            field.srid = Some(crs.srid);
            field.crs = Some(crs.clone());
        }
        self.crs = Some(crs);
        Ok(self)
    }

    /// Checks that `values` names every field in order with a matching type.
    pub fn check(&self, values: &[(&str, FieldValue)]) -> Result<(), SchemaError> {
        if values.len() != self.fields.len() {
            return Err(SchemaError::FieldMismatch(format!(
                "{} expects {} fields, got {}",
                self.name,
                self.fields.len(),
                values.len()
            )));
        }
        for (field, (name, value)) in self.fields.iter().zip(values) {
            if field.name != *name {
                return Err(SchemaError::FieldMismatch(format!(
                    "expected field {}, got {}",
                    field.name, name
                )));
            }
            if field.field_type != value.field_type() {
                return Err(SchemaError::FieldMismatch(format!(
                    "field {} expects {:?}, got {:?}",
                    field.name,
                    field.field_type,
                    value.field_type()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_schema() -> SchemaDescriptor {
        parse_type_spec("ns", "poi", "name:String,where:Point").unwrap()
    }

    #[test]
    fn test_with_crs_stamps_geometry_fields() {
        let crs = decode_crs(GEOMETRY_CRS, true).unwrap();
        let schema = point_schema().with_crs(crs.clone()).unwrap();
        assert_eq!(schema.crs(), Some(&crs));
        let geometry = schema.geometry_field().unwrap();
        assert_eq!(geometry.srid, Some(4326));
        assert_eq!(geometry.crs.as_ref(), Some(&crs));
        assert!(schema.field("name").unwrap().crs.is_none());
    }

    #[test]
    fn test_with_crs_requires_geometry() {
        let crs = decode_crs(GEOMETRY_CRS, true).unwrap();
        let schema = parse_type_spec("ns", "plain", "name:String").unwrap();
        assert_eq!(
            schema.with_crs(crs),
            Err(SchemaError::NoGeometry("plain".to_string()))
        );
    }

    #[test]
    fn test_check() {
        let schema = point_schema();
        let at = Coordinate { lon: -0.1, lat: 51.5 };
        assert!(schema
            .check(&[("name", FieldValue::String(None)), ("where", FieldValue::Point(at))])
            .is_ok());
        assert!(matches!(
            schema.check(&[("name", FieldValue::String(None))]),
            Err(SchemaError::FieldMismatch(_))
        ));
        assert!(matches!(
            schema.check(&[("where", FieldValue::Point(at)), ("name", FieldValue::String(None))]),
            Err(SchemaError::FieldMismatch(_))
        ));
        assert!(matches!(
            schema.check(&[("name", FieldValue::Long(1)), ("where", FieldValue::Point(at))]),
            Err(SchemaError::FieldMismatch(_))
        ));
    }
}
