use std::collections::HashSet;
use std::str::FromStr;

use super::{FieldDescriptor, FieldType, SchemaDescriptor, SchemaError};

const SRID_OPTION: &str = "srid=";

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Boolean" => Ok(FieldType::Boolean),
            "Integer" => Ok(FieldType::Integer),
            "Long" => Ok(FieldType::Long),
            "Double" => Ok(FieldType::Double),
            "String" => Ok(FieldType::String),
            "Point" => Ok(FieldType::Point),
            "LineString" => Ok(FieldType::LineString),
            _ => Err(SchemaError::UnknownType(s.to_string())),
        }
    }
}

fn parse_field(part: &str) -> Result<FieldDescriptor, SchemaError> {
    let mut pieces = part.split(':').map(str::trim);

    let name = pieces
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| SchemaError::InvalidField(part.to_string()))?;
    let field_type: FieldType = pieces
        .next()
        .ok_or_else(|| SchemaError::InvalidField(part.to_string()))?
        .parse()?;

    let mut srid = None;
    for option in pieces {
        let code = option
            .strip_prefix(SRID_OPTION)
            .filter(|_| field_type.is_geometry())
            .ok_or_else(|| SchemaError::InvalidOption(part.to_string()))?;
        srid = Some(
            code.parse::<u32>()
                .map_err(|_| SchemaError::InvalidOption(part.to_string()))?,
        );
    }

    Ok(FieldDescriptor {
        name: name.to_string(),
        field_type,
        srid,
        crs: None,
    })
}

/// Builds a descriptor from a `name:Type[,name:Type]*` specification.
///
/// Geometry fields may carry `:srid=<code>`.
pub fn parse_type_spec(namespace: &str, name: &str, spec: &str) -> Result<SchemaDescriptor, SchemaError> {
    if spec.trim().is_empty() {
        return Err(SchemaError::EmptySpec);
    }

    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for part in spec.split(',') {
        let field = parse_field(part)?;
        if !seen.insert(field.name.clone()) {
            return Err(SchemaError::DuplicateField(field.name));
        }
        fields.push(field);
    }

    Ok(SchemaDescriptor::new(namespace, name, fields))
}
