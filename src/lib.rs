//! Storage of OpenStreetMap nodes and ways as typed records.
//!
//! [`tags`] packs an element's tags into a single string field, [`schema`]
//! holds the process-wide node and way schemas, and [`record`] and [`import`]
//! turn an `.osm` file into records matching those schemas.

pub mod config;
pub mod data;
pub mod errors;
pub mod import;
pub mod record;
pub mod schema;
pub mod tags;
