//! JSON Schema generation for the file formats the tool reads and writes.
//!
//! Schemas are generated using the schemars crate and can be exported via the `schema` subcommand.

use schemars::{schema_for, Schema};
use std::collections::BTreeMap;

/// Returns all JSON schemas.
/// Uses BTreeMap for deterministic ordering (important for diffable output).
pub fn all_schemas() -> BTreeMap<&'static str, Schema> {
    let mut schemas = BTreeMap::new();

    // catalog snapshot input (.yaml / .json)
    schemas.insert("catalog", schema_for!(crate::catalog::Catalog));

    // configuration file
    schemas.insert("config", schema_for!(crate::config::DescribeConfig));

    // describe --format json output
    schemas.insert("describe", schema_for!(crate::render::json::DescribeJson));

    schemas
}

/// Generate a single schema by name.
pub fn get_schema(name: &str) -> Option<Schema> {
    all_schemas().remove(name)
}

/// List all available schema names.
pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}
