//! Describe a relational database schema.
//!
//! A [`catalog::Introspector`] reads raw metadata, [`schema::SchemaBuilder`]
//! filters, normalizes and links it into an immutable [`schema::Schema`], and
//! the [`diagram`] and [`render`] modules turn that into DOT, JSON and HTML.

pub mod catalog;
pub mod comment;
pub mod config;
pub mod diagram;
pub mod error;
pub mod filter;
pub mod json_schema;
pub mod render;
pub mod schema;

pub use error::{DescribeError, Result};
