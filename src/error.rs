//! Error types for schema description.

use thiserror::Error;

/// Errors raised while configuring, introspecting or normalizing a schema.
///
/// Filtering, dangling-reference pruning and hook-signalled exclusion are
/// normal control paths and never produce one of these.
#[derive(Error, Debug)]
pub enum DescribeError {
    /// The comment delimiter was empty
    #[error("Configuration error: comment delimiter must not be empty")]
    EmptyDelimiter,

    /// An include/exclude sub-pattern failed to compile
    #[error("Configuration error: invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The relation map names a local table the catalog does not contain
    #[error("Configuration error: relation map references unknown table '{table}'")]
    UnknownRelationTable { table: String },

    /// The relation map names a local column the table does not have
    #[error("Configuration error: relation map references unknown column '{table}.{column}'")]
    UnknownRelationColumn { table: String, column: String },

    /// A relation map constraint has no column pairs
    #[error("Configuration error: relation '{constraint}' on table '{table}' has no columns")]
    EmptyRelation { table: String, constraint: String },

    /// Two foreign keys on one table share a constraint name
    #[error("Duplicate foreign key constraint '{name}' on table '{table}'")]
    DuplicateConstraint { table: String, name: String },

    /// Unknown value for the diagram column mode
    #[error("Configuration error: {0}")]
    Config(String),

    /// The DSN could not be parsed
    #[error("Invalid DSN '{dsn}': {source}")]
    InvalidDsn {
        dsn: String,
        #[source]
        source: url::ParseError,
    },

    /// No introspector exists for this DSN scheme
    #[error("Unsupported driver '{scheme}' (supported: duckdb, or a .sql/.yaml/.json catalog file)")]
    UnsupportedDriver { scheme: String },

    /// An introspector could not read its source
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// DuckDB catalog query error
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Spreadsheet workbook could not be written
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl DescribeError {
    /// Create a catalog error from anything printable
    pub fn catalog(message: impl Into<String>) -> Self {
        DescribeError::Catalog(message.into())
    }

    /// Whether this error stems from user configuration rather than the catalog source
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            DescribeError::EmptyDelimiter
                | DescribeError::InvalidPattern { .. }
                | DescribeError::UnknownRelationTable { .. }
                | DescribeError::UnknownRelationColumn { .. }
                | DescribeError::EmptyRelation { .. }
                | DescribeError::Config(_)
        )
    }
}

/// Result alias for library operations
pub type Result<T> = std::result::Result<T, DescribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_classification() {
        assert!(DescribeError::EmptyDelimiter.is_config());
        assert!(DescribeError::UnknownRelationTable {
            table: "t".to_string()
        }
        .is_config());
        assert!(!DescribeError::catalog("boom").is_config());
    }

    #[test]
    fn test_messages() {
        let err = DescribeError::DuplicateConstraint {
            table: "t_comment".to_string(),
            name: "fk_x".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Duplicate foreign key constraint 'fk_x' on table 't_comment'"
        );
    }
}
