//! Shared data models.

pub mod datasource;
pub mod query;
pub mod relationship;

// Re-export commonly used types
pub use datasource::{
    is_reserved_name, ConnectionParams, CreateDataSourceRequest, DataSource, DataSourceItem,
    DEFAULT_SOURCE_NAME,
};
pub use query::{DataSourceParam, PageRequest, QueryRequest, Row, TableDataParams};
pub use relationship::{Relationship, RelationshipMap, RelationshipType};
