//! # Entity Metadata
//!
//! Everything known about an entity type without touching a database.
//!
//! ## Modules
//! - [`column`] - Column descriptors and their builder
//! - [`table`] - Table descriptors and name derivation
//! - [`relation`] - Relation descriptors and ownership rules
//! - [`entity`] - The `Entity` trait and `EntityMetadata`
//! - [`registry`] - The thread-safe metadata cache
//! - [`inspector`] - Column/value extraction used by statement building

pub mod column;
pub mod entity;
pub mod inspector;
pub mod registry;
pub mod relation;
pub mod table;

pub use column::{ColumnBuilder, ColumnDescriptor, ColumnRole, DefaultValue, LengthOrValues, SqlEnum};
pub use entity::{Entity, EntityLike, EntityMetadata, EntityMetadataBuilder};
pub use inspector::{coerce, lookup, Inspector, WriteOptions};
pub use registry::MetadataRegistry;
pub use relation::{JoinColumn, JoinTable, RelationDescriptor};
pub use table::{derive_table_name, TableDescriptor};
