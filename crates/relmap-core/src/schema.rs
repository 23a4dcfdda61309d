mod builder;
pub use builder::Builder;

mod column;
pub use column::Column;

pub mod config;
pub use config::SchemaConfig;

mod fk;
pub use fk::{ForeignKey, ForeignKeyField, StaticFilter};

mod mapping;
pub use mapping::{MappingId, TableMapping};

pub mod relation;
pub use relation::{
    LinkTable, ManyToMany, ManyToOne, OneToMany, OneToOne, Relationship, DEFAULT_MAX_DEPTH,
};

mod table;
pub use table::Table;

mod verify;

/// The set of table mappings known to a database handle.
///
/// Mappings refer to each other by [`MappingId`], so relationships may point
/// back at their own mapping. A built schema is immutable and can be shared
/// between connections.
#[derive(Debug)]
pub struct Schema {
    mappings: Vec<TableMapping>,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Get a mapping by ID
    pub fn mapping(&self, id: impl Into<MappingId>) -> &TableMapping {
        &self.mappings[id.into().0]
    }

    /// Get a mapping by the name of the table it maps
    pub fn mapping_by_table(&self, table: &str) -> Option<&TableMapping> {
        self.mappings.iter().find(|mapping| mapping.table == table)
    }

    pub fn mappings(&self) -> impl ExactSizeIterator<Item = &TableMapping> + '_ {
        self.mappings.iter()
    }
}
