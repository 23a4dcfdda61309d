pub mod bulk;
pub use bulk::BulkDataManager;

pub mod db;
pub use db::Db;

mod engine;
pub use engine::SaveOperation;

pub use relmap_core::{
    async_trait, bail, driver, err, row,
    schema::{self, ManyToMany, ManyToOne, MappingId, OneToMany, OneToOne, Relationship},
    Connection, Error, Key, Related, Result, Row, Schema, Value,
};
