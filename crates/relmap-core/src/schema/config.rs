//! Declarative schema description, loaded with serde.
//!
//! ```json
//! {
//!   "tables": [
//!     {
//!       "name": "parent",
//!       "primary_key": ["id"],
//!       "relationships": [
//!         {
//!           "kind": "one_to_many",
//!           "member": "children",
//!           "target": "child",
//!           "foreign_key": { "parent_id": "id" }
//!         }
//!       ]
//!     },
//!     { "name": "child" }
//!   ]
//! }
//! ```
//!
//! Relationship targets are table names. Tables referenced only as targets
//! must still be listed.

use super::{Builder, ManyToMany, ManyToOne, MappingId, OneToMany, OneToOne, Relationship};
use crate::{Error, Result, Value};

use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    pub tables: Vec<TableConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    /// Table name
    pub name: String,

    /// Columns; read from the database when omitted
    #[serde(default)]
    pub columns: Option<Vec<String>>,

    /// Primary key columns; read from the database when omitted
    #[serde(default)]
    pub primary_key: Option<Vec<String>>,

    #[serde(default)]
    pub auto_increment: Option<String>,

    #[serde(default)]
    pub relationships: Vec<RelationshipConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipConfig {
    OneToOne(ChildKeyConfig),
    OneToMany(ChildKeyConfig),
    ManyToOne(ParentKeyConfig),
    ManyToMany(LinkConfig),
}

/// A relationship whose child table holds the foreign key.
#[derive(Debug, Clone, Deserialize)]
pub struct ChildKeyConfig {
    pub member: String,
    pub target: String,

    /// Child column to parent column
    pub foreign_key: IndexMap<String, String>,

    /// Child column to a JSON scalar
    #[serde(default)]
    pub filters: IndexMap<String, serde_json::Value>,

    #[serde(default)]
    pub max_depth: Option<usize>,

    #[serde(default)]
    pub cascade: Option<bool>,
}

/// A relationship whose parent table holds the foreign key.
#[derive(Debug, Clone, Deserialize)]
pub struct ParentKeyConfig {
    pub member: String,
    pub target: String,

    /// Parent column to child column
    pub foreign_key: IndexMap<String, String>,

    #[serde(default)]
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    pub member: String,
    pub target: String,
    pub link_table: String,

    /// Link column to parent column
    pub parent_key: IndexMap<String, String>,

    /// Link column to child column
    pub child_key: IndexMap<String, String>,

    #[serde(default)]
    pub max_depth: Option<usize>,

    #[serde(default)]
    pub cascade: Option<bool>,
}

impl SchemaConfig {
    pub fn from_json(src: &str) -> Result<Self> {
        serde_json::from_str(src)
            .map_err(|err| Error::invalid_schema(format!("malformed schema config: {err}")))
    }

    pub(super) fn apply(&self, builder: &mut Builder) -> Result<()> {
        // Declare every table first so relationships may point forward.
        let ids: Vec<MappingId> = self
            .tables
            .iter()
            .map(|table| builder.mapping(table.name.as_str()))
            .collect();

        for (table, id) in self.tables.iter().zip(ids) {
            if let Some(columns) = &table.columns {
                builder.columns(id, columns);
            }

            if let Some(primary_key) = &table.primary_key {
                builder.primary_key(id, primary_key);
            }

            if let Some(column) = &table.auto_increment {
                builder.auto_increment(id, column);
            }

            for relationship in &table.relationships {
                let relationship = relationship.to_relationship(builder, &table.name)?;
                builder.relate(id, relationship);
            }
        }

        Ok(())
    }
}

impl RelationshipConfig {
    fn to_relationship(&self, builder: &Builder, table: &str) -> Result<Relationship> {
        Ok(match self {
            Self::OneToOne(config) => {
                let mut rel = OneToOne::new(&config.member, target(builder, table, &config.target)?);
                for (child, parent) in &config.foreign_key {
                    rel = rel.foreign_key(child, parent);
                }
                for (column, value) in &config.filters {
                    rel = rel.filter(column, filter_value(column, value)?);
                }
                if let Some(max_depth) = config.max_depth {
                    rel = rel.max_depth(max_depth);
                }
                if let Some(cascade) = config.cascade {
                    rel = rel.cascade(cascade);
                }
                rel.into()
            }
            Self::OneToMany(config) => {
                let mut rel = OneToMany::new(&config.member, target(builder, table, &config.target)?);
                for (child, parent) in &config.foreign_key {
                    rel = rel.foreign_key(child, parent);
                }
                for (column, value) in &config.filters {
                    rel = rel.filter(column, filter_value(column, value)?);
                }
                if let Some(max_depth) = config.max_depth {
                    rel = rel.max_depth(max_depth);
                }
                if let Some(cascade) = config.cascade {
                    rel = rel.cascade(cascade);
                }
                rel.into()
            }
            Self::ManyToOne(config) => {
                let mut rel = ManyToOne::new(&config.member, target(builder, table, &config.target)?);
                for (parent, child) in &config.foreign_key {
                    rel = rel.foreign_key(parent, child);
                }
                if let Some(max_depth) = config.max_depth {
                    rel = rel.max_depth(max_depth);
                }
                rel.into()
            }
            Self::ManyToMany(config) => {
                let mut rel = ManyToMany::new(
                    &config.member,
                    target(builder, table, &config.target)?,
                    &config.link_table,
                );
                for (link, parent) in &config.parent_key {
                    rel = rel.parent_key(link, parent);
                }
                for (link, child) in &config.child_key {
                    rel = rel.child_key(link, child);
                }
                if let Some(max_depth) = config.max_depth {
                    rel = rel.max_depth(max_depth);
                }
                if let Some(cascade) = config.cascade {
                    rel = rel.cascade(cascade);
                }
                rel.into()
            }
        })
    }
}

fn target(builder: &Builder, table: &str, target: &str) -> Result<MappingId> {
    builder.lookup(target).ok_or_else(|| {
        Error::invalid_schema(format!(
            "relationship on `{table}` targets unknown table `{target}`"
        ))
    })
}

fn filter_value(column: &str, value: &serde_json::Value) -> Result<Value> {
    use serde_json::Value as Json;

    Ok(match value {
        Json::Null => Value::Null,
        Json::Bool(v) => Value::Bool(*v),
        Json::Number(v) => match (v.as_i64(), v.as_f64()) {
            (Some(v), _) => Value::I64(v),
            (None, Some(v)) => Value::F64(v),
            _ => {
                return Err(Error::invalid_schema(format!(
                    "filter `{column}` holds an out-of-range number"
                )))
            }
        },
        Json::String(v) => Value::String(v.clone()),
        Json::Array(_) | Json::Object(_) => {
            return Err(Error::invalid_schema(format!(
                "filter `{column}` must be a scalar"
            )))
        }
    })
}
