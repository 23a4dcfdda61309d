use super::{MappingId, Relationship, Schema, SchemaConfig, Table, TableMapping};
use crate::{Connection, Error, Result};

use indexmap::{IndexMap, IndexSet};

/// Declares table mappings and their relationships, then validates them into
/// a [`Schema`].
///
/// Mappings are identified by table name: declaring the same table twice
/// returns the same [`MappingId`]. Column lists and primary keys left
/// undeclared are completed from the database by [`Builder::build_with`].
#[derive(Debug, Default)]
pub struct Builder {
    /// Maps table names to identifiers, which are handed out as soon as a
    /// table is declared so relationships can refer to it.
    table_lookup: IndexMap<String, MappingId>,

    /// Mappings as they are declared
    mappings: Vec<MappingDef>,
}

#[derive(Debug)]
struct MappingDef {
    table: String,
    columns: Option<Vec<String>>,
    primary_key: Option<Vec<String>>,
    auto_increment: Option<String>,
    relationships: Vec<Relationship>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a mapping for `table`, returning its identifier.
    pub fn mapping(&mut self, table: impl Into<String>) -> MappingId {
        let table = table.into();

        if let Some(id) = self.table_lookup.get(&table) {
            return *id;
        }

        let id = MappingId(self.mappings.len());
        self.table_lookup.insert(table.clone(), id);
        self.mappings.push(MappingDef {
            table,
            columns: None,
            primary_key: None,
            auto_increment: None,
            relationships: vec![],
        });
        id
    }

    /// Returns the identifier of an already declared table.
    pub fn lookup(&self, table: &str) -> Option<MappingId> {
        self.table_lookup.get(table).copied()
    }

    pub fn columns<I, S>(&mut self, id: MappingId, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def(id).columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn primary_key<I, S>(&mut self, id: MappingId, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.def(id).primary_key = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn auto_increment(&mut self, id: MappingId, column: impl Into<String>) -> &mut Self {
        self.def(id).auto_increment = Some(column.into());
        self
    }

    /// Appends a relationship to the mapping. Declaration order fixes the
    /// relationship's join alias.
    pub fn relate(&mut self, id: MappingId, relationship: impl Into<Relationship>) -> &mut Self {
        self.def(id).relationships.push(relationship.into());
        self
    }

    /// Declares every table and relationship described by `config`.
    pub fn load(&mut self, config: &SchemaConfig) -> Result<&mut Self> {
        config.apply(self)?;
        Ok(self)
    }

    /// Tables whose columns or primary key were not declared.
    pub fn incomplete_tables(&self) -> Vec<String> {
        self.mappings
            .iter()
            .filter(|def| def.columns.is_none() || def.primary_key.is_none())
            .map(|def| def.table.clone())
            .collect()
    }

    /// Fills in whatever the mapping for `table.name` left undeclared.
    pub fn apply_metadata(&mut self, table: &Table) -> &mut Self {
        let Some(id) = self.lookup(&table.name) else {
            return self;
        };

        let def = self.def(id);

        if def.columns.is_none() {
            def.columns = Some(table.columns.iter().map(|column| column.name.clone()).collect());
        }

        if def.primary_key.is_none() {
            def.primary_key = Some(table.primary_key.clone());
        }

        if def.auto_increment.is_none() {
            if let (Some(column), Some(primary_key)) = (table.auto_increment(), &def.primary_key) {
                if primary_key.len() == 1 && primary_key[0] == column.name {
                    def.auto_increment = Some(column.name.clone());
                }
            }
        }

        self
    }

    /// Completes undeclared columns and keys from `connection`, then builds.
    pub async fn build_with(mut self, connection: &mut dyn Connection) -> Result<Schema> {
        for table in self.incomplete_tables() {
            let metadata = connection
                .table_metadata(&table)
                .await
                .map_err(|err| err.context(format!("loading metadata for `{table}`")))?;

            self.apply_metadata(&metadata);
        }

        self.build()
    }

    pub fn build(self) -> Result<Schema> {
        let mut mappings = Vec::with_capacity(self.mappings.len());

        for (index, def) in self.mappings.into_iter().enumerate() {
            let Some(columns) = def.columns else {
                return Err(Error::invalid_schema(format!(
                    "table `{}` has no declared columns",
                    def.table
                )));
            };

            let primary_key = def.primary_key.unwrap_or_default();
            let mut columns: IndexSet<String> = columns.into_iter().collect();

            // Key columns are always selectable, even when left out of an
            // explicit column list.
            for column in &primary_key {
                columns.insert(column.clone());
            }

            mappings.push(TableMapping {
                id: MappingId(index),
                table: def.table,
                columns,
                primary_key,
                auto_increment: def.auto_increment,
                relationships: def.relationships,
            });
        }

        let schema = Schema { mappings };
        schema.verify()?;
        Ok(schema)
    }

    fn def(&mut self, id: MappingId) -> &mut MappingDef {
        &mut self.mappings[id.0]
    }
}
