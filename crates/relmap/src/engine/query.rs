use super::{
    assemble::{assemble, row_key, synthetic_key},
    plan::{Plan, ALIAS_SEPARATOR, ROOT_ALIAS},
    rewrite::Rewritten,
};
use crate::{Connection, Error, Key, Relationship, Result, Row, Schema, Value};

use indexmap::IndexMap;
use relmap_core::schema::{ManyToMany, TableMapping};
use std::fmt::Write;
use tracing::debug;

/// Upper bound on the number of keys constrained by one statement.
const MAX_KEYS_PER_QUERY: usize = 500;

/// Loads nested rows: plans the joins of a mapping, rewrites the caller's
/// SQL against them and assembles the results.
#[derive(Debug)]
pub(crate) struct QueryEngine<'a> {
    schema: &'a Schema,
    connection: &'a mut dyn Connection,
}

impl<'a> QueryEngine<'a> {
    pub(crate) fn new(schema: &'a Schema, connection: &'a mut dyn Connection) -> Self {
        Self { schema, connection }
    }

    #[tracing::instrument(skip_all, fields(table = %mapping.table))]
    pub(crate) async fn query(
        &mut self,
        mapping: &TableMapping,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<Row>> {
        let plan = Plan::new(self.schema, mapping);
        let stmt = Rewritten::new(&plan, sql)?;

        if stmt.paginated && plan.fans_out() {
            return self.query_paginated(mapping, &plan, &stmt, params).await;
        }

        let sql = format!("SELECT {} FROM {}{}", stmt.select, plan.from_clause(), stmt.tail);
        let rows = self.run(&sql, params).await?;

        Ok(assemble(&plan, rows))
    }

    /// A row limit must count root rows rather than joined rows, so the
    /// root keys are selected first and their nested rows loaded after.
    async fn query_paginated(
        &mut self,
        mapping: &TableMapping,
        plan: &Plan<'_>,
        stmt: &Rewritten,
        params: &[Value],
    ) -> Result<Vec<Row>> {
        let from = if stmt.references_joins {
            plan.from_clause()
        } else {
            plan.root_from_clause()
        };

        debug!(
            table = %mapping.table,
            joins = stmt.references_joins,
            "relmap.query.two_pass"
        );

        let sql = format!("SELECT DISTINCT {} FROM {from}{}", plan.key_items(), stmt.tail);
        let key_rows = self
            .run(&sql, params.get(stmt.select_params..).unwrap_or_default())
            .await?;

        if key_rows.is_empty() {
            return Ok(vec![]);
        }

        let keys = key_rows
            .iter()
            .map(|row| read_key(mapping, row))
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .select_keys(
                plan,
                &stmt.select,
                params.get(..stmt.select_params).unwrap_or(params),
                &keys,
                stmt.order_by.as_deref().unwrap_or(""),
                params.get(stmt.order_by_params.clone()).unwrap_or_default(),
            )
            .await?;

        let mut by_key: IndexMap<String, Row> = rows
            .into_iter()
            .map(|row| (row_key(mapping, &row), row))
            .collect();

        let mut ordered = Vec::with_capacity(by_key.len());
        for key in &keys {
            if let Some(row) = by_key.shift_remove(&synthetic_key(key.values())) {
                ordered.push(row);
            }
        }
        ordered.extend(by_key.into_values());

        Ok(ordered)
    }

    /// Loads the row with primary key `key`.
    pub(crate) async fn fetch(&mut self, mapping: &TableMapping, key: &Key) -> Result<Row> {
        mapping.check_key(key)?;

        let plan = Plan::new(self.schema, mapping);
        let mut rows = self
            .select_keys(&plan, &plan.select_items(), &[], std::slice::from_ref(key), "", &[])
            .await?;

        match rows.pop() {
            Some(row) => Ok(row),
            None => Err(Error::record_not_found(&mapping.table, key.clone())),
        }
    }

    /// Loads the rows with primary keys `keys`, in the order of `keys`.
    pub(crate) async fn multi_fetch(
        &mut self,
        mapping: &TableMapping,
        keys: &[Key],
        ignore_missing: bool,
    ) -> Result<Vec<Row>> {
        for key in keys {
            mapping.check_key(key)?;
        }

        if keys.is_empty() {
            return Ok(vec![]);
        }

        let plan = Plan::new(self.schema, mapping);
        let rows = self
            .select_keys(&plan, &plan.select_items(), &[], keys, "", &[])
            .await?;

        let by_key: IndexMap<String, Row> = rows
            .into_iter()
            .map(|row| (row_key(mapping, &row), row))
            .collect();

        let mut found = Vec::with_capacity(keys.len());

        for key in keys {
            match by_key.get(&synthetic_key(key.values())) {
                Some(row) => found.push(row.clone()),
                None if ignore_missing => {}
                None => return Err(Error::record_not_found(&mapping.table, key.clone())),
            }
        }

        Ok(found)
    }

    /// Loads the flat rows related to `parents` through `relationship`,
    /// without their own relationships.
    pub(crate) async fn fetch_related(
        &mut self,
        relationship: &Relationship,
        parents: &[&Row],
    ) -> Result<Vec<Row>> {
        let target = self.schema.mapping(relationship.target());
        let mut rows = vec![];

        for chunk in parents.chunks(MAX_KEYS_PER_QUERY) {
            let Some((sql, params)) = related_query(target, relationship, chunk) else {
                continue;
            };

            let results = self.run(&sql, &params).await?;
            rows.extend(results.into_iter().map(strip_alias));
        }

        Ok(rows)
    }

    /// Runs `SELECT {select} FROM {joins} WHERE {key condition}{trailing}`
    /// for every chunk of `keys` and assembles the results.
    async fn select_keys(
        &mut self,
        plan: &Plan<'_>,
        select: &str,
        leading: &[Value],
        keys: &[Key],
        trailing_sql: &str,
        trailing: &[Value],
    ) -> Result<Vec<Row>> {
        let key_columns: Vec<String> = plan
            .root()
            .mapping
            .primary_key
            .iter()
            .map(|column| format!("{ROOT_ALIAS}.{column}"))
            .collect();

        let width = key_columns.len().max(1);
        let budget = self
            .connection
            .capability()
            .max_params
            .saturating_sub(leading.len() + trailing.len());
        let chunk_size = (budget / width).clamp(1, MAX_KEYS_PER_QUERY);

        let from = plan.from_clause();
        let mut rows = vec![];

        for chunk in keys.chunks(chunk_size) {
            let sql = format!(
                "SELECT {select} FROM {from} WHERE {}{trailing_sql}",
                key_condition(&key_columns, chunk.len())
            );

            let mut params = leading.to_vec();
            params.extend(chunk.iter().flat_map(|key| key.values().iter().cloned()));
            params.extend_from_slice(trailing);

            let results = self.run(&sql, &params).await?;
            rows.extend(assemble(plan, results));
        }

        Ok(rows)
    }

    async fn run(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        debug!(sql = %sql, params = params.len(), "relmap.query");
        self.connection.query(sql, params).await
    }
}

/// `a.x IN (?, ?)` for a single column, otherwise
/// `((a.x = ? AND a.y = ?) OR (a.x = ? AND a.y = ?))`.
fn key_condition<S: AsRef<str>>(columns: &[S], count: usize) -> String {
    if let [column] = columns {
        let placeholders = vec!["?"; count].join(", ");
        return format!("{} IN ({placeholders})", column.as_ref());
    }

    let group = columns
        .iter()
        .map(|column| format!("{} = ?", column.as_ref()))
        .collect::<Vec<_>>()
        .join(" AND ");

    let groups = vec![format!("({group})"); count].join(" OR ");
    format!("({groups})")
}

fn read_key(mapping: &TableMapping, row: &Row) -> Result<Key> {
    mapping
        .primary_key
        .iter()
        .map(|column| {
            row.get(&format!("{ROOT_ALIAS}{ALIAS_SEPARATOR}{column}"))
                .cloned()
                .ok_or_else(|| {
                    Error::invalid_statement(format!(
                        "key column `{column}` of `{}` missing from results",
                        mapping.table
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()
        .map(Key::new)
}

/// `a.id AS a__id, ...` over the columns of one table
fn flat_items(mapping: &TableMapping) -> String {
    mapping
        .columns
        .iter()
        .map(|column| format!("{ROOT_ALIAS}.{column} AS {ROOT_ALIAS}{ALIAS_SEPARATOR}{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn strip_alias(row: Row) -> Row {
    let prefix = format!("{ROOT_ALIAS}{ALIAS_SEPARATOR}");

    row.into_parts()
        .0
        .into_iter()
        .map(|(name, value)| match name.strip_prefix(&prefix) {
            Some(column) => (column.to_string(), value),
            None => (name, value),
        })
        .collect()
}

/// Values of the `columns` of each parent that holds all of them, flattened.
fn parent_values(parents: &[&Row], columns: &[&str]) -> Vec<Value> {
    let mut params = vec![];

    for parent in parents {
        let values: Option<Vec<Value>> = columns
            .iter()
            .map(|column| parent.get(column).filter(|v| !v.is_null()).cloned())
            .collect();

        if let Some(values) = values {
            params.extend(values);
        }
    }

    params
}

/// Selects the rows of `target` related to `parents`; `None` when no parent
/// holds the columns the relationship correlates on.
fn related_query(
    target: &TableMapping,
    relationship: &Relationship,
    parents: &[&Row],
) -> Option<(String, Vec<Value>)> {
    let (sql, params) = if let Some(many_to_many) = relationship.as_many_to_many() {
        related_through_link(target, many_to_many, parents)
    } else {
        let foreign_key = relationship.child_foreign_key()?;

        let targets: Vec<&str> = foreign_key.targets().collect();
        let params = parent_values(parents, &targets);

        let sources: Vec<String> = foreign_key
            .sources()
            .map(|column| format!("{ROOT_ALIAS}.{column}"))
            .collect();

        let mut sql = format!(
            "SELECT {} FROM {} {ROOT_ALIAS} WHERE {}",
            flat_items(target),
            target.table,
            key_condition(&sources, params.len() / sources.len().max(1))
        );

        for filter in relationship.filters() {
            let _ = write!(
                sql,
                " AND {ROOT_ALIAS}.{} = {}",
                filter.column,
                filter.value.to_sql_literal()
            );
        }

        (sql, params)
    };

    (!params.is_empty()).then_some((sql, params))
}

fn related_through_link(
    target: &TableMapping,
    many_to_many: &ManyToMany,
    parents: &[&Row],
) -> (String, Vec<Value>) {
    let link = ManyToMany::link_alias(ROOT_ALIAS);
    let parent_key = &many_to_many.link.parent;
    let child_key = &many_to_many.link.child;

    let targets: Vec<&str> = parent_key.targets().collect();
    let params = parent_values(parents, &targets);

    let on = child_key
        .fields
        .iter()
        .map(|field| format!("{ROOT_ALIAS}.{} = {link}.{}", field.target, field.source))
        .collect::<Vec<_>>()
        .join(" AND ");

    let link_columns: Vec<String> = parent_key
        .sources()
        .map(|column| format!("{link}.{column}"))
        .collect();

    let sql = format!(
        "SELECT DISTINCT {} FROM {} {ROOT_ALIAS} JOIN {} {link} ON {on} WHERE {}",
        flat_items(target),
        target.table,
        many_to_many.link.table,
        key_condition(&link_columns, params.len() / link_columns.len().max(1))
    );

    (sql, params)
}
