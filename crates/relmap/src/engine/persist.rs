use super::{
    arena::{RowArena, RowId},
    assemble::{row_key, synthetic_key},
    query::QueryEngine,
    save_data::RelationshipSaveData,
};
use crate::{BulkDataManager, Connection, Error, Key, Result, Row, SaveOperation, Schema, Value};

use async_recursion::async_recursion;
use indexmap::IndexMap;
use relmap_core::schema::{ManyToMany, MappingId, Relationship, TableMapping};
use relmap_sql::stmt::{Filter, Update};
use std::collections::HashSet;
use tracing::debug;

/// Rows of a single statement's key list
const KEYS_PER_STATEMENT: usize = 500;

/// Writes and deletes nested rows, walking each mapping's relationships.
#[derive(Debug)]
pub(crate) struct PersistenceEngine<'a> {
    schema: &'a Schema,
    connection: &'a mut dyn Connection,
}

type Visited = HashSet<(MappingId, String)>;

impl<'a> PersistenceEngine<'a> {
    pub(crate) fn new(schema: &'a Schema, connection: &'a mut dyn Connection) -> Self {
        Self { schema, connection }
    }

    /// Saves `rows` and their nested rows. The rows are only updated (with
    /// generated keys and propagated foreign keys) once everything is
    /// written; on error they are left as they were.
    #[tracing::instrument(skip_all, fields(table = %mapping.table, rows = rows.len(), op = ?op))]
    pub(crate) async fn save_rows(&mut self, mapping: &TableMapping, rows: &mut [Row], op: SaveOperation) -> Result<()> {
        let mut arena = RowArena::default();
        let ids = arena.extend(rows.iter().cloned());

        self.save_nodes(&mut arena, mapping, &ids, op).await?;

        for (row, id) in rows.iter_mut().zip(ids) {
            *row = arena.take(id);
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, fields(table = %mapping.table, rows = rows.len()))]
    pub(crate) async fn delete_rows(&mut self, mapping: &TableMapping, rows: &[Row]) -> Result<()> {
        let rows: Vec<&Row> = rows.iter().collect();
        self.delete_nodes(mapping, &rows, &mut Visited::new()).await
    }

    #[async_recursion]
    async fn save_nodes(
        &mut self,
        arena: &mut RowArena,
        mapping: &TableMapping,
        ids: &[RowId],
        op: SaveOperation,
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let snapshot = match op {
            SaveOperation::Save => self.snapshot(arena, mapping, ids).await?,
            _ => IndexMap::new(),
        };

        let mut save_data = Vec::with_capacity(mapping.relationships.len());

        for relationship in &mapping.relationships {
            save_data.push(self.collect_children(arena, mapping, relationship, ids, &snapshot));
        }

        for data in &save_data {
            if let Some(many_to_one) = data.relationship.as_many_to_one() {
                let target = self.schema.mapping(many_to_one.target);
                self.save_nodes(arena, target, &data.all_child_rows, op).await?;

                let fields: Vec<(&str, &str)> = many_to_one
                    .foreign_key
                    .fields
                    .iter()
                    .map(|field| (field.source.as_str(), field.target.as_str()))
                    .collect();
                data.synchronise_parent_fields_from_child(arena, &fields);
            }
        }

        self.write_rows(arena, mapping, ids, op, &snapshot).await?;

        for data in &save_data {
            match data.relationship {
                Relationship::OneToOne(_) | Relationship::OneToMany(_) => {
                    self.save_owned_children(arena, data, op).await?;
                }
                Relationship::ManyToMany(many_to_many) => {
                    self.save_linked_children(arena, data, many_to_many, op).await?;
                }
                Relationship::ManyToOne(_) => {}
            }

            data.update_parent_member(arena);
        }

        Ok(())
    }

    /// Loads the stored version of every row holding a complete key, keyed
    /// by synthetic key.
    async fn snapshot(
        &mut self,
        arena: &RowArena,
        mapping: &TableMapping,
        ids: &[RowId],
    ) -> Result<IndexMap<String, Row>> {
        let keys: Vec<Key> = ids
            .iter()
            .filter_map(|&id| mapping.key_of(&arena[id]))
            .collect();

        if keys.is_empty() {
            return Ok(IndexMap::new());
        }

        let stored = QueryEngine::new(self.schema, &mut *self.connection)
            .multi_fetch(mapping, &keys, true)
            .await?;

        Ok(stored
            .into_iter()
            .map(|row| (row_key(mapping, &row), row))
            .collect())
    }

    /// Moves the rows under `relationship`'s member of each parent into the
    /// arena. Parents without the member take no part.
    fn collect_children<'r>(
        &self,
        arena: &mut RowArena,
        mapping: &TableMapping,
        relationship: &'r Relationship,
        ids: &[RowId],
        snapshot: &IndexMap<String, Row>,
    ) -> RelationshipSaveData<'r> {
        let member = relationship.member();
        let target = self.schema.mapping(relationship.target());
        let mut data = RelationshipSaveData::new(relationship);

        for &parent in ids {
            let Some(related) = arena[parent].remove_related(member) else {
                continue;
            };

            let children = arena.extend(related.into_rows());

            let previous = snapshot
                .get(&row_key(mapping, &arena[parent]))
                .and_then(|stored| stored.related(member))
                .filter(|_| relationship.as_many_to_one().is_none());

            if let Some(previous) = previous {
                let listed: HashSet<String> = children
                    .iter()
                    .filter_map(|&child| target.key_of(&arena[child]))
                    .map(|key| synthetic_key(key.values()))
                    .collect();

                for row in previous.rows() {
                    let Some(key) = target.key_of(row) else {
                        continue;
                    };

                    if !listed.contains(&synthetic_key(key.values())) {
                        data.removed.push((parent, row.clone()));
                    }
                }
            }

            data.add_child_rows(parent, children);
        }

        data
    }

    async fn write_rows(
        &mut self,
        arena: &mut RowArena,
        mapping: &TableMapping,
        ids: &[RowId],
        op: SaveOperation,
        snapshot: &IndexMap<String, Row>,
    ) -> Result<()> {
        let mut inserts = vec![];
        let mut generated = vec![];
        let mut updates = vec![];
        let mut replaces = vec![];

        let auto_increment = mapping.auto_increment.is_some();

        for &id in ids {
            let row = &arena[id];
            let has_key = mapping.key_of(row).is_some();

            match op {
                SaveOperation::Insert if !has_key && auto_increment => generated.push(id),
                SaveOperation::Insert => inserts.push(id),
                SaveOperation::Update if has_key => updates.push(id),
                SaveOperation::Replace if has_key => replaces.push(id),
                SaveOperation::Replace if auto_increment => generated.push(id),
                SaveOperation::Update | SaveOperation::Replace => return Err(missing_key(mapping)),
                SaveOperation::Save if has_key && snapshot.contains_key(&row_key(mapping, row)) => updates.push(id),
                SaveOperation::Save if !has_key && auto_increment => generated.push(id),
                SaveOperation::Save => inserts.push(id),
            }
        }

        let table = mapping.table.as_str();
        let key: Vec<&str> = mapping.primary_key.iter().map(String::as_str).collect();

        {
            let mut bulk = BulkDataManager::new(&mut *self.connection);

            if !inserts.is_empty() {
                let rows: Vec<&Row> = inserts.iter().map(|&id| &arena[id]).collect();
                bulk.insert(table, &written_columns(mapping, &rows), &rows).await?;
            }

            if !replaces.is_empty() {
                let rows: Vec<&Row> = replaces.iter().map(|&id| &arena[id]).collect();
                bulk.replace(table, &written_columns(mapping, &rows), &key, &rows).await?;
            }

            if !updates.is_empty() {
                let rows: Vec<&Row> = updates.iter().map(|&id| &arena[id]).collect();
                bulk.update(table, &written_columns(mapping, &rows), &key, &rows).await?;
            }
        }

        if let Some(column) = &mapping.auto_increment {
            for &id in &generated {
                let row = &arena[id];
                let columns: Vec<&str> = mapping
                    .known_columns(row)
                    .filter(|name| *name != column.as_str())
                    .collect();

                BulkDataManager::new(&mut *self.connection)
                    .insert(table, &columns, &[row])
                    .await?;

                let value = self.connection.last_auto_increment_id().await?;
                arena[id].set(column.as_str(), value);
            }
        }

        debug!(
            table,
            inserted = inserts.len() + generated.len(),
            updated = updates.len(),
            replaced = replaces.len(),
            "relmap.save"
        );

        Ok(())
    }

    /// Post-save step of one-to-one and one-to-many relationships.
    async fn save_owned_children(
        &mut self,
        arena: &mut RowArena,
        data: &RelationshipSaveData<'_>,
        op: SaveOperation,
    ) -> Result<()> {
        let relationship = data.relationship;
        let target = self.schema.mapping(relationship.target());

        if let Some(foreign_key) = relationship.child_foreign_key() {
            let fields: Vec<(&str, &str)> = foreign_key
                .fields
                .iter()
                .map(|field| (field.target.as_str(), field.source.as_str()))
                .collect();
            data.synchronise_child_fields_from_parent(arena, &fields);
        }

        for &child in &data.all_child_rows {
            for filter in relationship.filters() {
                arena[child].set(filter.column.as_str(), filter.value.clone());
            }
        }

        self.save_nodes(arena, target, &data.all_child_rows, op).await?;

        let removed = dropped_children(arena, target, data);
        if removed.is_empty() {
            return Ok(());
        }

        if relationship.cascade() {
            return self.delete_nodes(target, &removed, &mut Visited::new()).await;
        }

        let keys = removed
            .iter()
            .map(|row| target.key_of(row).ok_or_else(|| missing_key(target)))
            .collect::<Result<Vec<_>>>()?;

        self.unrelate(target, relationship, Filter::keys(&target.primary_key, &keys))
            .await
    }

    /// Post-save step of many-to-many relationships.
    async fn save_linked_children(
        &mut self,
        arena: &mut RowArena,
        data: &RelationshipSaveData<'_>,
        many_to_many: &ManyToMany,
        op: SaveOperation,
    ) -> Result<()> {
        let target = self.schema.mapping(many_to_many.target);
        self.save_nodes(arena, target, &data.all_child_rows, op).await?;

        let columns = link_columns(many_to_many);
        let table = many_to_many.link.table.as_str();

        let mut links = vec![];
        for entry in &data.child_rows_by_parent {
            for &child in &entry.children {
                links.push(link_row(many_to_many, &arena[entry.parent], &arena[child])?);
            }
        }

        let mut stale = vec![];
        for (parent, row) in &data.removed {
            stale.push(link_row(many_to_many, &arena[*parent], row)?);
        }

        let mut bulk = BulkDataManager::new(&mut *self.connection);

        if op != SaveOperation::Insert && !links.is_empty() {
            bulk.delete(table, &columns, &link_keys(&columns, &links)).await?;
        }

        if !links.is_empty() {
            let rows: Vec<&Row> = links.iter().collect();
            bulk.insert(table, &columns, &rows).await?;
        }

        if !stale.is_empty() {
            bulk.delete(table, &columns, &link_keys(&columns, &stale)).await?;
        }

        if many_to_many.cascade {
            let removed = dropped_children(arena, target, data);
            if !removed.is_empty() {
                self.delete_nodes(target, &removed, &mut Visited::new()).await?;
            }
        }

        Ok(())
    }

    #[async_recursion]
    async fn delete_nodes<'r>(
        &mut self,
        mapping: &TableMapping,
        rows: &[&'r Row],
        visited: &mut Visited,
    ) -> Result<()> {
        let mut keys = vec![];
        let mut pending = vec![];

        for &row in rows {
            let key = mapping.key_of(row).ok_or_else(|| missing_key(mapping))?;

            if visited.insert((mapping.id, synthetic_key(key.values()))) {
                keys.push(key);
                pending.push(row);
            }
        }

        if pending.is_empty() {
            return Ok(());
        }

        for relationship in &mapping.relationships {
            let target = self.schema.mapping(relationship.target());

            match relationship {
                Relationship::ManyToOne(_) => {}
                Relationship::ManyToMany(many_to_many) => {
                    let children = if many_to_many.cascade {
                        QueryEngine::new(self.schema, &mut *self.connection)
                            .fetch_related(relationship, &pending)
                            .await?
                    } else {
                        vec![]
                    };

                    let parent_columns: Vec<&str> = many_to_many.link.parent.sources().collect();
                    let parent_keys = parent_keys(&pending, many_to_many.link.parent.targets());

                    BulkDataManager::new(&mut *self.connection)
                        .delete(&many_to_many.link.table, &parent_columns, &parent_keys)
                        .await?;

                    if !children.is_empty() {
                        let children: Vec<&Row> = children.iter().collect();
                        self.delete_nodes(target, &children, visited).await?;
                    }
                }
                Relationship::OneToOne(_) | Relationship::OneToMany(_) if relationship.cascade() => {
                    let children = QueryEngine::new(self.schema, &mut *self.connection)
                        .fetch_related(relationship, &pending)
                        .await?;

                    let children: Vec<&Row> = children.iter().collect();
                    self.delete_nodes(target, &children, visited).await?;
                }
                Relationship::OneToOne(_) | Relationship::OneToMany(_) => {
                    let Some(foreign_key) = relationship.child_foreign_key() else {
                        continue;
                    };

                    let child_columns: Vec<&str> = foreign_key.sources().collect();
                    let parent_keys = parent_keys(&pending, foreign_key.targets());

                    for chunk in parent_keys.chunks(KEYS_PER_STATEMENT) {
                        self.unrelate(target, relationship, Filter::keys(&child_columns, chunk))
                            .await?;
                    }
                }
            }
        }

        let key_columns: Vec<&str> = mapping.primary_key.iter().map(String::as_str).collect();
        let count = BulkDataManager::new(&mut *self.connection)
            .delete(&mapping.table, &key_columns, &keys)
            .await?;

        debug!(table = %mapping.table, rows = keys.len(), count, "relmap.delete");
        Ok(())
    }

    /// Nulls the foreign key of the `target` rows matching `filter` (and the
    /// relationship's static filters).
    async fn unrelate(&mut self, target: &TableMapping, relationship: &Relationship, filter: Filter) -> Result<()> {
        let Some(foreign_key) = relationship.child_foreign_key() else {
            return Ok(());
        };

        let filter = relationship
            .filters()
            .iter()
            .fold(filter, |filter, f| filter.and(Filter::eq(f.column.as_str(), f.value.clone())));

        let mut stmt = Update::new(target.table.as_str(), filter);
        for column in foreign_key.sources() {
            stmt = stmt.set(column, Value::Null);
        }

        let count = BulkDataManager::new(&mut *self.connection).execute(stmt).await?;

        debug!(table = %target.table, count, "relmap.unrelate");
        Ok(())
    }
}

fn missing_key(mapping: &TableMapping) -> Error {
    Error::invalid_statement(format!(
        "row of `{}` has no complete primary key",
        mapping.table
    ))
}

/// Removed children that no parent of this save lists. A child moved to
/// another parent is saved there and must survive.
fn dropped_children<'d>(
    arena: &RowArena,
    target: &TableMapping,
    data: &'d RelationshipSaveData<'_>,
) -> Vec<&'d Row> {
    let listed: HashSet<String> = data
        .all_child_rows
        .iter()
        .filter_map(|&child| target.key_of(&arena[child]))
        .map(|key| synthetic_key(key.values()))
        .collect();

    data.removed
        .iter()
        .map(|(_, row)| row)
        .filter(|row| {
            target
                .key_of(row)
                .map_or(true, |key| !listed.contains(&synthetic_key(key.values())))
        })
        .collect()
}

/// Mapping columns held by any of `rows`, in mapping order.
fn written_columns<'m>(mapping: &'m TableMapping, rows: &[&Row]) -> Vec<&'m str> {
    mapping
        .columns
        .iter()
        .filter(|column| rows.iter().any(|row| row.contains(column)))
        .map(String::as_str)
        .collect()
}

/// Distinct keys built from the `columns` of each row holding all of them.
fn parent_keys<'c>(rows: &[&Row], columns: impl Iterator<Item = &'c str>) -> Vec<Key> {
    let columns: Vec<&str> = columns.collect();
    let mut seen = HashSet::new();

    rows.iter()
        .filter_map(|row| {
            columns
                .iter()
                .map(|column| row.get(column).filter(|value| !value.is_null()).cloned())
                .collect::<Option<Vec<_>>>()
        })
        .filter(|values| seen.insert(synthetic_key(values)))
        .map(Key::new)
        .collect()
}

/// Link table columns: parent side first, then child side.
fn link_columns(many_to_many: &ManyToMany) -> Vec<&str> {
    many_to_many
        .link
        .parent
        .sources()
        .chain(many_to_many.link.child.sources())
        .collect()
}

fn link_row(many_to_many: &ManyToMany, parent: &Row, child: &Row) -> Result<Row> {
    let mut link = Row::new();

    let sides = [(&many_to_many.link.parent, parent), (&many_to_many.link.child, child)];

    for (foreign_key, row) in sides {
        for field in &foreign_key.fields {
            match row.get(&field.target) {
                Some(value) if !value.is_null() => {
                    link.set(field.source.as_str(), value.clone());
                }
                _ => {
                    return Err(Error::invalid_statement(format!(
                        "cannot link through `{}`: column `{}` has no value",
                        many_to_many.link.table, field.target
                    )))
                }
            }
        }
    }

    Ok(link)
}

fn link_keys(columns: &[&str], links: &[Row]) -> Vec<Key> {
    links
        .iter()
        .map(|link| {
            Key::new(
                columns
                    .iter()
                    .map(|column| link.get(column).cloned().unwrap_or_default())
                    .collect(),
            )
        })
        .collect()
}
