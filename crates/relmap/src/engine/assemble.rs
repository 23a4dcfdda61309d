//! Folds flat joined result rows into nested rows.

use super::plan::{Plan, ALIAS_SEPARATOR};
use relmap_core::{schema::TableMapping, Related, Row, Value};

use indexmap::IndexMap;
use std::fmt::Write;
use tracing::trace;

#[derive(Debug)]
struct Entity {
    row: Row,

    /// One map per planned child node, keyed by synthetic key
    children: Vec<IndexMap<String, Entity>>,
}

/// Turns joined result rows into one nested row per distinct root entity,
/// in first-seen order.
pub(crate) fn assemble(plan: &Plan<'_>, rows: Vec<Row>) -> Vec<Row> {
    let mut roots = IndexMap::new();
    let mut selected = vec![false; plan.nodes.len()];
    let physical = rows.len();

    for row in rows {
        let mut parts = vec![Row::new(); plan.nodes.len()];

        for (name, value) in row.into_parts().0 {
            let (node, column) = route(plan, &name);
            selected[node] = true;
            parts[node].set(column.unwrap_or(name), value);
        }

        insert(plan, 0, &mut roots, &mut parts);
    }

    trace!(physical, entities = roots.len(), "relmap.assemble");

    roots
        .into_values()
        .map(|entity| finalize(plan, 0, entity, &selected))
        .collect()
}

/// Finds the node owning a result column. Columns that do not carry a
/// planned alias belong to the root, under their full name.
fn route(plan: &Plan<'_>, name: &str) -> (usize, Option<String>) {
    name.split_once(ALIAS_SEPARATOR)
        .and_then(|(alias, column)| Some((plan.node_for_alias(alias)?, Some(column.to_string()))))
        .unwrap_or((0, None))
}

fn insert(
    plan: &Plan<'_>,
    index: usize,
    entities: &mut IndexMap<String, Entity>,
    parts: &mut [Row],
) {
    let node = &plan.nodes[index];
    let part = std::mem::take(&mut parts[index]);

    let key = row_key(node.mapping, &part);
    let entity = entities.entry(key).or_insert_with(|| Entity {
        row: part,
        children: node.children.iter().map(|_| IndexMap::new()).collect(),
    });

    for (position, &child) in node.children.iter().enumerate() {
        // A LEFT JOIN that matched nothing
        if parts[child].is_all_null() {
            continue;
        }

        insert(plan, child, &mut entity.children[position], parts);
    }
}

fn finalize(plan: &Plan<'_>, index: usize, entity: Entity, selected: &[bool]) -> Row {
    let node = &plan.nodes[index];
    let mut row = entity.row;

    for (position, children) in entity.children.into_iter().enumerate() {
        let child = node.children[position];

        if !selected[child] {
            continue;
        }

        let Some(relationship) = plan.nodes[child].relationship else {
            continue;
        };

        let rows: Vec<Row> = children
            .into_values()
            .map(|entity| finalize(plan, child, entity, selected))
            .collect();

        let related = if relationship.is_multiple() {
            Related::Many(rows)
        } else {
            Related::One(rows.into_iter().next())
        };

        row.set_related(relationship.member(), related);
    }

    row
}

/// Identity of a row within its table: its primary key when the row holds
/// it, otherwise every column value.
pub(crate) fn row_key(mapping: &TableMapping, row: &Row) -> String {
    match mapping.key_of(row) {
        Some(key) => synthetic_key(key.values()),
        None => synthetic_key(row.columns().map(|(_, value)| value)),
    }
}

/// Encodes values as a string that is equal for equal values and distinct
/// otherwise.
pub(crate) fn synthetic_key<'a>(values: impl IntoIterator<Item = &'a Value>) -> String {
    let mut key = String::new();

    for value in values {
        let _ = match value {
            // Databases without a boolean type hand booleans back as integers.
            Value::Bool(v) => write!(key, "i{};", i64::from(*v)),
            Value::I64(v) => write!(key, "i{v};"),
            Value::F64(v) => write!(key, "f{v:?};"),
            Value::Null => write!(key, "n;"),
            Value::String(v) => write!(key, "s{}:{v};", v.len()),
            Value::Bytes(v) => {
                let _ = write!(key, "x{}:", v.len());
                for b in v {
                    let _ = write!(key, "{b:02x}");
                }
                write!(key, ";")
            }
        };
    }

    key
}
