use super::arena::{RowArena, RowId};
use relmap_core::{schema::Relationship, Related, Row, Value};

/// The rows of one relationship taking part in a save.
#[derive(Debug)]
pub(crate) struct RelationshipSaveData<'a> {
    pub(crate) relationship: &'a Relationship,

    /// Every child row, across all parents
    pub(crate) all_child_rows: Vec<RowId>,

    pub(crate) child_rows_by_parent: Vec<ParentChildren>,

    /// Previously stored children that are no longer listed, with the
    /// parent they were listed under
    pub(crate) removed: Vec<(RowId, Row)>,
}

#[derive(Debug)]
pub(crate) struct ParentChildren {
    pub(crate) parent: RowId,
    pub(crate) children: Vec<RowId>,
}

impl<'a> RelationshipSaveData<'a> {
    pub(crate) fn new(relationship: &'a Relationship) -> Self {
        Self {
            relationship,
            all_child_rows: vec![],
            child_rows_by_parent: vec![],
            removed: vec![],
        }
    }

    pub(crate) fn add_child_rows(&mut self, parent: RowId, children: Vec<RowId>) {
        self.all_child_rows.extend_from_slice(&children);
        self.child_rows_by_parent.push(ParentChildren { parent, children });
    }

    /// Copies `(parent column, child column)` values from each parent into
    /// its children. Columns the parent does not hold are left alone.
    pub(crate) fn synchronise_child_fields_from_parent(&self, arena: &mut RowArena, fields: &[(&str, &str)]) {
        for entry in &self.child_rows_by_parent {
            for &(parent_column, child_column) in fields {
                let Some(value) = arena[entry.parent].get(parent_column).cloned() else {
                    continue;
                };

                for &child in &entry.children {
                    arena[child].set(child_column, value.clone());
                }
            }
        }
    }

    /// Copies `(parent column, child column)` values from each parent's
    /// child into the parent. A parent without a child gets nulls.
    pub(crate) fn synchronise_parent_fields_from_child(&self, arena: &mut RowArena, fields: &[(&str, &str)]) {
        for entry in &self.child_rows_by_parent {
            for &(parent_column, child_column) in fields {
                let value = match entry.children.first() {
                    Some(&child) => arena[child].get(child_column).cloned().unwrap_or_default(),
                    None => Value::Null,
                };

                arena[entry.parent].set(parent_column, value);
            }
        }
    }

    /// Moves the children back onto the parents' member.
    pub(crate) fn update_parent_member(&self, arena: &mut RowArena) {
        let member = self.relationship.member();

        for entry in &self.child_rows_by_parent {
            let mut children: Vec<Row> = entry.children.iter().map(|&child| arena.take(child)).collect();

            let related = if self.relationship.is_multiple() {
                Related::Many(children)
            } else if children.is_empty() {
                Related::One(None)
            } else {
                Related::One(Some(children.swap_remove(0)))
            };

            arena[entry.parent].set_related(member, related);
        }
    }
}
