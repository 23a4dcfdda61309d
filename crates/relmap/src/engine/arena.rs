use relmap_core::Row;

use std::ops::{Index, IndexMut};

/// Identifies a row in a [`RowArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RowId(usize);

/// Owns every row touched by one save, so that parent and child rows can be
/// read and written by index while the save walks the relationship graph.
#[derive(Debug, Default)]
pub(crate) struct RowArena {
    rows: Vec<Row>,
}

impl RowArena {
    pub(crate) fn insert(&mut self, row: Row) -> RowId {
        let id = RowId(self.rows.len());
        self.rows.push(row);
        id
    }

    pub(crate) fn extend(&mut self, rows: impl IntoIterator<Item = Row>) -> Vec<RowId> {
        rows.into_iter().map(|row| self.insert(row)).collect()
    }

    pub(crate) fn get(&self, id: RowId) -> &Row {
        &self.rows[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: RowId) -> &mut Row {
        &mut self.rows[id.0]
    }

    /// Moves a row out, leaving an empty row in its slot.
    pub(crate) fn take(&mut self, id: RowId) -> Row {
        std::mem::take(&mut self.rows[id.0])
    }
}

impl Index<RowId> for RowArena {
    type Output = Row;

    fn index(&self, id: RowId) -> &Row {
        self.get(id)
    }
}

impl IndexMut<RowId> for RowArena {
    fn index_mut(&mut self, id: RowId) -> &mut Row {
        self.get_mut(id)
    }
}
