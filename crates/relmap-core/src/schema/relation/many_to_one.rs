use super::*;

/// The parent row references a single child row through its own foreign key
/// columns. Deleting the parent never touches the child.
#[derive(Debug, Clone)]
pub struct ManyToOne {
    /// Member name on the parent row
    pub member: String,

    /// Child mapping
    pub target: MappingId,

    /// Parent columns (source) referencing child columns (target)
    pub foreign_key: ForeignKey,

    pub max_depth: usize,
}

impl ManyToOne {
    pub fn new(member: impl Into<String>, target: impl Into<MappingId>) -> Self {
        Self {
            member: member.into(),
            target: target.into(),
            foreign_key: ForeignKey::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Adds a `parent_column -> child_column` pair to the foreign key.
    pub fn foreign_key(mut self, parent_column: impl Into<String>, child_column: impl Into<String>) -> Self {
        self.foreign_key.push(parent_column, child_column);
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub(super) fn join_clause(&self, table: &str, parent_alias: &str, own_alias: &str) -> String {
        let mut sql = format!("LEFT JOIN {table} {own_alias} ON ");

        for (i, field) in self.foreign_key.fields.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }

            let _ = write!(
                sql,
                "{own_alias}.{} = {parent_alias}.{}",
                field.target, field.source
            );
        }

        sql
    }
}
