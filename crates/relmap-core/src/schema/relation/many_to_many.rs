use super::*;

#[derive(Debug, Clone)]
pub struct ManyToMany {
    /// Member name on the parent row
    pub member: String,

    /// Child mapping
    pub target: MappingId,

    /// Table holding one row per parent/child association
    pub link: LinkTable,

    pub max_depth: usize,

    /// Delete children along with their links. Defaults to false, so only
    /// the link rows are removed.
    pub cascade: bool,
}

#[derive(Debug, Clone)]
pub struct LinkTable {
    /// Name of the link table
    pub table: String,

    /// Link columns (source) referencing parent columns (target)
    pub parent: ForeignKey,

    /// Link columns (source) referencing child columns (target)
    pub child: ForeignKey,
}

impl ManyToMany {
    pub fn new(
        member: impl Into<String>,
        target: impl Into<MappingId>,
        link_table: impl Into<String>,
    ) -> Self {
        Self {
            member: member.into(),
            target: target.into(),
            link: LinkTable {
                table: link_table.into(),
                parent: ForeignKey::default(),
                child: ForeignKey::default(),
            },
            max_depth: DEFAULT_MAX_DEPTH,
            cascade: false,
        }
    }

    /// Adds a `link_column -> parent_column` pair.
    pub fn parent_key(mut self, link_column: impl Into<String>, parent_column: impl Into<String>) -> Self {
        self.link.parent.push(link_column, parent_column);
        self
    }

    /// Adds a `link_column -> child_column` pair.
    pub fn child_key(mut self, link_column: impl Into<String>, child_column: impl Into<String>) -> Self {
        self.link.child.push(link_column, child_column);
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }

    /// Alias given to the link table when the child is aliased `own_alias`.
    pub fn link_alias(own_alias: &str) -> String {
        format!("{own_alias}_link")
    }

    pub(super) fn join_clause(&self, table: &str, parent_alias: &str, own_alias: &str) -> String {
        let link_alias = Self::link_alias(own_alias);

        let mut sql = format!("LEFT JOIN {} {link_alias} ON ", self.link.table);
        write_correlation(&mut sql, &link_alias, parent_alias, &self.link.parent);

        let _ = write!(sql, " LEFT JOIN {table} {own_alias} ON ");

        for (i, field) in self.link.child.fields.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }

            let _ = write!(sql, "{own_alias}.{} = {link_alias}.{}", field.target, field.source);
        }

        sql
    }
}
