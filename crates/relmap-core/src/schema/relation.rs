mod many_to_many;
pub use many_to_many::{LinkTable, ManyToMany};

mod many_to_one;
pub use many_to_one::ManyToOne;

mod one_to_many;
pub use one_to_many::OneToMany;

mod one_to_one;
pub use one_to_one::OneToOne;

use super::{ForeignKey, MappingId, Schema, StaticFilter};

use std::fmt::Write;

/// Depth bound applied to relationships that do not set one. The root of a
/// query sits at depth 1.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// How a child mapping correlates to a parent mapping.
#[derive(Debug, Clone)]
pub enum Relationship {
    /// The child holds the foreign key; at most one related row.
    OneToOne(OneToOne),

    /// The child holds the foreign key; any number of related rows.
    OneToMany(OneToMany),

    /// The parent holds the foreign key; at most one related row.
    ManyToOne(ManyToOne),

    /// Correlation runs through a link table; any number of related rows.
    ManyToMany(ManyToMany),
}

impl Relationship {
    /// Key under which the related data appears in a row
    pub fn member(&self) -> &str {
        match self {
            Self::OneToOne(rel) => &rel.member,
            Self::OneToMany(rel) => &rel.member,
            Self::ManyToOne(rel) => &rel.member,
            Self::ManyToMany(rel) => &rel.member,
        }
    }

    /// The child mapping
    pub fn target(&self) -> MappingId {
        match self {
            Self::OneToOne(rel) => rel.target,
            Self::OneToMany(rel) => rel.target,
            Self::ManyToOne(rel) => rel.target,
            Self::ManyToMany(rel) => rel.target,
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::OneToMany(_) | Self::ManyToMany(_))
    }

    /// Whether joining the child can repeat a parent row. Only a
    /// many-to-one joins on the child's primary key.
    pub fn fans_out(&self) -> bool {
        !matches!(self, Self::ManyToOne(_))
    }

    pub fn max_depth(&self) -> usize {
        match self {
            Self::OneToOne(rel) => rel.max_depth,
            Self::OneToMany(rel) => rel.max_depth,
            Self::ManyToOne(rel) => rel.max_depth,
            Self::ManyToMany(rel) => rel.max_depth,
        }
    }

    /// Whether children are deleted along with their parent, or when they
    /// drop out of the relationship on save. Non-cascading relationships
    /// only break the association.
    pub fn cascade(&self) -> bool {
        match self {
            Self::OneToOne(rel) => rel.cascade,
            Self::OneToMany(rel) => rel.cascade,
            Self::ManyToOne(_) => false,
            Self::ManyToMany(rel) => rel.cascade,
        }
    }

    /// Static equality filters on the child table. Only relationships whose
    /// child holds the foreign key carry filters.
    pub fn filters(&self) -> &[StaticFilter] {
        match self {
            Self::OneToOne(rel) => &rel.filters,
            Self::OneToMany(rel) => &rel.filters,
            _ => &[],
        }
    }

    /// The foreign key of a relationship whose child holds it, mapping child
    /// columns to parent columns.
    pub fn child_foreign_key(&self) -> Option<&ForeignKey> {
        match self {
            Self::OneToOne(rel) => Some(&rel.foreign_key),
            Self::OneToMany(rel) => Some(&rel.foreign_key),
            _ => None,
        }
    }

    pub fn as_many_to_one(&self) -> Option<&ManyToOne> {
        match self {
            Self::ManyToOne(rel) => Some(rel),
            _ => None,
        }
    }

    pub fn as_many_to_many(&self) -> Option<&ManyToMany> {
        match self {
            Self::ManyToMany(rel) => Some(rel),
            _ => None,
        }
    }

    /// Renders the `LEFT JOIN` that brings the child table, aliased
    /// `own_alias`, into a query where the parent table is aliased
    /// `parent_alias`.
    pub fn select_join_clause(&self, schema: &Schema, parent_alias: &str, own_alias: &str) -> String {
        let target = &schema.mapping(self.target()).table;

        match self {
            Self::OneToOne(rel) => {
                child_key_join(target, &rel.foreign_key, &rel.filters, parent_alias, own_alias)
            }
            Self::OneToMany(rel) => {
                child_key_join(target, &rel.foreign_key, &rel.filters, parent_alias, own_alias)
            }
            Self::ManyToOne(rel) => rel.join_clause(target, parent_alias, own_alias),
            Self::ManyToMany(rel) => rel.join_clause(target, parent_alias, own_alias),
        }
    }
}

/// Join for relationships whose child table references the parent key.
fn child_key_join(
    table: &str,
    foreign_key: &ForeignKey,
    filters: &[StaticFilter],
    parent_alias: &str,
    own_alias: &str,
) -> String {
    let mut sql = format!("LEFT JOIN {table} {own_alias} ON ");

    write_correlation(&mut sql, own_alias, parent_alias, foreign_key);

    for filter in filters {
        sql.push_str(" AND ");

        if filter.value.is_null() {
            let _ = write!(sql, "{own_alias}.{} IS NULL", filter.column);
        } else {
            let _ = write!(
                sql,
                "{own_alias}.{} = {}",
                filter.column,
                filter.value.to_sql_literal()
            );
        }
    }

    sql
}

/// Writes `source_alias.source = target_alias.target AND ...` for every
/// foreign key field.
fn write_correlation(dst: &mut String, source_alias: &str, target_alias: &str, fk: &ForeignKey) {
    for (i, field) in fk.fields.iter().enumerate() {
        if i > 0 {
            dst.push_str(" AND ");
        }

        let _ = write!(
            dst,
            "{source_alias}.{} = {target_alias}.{}",
            field.source, field.target
        );
    }
}

impl From<OneToOne> for Relationship {
    fn from(value: OneToOne) -> Self {
        Self::OneToOne(value)
    }
}

impl From<OneToMany> for Relationship {
    fn from(value: OneToMany) -> Self {
        Self::OneToMany(value)
    }
}

impl From<ManyToOne> for Relationship {
    fn from(value: ManyToOne) -> Self {
        Self::ManyToOne(value)
    }
}

impl From<ManyToMany> for Relationship {
    fn from(value: ManyToMany) -> Self {
        Self::ManyToMany(value)
    }
}
