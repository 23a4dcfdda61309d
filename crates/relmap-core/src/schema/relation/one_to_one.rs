use super::*;
use crate::Value;

/// Like [`OneToMany`], but the parent holds at most one child. When the
/// database returns several, the first one in result order wins.
#[derive(Debug, Clone)]
pub struct OneToOne {
    /// Member name on the parent row
    pub member: String,

    /// Child mapping
    pub target: MappingId,

    /// Child columns (source) referencing parent columns (target)
    pub foreign_key: ForeignKey,

    /// Extra equality conditions on the child table
    pub filters: Vec<StaticFilter>,

    pub max_depth: usize,

    /// Defaults to true
    pub cascade: bool,
}

impl OneToOne {
    pub fn new(member: impl Into<String>, target: impl Into<MappingId>) -> Self {
        Self {
            member: member.into(),
            target: target.into(),
            foreign_key: ForeignKey::default(),
            filters: vec![],
            max_depth: DEFAULT_MAX_DEPTH,
            cascade: true,
        }
    }

    pub fn foreign_key(mut self, child_column: impl Into<String>, parent_column: impl Into<String>) -> Self {
        self.foreign_key.push(child_column, parent_column);
        self
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(StaticFilter {
            column: column.into(),
            value: value.into(),
        });
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
}
