use crate::Value;

/// A set of column pairs correlating two tables.
///
/// Which side `source` and `target` refer to depends on the relationship
/// that owns the key; see each relationship variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForeignKey {
    pub fields: Vec<ForeignKeyField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyField {
    /// The column acting as the foreign key
    pub source: String,

    /// The column the foreign key references
    pub target: String,
}

impl ForeignKey {
    pub fn push(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.fields.push(ForeignKeyField {
            source: source.into(),
            target: target.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn sources(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.fields.iter().map(|field| field.source.as_str())
    }

    pub fn targets(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.fields.iter().map(|field| field.target.as_str())
    }
}

/// An equality condition on the child table that is part of a
/// relationship's correlation, e.g. a discriminator column fixed to a
/// literal so one physical table backs several logical relationships.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticFilter {
    pub column: String,
    pub value: Value,
}
