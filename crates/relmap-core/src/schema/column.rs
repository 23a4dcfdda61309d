/// Metadata describing one table column, as reported by a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// The name of the column in the database.
    pub name: String,

    /// True if the column is part of the table's primary key
    pub primary_key: bool,

    /// True if the database generates a value for this column when a row is
    /// inserted without one.
    pub auto_increment: bool,

    /// Whether or not the column is nullable
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: false,
            auto_increment: false,
            nullable: true,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}
