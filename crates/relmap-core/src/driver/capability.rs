/// SQL dialect spoken by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgresql,
    Mysql,
}

#[derive(Debug)]
pub struct Capability {
    /// The SQL dialect, which selects placeholder syntax, identifier quoting
    /// and the form of REPLACE statements.
    pub dialect: Dialect,

    /// Maximum number of bound parameters in one statement. Bulk operations
    /// are split so that no statement exceeds it.
    pub max_params: usize,
}

impl Capability {
    /// SQLite capabilities.
    pub const SQLITE: Self = Self {
        dialect: Dialect::Sqlite,

        // SQLITE_MAX_VARIABLE_NUMBER defaults to 32766 since 3.32.0.
        max_params: 32_766,
    };

    /// PostgreSQL capabilities
    pub const POSTGRESQL: Self = Self {
        dialect: Dialect::Postgresql,

        // The wire protocol stores the parameter count in an Int16.
        max_params: 32_767,
    };

    /// MySQL capabilities
    pub const MYSQL: Self = Self {
        dialect: Dialect::Mysql,
        max_params: 65_535,
    };
}
