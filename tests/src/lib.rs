
pub use exec_log::ExecLog;
pub use logging_connection::{LoggingConnection, Statement};

use relmap::{db::Builder, Db, Row, Value};
use relmap_driver_sqlite::Connection as SqliteConnection;

/// Opens an in-memory database holding the fixture tables, lets `declare`
/// describe the mappings and builds the handle on a logging connection.
///
/// The returned log starts out empty.
pub async fn setup<T>(declare: impl FnOnce(&mut Builder) -> T) -> (Db, ExecLog, T) {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut connection = SqliteConnection::in_memory().unwrap();
    connection.execute_batch(fixtures::SCHEMA).unwrap();

    let connection = LoggingConnection::new(Box::new(connection));
    let log = ExecLog::new(connection.log_handle());

    let mut builder = Db::builder();
    let mappings = declare(&mut builder);
    let db = builder.build(Box::new(connection)).await.unwrap();

    log.clear();
    (db, log, mappings)
}

/// Runs the fixture data inserts.
pub async fn seed(db: &mut Db, log: &ExecLog) {
    for stmt in fixtures::SEED.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        db.execute(stmt, &[]).await.unwrap();
    }
    log.clear();
}

/// The integer `column` of each row, sorted.
pub fn ids<'a>(rows: impl IntoIterator<Item = &'a Row>, column: &str) -> Vec<i64> {
    let mut ids: Vec<i64> = rows
        .into_iter()
        .map(|row| row.get(column).and_then(Value::as_i64).unwrap())
        .collect();
    ids.sort_unstable();
    ids
}

/// Counts the rows of `table` matching `condition`.
pub async fn count(db: &mut Db, table: &str, condition: &str) -> i64 {
    let rows = db
        .connection()
        .query(&format!("SELECT COUNT(*) AS n FROM {table} WHERE {condition}"), &[])
        .await
        .unwrap();
    rows[0].get("n").and_then(Value::as_i64).unwrap()
}
