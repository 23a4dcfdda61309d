use pretty_assertions::assert_eq;
use relmap::{
    row,
    schema::{Schema, SchemaConfig},
    Db, ManyToOne, OneToMany, SaveOperation, Value,
};
use tests::{fixtures, seed, setup};

#[tokio::test]
async fn columns_and_keys_come_from_the_database() {
    let (db, _log, lib) = setup(fixtures::library).await;

    let book = db.schema().mapping(lib.book);
    let columns: Vec<_> = book.columns.iter().map(String::as_str).collect();
    assert_eq!(columns, ["id", "author_id", "publisher_id", "title", "kind"]);
    assert_eq!(book.primary_key, ["id"]);
    assert_eq!(book.auto_increment.as_deref(), Some("id"));

    let (db, _log, edition) = setup(|b| b.mapping("edition")).await;
    let edition = db.schema().mapping(edition);
    assert_eq!(edition.primary_key, ["book_id", "number"]);
    assert_eq!(edition.auto_increment, None);
}

#[tokio::test]
async fn declared_columns_skip_metadata() {
    let (mut db, log, author) = setup(|b| {
        let author = b.mapping("author");
        b.columns(author, ["name"]).primary_key(author, ["id"]);
        author
    })
    .await;
    seed(&mut db, &log).await;

    let row = db.fetch(author, 1).await.unwrap();
    assert_eq!(row, row! { "id" => 1, "name" => "Le Guin" });

    // No auto-increment was declared, so the key must be supplied.
    assert_eq!(db.schema().mapping(author).auto_increment, None);
}

#[tokio::test]
async fn lookup_by_table_name() {
    let (db, _log, lib) = setup(fixtures::library).await;

    assert_eq!(db.mapping("book").unwrap(), lib.book);
    assert!(db.mapping("missing").unwrap_err().is_invalid_schema());
}

#[tokio::test]
async fn config_file_declares_the_schema() {
    let config = SchemaConfig::from_json(
        r#"{
            "tables": [
                {
                    "name": "author",
                    "relationships": [
                        {
                            "kind": "one_to_many",
                            "member": "books",
                            "target": "book",
                            "foreign_key": { "author_id": "id" },
                            "max_depth": 3
                        }
                    ]
                },
                {
                    "name": "book",
                    "relationships": [
                        {
                            "kind": "many_to_one",
                            "member": "publisher",
                            "target": "publisher",
                            "foreign_key": { "publisher_id": "id" }
                        },
                        {
                            "kind": "many_to_many",
                            "member": "tags",
                            "target": "tag",
                            "link_table": "book_tag",
                            "parent_key": { "book_id": "id" },
                            "child_key": { "tag_id": "id" }
                        }
                    ]
                },
                { "name": "publisher" },
                { "name": "tag", "columns": ["id", "label"], "primary_key": ["id"], "auto_increment": "id" }
            ]
        }"#,
    )
    .unwrap();

    let (mut db, log, ()) = setup(|b| {
        b.load(&config).unwrap();
    })
    .await;
    seed(&mut db, &log).await;

    let author = db.mapping("author").unwrap();
    let row = db.fetch(author, 2).await.unwrap();

    let books = row.many("books").unwrap();
    assert_eq!(books.len(), 2);
    assert!(books[0].one("publisher").is_some());
    assert!(books.iter().all(|book| book.many("tags").is_some()));

    let tag = db.mapping("tag").unwrap();
    let mut new_tag = row! { "label" => "culture" };
    db.save_row(tag, &mut new_tag, SaveOperation::Insert).await.unwrap();
    assert_eq!(new_tag.get("id"), Some(&Value::from(4)));
}

#[test]
fn config_rejects_unknown_targets() {
    let config = SchemaConfig::from_json(
        r#"{
            "tables": [
                {
                    "name": "author",
                    "columns": ["id"],
                    "primary_key": ["id"],
                    "relationships": [
                        { "kind": "one_to_many", "member": "books", "target": "book", "foreign_key": { "author_id": "id" } }
                    ]
                }
            ]
        }"#,
    )
    .unwrap();

    let mut builder = Schema::builder();
    let err = builder.load(&config).unwrap_err();
    assert!(err.is_invalid_schema());

    let err = SchemaConfig::from_json(r#"{ "tables": [], "extra": 1 }"#).unwrap_err();
    assert!(err.is_invalid_schema());
}

#[test]
fn invalid_relationships_are_rejected() {
    let mut builder = Schema::builder();
    let author = builder.mapping("author");
    let book = builder.mapping("book");

    builder
        .columns(author, ["id", "name"])
        .primary_key(author, ["id"])
        .columns(book, ["id", "author_id"])
        .primary_key(book, ["id"])
        .relate(author, OneToMany::new("name", book).foreign_key("author_id", "id"));

    let err = builder.build().unwrap_err();
    assert!(err.is_invalid_schema());

    let mut builder = Schema::builder();
    let author = builder.mapping("author");
    let book = builder.mapping("book");

    builder
        .columns(author, ["id"])
        .primary_key(author, ["id"])
        .columns(book, ["id"])
        .primary_key(book, ["id"])
        .relate(book, ManyToOne::new("author", author).foreign_key("author_id", "id"));

    let err = builder.build().unwrap_err();
    assert!(err.is_invalid_schema());
}

#[tokio::test]
async fn missing_table_fails_at_build() {
    let connection = relmap_driver_sqlite::Connection::in_memory().unwrap();

    let mut builder = Db::builder();
    builder.mapping("nowhere");

    let err = builder.build(Box::new(connection)).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "loading metadata for `nowhere`: invalid schema: table `nowhere` does not exist or has no columns"
    );
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn connect_by_url() {
    let mut builder = Db::builder();
    let thing = builder.mapping("thing");
    builder.columns(thing, ["id", "name"]).primary_key(thing, ["id"]);

    let mut db = builder.connect("sqlite::memory:").await.unwrap();
    db.execute("CREATE TABLE thing (id INTEGER PRIMARY KEY, name TEXT)", &[])
        .await
        .unwrap();

    let mut row = row! { "id" => 1, "name" => "widget" };
    db.save_row(thing, &mut row, SaveOperation::Insert).await.unwrap();
    assert_eq!(db.fetch(thing, 1).await.unwrap(), row);

    let err = Db::builder().connect("postgresql://localhost/relmap").await.unwrap_err();
    assert!(err.is_invalid_connection_url());

    let err = Db::builder().connect("redis://localhost").await.unwrap_err();
    assert!(err.is_invalid_connection_url());
}
