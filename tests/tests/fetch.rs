use pretty_assertions::assert_eq;
use relmap::{Key, Value};
use tests::{fixtures, ids, seed, setup};

#[tokio::test]
async fn fetch_single_row() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let author = db.fetch(lib.author, 2).await.unwrap();

    assert_eq!(author.get("id"), Some(&Value::from(2)));
    assert_eq!(author.get("name"), Some(&Value::from("Banks")));

    let books = author.many("books").unwrap();
    assert_eq!(ids(books, "id"), [4, 5]);

    for book in books {
        assert_eq!(book.get("author_id"), Some(&Value::from(2)));
        assert_eq!(
            book.one("publisher").and_then(|p| p.get("name")),
            Some(&Value::from("Orbit"))
        );
    }

    // One statement for the whole tree
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn fetch_absent_to_one_is_none() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let book = db.fetch(lib.book, 3).await.unwrap();

    assert_eq!(book.get("publisher_id"), Some(&Value::Null));
    assert_eq!(book.related("publisher"), Some(&relmap::Related::One(None)));
    assert_eq!(book.many("tags"), Some(&[][..]));
}

#[tokio::test]
async fn fetch_missing_row() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let err = db.fetch(lib.author, 42).await.unwrap_err();

    assert!(err.is_record_not_found());
    assert_eq!(err.missing_key(), Some(&Key::from(42)));
    assert_eq!(err.to_string(), "record not found; table=author key=(42)");
}

#[tokio::test]
async fn fetch_wrong_key_length_runs_no_sql() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let err = db.fetch(lib.author, [4, 12]).await.unwrap_err();

    assert!(err.is_wrong_key_length());
    assert!(log.is_empty());
}

#[tokio::test]
async fn fetch_composite_key() {
    let (mut db, log, edition) = setup(|b| b.mapping("edition")).await;
    seed(&mut db, &log).await;

    let row = db.fetch(edition, (1, 2)).await.unwrap();
    assert_eq!(row.get("year"), Some(&Value::from(1994)));

    let err = db.fetch(edition, 1).await.unwrap_err();
    assert!(err.is_wrong_key_length());
}

#[tokio::test]
async fn multi_fetch_keeps_caller_order() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let rows = db
        .multi_fetch(lib.author, &[Key::from(3), Key::from(1)], false)
        .await
        .unwrap();

    let names: Vec<_> = rows.iter().map(|row| row.get("name").unwrap().clone()).collect();
    assert_eq!(names, [Value::from("Jemisin"), Value::from("Le Guin")]);

    assert_eq!(ids(rows[0].many("books").unwrap(), "id"), [6, 7]);
    assert_eq!(ids(rows[1].many("books").unwrap(), "id"), [1, 2, 3]);
}

#[tokio::test]
async fn multi_fetch_missing_keys() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let keys = [Key::from(6), Key::from(3), Key::from(1), Key::from(7)];

    let rows = db.multi_fetch(lib.author, &keys, true).await.unwrap();
    let found: Vec<_> = rows.iter().map(|row| row.get("id").cloned()).collect();
    assert_eq!(found, [Some(Value::from(3)), Some(Value::from(1))]);

    let err = db.multi_fetch(lib.author, &keys, false).await.unwrap_err();
    assert!(err.is_record_not_found());
    assert_eq!(err.missing_key(), Some(&Key::from(6)));
}

#[tokio::test]
async fn multi_fetch_without_keys_runs_no_sql() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    assert!(db.multi_fetch(lib.author, &[], false).await.unwrap().is_empty());
    assert!(log.is_empty());

    let err = db
        .multi_fetch(lib.author, &[Key::from(1), Key::from((1, 2))], true)
        .await
        .unwrap_err();
    assert!(err.is_wrong_key_length());
    assert!(log.is_empty());
}

#[tokio::test]
async fn multi_fetch_splits_long_key_lists() {
    let (mut db, log, lib) = setup(fixtures::library).await;

    let rows: Vec<_> = (1..=600)
        .map(|id| relmap::row! { "id" => id, "label" => format!("tag {id}") })
        .collect();
    let refs: Vec<_> = rows.iter().collect();
    db.bulk().insert("tag", &["id", "label"], &refs).await.unwrap();
    log.clear();

    let keys: Vec<Key> = (1..=600).rev().map(Key::from).collect();
    let tags = db.multi_fetch(lib.tag, &keys, false).await.unwrap();

    assert_eq!(tags.len(), 600);
    assert_eq!(tags[0].get("id"), Some(&Value::from(600)));
    assert_eq!(log.len(), 2);
}
