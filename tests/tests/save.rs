use pretty_assertions::assert_eq;
use relmap::{row, Key, ManyToMany, OneToMany, Row, SaveOperation, Value};
use tests::{count, fixtures, ids, seed, setup};

#[tokio::test]
async fn insert_nested_rows_with_generated_keys() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let mut author = row! { "name" => "Delany" }.with_many(
        "books",
        vec![row! { "title" => "Dhalgren" }, row! { "title" => "Nova" }],
    );

    db.save_row(lib.author, &mut author, SaveOperation::Insert)
        .await
        .unwrap();

    assert_eq!(author.get("id"), Some(&Value::from(6)));

    let books = author.many("books").unwrap();
    assert_eq!(ids(books, "id"), [9, 10]);
    for book in books {
        assert_eq!(book.get("author_id"), Some(&Value::from(6)));
    }

    let stored = db.fetch(lib.author, 6).await.unwrap();
    assert_eq!(stored.get("name"), Some(&Value::from("Delany")));

    let titles: Vec<_> = stored
        .many("books")
        .unwrap()
        .iter()
        .map(|book| book.get("title").cloned().unwrap())
        .collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&Value::from("Nova")));
}

#[tokio::test]
async fn save_round_trip_removes_dropped_child() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let mut author = db.fetch(lib.author, 1).await.unwrap();
    author.set("name", "Ursula K. Le Guin");
    author.many_mut("books").unwrap().retain(|book| book.get("id") != Some(&Value::from(2)));

    db.save_row(lib.author, &mut author, SaveOperation::Save)
        .await
        .unwrap();

    let stored = db.fetch(lib.author, 1).await.unwrap();
    assert_eq!(stored.get("name"), Some(&Value::from("Ursula K. Le Guin")));
    assert_eq!(ids(stored.many("books").unwrap(), "id"), [1, 3]);

    assert_eq!(count(&mut db, "book", "id = 2").await, 0);
    assert_eq!(count(&mut db, "book", "author_id = 1").await, 2);

    // Untouched siblings keep their links
    assert_eq!(count(&mut db, "book_tag", "book_id = 1").await, 2);
    assert_eq!(count(&mut db, "book", "author_id IS NULL").await, 0);
}

#[tokio::test]
async fn save_without_cascade_unrelates_dropped_child() {
    let (mut db, log, (author, book)) = setup(|b| {
        let author = b.mapping("author");
        let book = b.mapping("book");
        b.relate(
            author,
            OneToMany::new("books", book)
                .foreign_key("author_id", "id")
                .cascade(false),
        );
        (author, book)
    })
    .await;
    seed(&mut db, &log).await;

    let mut row = db.fetch(author, 2).await.unwrap();
    row.many_mut("books").unwrap().clear();

    db.save_row(author, &mut row, SaveOperation::Save).await.unwrap();

    let orphan = db.fetch(book, 4).await.unwrap();
    assert_eq!(orphan.get("author_id"), Some(&Value::Null));
    assert_eq!(count(&mut db, "book", "id IN (4, 5) AND author_id IS NULL").await, 2);
}

#[tokio::test]
async fn save_inserts_new_and_updates_existing() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let mut rows = vec![
        row! { "id" => 5, "name" => "Gene Wolfe" },
        row! { "name" => "Tiptree" },
    ];

    db.save_rows(lib.author, &mut rows, SaveOperation::Save)
        .await
        .unwrap();

    assert_eq!(rows[1].get("id"), Some(&Value::from(6)));
    assert_eq!(count(&mut db, "author", "name = 'Gene Wolfe' AND id = 5").await, 1);
    assert_eq!(count(&mut db, "author", "1 = 1").await, 6);
}

#[tokio::test]
async fn update_requires_a_key() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let original = vec![row! { "name" => "Nobody" }];
    let mut rows = original.clone();

    let err = db
        .save_rows(lib.author, &mut rows, SaveOperation::Update)
        .await
        .unwrap_err();

    assert!(err.is_invalid_statement());
    assert_eq!(rows, original);
    assert!(log.is_empty());
}

#[tokio::test]
async fn failed_save_leaves_rows_unchanged() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    // The nested book has no key, which an update cannot handle.
    let original = row! { "id" => 1, "name" => "Le Guin" }
        .with_many("books", vec![row! { "title" => "Tehanu" }]);
    let mut row = original.clone();

    let err = db
        .save_row(lib.author, &mut row, SaveOperation::Update)
        .await
        .unwrap_err();

    assert!(err.is_invalid_statement());
    assert_eq!(row, original);
}

#[tokio::test]
async fn update_writes_only_present_columns() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let mut book = row! { "id" => 4, "title" => "Excession (2nd ed.)" };
    db.save_row(lib.book, &mut book, SaveOperation::Update)
        .await
        .unwrap();

    let stored = db.fetch(lib.book, 4).await.unwrap();
    assert_eq!(stored.get("title"), Some(&Value::from("Excession (2nd ed.)")));
    assert_eq!(stored.get("publisher_id"), Some(&Value::from(2)));

    assert_eq!(log.count_starting_with(r#"UPDATE "book" SET "title" = "#), 1);
}

#[tokio::test]
async fn replace_overwrites_by_key() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let mut rows = vec![
        row! { "id" => 1, "label" => "utopia" },
        row! { "id" => 9, "label" => "ships" },
    ];
    db.save_rows(lib.tag, &mut rows, SaveOperation::Replace)
        .await
        .unwrap();

    assert_eq!(count(&mut db, "tag", "1 = 1").await, 4);
    assert_eq!(count(&mut db, "tag", "id = 1 AND label = 'utopia'").await, 1);
    assert_eq!(count(&mut db, "tag", "id = 9 AND label = 'ships'").await, 1);
}

#[tokio::test]
async fn many_to_one_saves_the_referenced_row_first() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let mut book = row! { "title" => "Matter" }
        .with_one("publisher", Some(row! { "name" => "Little, Brown" }));

    db.save_row(lib.book, &mut book, SaveOperation::Insert)
        .await
        .unwrap();

    assert_eq!(book.get("publisher_id"), Some(&Value::from(3)));
    assert_eq!(
        book.one("publisher").and_then(|p| p.get("id")),
        Some(&Value::from(3))
    );

    let id = book.get("id").and_then(Value::as_i64).unwrap();
    let stored = db.fetch(lib.book, id).await.unwrap();
    assert_eq!(
        stored.one("publisher").and_then(|p| p.get("name")),
        Some(&Value::from("Little, Brown"))
    );

    let sql = log.sql();
    assert!(sql[0].starts_with("INSERT INTO \"publisher\""));
    assert!(sql[1].starts_with("INSERT INTO \"book\""));
}

#[tokio::test]
async fn many_to_one_cleared_nulls_the_foreign_key() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let mut book = row! { "id" => 1 }.with_one("publisher", None);
    db.save_row(lib.book, &mut book, SaveOperation::Update)
        .await
        .unwrap();

    assert_eq!(count(&mut db, "book", "id = 1 AND publisher_id IS NULL").await, 1);
    assert_eq!(count(&mut db, "publisher", "id = 1").await, 1);
}

#[tokio::test]
async fn many_to_many_save_writes_link_rows() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let mut book = row! { "id" => 8 }.with_many(
        "tags",
        vec![row! { "id" => 2, "label" => "space" }, row! { "label" => "empire" }],
    );

    db.save_row(lib.book, &mut book, SaveOperation::Save)
        .await
        .unwrap();

    let tags = book.many("tags").unwrap();
    assert_eq!(tags[1].get("id"), Some(&Value::from(4)));

    let stored = db.fetch(lib.book, 8).await.unwrap();
    assert_eq!(ids(stored.many("tags").unwrap(), "id"), [2, 4]);

    // Saving again with one tag dropped removes its link only.
    let mut book: Row = row! { "id" => 8 }.with_many("tags", vec![row! { "id" => 4 }]);
    db.save_row(lib.book, &mut book, SaveOperation::Save)
        .await
        .unwrap();

    assert_eq!(count(&mut db, "book_tag", "book_id = 8").await, 1);
    assert_eq!(count(&mut db, "book_tag", "book_id = 8 AND tag_id = 4").await, 1);
    assert_eq!(count(&mut db, "tag", "id = 2").await, 1);

    // Other books keep their links to the dropped tag.
    assert_eq!(count(&mut db, "book_tag", "tag_id = 2").await, 3);
}

#[tokio::test]
async fn absent_member_leaves_children_alone() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let mut author = row! { "id" => 2, "name" => "Iain M. Banks" };
    db.save_row(lib.author, &mut author, SaveOperation::Save)
        .await
        .unwrap();

    assert_eq!(count(&mut db, "book", "author_id = 2").await, 2);
    assert!(author.related("books").is_none());
}

#[tokio::test]
async fn child_moved_between_parents_survives() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let mut rows = db
        .multi_fetch(lib.author, &[Key::from(1), Key::from(2)], false)
        .await
        .unwrap();

    let books = rows[0].many_mut("books").unwrap();
    let position = books
        .iter()
        .position(|book| book.get("id") == Some(&Value::from(2)))
        .unwrap();
    let moved = books.remove(position);
    rows[1].many_mut("books").unwrap().push(moved);

    db.save_rows(lib.author, &mut rows, SaveOperation::Save)
        .await
        .unwrap();

    assert_eq!(count(&mut db, "book", "id = 2 AND author_id = 2").await, 1);
    assert_eq!(count(&mut db, "book", "author_id = 1").await, 2);
    assert_eq!(ids(rows[1].many("books").unwrap(), "id"), [2, 4, 5]);

    let stored = db.fetch(lib.author, 2).await.unwrap();
    assert_eq!(ids(stored.many("books").unwrap(), "id"), [2, 4, 5]);
}

#[tokio::test]
async fn child_moved_between_linked_parents_survives_cascade() {
    let (mut db, log, book) = setup(|b| {
        let book = b.mapping("book");
        let tag = b.mapping("tag");
        b.relate(
            book,
            ManyToMany::new("tags", tag, "book_tag")
                .parent_key("book_id", "id")
                .child_key("tag_id", "id")
                .cascade(true),
        );
        book
    })
    .await;
    seed(&mut db, &log).await;

    let mut rows = db
        .multi_fetch(book, &[Key::from(1), Key::from(4)], false)
        .await
        .unwrap();

    // Tag 1 goes from book 1 to book 4
    let tags = rows[0].many_mut("tags").unwrap();
    let position = tags
        .iter()
        .position(|tag| tag.get("id") == Some(&Value::from(1)))
        .unwrap();
    let moved = tags.remove(position);
    rows[1].many_mut("tags").unwrap().push(moved);

    db.save_rows(book, &mut rows, SaveOperation::Save)
        .await
        .unwrap();

    assert_eq!(count(&mut db, "tag", "id = 1").await, 1);
    assert_eq!(count(&mut db, "book_tag", "book_id = 1 AND tag_id = 1").await, 0);
    assert_eq!(count(&mut db, "book_tag", "book_id = 4 AND tag_id = 1").await, 1);
    assert_eq!(count(&mut db, "book_tag", "book_id = 1").await, 1);
}

#[tokio::test]
async fn one_to_one_save_replaces_the_previous_child() {
    let (mut db, log, (author, _)) = setup(|b| fixtures::biographies(b, true)).await;
    seed(&mut db, &log).await;

    db.execute("UPDATE book SET kind = 'bio' WHERE id = 8", &[])
        .await
        .unwrap();

    let mut row = db
        .fetch(author, 4)
        .await
        .unwrap()
        .with_one("bio", Some(row! { "title" => "Provenance" }));

    db.save_row(author, &mut row, SaveOperation::Save).await.unwrap();

    let bio = row.one("bio").unwrap();
    assert_eq!(bio.get("id"), Some(&Value::from(9)));
    assert_eq!(bio.get("author_id"), Some(&Value::from(4)));
    assert_eq!(bio.get("kind"), Some(&Value::from("bio")));

    assert_eq!(count(&mut db, "book", "id = 8").await, 0);
    assert_eq!(count(&mut db, "book", "kind = 'bio'").await, 1);

    let stored = db.fetch(author, 4).await.unwrap();
    assert_eq!(
        stored.one("bio").unwrap().get("title"),
        Some(&Value::from("Provenance"))
    );
}

#[tokio::test]
async fn one_to_one_save_without_cascade_unrelates_the_previous_child() {
    let (mut db, log, (author, _)) = setup(|b| fixtures::biographies(b, false)).await;
    seed(&mut db, &log).await;

    db.execute("UPDATE book SET kind = 'bio' WHERE id = 8", &[])
        .await
        .unwrap();

    let mut row = db.fetch(author, 4).await.unwrap().with_one("bio", None);
    db.save_row(author, &mut row, SaveOperation::Save).await.unwrap();

    assert_eq!(count(&mut db, "book", "id = 8 AND author_id IS NULL").await, 1);

    let stored = db.fetch(author, 4).await.unwrap();
    assert!(stored.one("bio").is_none());
}
