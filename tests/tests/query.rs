use pretty_assertions::assert_eq;
use relmap::{Key, Value};
use tests::{fixtures, ids, seed, setup};

#[tokio::test]
async fn where_fragment() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let rows = db
        .query(lib.author, "name = ?", &[Value::from("Banks")])
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(ids(rows[0].many("books").unwrap(), "id"), [4, 5]);

    let sql = log.sql();
    assert_eq!(sql.len(), 1);
    assert!(sql[0].starts_with("SELECT a.id AS a__id, a.name AS a__name, aa.id AS aa__id"));
    assert!(sql[0].contains(" FROM author a LEFT JOIN book aa ON aa.author_id = a.id "));
    assert!(sql[0].ends_with(" WHERE a.name = ?"));
}

#[tokio::test]
async fn member_paths_reach_joined_tables() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let rows = db
        .query(
            lib.author,
            "books.tags.label = ? ORDER BY id",
            &[Value::from("space")],
        )
        .await
        .unwrap();

    assert_eq!(ids(&rows, "id"), [1, 2]);
    assert!(log.sql()[0].ends_with(" WHERE aab.label = ? ORDER BY a.id"));
}

#[tokio::test]
async fn full_select_statement() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let rows = db
        .query(
            lib.book,
            "SELECT * FROM book WHERE author_id IN (?, ?) ORDER BY title DESC",
            &[Value::from(3), Value::from(4)],
        )
        .await
        .unwrap();

    let titles: Vec<_> = rows.iter().map(|row| row.get("title").unwrap().clone()).collect();
    assert_eq!(
        titles,
        [
            Value::from("The Obelisk Gate"),
            Value::from("The Fifth Season"),
            Value::from("Ancillary Justice"),
        ]
    );

    // The Fifth Season is tagged once
    assert_eq!(ids(rows[1].many("tags").unwrap(), "id"), [3]);
}

#[tokio::test]
async fn select_from_another_table_is_rejected() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let err = db.query(lib.book, "SELECT * FROM author", &[]).await.unwrap_err();
    assert!(err.is_invalid_statement());

    let err = db.query(lib.book, "title = 'open", &[]).await.unwrap_err();
    assert!(err.is_invalid_statement());

    assert!(log.is_empty());
}

#[tokio::test]
async fn empty_fragment_selects_everything() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let rows = db.query(lib.author, "", &[]).await.unwrap();
    assert_eq!(ids(&rows, "id"), [1, 2, 3, 4, 5]);

    let wolfe = rows.iter().find(|row| row.get("id") == Some(&Value::from(5))).unwrap();
    assert_eq!(wolfe.many("books"), Some(&[][..]));
}

#[tokio::test]
async fn limit_counts_parents_not_joined_rows() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let rows = db.query(lib.author, "ORDER BY id LIMIT 4", &[]).await.unwrap();

    let parents: Vec<_> = rows.iter().map(|row| row.get("id").cloned().unwrap()).collect();
    assert_eq!(
        parents,
        [Value::from(1), Value::from(2), Value::from(3), Value::from(4)]
    );

    let children: Vec<_> = rows
        .iter()
        .map(|row| ids(row.many("books").unwrap(), "id"))
        .collect();
    assert_eq!(children, [vec![1, 2, 3], vec![4, 5], vec![6, 7], vec![8]]);

    let sql = log.sql();
    assert_eq!(sql.len(), 2);
    assert_eq!(
        sql[0],
        "SELECT DISTINCT a.id AS a__id FROM author a ORDER BY a.id LIMIT 4"
    );
    assert!(sql[1].ends_with(" WHERE a.id IN (?, ?, ?, ?) ORDER BY a.id"));
}

#[tokio::test]
async fn paginated_results_follow_the_first_pass_order() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let rows = db
        .query(lib.author, "ORDER BY id DESC LIMIT ? OFFSET ?", &[Value::from(3), Value::from(1)])
        .await
        .unwrap();

    let parents: Vec<_> = rows.iter().map(|row| row.get("id").cloned().unwrap()).collect();
    assert_eq!(parents, [Value::from(4), Value::from(3), Value::from(2)]);

    // Limit and offset only bind in the first pass
    let last = log.last().unwrap();
    assert_eq!(last.params.len(), 3);
}

#[tokio::test]
async fn paginated_filter_on_joined_table() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let rows = db
        .query(
            lib.author,
            "books.publisher.name = ? ORDER BY id LIMIT 2",
            &[Value::from("Orbit")],
        )
        .await
        .unwrap();

    assert_eq!(ids(&rows, "id"), [2, 3]);

    // The second pass loads the full child lists, not just the matches.
    assert_eq!(ids(rows[0].many("books").unwrap(), "id"), [4, 5]);

    let sql = log.sql();
    assert!(sql[0].starts_with("SELECT DISTINCT a.id AS a__id FROM author a LEFT JOIN book aa"));
    assert!(sql[0].ends_with(" WHERE aaa.name = ? ORDER BY a.id LIMIT 2"));
}

#[tokio::test]
async fn paginated_query_without_matches_stops_after_first_pass() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let rows = db
        .query(lib.author, "name = ? LIMIT 10", &[Value::from("Nobody")])
        .await
        .unwrap();

    assert!(rows.is_empty());
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn limit_without_to_many_relationships_is_one_pass() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let rows = db.query(lib.publisher, "ORDER BY name DESC LIMIT 1", &[]).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&Value::from("Orbit")));
    assert_eq!(log.len(), 1);
}

#[tokio::test]
async fn self_reference_stops_at_default_depth() {
    let (mut db, log, category) = setup(|b| fixtures::categories(b, None)).await;
    seed(&mut db, &log).await;

    let root = db.fetch(category, 1).await.unwrap();

    let mut depth = 1;
    let mut node = &root;
    while let Some(children) = node.many("children") {
        assert_eq!(children.len(), 1);
        node = &children[0];
        depth += 1;
    }

    assert_eq!(depth, 5);
    assert_eq!(node.get("name"), Some(&Value::from("five")));
    assert!(node.related("children").is_none());
}

#[tokio::test]
async fn self_reference_with_explicit_depth() {
    let (mut db, log, category) = setup(|b| fixtures::categories(b, Some(2))).await;
    seed(&mut db, &log).await;

    let rows = db
        .multi_fetch(category, &[Key::from(3), Key::from(6)], false)
        .await
        .unwrap();

    let child = &rows[0].many("children").unwrap()[0];
    assert_eq!(child.get("id"), Some(&Value::from(4)));
    assert!(child.related("children").is_none());

    let child = &rows[1].many("children").unwrap()[0];
    assert_eq!(child.get("id"), Some(&Value::from(7)));
}

#[tokio::test]
async fn static_filters_restrict_children() {
    let (mut db, log, author) = setup(|b| {
        let author = b.mapping("author");
        let book = b.mapping("book");
        b.relate(
            author,
            relmap::OneToMany::new("essays", book)
                .foreign_key("author_id", "id")
                .filter("kind", "essay"),
        );
        author
    })
    .await;
    seed(&mut db, &log).await;

    db.execute("UPDATE book SET kind = 'essay' WHERE id = 2", &[])
        .await
        .unwrap();

    let row = db.fetch(author, 1).await.unwrap();
    assert_eq!(ids(row.many("essays").unwrap(), "id"), [2]);
}

#[tokio::test]
async fn select_statement_keeps_caller_join() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let rows = db
        .query(
            lib.author,
            "SELECT * FROM author INNER JOIN book b2 ON b2.author_id = author.id WHERE b2.title = ?",
            &[Value::from("Excession")],
        )
        .await
        .unwrap();

    assert_eq!(ids(&rows, "id"), [2]);

    // The caller's join narrows the parents, not the loaded children
    assert_eq!(ids(rows[0].many("books").unwrap(), "id"), [4, 5]);

    let sql = log.sql();
    assert_eq!(sql.len(), 1);
    assert!(sql[0].ends_with(
        " LEFT JOIN tag aab ON aab.id = aab_link.tag_id \
         INNER JOIN book b2 ON b2.author_id = a.id WHERE b2.title = ?"
    ));
}

#[tokio::test]
async fn paginated_select_statement_keeps_caller_join() {
    let (mut db, log, lib) = setup(fixtures::library).await;
    seed(&mut db, &log).await;

    let rows = db
        .query(
            lib.author,
            "SELECT * FROM author INNER JOIN book b2 ON b2.author_id = author.id \
             WHERE b2.publisher_id = ? ORDER BY id LIMIT 2",
            &[Value::from(2)],
        )
        .await
        .unwrap();

    // Orbit published the books of authors 2, 3 and 4
    assert_eq!(ids(&rows, "id"), [2, 3]);
    assert_eq!(
        log.sql()[0],
        "SELECT DISTINCT a.id AS a__id FROM author a \
         INNER JOIN book b2 ON b2.author_id = a.id WHERE b2.publisher_id = ? ORDER BY a.id LIMIT 2"
    );
}

#[tokio::test]
async fn limit_counts_parents_over_one_to_one() {
    let (mut db, log, author) = setup(|b| {
        let author = b.mapping("author");
        let book = b.mapping("book");
        b.relate(
            author,
            relmap::OneToOne::new("first_book", book).foreign_key("author_id", "id"),
        );
        author
    })
    .await;
    seed(&mut db, &log).await;

    // Author 1 has three books, so a one-pass limit would stop at author 1
    let rows = db.query(author, "ORDER BY id LIMIT 2", &[]).await.unwrap();

    let parents: Vec<_> = rows.iter().map(|row| row.get("id").cloned().unwrap()).collect();
    assert_eq!(parents, [Value::from(1), Value::from(2)]);

    let book = rows[0].one("first_book").unwrap();
    assert_eq!(book.get("author_id"), Some(&Value::from(1)));

    assert_eq!(log.len(), 2);
    assert_eq!(
        log.sql()[0],
        "SELECT DISTINCT a.id AS a__id FROM author a ORDER BY a.id LIMIT 2"
    );
}

#[tokio::test]
async fn one_to_one_with_filter_yields_a_single_row() {
    let (mut db, log, (author, _)) = setup(|b| fixtures::biographies(b, true)).await;
    seed(&mut db, &log).await;

    db.execute("UPDATE book SET kind = 'bio' WHERE id IN (3, 8)", &[])
        .await
        .unwrap();

    let rows = db.query(author, "ORDER BY id", &[]).await.unwrap();
    assert_eq!(ids(&rows, "id"), [1, 2, 3, 4, 5]);

    let bio = rows[0].one("bio").unwrap();
    assert_eq!(bio.get("id"), Some(&Value::from(3)));
    assert_eq!(bio.get("kind"), Some(&Value::from("bio")));

    // Novels never show up as a bio
    let banks = rows[1].related("bio").unwrap();
    assert!(!banks.is_multiple());
    assert!(banks.is_empty());

    assert_eq!(rows[3].one("bio").unwrap().get("id"), Some(&Value::from(8)));
    assert!(log.last().unwrap().sql.contains("LEFT JOIN book aa ON aa.author_id = a.id AND aa.kind = 'bio'"));
}
