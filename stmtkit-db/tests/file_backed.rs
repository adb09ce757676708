//! Integration tests against on-disk databases.

use std::path::{Path, PathBuf};

use stmtkit_db::{params, Connection, ErrorKind, State, StepResult};

fn temp_db(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("stmtkit.sqlite")
}

fn seed(path: &Path) {
    let conn = Connection::open(path, false).expect("open");
    conn.execute_batch(
        "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL, data BLOB);",
    )
    .expect("create table");
    let mut insert = conn
        .prepare("INSERT INTO notes (body, data) VALUES (?1, ?2)")
        .expect("prepare insert");
    for (body, data) in [("first", vec![1_u8]), ("second", vec![2, 2]), ("third", vec![])] {
        let mut insert = insert.guard();
        insert.bind_string(1, body).expect("bind body");
        insert.bind_blob(2, &data).expect("bind data");
        assert_eq!(insert.step().expect("insert"), StepResult::Done);
    }
    assert_eq!(conn.last_insert_rowid(), 3);
}

#[test]
fn test_prepared_insert_reused_through_guard() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = temp_db(&dir);
    seed(&path);

    let conn = Connection::open(&path, true).expect("reopen read-only");
    let bodies = {
        let mut stmt = conn
            .prepare("SELECT body FROM notes ORDER BY id")
            .expect("prepare");
        let mut bodies = Vec::new();
        while stmt.step().expect("step") == StepResult::Row {
            bodies.push(stmt.view_string(0).into_owned());
        }
        bodies
    };
    assert_eq!(bodies, ["first", "second", "third"]);
}

#[test]
fn test_statement_outlives_connection_owner() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = temp_db(&dir);
    seed(&path);

    let mut stmt = {
        let conn = Connection::open(&path, false).expect("open");
        conn.prepare("SELECT id, data FROM notes WHERE length(data) > ? ORDER BY id")
            .expect("prepare")
    };
    stmt.bind_int64(1, 0).expect("bind");
    let mut rows = Vec::new();
    while stmt.step().expect("step") == StepResult::Row {
        rows.push((stmt.view_int64(0), stmt.view_blob(1).to_vec()));
    }
    assert_eq!(rows, vec![(1, vec![1]), (2, vec![2, 2])]);
}

#[test]
fn test_read_only_connection_rejects_writes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = temp_db(&dir);
    seed(&path);

    let conn = Connection::open(&path, true).expect("open read-only");
    let mut stmt = conn
        .prepare("DELETE FROM notes WHERE id = ?")
        .expect("prepare");
    stmt.bind_int64(1, 1).expect("bind");
    let err = stmt.step().expect_err("read-only database");
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(stmt.state(), State::Finished);
}

#[test]
fn test_second_connection_sees_committed_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = temp_db(&dir);
    seed(&path);

    let writer = Connection::open(&path, false).expect("writer");
    let reader = Connection::open(&path, false).expect("reader");
    let mut count = reader.prepare("SELECT count(*) FROM notes").expect("prepare");

    count.step().expect("step");
    assert_eq!(count.view_int64(0), 3);
    count.reset();

    writer
        .execute("INSERT INTO notes (body) VALUES (?1)", params!["fourth"])
        .expect("insert");
    count.step().expect("step");
    assert_eq!(count.view_int64(0), 4);
}

#[test]
fn test_open_missing_file_read_only_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = Connection::open(&dir.path().join("missing.sqlite"), true)
        .expect_err("nothing to open");
    assert_eq!(err.kind(), ErrorKind::Execution);
}
