use super::*;

fn lines_db(on_delete: OnDeleteAction) -> Database {
    let db = test_db();
    let lines = interleaved(
        table(
            "Lines",
            vec![
                ColumnDef::new("AccountId", DataType::Int64).not_null(),
                ColumnDef::new("LineId", DataType::Int64).not_null(),
                ColumnDef::new("Memo", DataType::String),
            ],
            &["AccountId", "LineId"],
        ),
        "Accounts",
        on_delete,
    );
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(lines),
        ],
    );
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId"],
        vec![vec![int(1)], vec![int(2)]],
    ))
    .unwrap();
    txn.write(&MutationOp::insert(
        "Lines",
        &["AccountId", "LineId"],
        vec![vec![int(1), int(1)], vec![int(1), int(2)], vec![int(2), int(1)]],
    ))
    .unwrap();
    txn.commit().unwrap();
    db
}

#[test]
fn test_child_needs_parent_row() {
    let db = lines_db(OnDeleteAction::Cascade);
    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::insert(
            "Lines",
            &["AccountId", "LineId"],
            vec![vec![int(9), int(1)]],
        ))
        .unwrap_err();
    assert_eq!(err.constraint(), Some("Lines"));
    assert_eq!(
        err.to_string(),
        "Insert failed because key was not found in parent table Accounts: {9}"
    );
}

#[test]
fn test_child_may_follow_parent_in_same_transaction() {
    let db = lines_db(OnDeleteAction::Cascade);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert("Accounts", &["AccountId"], vec![vec![int(3)]]))
        .unwrap();
    txn.write(&MutationOp::insert(
        "Lines",
        &["AccountId", "LineId"],
        vec![vec![int(3), int(1)]],
    ))
    .unwrap();
    txn.commit().unwrap();
    assert_eq!(scan(&db, "Lines", &["LineId"]).len(), 4);
}

#[test]
fn test_no_action_parent_delete_is_rejected() {
    let db = lines_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::delete("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap_err();
    assert_eq!(err.constraint(), Some("Lines"));
    assert!(err.to_string().contains("while child rows exist"));

    // Deleting the children first lets the parent go.
    txn.write(&MutationOp::delete(
        "Lines",
        &["AccountId", "LineId"],
        vec![vec![int(1), int(1)], vec![int(1), int(2)]],
    ))
    .unwrap();
    txn.write(&MutationOp::delete("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap();
    txn.commit().unwrap();
    assert_eq!(scan(&db, "Accounts", &["AccountId"]), vec![vec![int(2)]]);
}

#[test]
fn test_cascade_parent_delete_removes_children() {
    let db = lines_db(OnDeleteAction::Cascade);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::delete("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap();
    assert_eq!(txn.scan("Lines", &["AccountId", "LineId"]).unwrap(), vec![vec![int(2), int(1)]]);
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Lines", &["AccountId", "LineId"]),
        vec![vec![int(2), int(1)]]
    );
}

#[test]
fn test_cascade_reaches_grandchildren() {
    let db = lines_db(OnDeleteAction::Cascade);
    let notes = interleaved(
        table(
            "Notes",
            vec![
                ColumnDef::new("AccountId", DataType::Int64).not_null(),
                ColumnDef::new("LineId", DataType::Int64).not_null(),
                ColumnDef::new("NoteId", DataType::Int64).not_null(),
            ],
            &["AccountId", "LineId", "NoteId"],
        ),
        "Lines",
        OnDeleteAction::Cascade,
    );
    create(&db, vec![DdlStatement::CreateTable(notes)]);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Notes",
        &["AccountId", "LineId", "NoteId"],
        vec![vec![int(1), int(2), int(1)], vec![int(2), int(1), int(1)]],
    ))
    .unwrap();
    txn.commit().unwrap();

    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::delete("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap();
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Notes", &["AccountId", "LineId", "NoteId"]),
        vec![vec![int(2), int(1), int(1)]]
    );
}

#[test]
fn test_defaulted_parent_key_still_needs_parent_row() {
    let db = test_db();
    let lines = interleaved(
        table(
            "Lines",
            vec![
                ColumnDef::new("AccountId", DataType::Int64)
                    .not_null()
                    .default_value("1"),
                ColumnDef::new("LineId", DataType::Int64).not_null(),
            ],
            &["AccountId", "LineId"],
        ),
        "Accounts",
        OnDeleteAction::Cascade,
    );
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(lines),
        ],
    );

    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::insert("Lines", &["LineId"], vec![vec![int(7)]]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Insert failed because key was not found in parent table Accounts: {1}"
    );
    assert!(txn.scan("Lines", &["AccountId", "LineId"]).unwrap().is_empty());

    txn.write(&MutationOp::insert("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap();
    txn.write(&MutationOp::insert("Lines", &["LineId"], vec![vec![int(7)]]))
        .unwrap();
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Lines", &["AccountId", "LineId"]),
        vec![vec![int(1), int(7)]]
    );
}
