use super::*;

#[test]
fn test_insert_then_scan_in_key_order() {
    let db = shop_db(OnDeleteAction::NoAction);
    insert_accounts(&db, &[(2, "b@x.com"), (1, "a@x.com")]);
    assert_eq!(
        scan(&db, "Accounts", &["AccountId", "Email"]),
        vec![
            vec![int(1), text("a@x.com")],
            vec![int(2), text("b@x.com")],
        ]
    );
}

#[test]
fn test_transaction_reads_its_own_writes() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId", "Email"],
        vec![vec![int(1), text("a@x.com")]],
    ))
    .unwrap();
    assert_eq!(
        txn.read("Accounts", &[int(1)], &["Email"]).unwrap(),
        Some(vec![text("a@x.com")])
    );
    // Nothing reaches storage before commit.
    assert!(scan(&db, "Accounts", &["AccountId"]).is_empty());
    txn.commit().unwrap();
    assert_eq!(scan(&db, "Accounts", &["AccountId"]).len(), 1);
}

#[test]
fn test_dropped_transaction_writes_nothing() {
    let db = shop_db(OnDeleteAction::NoAction);
    {
        let mut txn = db.begin().unwrap();
        txn.write(&MutationOp::insert("Accounts", &["AccountId"], vec![vec![int(1)]]))
            .unwrap();
    }
    assert!(scan(&db, "Accounts", &["AccountId"]).is_empty());
}

#[test]
fn test_duplicate_insert_is_rejected() {
    let db = shop_db(OnDeleteAction::NoAction);
    insert_accounts(&db, &[(1, "a@x.com")]);
    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::insert("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap_err();
    assert_eq!(
        err,
        Error::AlreadyExists("Row {1} in table Accounts already exists".into())
    );
}

#[test]
fn test_update_of_missing_row_is_rejected() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::update(
            "Accounts",
            &["AccountId", "Email"],
            vec![vec![int(5), text("e@x.com")]],
        ))
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.to_string().contains("Row cannot be updated"));
}

#[test]
fn test_update_keeps_unlisted_columns() {
    let db = shop_db(OnDeleteAction::NoAction);
    insert_accounts(&db, &[(1, "a@x.com")]);
    insert_orders(&db, &[(10, 1, 5)]);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::update(
        "Orders",
        &["OrderId", "Amount"],
        vec![vec![int(10), int(7)]],
    ))
    .unwrap();
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Orders", &["OrderId", "AccountId", "Amount"]),
        vec![vec![int(10), int(1), int(7)]]
    );
}

#[test]
fn test_insert_or_update_and_replace() {
    let db = shop_db(OnDeleteAction::NoAction);
    insert_accounts(&db, &[(1, "a@x.com")]);

    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::new(
        MutationKind::InsertOrUpdate,
        "Accounts",
        &["AccountId", "Email"],
        vec![vec![int(1), text("new@x.com")], vec![int(2), text("b@x.com")]],
    ))
    .unwrap();
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Accounts", &["AccountId", "Email"]),
        vec![
            vec![int(1), text("new@x.com")],
            vec![int(2), text("b@x.com")],
        ]
    );

    // Replace drops the columns it does not list.
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::new(
        MutationKind::Replace,
        "Accounts",
        &["AccountId"],
        vec![vec![int(1)]],
    ))
    .unwrap();
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Accounts", &["AccountId", "Email"])[0],
        vec![int(1), Value::Null]
    );
}

#[test]
fn test_delete_needs_exactly_the_key_columns() {
    let db = shop_db(OnDeleteAction::NoAction);
    insert_accounts(&db, &[(1, "a@x.com")]);
    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::delete("Accounts", &["Email"], vec![vec![text("a@x.com")]]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    txn.write(&MutationOp::delete("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap();
    txn.commit().unwrap();
    assert!(scan(&db, "Accounts", &["AccountId"]).is_empty());
}

#[test]
fn test_delete_of_missing_row_is_a_no_op() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::delete("Accounts", &["AccountId"], vec![vec![int(42)]]))
        .unwrap();
    txn.commit().unwrap();
}

#[test]
fn test_unknown_table_and_column() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::insert("Nope", &["Id"], vec![vec![int(1)]]))
        .unwrap_err();
    assert_eq!(err, Error::NotFound("Table not found: Nope".into()));

    let err = txn
        .write(&MutationOp::insert("Accounts", &["AccountId", "Phone"], vec![vec![int(1), text("1")]]))
        .unwrap_err();
    assert_eq!(err, Error::NotFound("Column not found: Accounts.Phone".into()));
}

#[test]
fn test_row_width_must_match_columns() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::insert("Accounts", &["AccountId", "Email"], vec![vec![int(1)]]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_transaction_keeps_its_schema_version() {
    let db = shop_db(OnDeleteAction::NoAction);
    let txn = db.begin().unwrap();
    let version = txn.schema().version();
    create(
        &db,
        vec![DdlStatement::CreateIndex(index("OrdersByAmount", "Orders", &["Amount"], false))],
    );
    assert_eq!(txn.schema().version(), version);
    assert!(db.schema().version() > version);
}
