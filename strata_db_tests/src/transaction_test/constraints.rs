use super::*;

#[test]
fn test_foreign_key_needs_referenced_row() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Orders",
        &["OrderId", "AccountId", "Amount"],
        vec![vec![int(10), int(99), int(5)]],
    ))
    .unwrap();
    let err = txn.commit().unwrap_err();
    assert_eq!(err.constraint(), Some("FK_OrdersAccount"));
    assert!(err.to_string().contains("Cannot find referenced values {99}"));
}

#[test]
fn test_foreign_key_sees_rows_of_same_transaction() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Orders",
        &["OrderId", "AccountId", "Amount"],
        vec![vec![int(10), int(1), int(5)]],
    ))
    .unwrap();
    txn.write(&MutationOp::insert("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap();
    txn.commit().unwrap();
}

#[test]
fn test_null_foreign_key_is_not_checked() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Orders",
        &["OrderId", "Amount"],
        vec![vec![int(10), int(5)]],
    ))
    .unwrap();
    txn.commit().unwrap();
}

#[test]
fn test_referenced_row_cannot_be_deleted() {
    let db = shop_db(OnDeleteAction::NoAction);
    insert_accounts(&db, &[(1, "a@x.com")]);
    insert_orders(&db, &[(10, 1, 5)]);

    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::delete("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap();
    let err = txn.commit().unwrap_err();
    assert_eq!(err.constraint(), Some("FK_OrdersAccount"));
    assert_eq!(scan(&db, "Accounts", &["AccountId"]).len(), 1);
}

#[test]
fn test_referenced_row_can_go_with_its_references() {
    let db = shop_db(OnDeleteAction::NoAction);
    insert_accounts(&db, &[(1, "a@x.com")]);
    insert_orders(&db, &[(10, 1, 5)]);

    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::delete("Orders", &["OrderId"], vec![vec![int(10)]]))
        .unwrap();
    txn.write(&MutationOp::delete("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap();
    txn.commit().unwrap();
    assert!(scan(&db, "Accounts", &["AccountId"]).is_empty());
}

#[test]
fn test_foreign_key_cascade_deletes_referencing_rows() {
    let db = shop_db(OnDeleteAction::Cascade);
    insert_accounts(&db, &[(1, "a@x.com"), (2, "b@x.com")]);
    insert_orders(&db, &[(10, 1, 5), (11, 2, 6), (12, 1, 7)]);

    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::delete("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap();
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Orders", &["OrderId", "AccountId"]),
        vec![vec![int(11), int(2)]]
    );
}

#[test]
fn test_check_constraint_rejects_false() {
    let db = test_db();
    let mut orders = orders(OnDeleteAction::NoAction);
    orders.foreign_keys.clear();
    orders.check_constraints.push(CheckDef {
        name: Some("PositiveAmount".into()),
        expression: "Amount > 0".into(),
    });
    create(&db, vec![DdlStatement::CreateTable(orders)]);

    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Orders",
        &["OrderId", "Amount"],
        vec![vec![int(1), int(-5)]],
    ))
    .unwrap();
    let err = txn.commit().unwrap_err();
    assert_eq!(err.constraint(), Some("PositiveAmount"));
    assert_eq!(
        err.to_string(),
        "Check constraint `Orders`.`PositiveAmount` is violated for key {1}"
    );

    // NULL satisfies the check.
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert("Orders", &["OrderId"], vec![vec![int(2)]]))
        .unwrap();
    txn.commit().unwrap();
}

#[test]
fn test_not_null_column_must_be_given() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::insert("Accounts", &["Email"], vec![vec![text("a@x.com")]]))
        .unwrap_err();
    assert_eq!(err.constraint(), Some("AccountId"));

    let err = txn
        .write(&MutationOp::insert("Accounts", &["AccountId"], vec![vec![Value::Null]]))
        .unwrap_err();
    assert_eq!(err.constraint(), Some("AccountId"));
}

#[test]
fn test_value_must_match_column_type() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::insert(
            "Accounts",
            &["AccountId", "Email"],
            vec![vec![int(1), int(7)]],
        ))
        .unwrap_err();
    assert!(matches!(err, Error::TypeMismatch(_)));
}

#[test]
fn test_string_longer_than_column_limit() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::insert(
            "Accounts",
            &["AccountId", "Email"],
            vec![vec![int(1), text(&"x".repeat(65))]],
        ))
        .unwrap_err();
    assert_eq!(err.constraint(), Some("Email"));
    assert!(err.to_string().contains("limit: 64"));
}
