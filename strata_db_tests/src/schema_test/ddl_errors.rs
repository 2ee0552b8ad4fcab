use super::*;

#[test]
fn test_duplicate_table_is_rejected() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let err = db
        .update_schema(&[DdlStatement::CreateTable(accounts())])
        .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
    assert!(err.to_string().contains("Duplicate name in schema"));
    assert_eq!(db.schema().version(), SchemaVersion(1));
}

#[test]
fn test_if_not_exists_skips_existing_table() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let mut again = accounts();
    again.if_not_exists = true;
    db.update_schema(&[DdlStatement::CreateTable(again)]).unwrap();
    assert_eq!(db.schema().tables().count(), 1);
}

#[test]
fn test_batch_stops_at_first_failure() {
    let db = test_db();
    let audit = table(
        "Audit",
        vec![ColumnDef::new("EntryId", DataType::Int64)],
        &["EntryId"],
    );
    let err = db
        .update_schema(&[
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(audit),
        ])
        .unwrap_err();
    assert!(matches!(err, Error::Schema(_)));
    let schema = db.schema();
    assert!(schema.find_table("Accounts").is_some());
    assert!(schema.find_table("Audit").is_none());
    assert_eq!(schema.version(), SchemaVersion(1));
}

#[test]
fn test_drop_table_with_index_is_rejected() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateIndex(index("AccountsByEmail", "Accounts", &["Email"], false)),
        ],
    );
    let err = db
        .update_schema(&[DdlStatement::DropTable(DropObject::named("Accounts"))])
        .unwrap_err();
    assert_eq!(
        err,
        Error::Schema("Cannot drop table Accounts with indices: AccountsByEmail.".into())
    );

    create(
        &db,
        vec![
            DdlStatement::DropIndex(DropObject::named("AccountsByEmail")),
            DdlStatement::DropTable(DropObject::named("Accounts")),
        ],
    );
    assert!(db.schema().find_table("Accounts").is_none());
}

#[test]
fn test_drop_missing_table() {
    let db = test_db();
    let err = db
        .update_schema(&[DdlStatement::DropTable(DropObject::named("Nope"))])
        .unwrap_err();
    assert_eq!(err, Error::Schema("Table not found: Nope".into()));

    let mut if_exists = DropObject::named("Nope");
    if_exists.if_exists = true;
    db.update_schema(&[DdlStatement::DropTable(if_exists)]).unwrap();
}

#[test]
fn test_cannot_drop_key_column() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let drop = AlterTable {
        table: "Accounts".into(),
        action: AlterTableAction::DropColumn {
            column: "AccountId".into(),
        },
    };
    let err = db.update_schema(&[DdlStatement::AlterTable(drop)]).unwrap_err();
    assert!(err.to_string().contains("Cannot drop key column AccountId"));
}

#[test]
fn test_generated_column_must_reference_known_columns() {
    let db = test_db();
    let mut accounts = accounts();
    accounts
        .columns
        .push(ColumnDef::new("Shout", DataType::String).generated("UPPER(Nickname)", true));
    let err = db
        .update_schema(&[DdlStatement::CreateTable(accounts)])
        .unwrap_err();
    assert!(err.to_string().contains("references unknown column nickname"));
    assert!(db.schema().find_table("Accounts").is_none());
}

#[test]
fn test_not_null_on_column_with_nulls_fails_backfill() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap();
    txn.commit().unwrap();

    let tighten = AlterTable {
        table: "Accounts".into(),
        action: AlterTableAction::AlterColumn {
            column: ColumnDef::new("Email", DataType::String).length(64).not_null(),
        },
    };
    let err = db
        .update_schema(&[DdlStatement::AlterTable(tighten)])
        .unwrap_err();
    assert_eq!(err.constraint(), Some("Email"));
    assert!(err.to_string().contains("has NULL value(s)"));
    let schema = db.schema();
    assert_eq!(schema.version(), SchemaVersion(1));
    let table = schema.find_table("Accounts").unwrap();
    assert!(schema.find_column(table, "Email").unwrap().nullable);
}

#[test]
fn test_add_check_verifies_existing_rows() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId", "Email"],
        vec![vec![int(-1), text("neg@x.com")]],
    ))
    .unwrap();
    txn.commit().unwrap();

    let check = AlterTable {
        table: "Accounts".into(),
        action: AlterTableAction::AddCheckConstraint {
            check: CheckDef {
                name: Some("PositiveId".into()),
                expression: "AccountId > 0".into(),
            },
        },
    };
    let err = db.update_schema(&[DdlStatement::AlterTable(check)]).unwrap_err();
    assert_eq!(err.constraint(), Some("PositiveId"));
}

#[test]
fn test_add_column_with_default_backfills_rows() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId"],
        vec![vec![int(1)], vec![int(2)]],
    ))
    .unwrap();
    txn.commit().unwrap();

    let add = AlterTable {
        table: "Accounts".into(),
        action: AlterTableAction::AddColumn {
            column: ColumnDef::new("Tier", DataType::Int64)
                .not_null()
                .default_value("3"),
            if_not_exists: false,
        },
    };
    create(&db, vec![DdlStatement::AlterTable(add)]);
    let rows = db.begin().unwrap().scan("Accounts", &["AccountId", "Tier"]).unwrap();
    assert_eq!(rows, vec![vec![int(1), int(3)], vec![int(2), int(3)]]);
}

#[test]
fn test_add_not_null_column_without_default_is_rejected() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let add = AlterTable {
        table: "Accounts".into(),
        action: AlterTableAction::AddColumn {
            column: ColumnDef::new("Tier", DataType::Int64).not_null(),
            if_not_exists: false,
        },
    };
    let err = db.update_schema(&[DdlStatement::AlterTable(add)]).unwrap_err();
    assert!(err.to_string().contains("Cannot add NOT NULL column"));
}

#[test]
fn test_drop_table_removes_its_rows() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap();
    txn.commit().unwrap();

    create(
        &db,
        vec![
            DdlStatement::DropTable(DropObject::named("Accounts")),
            DdlStatement::CreateTable(accounts()),
        ],
    );
    let rows = db.begin().unwrap().scan("Accounts", &["AccountId"]).unwrap();
    assert!(rows.is_empty());
}
