use super::*;
use strata_db_core::schema::FINGERPRINT_LENGTH;
use strata_db_core::schema::updater::managed_index_name;

fn add_fk(name: &str) -> DdlStatement {
    DdlStatement::AlterTable(AlterTable {
        table: "Orders".into(),
        action: AlterTableAction::AddForeignKey {
            foreign_key: foreign_key(
                Some(name),
                &["AccountId"],
                "Accounts",
                &["AccountId"],
                OnDeleteAction::NoAction,
            ),
        },
    })
}

fn drop_constraint(name: &str) -> DdlStatement {
    DdlStatement::AlterTable(AlterTable {
        table: "Orders".into(),
        action: AlterTableAction::DropConstraint { name: name.into() },
    })
}

#[test]
fn test_index_gets_data_table() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateIndex(index("AccountsByEmail", "Accounts", &["Email"], true)),
        ],
    );
    let schema = db.schema();
    let index = schema.find_index("AccountsByEmail").unwrap();
    assert!(index.unique);
    assert!(!index.is_managed());
    let data = schema.get::<Table>(index.data_table).unwrap();
    assert_eq!(data.owner_index, Some(index.id));
    // Index key followed by the base table key.
    let names: Vec<&str> = schema
        .table_columns(data)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["Email", "AccountId"]);
    assert!(schema.find_table(&data.name).is_none());
}

#[test]
fn test_foreign_key_creates_managed_index() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(orders(OnDeleteAction::NoAction)),
        ],
    );
    let schema = db.schema();
    let expected = managed_index_name("Orders", &["AccountId".to_string()], false);
    assert!(expected.starts_with("IDX_Orders_AccountId_N_"));
    assert_eq!(expected.len(), "IDX_Orders_AccountId_N_".len() + FINGERPRINT_LENGTH);

    let index = schema.find_index(&expected).unwrap();
    assert!(index.is_managed());
    assert!(!index.unique);
    let fk = schema.referencing_foreign_keys(schema.find_table("Accounts").unwrap().id)[0];
    assert_eq!(index.managing_nodes, vec![fk.id]);
    assert_eq!(fk.referencing_index, Some(index.id));
    // The referenced side is the primary key, no index needed.
    assert_eq!(fk.referenced_index, None);
}

#[test]
fn test_managed_index_is_shared_and_dropped_with_last_user() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(orders(OnDeleteAction::NoAction)),
            add_fk("FK_OrdersAccountAgain"),
        ],
    );
    let name = managed_index_name("Orders", &["AccountId".to_string()], false);
    let schema = db.schema();
    assert_eq!(schema.find_index(&name).unwrap().managing_nodes.len(), 2);
    assert_eq!(schema.indexes().count(), 1);

    create(&db, vec![drop_constraint("FK_OrdersAccount")]);
    let schema = db.schema();
    assert_eq!(schema.find_index(&name).unwrap().managing_nodes.len(), 1);

    create(&db, vec![drop_constraint("FK_OrdersAccountAgain")]);
    assert!(db.schema().find_index(&name).is_none());
}

#[test]
fn test_managed_index_cannot_be_dropped() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(orders(OnDeleteAction::NoAction)),
        ],
    );
    let name = managed_index_name("Orders", &["AccountId".to_string()], false);
    let err = db
        .update_schema(&[DdlStatement::DropIndex(DropObject::named(name.clone()))])
        .unwrap_err();
    assert_eq!(
        err,
        Error::Schema(format!(
            "Cannot drop managed index {name}: it is used by FK_OrdersAccount."
        ))
    );
}

#[test]
fn test_foreign_key_on_non_key_columns_adds_unique_index() {
    let db = test_db();
    let mut refs = table(
        "Referrals",
        vec![
            ColumnDef::new("ReferralId", DataType::Int64).not_null(),
            ColumnDef::new("Email", DataType::String).length(64),
        ],
        &["ReferralId"],
    );
    refs.foreign_keys.push(foreign_key(
        None,
        &["Email"],
        "Accounts",
        &["Email"],
        OnDeleteAction::NoAction,
    ));
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(refs),
        ],
    );
    let schema = db.schema();
    let unique = managed_index_name("Accounts", &["Email".to_string()], true);
    let index = schema.find_index(&unique).unwrap();
    assert!(index.unique);
    assert!(index.is_managed());
    let fk = schema.referencing_foreign_keys(index.table)[0];
    assert!(fk.name.starts_with("FK_Referrals_Accounts_"));
    assert_eq!(fk.referenced_index, Some(index.id));
}

#[test]
fn test_new_index_is_backfilled() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId", "Email"],
        vec![vec![int(1), text("a@x.com")], vec![int(2), text("a@x.com")]],
    ))
    .unwrap();
    txn.commit().unwrap();

    let err = db
        .update_schema(&[DdlStatement::CreateIndex(index(
            "AccountsByEmail",
            "Accounts",
            &["Email"],
            true,
        ))])
        .unwrap_err();
    assert_eq!(err.constraint(), Some("AccountsByEmail"));
    assert!(err.to_string().contains("Found uniqueness violation"));
    assert!(db.schema().find_index("AccountsByEmail").is_none());

    create(
        &db,
        vec![DdlStatement::CreateIndex(index(
            "AccountsByEmailAll",
            "Accounts",
            &["Email"],
            false,
        ))],
    );
    assert!(db.schema().find_index("AccountsByEmailAll").is_some());
}

#[test]
fn test_managed_index_found_under_another_fingerprint() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(orders(OnDeleteAction::NoAction)),
        ],
    );
    let schema = db.schema();
    let name = managed_index_name("Orders", &["AccountId".to_string()], false);
    let (prefix, fingerprint) = name.split_at(name.len() - FINGERPRINT_LENGTH);
    assert_eq!(prefix, "IDX_Orders_AccountId_N_");
    let other = if fingerprint == "0123456789ABCDEF" {
        "FEDCBA9876543210"
    } else {
        "0123456789ABCDEF"
    };

    let sibling = format!("{prefix}{other}");
    assert_eq!(schema.find_managed_index(&sibling).unwrap().name, name);
    assert_eq!(schema.find_index(&sibling).unwrap().name, name);
    assert!(schema.find_index_case_sensitive(&sibling).is_none());

    // Same shape, different prefix.
    for missing in [
        format!("IDX_Orders_Amount_N_{other}"),
        format!("IDX_Orders_AccountId_U_{other}"),
        format!("IDX_Orders_AccountId_N_{}", &other[..FINGERPRINT_LENGTH - 1]),
        format!("IDX_Orders_AccountId_N_{}", other.to_lowercase()),
    ] {
        assert!(schema.find_managed_index(&missing).is_none(), "{missing}");
        assert!(schema.find_index(&missing).is_none(), "{missing}");
    }
}
