use super::*;

#[test]
fn test_registry_lists_actions_per_table() {
    let db = shop_db();
    let registry = ActionRegistry::new(db.schema(), Arc::new(FunctionCatalog::new()));
    let actions = registry.describe();

    assert_eq!(
        actions["Accounts"],
        vec![
            "ColumnValueValidator(Accounts)",
            "RowExistenceValidator(Accounts)",
            "IndexEffector(AccountsByEmail)",
            "ForeignKeyActionEffector(FK_OrdersAccount)",
            "IndexModifier(AccountsByEmail)",
            "ForeignKeyReferencedVerifier(FK_OrdersAccount)",
        ]
    );
    assert_eq!(
        actions["_index_data_AccountsByEmail"],
        vec!["UniqueIndexVerifier(AccountsByEmail)"]
    );

    let orders = &actions["Orders"];
    assert_eq!(orders[0], "ColumnValueValidator(Orders)");
    assert!(orders.contains(&"ColumnDefaultEffector(Status)".to_string()));
    assert!(orders.contains(&"GeneratedColumnEffector(Orders, columns)".to_string()));
    assert!(orders.contains(&"ForeignKeyReferencingVerifier(FK_OrdersAccount)".to_string()));
    assert!(orders.contains(&"CheckConstraintVerifier(PositiveAmount)".to_string()));
    assert!(!orders.iter().any(|a| a.ends_with("keys)")));
}

#[test]
fn test_registries_for_same_schema_are_equal() {
    let first_db = shop_db();
    let second_db = shop_db();
    assert!(!Arc::ptr_eq(&first_db.schema(), &second_db.schema()));

    let functions = Arc::new(FunctionCatalog::new());
    let first_manager = ActionManager::new();
    let second_manager = ActionManager::new();
    first_manager
        .add_actions_for_schema(first_db.schema(), functions.clone())
        .unwrap();
    second_manager
        .add_actions_for_schema(second_db.schema(), functions.clone())
        .unwrap();

    let version = first_db.schema().version();
    let first = first_manager.get_actions_for_schema(version).unwrap();
    let second = second_manager.get_actions_for_schema(version).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);

    let rebuilt = ActionRegistry::new(second_db.schema(), functions);
    assert_eq!(rebuilt, *first);
    let published = first_db
        .action_manager()
        .get_actions_for_schema(version)
        .unwrap();
    assert_eq!(*published, *second);
}

#[test]
fn test_registry_differs_after_schema_change() {
    let db = shop_db();
    let functions = Arc::new(FunctionCatalog::new());
    let before = ActionRegistry::new(db.schema(), functions.clone());
    create(
        &db,
        vec![DdlStatement::CreateIndex(index("OrdersByAmount", "Orders", &["Amount"], false))],
    );
    let after = ActionRegistry::new(db.schema(), functions);
    assert_ne!(before, after);
    assert!(after.describe()["Orders"].contains(&"IndexModifier(OrdersByAmount)".to_string()));
}

#[test]
fn test_interleaved_tables_get_parent_and_child_actions() {
    let db = test_db();
    let lines = interleaved(
        table(
            "Lines",
            vec![
                ColumnDef::new("AccountId", DataType::Int64).not_null(),
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
    let registry = ActionRegistry::new(db.schema(), Arc::new(FunctionCatalog::new()));
    let actions = registry.describe();
    assert!(actions["Accounts"].contains(&"InterleaveParentValidator(Accounts -> Lines)".to_string()));
    assert!(actions["Accounts"].contains(&"InterleaveParentEffector(Accounts -> Lines)".to_string()));
    assert!(actions["Lines"].contains(&"InterleaveChildValidator(Accounts -> Lines)".to_string()));
}

#[test]
fn test_identity_key_gets_key_effector() {
    let db = test_db();
    let tickets = table(
        "Tickets",
        vec![
            ColumnDef::new("TicketId", DataType::Int64).identity(),
            ColumnDef::new("Title", DataType::String),
        ],
        &["TicketId"],
    );
    create(&db, vec![DdlStatement::CreateTable(tickets)]);
    let registry = ActionRegistry::new(db.schema(), Arc::new(FunctionCatalog::new()));
    assert!(registry.describe()["Tickets"]
        .contains(&"GeneratedColumnEffector(Tickets, keys)".to_string()));
}

#[test]
fn test_unknown_version_is_not_found() {
    let manager = ActionManager::new();
    let err = manager.get_actions_for_schema(SchemaVersion(7)).unwrap_err();
    assert_eq!(
        err,
        Error::NotFound("Schema version v7 was not registered with the action manager".into())
    );
}
