use super::*;

#[test]
fn test_every_published_version_is_registered() {
    let db = shop_db();
    let versions = db.action_manager().registered_versions();
    assert_eq!(
        versions,
        (0..=3).map(SchemaVersion).collect::<Vec<_>>()
    );
    for version in versions {
        let registry = db.action_manager().get_actions_for_schema(version).unwrap();
        assert_eq!(registry.schema().version(), version);
    }
}

#[test]
fn test_removed_version_cannot_start_transactions() {
    let db = shop_db();
    let version = db.schema().version();
    assert!(db.action_manager().remove_actions_for_schema(version));
    assert!(!db.action_manager().remove_actions_for_schema(version));

    let err = db.begin().err().unwrap();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_old_registry_outlives_new_versions() {
    let db = shop_db();
    let old = db
        .action_manager()
        .get_actions_for_schema(SchemaVersion(1))
        .unwrap();
    create(
        &db,
        vec![DdlStatement::CreateIndex(index("OrdersByAmount", "Orders", &["Amount"], false))],
    );
    assert!(old.schema().find_table("Orders").is_none());
    assert!(old.describe().contains_key("Accounts"));
}

#[test]
fn test_manager_shares_registry_between_lookups() {
    let manager = ActionManager::new();
    let db = shop_db();
    manager
        .add_actions_for_schema(db.schema(), Arc::new(FunctionCatalog::new()))
        .unwrap();
    let first = manager.get_actions_for_schema(db.schema().version()).unwrap();
    let second = manager.get_actions_for_schema(db.schema().version()).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_same_version_of_another_schema_keeps_first_registry() {
    let manager = ActionManager::new();
    let first_db = shop_db();
    let second_db = shop_db();
    assert_eq!(first_db.schema().version(), second_db.schema().version());
    let version = first_db.schema().version();

    let functions = Arc::new(FunctionCatalog::new());
    manager
        .add_actions_for_schema(first_db.schema(), functions.clone())
        .unwrap();
    let kept = manager.get_actions_for_schema(version).unwrap();

    // Registering the same schema again changes nothing.
    manager
        .add_actions_for_schema(first_db.schema(), functions.clone())
        .unwrap();
    let err = manager
        .add_actions_for_schema(second_db.schema(), functions)
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));

    let current = manager.get_actions_for_schema(version).unwrap();
    assert!(Arc::ptr_eq(&kept, &current));
    assert!(Arc::ptr_eq(current.schema(), &first_db.schema()));
    assert_eq!(manager.registered_versions(), vec![version]);
}
