use super::*;
use strata_db_core::schema::printer::print_statement;

#[test]
fn test_each_statement_publishes_a_version() {
    let db = test_db();
    assert_eq!(db.schema().version(), SchemaVersion(0));
    let version = db
        .update_schema(&[
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(orders(OnDeleteAction::NoAction)),
        ])
        .unwrap();
    assert_eq!(version, SchemaVersion(2));
    assert_eq!(version.to_string(), "v2");
    assert_eq!(db.action_manager().registered_versions().len(), 3);
}

#[test]
fn test_new_version_shares_untouched_nodes() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let before = db.schema();
    let accounts_id = before.find_table("Accounts").unwrap().id;

    let extra = table(
        "Audit",
        vec![ColumnDef::new("EntryId", DataType::Int64)],
        &["EntryId"],
    );
    create(&db, vec![DdlStatement::CreateTable(extra)]);
    let after = db.schema();

    let old_node = before.graph().get_shared(accounts_id).unwrap();
    let new_node = after.graph().get_shared(accounts_id).unwrap();
    assert!(Arc::ptr_eq(old_node, new_node));
    assert!(before.find_table("Audit").is_none());
    assert!(after.find_table("Audit").is_some());
}

#[test]
fn test_edited_node_is_copied_not_mutated() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let before = db.schema();
    let accounts_id = before.find_table("Accounts").unwrap().id;

    let add = AlterTable {
        table: "Accounts".into(),
        action: AlterTableAction::AddColumn {
            column: ColumnDef::new("Nickname", DataType::String),
            if_not_exists: false,
        },
    };
    create(&db, vec![DdlStatement::AlterTable(add)]);
    let after = db.schema();

    let old_node = before.graph().get_shared(accounts_id).unwrap();
    let new_node = after.graph().get_shared(accounts_id).unwrap();
    assert!(!Arc::ptr_eq(old_node, new_node));
    assert_eq!(before.get::<Table>(accounts_id).unwrap().columns.len(), 2);
    assert_eq!(after.get::<Table>(accounts_id).unwrap().columns.len(), 3);
}

#[test]
fn test_dump_replays_to_same_schema() {
    let db = test_db();
    let mut orders = orders(OnDeleteAction::Cascade);
    orders.columns.push(ColumnDef::new("Total", DataType::Int64).generated("Amount * 2", true));
    orders.check_constraints.push(CheckDef {
        name: Some("PositiveAmount".into()),
        expression: "Amount > 0".into(),
    });
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(orders),
            DdlStatement::CreateIndex(index("AccountsByEmail", "Accounts", &["Email"], true)),
        ],
    );

    let dump = db.dump();
    let replica = test_db();
    replica.update_schema(&dump).unwrap();
    assert_eq!(replica.dump(), dump);
    assert_eq!(replica.print_ddl(), db.print_ddl());
}

#[test]
fn test_dump_leaves_out_managed_indexes() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(orders(OnDeleteAction::NoAction)),
        ],
    );
    let dump = db.dump();
    assert_eq!(dump.len(), 2);
    assert!(dump.iter().all(|s| !matches!(s, DdlStatement::CreateIndex(_))));
}

#[test]
fn test_dump_keeps_index_creation_order() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateIndex(index("ZetaByEmail", "Accounts", &["Email"], false)),
            DdlStatement::CreateIndex(index("AlphaByEmail", "Accounts", &["Email"], true)),
        ],
    );
    let names: Vec<String> = db
        .dump()
        .into_iter()
        .filter_map(|statement| match statement {
            DdlStatement::CreateIndex(index) => Some(index.name),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["ZetaByEmail", "AlphaByEmail"]);
    let ddl = db.print_ddl();
    assert!(ddl[1].contains("ZetaByEmail"));
    assert!(ddl[2].contains("AlphaByEmail"));
}

#[test]
fn test_printer_renders_create_table() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateIndex(index("AccountsByEmail", "Accounts", &["Email"], true)),
        ],
    );
    let ddl = db.print_ddl();
    assert_eq!(ddl.len(), 2);
    assert!(ddl[0].starts_with("CREATE TABLE"));
    assert!(ddl[0].contains("Accounts"));
    assert!(ddl[1].starts_with("CREATE UNIQUE INDEX"));
    assert_eq!(ddl[0], print_statement(&db.dump()[0]));
}

#[test]
fn test_ddl_statements_round_trip_through_json() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let dump = db.dump();
    let json = serde_json::to_string(&dump).unwrap();
    let parsed: Vec<DdlStatement> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, dump);
}
