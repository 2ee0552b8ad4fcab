use super::*;
use anyhow::Context;
use strata_db_core::schema::ddl::CreateSchema;

#[test]
fn test_table_lookup_ignores_case() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(accounts())]);
    let schema = db.schema();
    assert_eq!(schema.find_table("accounts").unwrap().name, "Accounts");
    assert_eq!(schema.find_table("ACCOUNTS").unwrap().name, "Accounts");
    assert!(schema.find_table_case_sensitive("Accounts").is_some());
    assert!(schema.find_table_case_sensitive("accounts").is_none());
}

#[test]
fn test_synonym_resolves_to_table() -> anyhow::Result<()> {
    let db = test_db();
    let mut accounts = accounts();
    accounts.synonym = Some("Members".into());
    db.update_schema(&[DdlStatement::CreateTable(accounts)])?;
    let schema = db.schema();

    let table = schema.find_table("members").context("synonym lookup")?;
    assert_eq!(table.name, "Accounts");
    assert!(schema.find_table_using_synonym_case_sensitive("Members").is_some());
    assert!(schema.find_table_using_synonym_case_sensitive("MEMBERS").is_none());

    let mut txn = db.begin()?;
    txn.write(&MutationOp::insert(
        "Members",
        &["AccountId", "Email"],
        vec![vec![int(1), text("a@x.com")]],
    ))?;
    txn.commit()?;
    let rows = db.begin()?.scan("Accounts", &["Email"])?;
    assert_eq!(rows, vec![vec![text("a@x.com")]]);
    Ok(())
}

#[test]
fn test_drop_synonym() {
    let db = test_db();
    let mut accounts = accounts();
    accounts.synonym = Some("Members".into());
    create(&db, vec![DdlStatement::CreateTable(accounts)]);
    let drop = AlterTable {
        table: "Accounts".into(),
        action: AlterTableAction::DropSynonym {
            synonym: "members".into(),
        },
    };
    create(&db, vec![DdlStatement::AlterTable(drop)]);
    assert!(db.schema().find_table("Members").is_none());
}

#[test]
fn test_columns_in_declaration_order() {
    let db = test_db();
    create(&db, vec![DdlStatement::CreateTable(orders_without_fk())]);
    let schema = db.schema();
    let table = schema.find_table("Orders").unwrap();
    let names: Vec<&str> = schema
        .table_columns(table)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["OrderId", "AccountId", "Amount"]);
    assert_eq!(schema.find_column(table, "amount").unwrap().name, "Amount");
    assert!(schema.find_column(table, "missing").is_none());
}

#[test]
fn test_interleaved_children_and_referencing_keys() {
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
            DdlStatement::CreateTable(orders(OnDeleteAction::NoAction)),
        ],
    );
    let schema = db.schema();
    let accounts = schema.find_table("Accounts").unwrap();
    let children: Vec<&str> = schema
        .children_of(accounts.id)
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(children, vec!["Lines"]);
    let referencing = schema.referencing_foreign_keys(accounts.id);
    assert_eq!(referencing.len(), 1);
    assert_eq!(referencing[0].name, "FK_OrdersAccount");
}

#[test]
fn test_indexes_under_name_cover_named_schemas() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateSchema(CreateSchema {
                name: "Sales".into(),
                if_not_exists: false,
            }),
            DdlStatement::CreateIndex(index("ByEmail", "Accounts", &["Email"], false)),
            DdlStatement::CreateIndex(index("Sales.ByEmail", "Accounts", &["Email"], false)),
            DdlStatement::CreateIndex(index("Sales.OnlyInSales", "Accounts", &["AccountId"], false)),
        ],
    );
    let schema = db.schema();
    let names = |name: &str| -> Vec<String> {
        schema
            .find_indexes_under_name(name)
            .into_iter()
            .map(|index| index.name.clone())
            .collect()
    };
    assert_eq!(names("ByEmail"), vec!["ByEmail", "Sales.ByEmail"]);
    assert_eq!(names("byemail"), vec!["ByEmail", "Sales.ByEmail"]);
    assert_eq!(names("OnlyInSales"), vec!["Sales.OnlyInSales"]);
    assert!(names("Missing").is_empty());
    assert_eq!(schema.find_index("sales.byemail").unwrap().name, "Sales.ByEmail");
}

#[test]
fn test_graph_lists_hidden_tables_after_public_ones() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateIndex(index("AccountsByEmail", "Accounts", &["Email"], true)),
        ],
    );
    let schema = db.schema();
    let all: Vec<&str> = schema
        .graph()
        .iter_as::<Table>()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(all, vec!["Accounts", "_index_data_AccountsByEmail"]);
    let public: Vec<&str> = schema.tables().map(|t| t.name.as_str()).collect();
    assert_eq!(public, vec!["Accounts"]);
}

fn orders_without_fk() -> strata_db_core::schema::ddl::CreateTable {
    let mut orders = orders(OnDeleteAction::NoAction);
    orders.foreign_keys.clear();
    orders
}
