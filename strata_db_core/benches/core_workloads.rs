use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use strata_db_core::schema::ddl::{ColumnDef, CreateIndex, CreateTable, ForeignKeyDef, KeyPart};
use strata_db_core::schema::catalog::OnDeleteAction;
use strata_db_core::types::datatype::DataType;
use strata_db_core::{ActionRegistry, Database, DdlStatement, FunctionCatalog, MutationOp, Value};

const BATCH_ROWS: i64 = 64;

fn table(name: &str, columns: Vec<ColumnDef>, key: &[&str]) -> CreateTable {
    CreateTable {
        name: name.into(),
        columns,
        primary_key: key.iter().map(|c| KeyPart::asc(*c)).collect(),
        foreign_keys: Vec::new(),
        check_constraints: Vec::new(),
        interleave_in_parent: None,
        row_deletion_policy: None,
        synonym: None,
        locality_group: None,
        if_not_exists: false,
    }
}

fn setup_db() -> Database {
    let db = Database::new();
    let accounts = table(
        "Accounts",
        vec![
            ColumnDef::new("AccountId", DataType::Int64).not_null(),
            ColumnDef::new("Email", DataType::String).length(256),
        ],
        &["AccountId"],
    );
    let mut orders = table(
        "Orders",
        vec![
            ColumnDef::new("OrderId", DataType::Int64).not_null(),
            ColumnDef::new("AccountId", DataType::Int64),
            ColumnDef::new("Amount", DataType::Int64),
            ColumnDef::new("Doubled", DataType::Int64).generated("Amount * 2", true),
        ],
        &["OrderId"],
    );
    orders.foreign_keys.push(ForeignKeyDef {
        name: None,
        columns: vec!["AccountId".into()],
        referenced_table: "Accounts".into(),
        referenced_columns: vec!["AccountId".into()],
        on_delete: OnDeleteAction::Cascade,
        enforced: true,
    });
    let by_email = CreateIndex {
        name: "AccountsByEmail".into(),
        table: "Accounts".into(),
        key: vec![KeyPart::asc("Email")],
        storing: Vec::new(),
        unique: true,
        null_filtered: false,
        interleave_in: None,
        if_not_exists: false,
    };
    db.update_schema(&[
        DdlStatement::CreateTable(accounts),
        DdlStatement::CreateTable(orders),
        DdlStatement::CreateIndex(by_email),
    ])
    .expect("schema");
    db
}

fn bench_registry_build(c: &mut Criterion) {
    let db = setup_db();
    let schema = db.schema();
    let functions = Arc::new(FunctionCatalog::new());
    c.bench_function("registry_build", |b| {
        b.iter(|| black_box(ActionRegistry::new(schema.clone(), functions.clone())))
    });
}

fn bench_insert_batch(c: &mut Criterion) {
    c.bench_function("insert_batch_with_actions", |b| {
        b.iter_batched(
            setup_db,
            |db| {
                let mut txn = db.begin().expect("begin");
                let accounts: Vec<Vec<Value>> = (0..BATCH_ROWS)
                    .map(|i| vec![Value::Int64(i), Value::String(format!("user{i}@example.com"))])
                    .collect();
                txn.write(&MutationOp::insert("Accounts", &["AccountId", "Email"], accounts))
                    .expect("accounts");
                let orders: Vec<Vec<Value>> = (0..BATCH_ROWS)
                    .map(|i| vec![Value::Int64(i), Value::Int64(i), Value::Int64(i * 10)])
                    .collect();
                txn.write(&MutationOp::insert("Orders", &["OrderId", "AccountId", "Amount"], orders))
                    .expect("orders");
                black_box(txn.commit().expect("commit"));
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_registry_build, bench_insert_batch);
criterion_main!(benches);
