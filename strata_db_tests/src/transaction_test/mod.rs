use crate::support::*;
use strata_db_core::schema::catalog::OnDeleteAction;
use strata_db_core::schema::ddl::{CheckDef, ColumnDef, CreateIndex};
use strata_db_core::types::datatype::DataType;
use strata_db_core::{
    Database, DdlStatement, Error, MutationKind, MutationOp, Phase, TraceEvent, Value,
};

fn shop_db(on_delete: OnDeleteAction) -> Database {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(orders(on_delete)),
            DdlStatement::CreateIndex(index("AccountsByEmail", "Accounts", &["Email"], true)),
        ],
    );
    db
}

fn insert_accounts(db: &Database, rows: &[(i64, &str)]) {
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId", "Email"],
        rows.iter().map(|(id, email)| vec![int(*id), text(email)]).collect(),
    ))
    .unwrap();
    txn.commit().unwrap();
}

fn insert_orders(db: &Database, rows: &[(i64, i64, i64)]) {
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Orders",
        &["OrderId", "AccountId", "Amount"],
        rows.iter()
            .map(|(id, account, amount)| vec![int(*id), int(*account), int(*amount)])
            .collect(),
    ))
    .unwrap();
    txn.commit().unwrap();
}

fn scan(db: &Database, table: &str, columns: &[&str]) -> Vec<Vec<Value>> {
    db.begin().unwrap().scan(table, columns).unwrap()
}

fn phases(trace: &[TraceEvent]) -> Vec<Phase> {
    trace.iter().map(|e| e.phase).collect()
}

mod columns;
mod constraints;
mod interleave;
mod pipeline;
mod writes;
