use crate::support::*;
use std::sync::Arc;
use strata_db_core::schema::catalog::OnDeleteAction;
use strata_db_core::schema::ddl::{CheckDef, ColumnDef};
use strata_db_core::types::datatype::DataType;
use strata_db_core::{
    ActionManager, ActionRegistry, Database, DdlStatement, Error, FunctionCatalog, SchemaVersion,
};

/// Accounts with a unique email index, orders cascading from accounts with
/// a default status, a stored total and a check on the amount.
fn shop_db() -> Database {
    let db = test_db();
    let mut orders = orders(OnDeleteAction::Cascade);
    orders
        .columns
        .push(ColumnDef::new("Status", DataType::String).default_value("'new'"));
    orders
        .columns
        .push(ColumnDef::new("Total", DataType::Int64).generated("Amount * 2", true));
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
    db
}

mod manager;
mod registry;
