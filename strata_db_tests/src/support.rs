use strata_db_core::schema::catalog::OnDeleteAction;
use strata_db_core::schema::ddl::{
    ColumnDef, CreateIndex, CreateTable, ForeignKeyDef, InterleaveDef, KeyPart,
};
use strata_db_core::types::datatype::DataType;
use strata_db_core::{Database, DdlStatement, Value};

pub fn test_db() -> Database {
    Database::new()
}

pub fn table(name: &str, columns: Vec<ColumnDef>, key: &[&str]) -> CreateTable {
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

pub fn interleaved(mut child: CreateTable, parent: &str, on_delete: OnDeleteAction) -> CreateTable {
    child.interleave_in_parent = Some(InterleaveDef {
        parent: parent.into(),
        on_delete,
    });
    child
}

pub fn foreign_key(
    name: Option<&str>,
    columns: &[&str],
    referenced_table: &str,
    referenced_columns: &[&str],
    on_delete: OnDeleteAction,
) -> ForeignKeyDef {
    ForeignKeyDef {
        name: name.map(str::to_string),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        referenced_table: referenced_table.into(),
        referenced_columns: referenced_columns.iter().map(|c| c.to_string()).collect(),
        on_delete,
        enforced: true,
    }
}

pub fn index(name: &str, table: &str, key: &[&str], unique: bool) -> CreateIndex {
    CreateIndex {
        name: name.into(),
        table: table.into(),
        key: key.iter().map(|c| KeyPart::asc(*c)).collect(),
        storing: Vec::new(),
        unique,
        null_filtered: false,
        interleave_in: None,
        if_not_exists: false,
    }
}

/// `Accounts(AccountId, Email)` keyed on `AccountId`.
pub fn accounts() -> CreateTable {
    table(
        "Accounts",
        vec![
            ColumnDef::new("AccountId", DataType::Int64).not_null(),
            ColumnDef::new("Email", DataType::String).length(64),
        ],
        &["AccountId"],
    )
}

/// `Orders(OrderId, AccountId, Amount)` referencing `Accounts`.
pub fn orders(on_delete: OnDeleteAction) -> CreateTable {
    let mut orders = table(
        "Orders",
        vec![
            ColumnDef::new("OrderId", DataType::Int64).not_null(),
            ColumnDef::new("AccountId", DataType::Int64),
            ColumnDef::new("Amount", DataType::Int64),
        ],
        &["OrderId"],
    );
    orders.foreign_keys.push(foreign_key(
        Some("FK_OrdersAccount"),
        &["AccountId"],
        "Accounts",
        &["AccountId"],
        on_delete,
    ));
    orders
}

pub fn create(db: &Database, statements: Vec<DdlStatement>) {
    db.update_schema(&statements).unwrap();
}

pub fn int(v: i64) -> Value {
    Value::Int64(v)
}

pub fn text(v: &str) -> Value {
    Value::String(v.to_string())
}
