use crate::support::*;
use strata_db_core::schema::catalog::OnDeleteAction;
use strata_db_core::storage::{MemStorage, StorageEngine};
use strata_db_core::types::{ColumnValues, Key};
use strata_db_core::DdlStatement;
use strata_db_core::schema::NodeId;

fn row(cells: &[(NodeId, i64)]) -> ColumnValues {
    cells.iter().map(|(c, v)| (*c, int(*v))).collect()
}

#[test]
fn test_prefix_scan_stays_inside_prefix() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(orders(OnDeleteAction::NoAction)),
        ],
    );
    let schema = db.schema();
    let orders = schema.find_table("Orders").unwrap();
    let amount = schema.find_column(orders, "Amount").unwrap().id;

    let mut storage = MemStorage::new();
    for (a, b) in [(1, 1), (1, 2), (2, 1), (3, 1)] {
        storage
            .put(orders.id, Key::new(vec![int(a), int(b)]), row(&[(amount, a * 10 + b)]))
            .unwrap();
    }
    assert_eq!(storage.row_count(orders.id), 4);

    let keys: Vec<Key> = storage
        .scan_prefix(orders.id, &[int(1)])
        .unwrap()
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    assert_eq!(
        keys,
        vec![Key::new(vec![int(1), int(1)]), Key::new(vec![int(1), int(2)])]
    );
    assert_eq!(storage.scan(orders.id).unwrap().len(), 4);
}

#[test]
fn test_delete_and_drop_table() {
    let db = test_db();
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateTable(orders(OnDeleteAction::NoAction)),
        ],
    );
    let schema = db.schema();
    let accounts = schema.find_table("Accounts").unwrap().id;
    let orders = schema.find_table("Orders").unwrap().id;

    let mut storage = MemStorage::new();
    storage.put(accounts, Key::new(vec![int(1)]), ColumnValues::new()).unwrap();
    storage.put(orders, Key::new(vec![int(1)]), ColumnValues::new()).unwrap();

    // Deleting a missing row is not an error.
    storage.delete(accounts, &Key::new(vec![int(9)])).unwrap();
    assert_eq!(storage.row_count(accounts), 1);

    storage.drop_table(orders).unwrap();
    assert_eq!(storage.row_count(orders), 0);
    assert!(storage.read(accounts, &Key::new(vec![int(1)])).unwrap().is_some());
    assert!(storage.read(orders, &Key::new(vec![int(1)])).unwrap().is_none());
}
