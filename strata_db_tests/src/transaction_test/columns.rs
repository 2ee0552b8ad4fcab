use super::*;

fn invoices_db() -> Database {
    let db = test_db();
    let invoices = table(
        "Invoices",
        vec![
            ColumnDef::new("InvoiceId", DataType::Int64).not_null(),
            ColumnDef::new("Amount", DataType::Int64),
            ColumnDef::new("Status", DataType::String).default_value("'open'"),
            ColumnDef::new("Total", DataType::Int64).generated("Amount * 2", true),
            ColumnDef::new("Label", DataType::String)
                .generated("CONCAT(Status, '-', UPPER(Status))", true),
        ],
        &["InvoiceId"],
    );
    create(&db, vec![DdlStatement::CreateTable(invoices)]);
    db
}

#[test]
fn test_default_fills_missing_column() {
    let db = invoices_db();
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Invoices",
        &["InvoiceId", "Amount"],
        vec![vec![int(1), int(10)]],
    ))
    .unwrap();
    txn.write(&MutationOp::insert(
        "Invoices",
        &["InvoiceId", "Amount", "Status"],
        vec![vec![int(2), int(10), text("paid")]],
    ))
    .unwrap();
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Invoices", &["InvoiceId", "Status"]),
        vec![vec![int(1), text("open")], vec![int(2), text("paid")]]
    );
}

#[test]
fn test_generated_columns_follow_their_inputs() {
    let db = invoices_db();
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Invoices",
        &["InvoiceId", "Amount"],
        vec![vec![int(1), int(10)]],
    ))
    .unwrap();
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Invoices", &["Total", "Label"]),
        vec![vec![int(20), text("open-OPEN")]]
    );

    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::update(
        "Invoices",
        &["InvoiceId", "Amount", "Status"],
        vec![vec![int(1), int(21), text("paid")]],
    ))
    .unwrap();
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Invoices", &["Total", "Label"]),
        vec![vec![int(42), text("paid-PAID")]]
    );
}

#[test]
fn test_generated_column_is_null_for_null_input() {
    let db = invoices_db();
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert("Invoices", &["InvoiceId"], vec![vec![int(1)]]))
        .unwrap();
    txn.commit().unwrap();
    assert_eq!(scan(&db, "Invoices", &["Amount", "Total"]), vec![vec![Value::Null, Value::Null]]);
}

#[test]
fn test_generated_column_cannot_be_written() {
    let db = invoices_db();
    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::insert(
            "Invoices",
            &["InvoiceId", "Total"],
            vec![vec![int(1), int(5)]],
        ))
        .unwrap_err();
    assert_eq!(
        err,
        Error::InvalidArgument("Cannot write into generated column Invoices.Total.".into())
    );
}

#[test]
fn test_generated_column_error_names_the_column() {
    let db = invoices_db();
    let mut txn = db.begin().unwrap();
    let err = txn
        .write(&MutationOp::insert(
            "Invoices",
            &["InvoiceId", "Amount"],
            vec![vec![int(1), int(i64::MAX)]],
        ))
        .unwrap_err();
    assert!(matches!(err, Error::Evaluation { ref column, .. } if column == "Total"));
}

#[test]
fn test_identity_key_is_generated() {
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

    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Tickets",
        &["Title"],
        vec![vec![text("first")], vec![text("second")]],
    ))
    .unwrap();
    txn.commit().unwrap();

    let rows = scan(&db, "Tickets", &["TicketId", "Title"]);
    assert_eq!(rows.len(), 2);
    let ids: Vec<i64> = rows
        .iter()
        .map(|row| match row[0] {
            Value::Int64(id) => id,
            ref other => panic!("unexpected key {other:?}"),
        })
        .collect();
    assert!(ids.iter().all(|id| *id > 0));
    assert_ne!(ids[0], ids[1]);
}

#[test]
fn test_key_generated_from_other_columns() {
    let db = test_db();
    let shards = table(
        "Events",
        vec![
            ColumnDef::new("Shard", DataType::Int64).generated("MOD(EventId, 4)", true),
            ColumnDef::new("EventId", DataType::Int64).not_null(),
        ],
        &["Shard", "EventId"],
    );
    create(&db, vec![DdlStatement::CreateTable(shards)]);

    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Events",
        &["EventId"],
        vec![vec![int(9)], vec![int(6)]],
    ))
    .unwrap();
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Events", &["Shard", "EventId"]),
        vec![vec![int(1), int(9)], vec![int(2), int(6)]]
    );
}

#[test]
fn test_sequence_default_draws_values() {
    let db = test_db();
    let mut statements = vec![DdlStatement::CreateSequence(
        strata_db_core::schema::ddl::CreateSequence {
            name: "InvoiceSeq".into(),
            kind: None,
            start_with_counter: None,
            skip_range: None,
            if_not_exists: false,
        },
    )];
    statements.push(DdlStatement::CreateTable(table(
        "Receipts",
        vec![
            ColumnDef::new("ReceiptId", DataType::Int64)
                .default_value("GET_NEXT_SEQUENCE_VALUE(SEQUENCE InvoiceSeq)"),
            ColumnDef::new("Note", DataType::String),
        ],
        &["ReceiptId"],
    )));
    create(&db, statements);

    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Receipts",
        &["Note"],
        vec![vec![text("a")], vec![text("b")], vec![text("c")]],
    ))
    .unwrap();
    txn.commit().unwrap();
    assert_eq!(scan(&db, "Receipts", &["ReceiptId"]).len(), 3);
}

#[test]
fn test_generated_key_sees_declared_column_types() {
    let mut functions = strata_db_core::FunctionCatalog::new();
    functions.register("KIND_OF", |args| {
        let kind = match args.first() {
            Some(Value::Float64(_)) => "float",
            Some(Value::Int64(_)) => "int",
            _ => "other",
        };
        Ok(text(kind))
    });
    let db = test_db().with_functions(std::sync::Arc::new(functions));
    let readings = table(
        "Readings",
        vec![
            ColumnDef::new("Kind", DataType::String).generated("KIND_OF(Price)", true),
            ColumnDef::new("ReadingId", DataType::Int64).not_null(),
            ColumnDef::new("Price", DataType::Float64),
        ],
        &["Kind", "ReadingId"],
    );
    create(&db, vec![DdlStatement::CreateTable(readings)]);

    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Readings",
        &["ReadingId", "Price"],
        vec![vec![int(1), int(3)]],
    ))
    .unwrap();
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Readings", &["Kind", "ReadingId", "Price"]),
        vec![vec![text("float"), int(1), Value::Float64(3.0)]]
    );
}
