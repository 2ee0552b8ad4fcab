use super::*;
use strata_db_core::actions::{ActionContext, ActionRegistry, RowOp, StorageReader, WriteOp};
use strata_db_core::storage::{MemStorage, StorageEngine};

#[test]
fn test_insert_runs_phases_in_order() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId", "Email"],
        vec![vec![int(1), text("a@x.com")]],
    ))
    .unwrap();
    let trace = txn.commit().unwrap();

    let expected = vec![
        (Phase::Validate, "Accounts"),
        (Phase::Stage, "Accounts"),
        (Phase::Effect, "Accounts"),
        (Phase::Modify, "_index_data_AccountsByEmail"),
        (Phase::Verify, "Accounts"),
        (Phase::Apply, ""),
    ];
    let actual: Vec<(Phase, &str)> = trace.iter().map(|e| (e.phase, e.table.as_str())).collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_commit_phases_follow_write_phases() {
    let db = shop_db(OnDeleteAction::Cascade);
    insert_accounts(&db, &[(1, "a@x.com")]);
    insert_orders(&db, &[(10, 1, 5), (11, 1, 6)]);

    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::delete("Accounts", &["AccountId"], vec![vec![int(1)]]))
        .unwrap();
    let written = phases(txn.trace());
    assert!(!written.contains(&Phase::Modify));
    assert!(!written.contains(&Phase::Verify));
    // The cascade deletes both orders through the write pipeline.
    let staged_orders = txn
        .trace()
        .iter()
        .filter(|e| e.phase == Phase::Stage && e.table == "Orders")
        .count();
    assert_eq!(staged_orders, 2);

    let trace = phases(&txn.commit().unwrap());
    let first_commit_phase = trace
        .iter()
        .position(|p| matches!(p, Phase::Modify | Phase::Verify))
        .unwrap();
    assert!(trace[..first_commit_phase]
        .iter()
        .all(|p| matches!(p, Phase::Validate | Phase::Stage | Phase::Effect)));
    assert_eq!(trace.last(), Some(&Phase::Apply));
}

#[test]
fn test_generated_keys_run_after_validation() {
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
    txn.write(&MutationOp::insert("Tickets", &["Title"], vec![vec![text("first")]]))
        .unwrap();
    assert_eq!(
        phases(txn.trace()),
        vec![
            Phase::Validate,
            Phase::GenerateKeys,
            Phase::Validate,
            Phase::Stage,
            Phase::Effect
        ]
    );
}

#[test]
fn test_unique_violation_is_found_at_commit() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId", "Email"],
        vec![vec![int(1), text("same@x.com")], vec![int(2), text("same@x.com")]],
    ))
    .unwrap();
    let err = txn.commit().unwrap_err();
    assert_eq!(err.constraint(), Some("AccountsByEmail"));
    assert!(err.to_string().contains("UNIQUE violation on index AccountsByEmail"));
    assert!(scan(&db, "Accounts", &["AccountId"]).is_empty());
}

#[test]
fn test_unique_violation_against_committed_rows() {
    let db = shop_db(OnDeleteAction::NoAction);
    insert_accounts(&db, &[(1, "a@x.com")]);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId", "Email"],
        vec![vec![int(2), text("a@x.com")]],
    ))
    .unwrap();
    assert_eq!(txn.commit().unwrap_err().constraint(), Some("AccountsByEmail"));
}

#[test]
fn test_moving_a_unique_value_between_rows() {
    let db = shop_db(OnDeleteAction::NoAction);
    insert_accounts(&db, &[(1, "a@x.com")]);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::update(
        "Accounts",
        &["AccountId", "Email"],
        vec![vec![int(1), text("old@x.com")]],
    ))
    .unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId", "Email"],
        vec![vec![int(2), text("a@x.com")]],
    ))
    .unwrap();
    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Accounts", &["AccountId", "Email"]),
        vec![
            vec![int(1), text("old@x.com")],
            vec![int(2), text("a@x.com")],
        ]
    );
}

#[test]
fn test_unique_index_treats_null_as_a_value() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId"],
        vec![vec![int(1)], vec![int(2)]],
    ))
    .unwrap();
    assert_eq!(txn.commit().unwrap_err().constraint(), Some("AccountsByEmail"));
}

#[test]
fn test_null_filtered_unique_index_skips_nulls() {
    let db = test_db();
    let by_email = CreateIndex {
        null_filtered: true,
        ..index("AccountsByEmail", "Accounts", &["Email"], true)
    };
    create(
        &db,
        vec![
            DdlStatement::CreateTable(accounts()),
            DdlStatement::CreateIndex(by_email),
        ],
    );
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId"],
        vec![vec![int(1)], vec![int(2)]],
    ))
    .unwrap();
    txn.commit().unwrap();
    assert_eq!(scan(&db, "Accounts", &["AccountId"]).len(), 2);
}

#[test]
fn test_failed_write_leaves_transaction_unchanged() {
    let db = shop_db(OnDeleteAction::NoAction);
    let mut txn = db.begin().unwrap();
    txn.write(&MutationOp::insert(
        "Accounts",
        &["AccountId", "Email"],
        vec![vec![int(1), text("a@x.com")]],
    ))
    .unwrap();
    let trace_len = txn.trace().len();

    // The second row collides with the first after the first was staged.
    let err = txn
        .write(&MutationOp::insert(
            "Accounts",
            &["AccountId", "Email"],
            vec![vec![int(2), text("b@x.com")], vec![int(2), text("c@x.com")]],
        ))
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
    assert_eq!(txn.trace().len(), trace_len);
    assert_eq!(txn.read("Accounts", &[int(2)], &["Email"]).unwrap(), None);

    txn.commit().unwrap();
    assert_eq!(
        scan(&db, "Accounts", &["AccountId", "Email"]),
        vec![vec![int(1), text("a@x.com")]]
    );
}

/// Two accounts sharing an email, written straight to storage, and the
/// inserts that staged them.
fn duplicate_email_rows(db: &Database) -> (MemStorage, Vec<WriteOp>) {
    let schema = db.schema();
    let accounts = schema.find_table("Accounts").unwrap();
    let id = schema.find_column(accounts, "AccountId").unwrap().id;
    let email = schema.find_column(accounts, "Email").unwrap().id;

    let mut storage = MemStorage::new();
    let mut ops = Vec::new();
    for account in [1, 2] {
        let op = WriteOp::Insert(RowOp {
            table: accounts.id,
            key: strata_db_core::types::Key::new(vec![int(account)]),
            columns: vec![id, email],
            values: vec![int(account), text("same@x.com")],
        });
        let row = op.apply_to(None).unwrap();
        storage.put(accounts.id, op.key().clone(), row).unwrap();
        ops.push(op);
    }
    (storage, ops)
}

fn run_modifiers(registry: &ActionRegistry, storage: &mut MemStorage, ops: &[WriteOp]) -> Vec<WriteOp> {
    let mut entries = Vec::new();
    for op in ops {
        let effects = {
            let reader = StorageReader(&*storage);
            let mut ctx = ActionContext::new(registry.evaluator(), &reader);
            registry.execute_modifiers(&mut ctx, op).unwrap();
            ctx.take_effects()
        };
        for effect in effects {
            let row = effect.apply_to(None).unwrap();
            storage.put(effect.table(), effect.key().clone(), row).unwrap();
            entries.push(effect);
        }
    }
    entries
}

fn run_verifiers(registry: &ActionRegistry, storage: &MemStorage, ops: &[WriteOp]) -> Result<(), Error> {
    let reader = StorageReader(storage);
    let ctx = ActionContext::new(registry.evaluator(), &reader);
    ops.iter().try_for_each(|op| registry.execute_verifiers(&ctx, op))
}

#[test]
fn test_verifiers_need_modifier_output() {
    let db = shop_db(OnDeleteAction::NoAction);
    let registry = db
        .action_manager()
        .get_actions_for_schema(db.schema().version())
        .unwrap();

    // Modifiers first: the index entries exist and the duplicate is found.
    let (mut storage, ops) = duplicate_email_rows(&db);
    let mut written = ops.clone();
    written.extend(run_modifiers(&registry, &mut storage, &ops));
    assert_eq!(written.len(), 4);
    let err = run_verifiers(&registry, &storage, &written).unwrap_err();
    assert_eq!(err.constraint(), Some("AccountsByEmail"));

    // Verifiers first: nothing in the index yet, so the duplicate slips by.
    let (mut storage, ops) = duplicate_email_rows(&db);
    run_verifiers(&registry, &storage, &ops).unwrap();
    let entries = run_modifiers(&registry, &mut storage, &ops);
    assert_eq!(entries.len(), 2);
}
