use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use strata_db_core::types::value::{Value, parse_value, value_to_string};
use strata_db_core::{Database, DdlStatement, MutationKind, MutationOp};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// One step of a script.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Step {
    /// Schema statements, applied as one batch.
    Ddl(Vec<DdlStatement>),
    /// Mutations committed together.
    Transaction(Vec<MutationRecord>),
    /// Prints every row of a table.
    Scan { table: String, columns: Vec<String> },
}

#[derive(Debug, Deserialize)]
struct MutationRecord {
    kind: MutationKind,
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<JsonValue>>,
}

struct Args {
    script: PathBuf,
    dump_json: bool,
}

fn parse_args() -> Result<Args> {
    let mut script = None;
    let mut dump_json = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dump-json" => dump_json = true,
            "-h" | "--help" => {
                println!("usage: strata_db_cli <script.json> [--dump-json]");
                std::process::exit(0);
            }
            other if other.starts_with("--") => bail!("unknown flag {other}"),
            other => script = Some(PathBuf::from(other)),
        }
    }
    let Some(script) = script else {
        bail!("usage: strata_db_cli <script.json> [--dump-json]");
    };
    Ok(Args { script, dump_json })
}

/// Converts JSON cells to values using the declared column types.
fn to_mutation(db: &Database, record: MutationRecord) -> Result<MutationOp> {
    let schema = db.schema();
    let table = schema
        .find_table(&record.table)
        .with_context(|| format!("table {} does not exist", record.table))?;
    let mut types = Vec::with_capacity(record.columns.len());
    for name in &record.columns {
        let column = schema
            .find_column(table, name)
            .with_context(|| format!("column {}.{} does not exist", record.table, name))?;
        types.push(column.data_type.clone());
    }
    let mut rows = Vec::with_capacity(record.rows.len());
    for row in record.rows {
        let mut values = Vec::with_capacity(row.len());
        for (cell, dtype) in row.iter().zip(&types) {
            let value = match cell {
                JsonValue::Null => Value::Null,
                JsonValue::String(token) => parse_value(dtype, token)?,
                other => parse_value(dtype, &other.to_string())?,
            };
            values.push(value);
        }
        rows.push(values);
    }
    let columns: Vec<&str> = record.columns.iter().map(String::as_str).collect();
    Ok(MutationOp::new(record.kind, record.table.as_str(), &columns, rows))
}

fn run_step(db: &Database, step: Step) -> Result<()> {
    match step {
        Step::Ddl(statements) => {
            let version = db.update_schema(&statements)?;
            info!(%version, statements = statements.len(), "schema updated");
        }
        Step::Transaction(records) => {
            let mut txn = db.begin()?;
            let count = records.len();
            for record in records {
                let mutation = to_mutation(db, record)?;
                txn.write(&mutation)?;
            }
            txn.commit()?;
            info!(mutations = count, "committed");
        }
        Step::Scan { table, columns } => {
            let txn = db.begin()?;
            let names: Vec<&str> = columns.iter().map(String::as_str).collect();
            println!("{}", columns.join("\t"));
            for row in txn.scan(&table, &names)? {
                let cells: Vec<String> = row.iter().map(value_to_string).collect();
                println!("{}", cells.join("\t"));
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading {}", args.script.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&text).context("parsing script")?;

    let db = Database::new();
    for (i, step) in steps.into_iter().enumerate() {
        run_step(&db, step).with_context(|| format!("step {}", i + 1))?;
    }

    if args.dump_json {
        println!("{}", serde_json::to_string_pretty(&db.dump())?);
    } else {
        for statement in db.print_ddl() {
            println!("{statement};");
        }
    }
    Ok(())
}
