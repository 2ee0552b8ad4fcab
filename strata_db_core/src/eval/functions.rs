use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::schema::catalog::sequence::Sequence;
use crate::schema::graph::NodeId;
use crate::types::value::Value;

use super::expr::compare;

pub type ScalarFunction = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Scalar functions available to default, generated and check expressions,
/// plus the state behind `GET_NEXT_SEQUENCE_VALUE`.
pub struct FunctionCatalog {
    functions: HashMap<String, ScalarFunction>,
    sequences: SequenceStore,
}

impl std::fmt::Debug for FunctionCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionCatalog")
            .field("functions", &names)
            .finish_non_exhaustive()
    }
}

impl Default for FunctionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionCatalog {
    /// Catalog with the builtin scalar functions.
    pub fn new() -> Self {
        let mut catalog = Self {
            functions: HashMap::new(),
            sequences: SequenceStore::default(),
        };
        catalog.register("UPPER", |args| map_string(args, "UPPER", |s| s.to_uppercase()));
        catalog.register("LOWER", |args| map_string(args, "LOWER", |s| s.to_lowercase()));
        catalog.register("CONCAT", concat);
        catalog.register("LENGTH", length);
        catalog.register("ABS", abs);
        catalog.register("COALESCE", |args| {
            Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null))
        });
        catalog.register("IFNULL", |args| {
            arity("IFNULL", args, 2)?;
            Ok(if args[0].is_null() { args[1].clone() } else { args[0].clone() })
        });
        catalog.register("MOD", modulo);
        catalog.register("GREATEST", |args| extreme("GREATEST", args, std::cmp::Ordering::Greater));
        catalog.register("LEAST", |args| extreme("LEAST", args, std::cmp::Ordering::Less));
        catalog
    }

    /// Adds or replaces a function. Names are case-insensitive.
    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_ascii_uppercase(), Arc::new(f));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_ascii_uppercase())
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let f = self
            .functions
            .get(&name.to_ascii_uppercase())
            .ok_or_else(|| Error::Expression(format!("Function not found: {name}")))?;
        f(args)
    }

    pub fn sequences(&self) -> &SequenceStore {
        &self.sequences
    }
}

/// Counter state of every sequence, keyed by sequence node id.
#[derive(Debug, Default)]
pub struct SequenceStore {
    counters: Mutex<HashMap<NodeId, i64>>,
}

impl SequenceStore {
    /// Produces the next value of `sequence`, skipping its skip range.
    pub fn next_value(&self, sequence: &Sequence) -> Result<Value> {
        let mut counters = self.counters.lock();
        let counter = counters
            .entry(sequence.id)
            .or_insert_with(|| sequence.start_with_counter.unwrap_or(1));
        loop {
            if *counter <= 0 {
                return Err(Error::Expression(format!(
                    "Sequence {} is exhausted",
                    sequence.name
                )));
            }
            let value = bit_reversed_positive(*counter);
            *counter = counter.wrapping_add(1);
            match sequence.skip_range {
                Some((min, max)) if value >= min && value <= max => continue,
                _ => return Ok(Value::Int64(value)),
            }
        }
    }

    /// Resets the counter so the next value is drawn from `counter`.
    pub fn restart(&self, sequence: NodeId, counter: i64) {
        self.counters.lock().insert(sequence, counter);
    }

    pub fn forget(&self, sequence: NodeId) {
        self.counters.lock().remove(&sequence);
    }
}

/// Maps a positive counter to a positive value by reversing its 63 value bits.
pub fn bit_reversed_positive(counter: i64) -> i64 {
    ((counter as u64).reverse_bits() >> 1) as i64
}

fn arity(name: &str, args: &[Value], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(Error::Expression(format!(
            "{name} expects {n} argument(s) but got {}",
            args.len()
        )));
    }
    Ok(())
}

fn map_string(args: &[Value], name: &str, f: impl Fn(&str) -> String) -> Result<Value> {
    arity(name, args, 1)?;
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::String(f(s))),
        _ => Err(Error::TypeMismatch(format!("{name} expects a STRING argument"))),
    }
}

fn concat(args: &[Value]) -> Result<Value> {
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    let mut out = String::new();
    for arg in args {
        match arg {
            Value::String(s) => out.push_str(s),
            _ => return Err(Error::TypeMismatch("CONCAT expects STRING arguments".to_string())),
        }
    }
    Ok(Value::String(out))
}

fn length(args: &[Value]) -> Result<Value> {
    arity("LENGTH", args, 1)?;
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::String(s) => Ok(Value::Int64(s.chars().count() as i64)),
        Value::Bytes(b) => Ok(Value::Int64(b.len() as i64)),
        _ => Err(Error::TypeMismatch("LENGTH expects STRING or BYTES".to_string())),
    }
}

fn abs(args: &[Value]) -> Result<Value> {
    arity("ABS", args, 1)?;
    match &args[0] {
        Value::Null => Ok(Value::Null),
        Value::Int64(n) => n
            .checked_abs()
            .map(Value::Int64)
            .ok_or_else(|| Error::Expression("int64 overflow: ABS".to_string())),
        Value::Float64(n) => Ok(Value::Float64(n.abs())),
        Value::Numeric(d) => Ok(Value::Numeric(d.abs())),
        _ => Err(Error::TypeMismatch("ABS expects a numeric argument".to_string())),
    }
}

fn modulo(args: &[Value]) -> Result<Value> {
    arity("MOD", args, 2)?;
    match (&args[0], &args[1]) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int64(_), Value::Int64(0)) => Err(Error::Expression("division by zero: MOD".to_string())),
        (Value::Int64(a), Value::Int64(b)) => Ok(Value::Int64(a.wrapping_rem(*b))),
        _ => Err(Error::TypeMismatch("MOD expects INT64 arguments".to_string())),
    }
}

fn extreme(name: &str, args: &[Value], want: std::cmp::Ordering) -> Result<Value> {
    if args.is_empty() {
        return Err(Error::Expression(format!("{name} expects at least one argument")));
    }
    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    let mut best = &args[0];
    for arg in &args[1..] {
        if compare(arg, best)? == want {
            best = arg;
        }
    }
    Ok(best.clone())
}
