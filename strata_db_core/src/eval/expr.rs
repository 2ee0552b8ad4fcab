use std::cmp::Ordering;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{Error, Result};
use crate::types::value::Value;

use super::{EvalContext, FunctionCatalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
    Concat,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "OR",
            BinaryOp::And => "AND",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Concat => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
    /// `GET_NEXT_SEQUENCE_VALUE(SEQUENCE name)`
    NextSequenceValue(String),
}

impl Expr {
    pub(super) fn visit(&self, f: &mut dyn FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } => expr.visit(f),
            Expr::Binary { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            Expr::Function { args, .. } => args.iter().for_each(|arg| arg.visit(f)),
            Expr::Literal(_) | Expr::Column(_) | Expr::NextSequenceValue(_) => {}
        }
    }

    pub(super) fn evaluate(&self, ctx: &dyn EvalContext, functions: &FunctionCatalog) -> Result<Value> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Column(name) => ctx
                .column_value(name)
                .ok_or_else(|| Error::Expression(format!("Unknown column '{name}' in expression"))),
            Expr::Unary { op, expr } => {
                let v = expr.evaluate(ctx, functions)?;
                match (op, v) {
                    (_, Value::Null) => Ok(Value::Null),
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnaryOp::Neg, Value::Int64(n)) => n
                        .checked_neg()
                        .map(Value::Int64)
                        .ok_or_else(|| Error::Expression("int64 overflow".to_string())),
                    (UnaryOp::Neg, Value::Float64(n)) => Ok(Value::Float64(-n)),
                    (UnaryOp::Neg, Value::Numeric(d)) => Ok(Value::Numeric(-d)),
                    (op, other) => Err(Error::TypeMismatch(format!(
                        "cannot apply {op:?} to {}",
                        crate::types::value::value_to_string(&other)
                    ))),
                }
            }
            Expr::Binary { left, op, right } => match op {
                BinaryOp::And | BinaryOp::Or => {
                    let l = as_logical(left.evaluate(ctx, functions)?)?;
                    let r = as_logical(right.evaluate(ctx, functions)?)?;
                    Ok(logical(*op, l, r))
                }
                _ => {
                    let l = left.evaluate(ctx, functions)?;
                    let r = right.evaluate(ctx, functions)?;
                    binary(*op, l, r)
                }
            },
            Expr::IsNull { expr, negated } => {
                let v = expr.evaluate(ctx, functions)?;
                Ok(Value::Bool(v.is_null() != *negated))
            }
            Expr::Function { name, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(ctx, functions))
                    .collect::<Result<Vec<_>>>()?;
                functions.call(name, &values)
            }
            Expr::NextSequenceValue(name) => ctx.next_sequence_value(name),
        }
    }
}

fn as_logical(v: Value) -> Result<Option<bool>> {
    match v {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        other => Err(Error::TypeMismatch(format!(
            "expected BOOL but got {}",
            crate::types::value::value_to_string(&other)
        ))),
    }
}

// Three-valued logic.
fn logical(op: BinaryOp, l: Option<bool>, r: Option<bool>) -> Value {
    let out = match (op, l, r) {
        (BinaryOp::And, Some(false), _) | (BinaryOp::And, _, Some(false)) => Some(false),
        (BinaryOp::And, Some(true), Some(true)) => Some(true),
        (BinaryOp::Or, Some(true), _) | (BinaryOp::Or, _, Some(true)) => Some(true),
        (BinaryOp::Or, Some(false), Some(false)) => Some(false),
        _ => None,
    };
    out.map(Value::Bool).unwrap_or(Value::Null)
}

enum Numeric {
    Int(i64, i64),
    Float(f64, f64),
    Decimal(Decimal, Decimal),
}

fn numeric_pair(l: &Value, r: &Value) -> Option<Numeric> {
    match (l, r) {
        (Value::Int64(a), Value::Int64(b)) => Some(Numeric::Int(*a, *b)),
        (Value::Numeric(a), Value::Numeric(b)) => Some(Numeric::Decimal(*a, *b)),
        (Value::Numeric(a), Value::Int64(b)) => Some(Numeric::Decimal(*a, Decimal::from(*b))),
        (Value::Int64(a), Value::Numeric(b)) => Some(Numeric::Decimal(Decimal::from(*a), *b)),
        _ => Some(Numeric::Float(as_f64(l)?, as_f64(r)?)),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int64(n) => Some(*n as f64),
        Value::Float64(n) => Some(*n),
        Value::Numeric(d) => d.to_f64(),
        _ => None,
    }
}

fn overflow() -> Error {
    Error::Expression("arithmetic overflow".to_string())
}

fn binary(op: BinaryOp, l: Value, r: Value) -> Result<Value> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    match op {
        BinaryOp::Concat => match (l, r) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (Value::Bytes(mut a), Value::Bytes(b)) => {
                a.extend(b);
                Ok(Value::Bytes(a))
            }
            _ => Err(Error::TypeMismatch(
                "|| requires two STRING or two BYTES operands".to_string(),
            )),
        },
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte => {
            let ord = compare(&l, &r)?;
            let result = match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::NotEq => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::Lte => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => arithmetic(op, &l, &r),
        BinaryOp::And | BinaryOp::Or => Err(Error::Internal("logical operator in arithmetic".into())),
    }
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    let pair = numeric_pair(l, r).ok_or_else(|| {
        Error::TypeMismatch(format!(
            "operator {} requires numeric operands",
            op.symbol()
        ))
    })?;
    match pair {
        // INT64 / INT64 yields FLOAT64.
        Numeric::Int(a, b) if op == BinaryOp::Div => divide_f64(a as f64, b as f64),
        Numeric::Int(a, b) => {
            let out = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                _ => a.checked_mul(b),
            };
            out.map(Value::Int64).ok_or_else(overflow)
        }
        Numeric::Float(a, b) => match op {
            BinaryOp::Add => Ok(Value::Float64(a + b)),
            BinaryOp::Sub => Ok(Value::Float64(a - b)),
            BinaryOp::Mul => Ok(Value::Float64(a * b)),
            _ => divide_f64(a, b),
        },
        Numeric::Decimal(a, b) => {
            let out = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                _ => {
                    if b.is_zero() {
                        return Err(Error::Expression("division by zero".to_string()));
                    }
                    a.checked_div(b)
                }
            };
            out.map(Value::Numeric).ok_or_else(overflow)
        }
    }
}

fn divide_f64(a: f64, b: f64) -> Result<Value> {
    if b == 0.0 {
        return Err(Error::Expression("division by zero".to_string()));
    }
    Ok(Value::Float64(a / b))
}

/// Compares two non-null values of compatible types.
pub(super) fn compare(l: &Value, r: &Value) -> Result<Ordering> {
    if std::mem::discriminant(l) == std::mem::discriminant(r) {
        return Ok(l.cmp(r));
    }
    match numeric_pair(l, r) {
        Some(Numeric::Decimal(a, b)) => Ok(a.cmp(&b)),
        Some(Numeric::Float(a, b)) => Ok(a.total_cmp(&b)),
        Some(Numeric::Int(a, b)) => Ok(a.cmp(&b)),
        None => Err(Error::TypeMismatch(format!(
            "cannot compare {} with {}",
            crate::types::value::value_to_string(l),
            crate::types::value::value_to_string(r)
        ))),
    }
}
