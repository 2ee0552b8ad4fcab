use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::types::value::Value;

use super::expr::{BinaryOp, Expr, UnaryOp};
use super::tokenizer::{Token, tokenize};

pub(super) fn parse_expression(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(Error::Expression("Empty expression".to_string()));
    }
    let mut idx = 0usize;
    let expr = parse_or_expr(&tokens, &mut idx)?;
    if idx != tokens.len() {
        return Err(unexpected(&tokens, idx));
    }
    Ok(expr)
}

fn unexpected(tokens: &[Token], idx: usize) -> Error {
    match tokens.get(idx) {
        Some(tok) => Error::Expression(format!("Unexpected token {tok:?} in expression")),
        None => Error::Expression("Unexpected end of expression".to_string()),
    }
}

fn expect_symbol(tokens: &[Token], idx: &mut usize, sym: &str) -> Result<()> {
    match tokens.get(*idx) {
        Some(tok) if tok.is_symbol(sym) => {
            *idx += 1;
            Ok(())
        }
        _ => Err(Error::Expression(format!("Expected '{sym}' in expression"))),
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn parse_or_expr(tokens: &[Token], idx: &mut usize) -> Result<Expr> {
    let mut left = parse_and_expr(tokens, idx)?;
    while *idx < tokens.len() && tokens[*idx].is_keyword("or") {
        *idx += 1;
        let right = parse_and_expr(tokens, idx)?;
        left = binary(left, BinaryOp::Or, right);
    }
    Ok(left)
}

fn parse_and_expr(tokens: &[Token], idx: &mut usize) -> Result<Expr> {
    let mut left = parse_not_expr(tokens, idx)?;
    while *idx < tokens.len() && tokens[*idx].is_keyword("and") {
        *idx += 1;
        let right = parse_not_expr(tokens, idx)?;
        left = binary(left, BinaryOp::And, right);
    }
    Ok(left)
}

fn parse_not_expr(tokens: &[Token], idx: &mut usize) -> Result<Expr> {
    if *idx < tokens.len() && tokens[*idx].is_keyword("not") {
        *idx += 1;
        let expr = parse_not_expr(tokens, idx)?;
        return Ok(Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(expr),
        });
    }
    parse_comparison(tokens, idx)
}

fn parse_comparison(tokens: &[Token], idx: &mut usize) -> Result<Expr> {
    let left = parse_additive(tokens, idx)?;

    if *idx < tokens.len() && tokens[*idx].is_keyword("is") {
        *idx += 1;
        let negated = *idx < tokens.len() && tokens[*idx].is_keyword("not");
        if negated {
            *idx += 1;
        }
        if *idx >= tokens.len() || !tokens[*idx].is_keyword("null") {
            return Err(Error::Expression("Expected NULL after IS".to_string()));
        }
        *idx += 1;
        return Ok(Expr::IsNull {
            expr: Box::new(left),
            negated,
        });
    }

    let op = match tokens.get(*idx) {
        Some(Token::Symbol("=")) => BinaryOp::Eq,
        Some(Token::Symbol("!=")) | Some(Token::Symbol("<>")) => BinaryOp::NotEq,
        Some(Token::Symbol("<")) => BinaryOp::Lt,
        Some(Token::Symbol("<=")) => BinaryOp::Lte,
        Some(Token::Symbol(">")) => BinaryOp::Gt,
        Some(Token::Symbol(">=")) => BinaryOp::Gte,
        _ => return Ok(left),
    };
    *idx += 1;
    let right = parse_additive(tokens, idx)?;
    Ok(binary(left, op, right))
}

fn parse_additive(tokens: &[Token], idx: &mut usize) -> Result<Expr> {
    let mut left = parse_multiplicative(tokens, idx)?;
    loop {
        let op = match tokens.get(*idx) {
            Some(Token::Symbol("+")) => BinaryOp::Add,
            Some(Token::Symbol("-")) => BinaryOp::Sub,
            Some(Token::Symbol("||")) => BinaryOp::Concat,
            _ => return Ok(left),
        };
        *idx += 1;
        let right = parse_multiplicative(tokens, idx)?;
        left = binary(left, op, right);
    }
}

fn parse_multiplicative(tokens: &[Token], idx: &mut usize) -> Result<Expr> {
    let mut left = parse_unary(tokens, idx)?;
    loop {
        let op = match tokens.get(*idx) {
            Some(Token::Symbol("*")) => BinaryOp::Mul,
            Some(Token::Symbol("/")) => BinaryOp::Div,
            _ => return Ok(left),
        };
        *idx += 1;
        let right = parse_unary(tokens, idx)?;
        left = binary(left, op, right);
    }
}

fn parse_unary(tokens: &[Token], idx: &mut usize) -> Result<Expr> {
    if matches!(tokens.get(*idx), Some(Token::Symbol("-"))) {
        *idx += 1;
        let expr = parse_unary(tokens, idx)?;
        return Ok(match expr {
            Expr::Literal(Value::Int64(n)) => Expr::Literal(Value::Int64(-n)),
            other => Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(other),
            },
        });
    }
    parse_primary_expr(tokens, idx)
}

fn parse_primary_expr(tokens: &[Token], idx: &mut usize) -> Result<Expr> {
    let tok = tokens.get(*idx).ok_or_else(|| unexpected(tokens, *idx))?.clone();
    *idx += 1;
    match tok {
        Token::Symbol("(") => {
            let expr = parse_or_expr(tokens, idx)?;
            expect_symbol(tokens, idx, ")")?;
            Ok(expr)
        }
        Token::Number(text) => parse_number(&text).map(Expr::Literal),
        Token::Str(text) => Ok(Expr::Literal(Value::String(text))),
        Token::QuotedIdent(name) => Ok(Expr::Column(name)),
        Token::Ident(word) => {
            if matches!(tokens.get(*idx), Some(Token::Symbol("("))) {
                *idx += 1;
                return parse_call(word, tokens, idx);
            }
            match word.to_ascii_uppercase().as_str() {
                "NULL" => Ok(Expr::Literal(Value::Null)),
                "TRUE" => Ok(Expr::Literal(Value::Bool(true))),
                "FALSE" => Ok(Expr::Literal(Value::Bool(false))),
                _ => Ok(Expr::Column(word)),
            }
        }
        Token::Symbol(_) => Err(unexpected(tokens, *idx - 1)),
    }
}

fn parse_call(name: String, tokens: &[Token], idx: &mut usize) -> Result<Expr> {
    if name.eq_ignore_ascii_case("get_next_sequence_value") {
        match (tokens.get(*idx), tokens.get(*idx + 1)) {
            (Some(kw), Some(Token::Ident(seq) | Token::QuotedIdent(seq)))
                if kw.is_keyword("sequence") =>
            {
                let seq = seq.clone();
                *idx += 2;
                expect_symbol(tokens, idx, ")")?;
                return Ok(Expr::NextSequenceValue(seq));
            }
            _ => {
                return Err(Error::Expression(
                    "Usage: GET_NEXT_SEQUENCE_VALUE(SEQUENCE <name>)".to_string(),
                ));
            }
        }
    }

    let mut args = Vec::new();
    if matches!(tokens.get(*idx), Some(Token::Symbol(")"))) {
        *idx += 1;
        return Ok(Expr::Function { name, args });
    }
    loop {
        args.push(parse_or_expr(tokens, idx)?);
        match tokens.get(*idx) {
            Some(Token::Symbol(",")) => *idx += 1,
            Some(Token::Symbol(")")) => {
                *idx += 1;
                return Ok(Expr::Function { name, args });
            }
            _ => return Err(unexpected(tokens, *idx)),
        }
    }
}

fn parse_number(text: &str) -> Result<Value> {
    if text.contains('.') {
        return text
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|_| Error::Expression(format!("Invalid number literal '{text}'")));
    }
    match text.parse::<i64>() {
        Ok(n) => Ok(Value::Int64(n)),
        Err(_) => text
            .parse::<Decimal>()
            .map(Value::Numeric)
            .map_err(|_| Error::Expression(format!("Invalid number literal '{text}'"))),
    }
}
