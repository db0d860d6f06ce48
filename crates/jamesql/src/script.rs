//! The arithmetic script expression language (§4.7): a tiny
//! recursive-descent parser over `+ - * /`, `log`, and `decay`,
//! evaluated against a single hit's document and its `_score`.
//! Grounded in the original's `lark`-based `script_lang.py` grammar,
//! reimplemented with `nom` the same way the string query grammar is
//! (`jamesql-query-parser`), since this crate's own dependency stack
//! already carries it.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, char, multispace0};
use nom::combinator::{cut, map, recognize};
use nom::multi::many0_count;
use nom::number::complete::recognize_float;
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;
use serde_json::Value;

use crate::document::Document;
use crate::error::ScriptError;

#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64),
    Field(String),
    BinaryOp(Box<Expr>, Op, Box<Expr>),
    Log(Box<Expr>),
    Decay(String),
}

#[derive(Debug, Clone, Copy)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

pub fn parse(input: &str) -> Result<Expr, ScriptError> {
    let trimmed = input.trim();
    match delimited(multispace0, expr, multispace0)(trimmed) {
        Ok((rest, parsed)) if rest.trim().is_empty() => Ok(parsed),
        Ok((rest, _)) => Err(ScriptError::UnexpectedToken(input.len() - rest.len())),
        Err(_) => Err(ScriptError::UnexpectedToken(0)),
    }
}

fn expr(input: &str) -> IResult<&str, Expr> {
    alt((parenthesized, log_call, decay_call, number, field))(input)
}

fn parenthesized(input: &str) -> IResult<&str, Expr> {
    map(
        delimited(
            char('('),
            cut(tuple((delimited(multispace0, expr, multispace0), op, delimited(multispace0, expr, multispace0)))),
            cut(char(')')),
        ),
        |(lhs, op, rhs)| Expr::BinaryOp(Box::new(lhs), op, Box::new(rhs)),
    )(input)
}

fn op(input: &str) -> IResult<&str, Op> {
    alt((
        map(char('+'), |_| Op::Add),
        map(char('-'), |_| Op::Sub),
        map(char('*'), |_| Op::Mul),
        map(char('/'), |_| Op::Div),
    ))(input)
}

fn log_call(input: &str) -> IResult<&str, Expr> {
    map(
        preceded(pair(tag("log"), multispace0), cut(delimited(char('('), delimited(multispace0, expr, multispace0), char(')')))),
        |inner| Expr::Log(Box::new(inner)),
    )(input)
}

fn decay_call(input: &str) -> IResult<&str, Expr> {
    map(preceded(pair(tag("decay"), multispace0), cut(identifier)), |field: &str| Expr::Decay(field.to_string()))(input)
}

fn number(input: &str) -> IResult<&str, Expr> {
    map(recognize_float, |s: &str| Expr::Number(s.parse().unwrap_or(0.0)))(input)
}

fn field(input: &str) -> IResult<&str, Expr> {
    map(identifier, |s: &str| Expr::Field(s.to_string()))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(alt((alpha1, tag("_"))), many0_count(alt((alphanumeric1, tag("_"))))))(input)
}

/// Evaluates a parsed script expression against one hit: its document
/// plus `_score`, which is always present.
pub fn evaluate(expr: &Expr, doc: &Document, score: f64, today: (i32, u32, u32)) -> Result<f64, ScriptError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Field(name) => resolve_field(name, doc, score),
        Expr::BinaryOp(lhs, op, rhs) => {
            let l = evaluate(lhs, doc, score, today)?;
            let r = evaluate(rhs, doc, score, today)?;
            match op {
                Op::Add => Ok(l + r),
                Op::Sub => Ok(l - r),
                Op::Mul => Ok(l * r),
                Op::Div => {
                    if r == 0.0 {
                        Err(ScriptError::DivisionByZero)
                    } else {
                        Ok(l / r)
                    }
                }
            }
        }
        Expr::Log(inner) => {
            let v = evaluate(inner, doc, score, today)?;
            Ok((v + 0.1).ln())
        }
        Expr::Decay(field) => {
            let value = doc.get(field).ok_or_else(|| ScriptError::UnknownField(field.clone()))?;
            let date_str = value.as_str().ok_or_else(|| ScriptError::NotANumber(field.clone()))?;
            let (y, m, d) = crate::document::parse_ymd(date_str).ok_or_else(|| ScriptError::NotANumber(field.clone()))?;
            let days = days_between((y, m, d), today);
            Ok(0.9_f64.powf(days / 30.0))
        }
    }
}

fn resolve_field(name: &str, doc: &Document, score: f64) -> Result<f64, ScriptError> {
    if name == "_score" {
        return Ok(score);
    }
    let value = doc.get(name).ok_or_else(|| ScriptError::UnknownField(name.to_string()))?;
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| ScriptError::NotANumber(name.to_string())),
        Value::String(s) => s.parse().map_err(|_| ScriptError::NotANumber(name.to_string())),
        _ => Err(ScriptError::NotANumber(name.to_string())),
    }
}

/// Whole-day difference between two `(year, month, day)` tuples via
/// the civil-to-Julian-day-number conversion, avoiding a dependency on
/// a calendar crate for what is otherwise a single arithmetic script
/// builtin.
fn days_between(from: (i32, u32, u32), to: (i32, u32, u32)) -> f64 {
    (julian_day_number(to) - julian_day_number(from)) as f64
}

fn julian_day_number((y, m, d): (i32, u32, u32)) -> i64 {
    let (y, m) = if m <= 2 { (y as i64 - 1, m as i64 + 12) } else { (y as i64, m as i64) };
    let a = y / 100;
    let b = 2 - a + a / 4;
    (365.25 * (y as f64 + 4716.0)).floor() as i64 + (30.6001 * (m as f64 + 1.0)).floor() as i64 + d as i64 + b - 1524
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: &[(&str, Value)]) -> Document {
        fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn evaluates_arithmetic_expressions() {
        let expr = parse("(_score * 2)").unwrap();
        let score = evaluate(&expr, &doc(&[]), 3.0, (2026, 1, 1)).unwrap();
        assert_eq!(score, 6.0);
    }

    #[test]
    fn log_avoids_domain_errors_at_zero() {
        let expr = parse("log(0)").unwrap();
        let result = evaluate(&expr, &doc(&[]), 0.0, (2026, 1, 1)).unwrap();
        assert!((result - 0.1_f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn division_by_zero_is_a_script_error() {
        let expr = parse("(_score / 0)").unwrap();
        let err = evaluate(&expr, &doc(&[]), 1.0, (2026, 1, 1)).unwrap_err();
        assert!(matches!(err, ScriptError::DivisionByZero));
    }

    #[test]
    fn decay_halves_roughly_every_half_life() {
        let expr = parse("decay released").unwrap();
        let document = doc(&[("released", json!("2025-12-02"))]);
        let result = evaluate(&expr, &document, 0.0, (2026, 1, 1)).unwrap();
        assert!(result > 0.0 && result < 1.0);
    }

    #[test]
    fn unknown_field_is_a_script_error() {
        let expr = parse("missing").unwrap();
        let err = evaluate(&expr, &doc(&[]), 0.0, (2026, 1, 1)).unwrap_err();
        assert!(matches!(err, ScriptError::UnknownField(_)));
    }
}
