//! Expression collaborator.
//!
//! The layout engine never interprets template expressions itself; it calls
//! an [`Expressions`] implementation for three things: interpolating strings
//! (bookmark titles), evaluating band conditions, and resolving element props
//! before measurement.
//!
//! [`TemplateExpressions`] is the default. It understands:
//!
//! - `{{ path }}` interpolation inside strings, where `path` is a dot path
//!   into the scope (`item.qty`, `_anchors.totals`).
//! - Conditions: a path or literal, optionally negated with `!`, compared with
//!   `== != > < >= <=`, and combined with `&&` / `||`. Surrounding `{{ }}`
//!   is accepted.
//! - Operator objects inside props: `$ref`, `$if`, `$cond`, comparisons,
//!   arithmetic, `$upper`, `$lower`, `$concat`, `$format` and `$count`.

use serde_json::{Map, Value};

use crate::scope::{is_truthy, value_to_string, Scope};

/// Evaluates template expressions against a band instance's scope.
pub trait Expressions: Send + Sync {
    /// Interpolate every `{{ ... }}` placeholder in `template`.
    fn resolve(&self, template: &str, scope: &Scope) -> String;

    /// Evaluate a band condition.
    fn evaluate(&self, condition: &str, scope: &Scope) -> bool;

    /// Resolve expressions nested anywhere inside an element's raw props.
    fn resolve_props(&self, props: &Value, scope: &Scope) -> Value;
}

/// The built-in expression evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateExpressions;

impl Expressions for TemplateExpressions {
    fn resolve(&self, template: &str, scope: &Scope) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            out.push_str(&rest[..start]);
            let expr = &rest[start + 2..start + 2 + len];
            out.push_str(&value_to_string(&eval_expr(expr, scope)));
            rest = &rest[start + 2 + len + 2..];
        }
        out.push_str(rest);
        out
    }

    fn evaluate(&self, condition: &str, scope: &Scope) -> bool {
        let trimmed = condition.trim();
        let inner = trimmed
            .strip_prefix("{{")
            .and_then(|s| s.strip_suffix("}}"))
            .unwrap_or(trimmed);
        is_truthy(&eval_expr(inner, scope))
    }

    fn resolve_props(&self, props: &Value, scope: &Scope) -> Value {
        evaluate_node(props, scope, self).unwrap_or(Value::Null)
    }
}

// ─── Condition / interpolation expressions ──────────────────────────

fn eval_expr(expr: &str, scope: &Scope) -> Value {
    let expr = expr.trim();

    if let Some((lhs, rhs)) = split_top_level(expr, "||") {
        let l = eval_expr(lhs, scope);
        return if is_truthy(&l) { l } else { eval_expr(rhs, scope) };
    }
    if let Some((lhs, rhs)) = split_top_level(expr, "&&") {
        let l = eval_expr(lhs, scope);
        return if is_truthy(&l) { eval_expr(rhs, scope) } else { l };
    }

    // Two-character operators first so `>=` is not read as `>`.
    for (token, op) in [
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        (">=", CompareOp::Gte),
        ("<=", CompareOp::Lte),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
    ] {
        if let Some((lhs, rhs)) = split_top_level(expr, token) {
            let a = eval_operand(lhs, scope);
            let b = eval_operand(rhs, scope);
            return Value::Bool(compare_values(&a, &b, &op));
        }
    }

    if let Some(inner) = expr.strip_prefix('!') {
        return Value::Bool(!is_truthy(&eval_expr(inner, scope)));
    }

    eval_operand(expr, scope)
}

/// Split at the first occurrence of `token` outside quotes.
fn split_top_level<'a>(expr: &'a str, token: &str) -> Option<(&'a str, &'a str)> {
    let mut quote: Option<char> = None;
    for (i, ch) in expr.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None => {
                if expr[i..].starts_with(token) {
                    // `>`/`<` must not match the first half of `>=`/`<=`.
                    if (token == ">" || token == "<") && expr[i + 1..].starts_with('=') {
                        continue;
                    }
                    return Some((&expr[..i], &expr[i + token.len()..]));
                }
            }
        }
    }
    None
}

fn eval_operand(operand: &str, scope: &Scope) -> Value {
    let operand = operand.trim();
    match operand {
        "" | "null" | "undefined" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if looks_numeric(operand) {
        if let Ok(n) = operand.parse::<f64>() {
            return serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number);
        }
    }
    for q in ['\'', '"'] {
        if let Some(s) = operand.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return Value::String(s.to_string());
        }
    }
    if let Some(inner) = operand.strip_prefix('!') {
        return Value::Bool(!is_truthy(&eval_operand(inner, scope)));
    }
    scope.resolve_path(operand).cloned().unwrap_or(Value::Null)
}

/// Numeric literals start with a digit, `-` or `.`. Keeps `inf` and `nan`
/// resolving as data paths.
fn looks_numeric(operand: &str) -> bool {
    operand
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '.')
}

// ─── Props operator objects ─────────────────────────────────────────

/// Evaluate a single node of an element's props tree.
fn evaluate_node(node: &Value, scope: &Scope, exprs: &TemplateExpressions) -> Option<Value> {
    match node {
        Value::Object(map) => {
            if let Some(result) = evaluate_expr_object(map, scope, exprs) {
                return result;
            }
            let mut result = Map::new();
            for (key, val) in map {
                if let Some(evaluated) = evaluate_node(val, scope, exprs) {
                    result.insert(key.clone(), evaluated);
                }
            }
            Some(Value::Object(result))
        }
        Value::Array(arr) => Some(Value::Array(
            arr.iter()
                .filter_map(|item| evaluate_node(item, scope, exprs))
                .collect(),
        )),
        Value::String(s) if s.contains("{{") => Some(Value::String(exprs.resolve(s, scope))),
        _ => Some(node.clone()),
    }
}

/// Operator keys in lookup order. An object is an expression when it holds
/// one of these; other `$` keys are ordinary props.
const OPERATORS: [&str; 18] = [
    "$ref", "$if", "$cond", "$eq", "$ne", "$gt", "$lt", "$gte", "$lte", "$add", "$sub", "$mul",
    "$div", "$upper", "$lower", "$concat", "$format", "$count",
];

/// Returns `Some(Some(value))` for an expression that produced a value,
/// `Some(None)` for one that produced nothing (e.g. a false `$if` without
/// `else`), and `None` when `map` is not an expression object.
fn evaluate_expr_object(
    map: &Map<String, Value>,
    scope: &Scope,
    exprs: &TemplateExpressions,
) -> Option<Option<Value>> {
    let (key, args) = OPERATORS.iter().find_map(|op| map.get_key_value(*op))?;
    let eval = |v: &Value| evaluate_node(v, scope, exprs);

    let result = match key.as_str() {
        "$ref" => args.as_str().and_then(|p| scope.resolve_path(p).cloned()),
        "$if" => {
            let cond = eval(args)?;
            let branch = if is_truthy(&cond) { "then" } else { "else" };
            map.get(branch).and_then(eval)
        }
        "$cond" => {
            let arr = args.as_array().filter(|a| a.len() == 3)?;
            let cond = eval(&arr[0])?;
            if is_truthy(&cond) {
                eval(&arr[1])
            } else {
                eval(&arr[2])
            }
        }
        "$eq" => comparison(args, &eval, CompareOp::Eq),
        "$ne" => comparison(args, &eval, CompareOp::Ne),
        "$gt" => comparison(args, &eval, CompareOp::Gt),
        "$lt" => comparison(args, &eval, CompareOp::Lt),
        "$gte" => comparison(args, &eval, CompareOp::Gte),
        "$lte" => comparison(args, &eval, CompareOp::Lte),
        "$add" => arithmetic(args, &eval, |a, b| a + b),
        "$sub" => arithmetic(args, &eval, |a, b| a - b),
        "$mul" => arithmetic(args, &eval, |a, b| a * b),
        "$div" => arithmetic(args, &eval, |a, b| if b != 0.0 { a / b } else { 0.0 }),
        "$upper" => eval(args).map(|v| Value::String(value_to_string(&v).to_uppercase())),
        "$lower" => eval(args).map(|v| Value::String(value_to_string(&v).to_lowercase())),
        "$concat" => {
            let parts = args.as_array()?;
            let mut out = String::new();
            for part in parts {
                out.push_str(&value_to_string(&eval(part)?));
            }
            Some(Value::String(out))
        }
        "$format" => {
            let arr = args.as_array().filter(|a| a.len() == 2)?;
            let value = eval(&arr[0]).and_then(|v| v.as_f64())?;
            let fmt = eval(&arr[1])?;
            let fmt = fmt.as_str()?;
            let decimals = fmt.find('.').map_or(0, |dot| fmt.len() - dot - 1);
            Some(Value::String(format!("{value:.decimals$}")))
        }
        "$count" => match eval(args) {
            Some(Value::Array(arr)) => Some(Value::from(arr.len())),
            _ => Some(Value::from(0)),
        },
        _ => return None,
    };
    Some(result)
}

enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
}

fn comparison(args: &Value, eval: &dyn Fn(&Value) -> Option<Value>, op: CompareOp) -> Option<Value> {
    let arr = args.as_array().filter(|a| a.len() == 2)?;
    let a = eval(&arr[0])?;
    let b = eval(&arr[1])?;
    Some(Value::Bool(compare_values(&a, &b, &op)))
}

fn arithmetic(
    args: &Value,
    eval: &dyn Fn(&Value) -> Option<Value>,
    op: fn(f64, f64) -> f64,
) -> Option<Value> {
    let arr = args.as_array().filter(|a| a.len() == 2)?;
    let a = eval(&arr[0]).and_then(|v| v.as_f64())?;
    let b = eval(&arr[1]).and_then(|v| v.as_f64())?;
    Some(serde_json::Number::from_f64(op(a, b)).map_or(Value::Null, Value::Number))
}

/// Compare two JSON values. Numbers compare as f64, strings lexically,
/// everything else by equality only.
fn compare_values(a: &Value, b: &Value, op: &CompareOp) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(na), Some(nb)) => match op {
            CompareOp::Eq => na == nb,
            CompareOp::Ne => na != nb,
            CompareOp::Gt => na > nb,
            CompareOp::Lt => na < nb,
            CompareOp::Gte => na >= nb,
            CompareOp::Lte => na <= nb,
        },
        _ => match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Gt | CompareOp::Lt | CompareOp::Gte | CompareOp::Lte => {
                match (a.as_str(), b.as_str()) {
                    (Some(sa), Some(sb)) => match op {
                        CompareOp::Gt => sa > sb,
                        CompareOp::Lt => sa < sb,
                        CompareOp::Gte => sa >= sb,
                        CompareOp::Lte => sa <= sb,
                        CompareOp::Eq | CompareOp::Ne => false,
                    },
                    _ => false,
                }
            }
        },
    }
}
