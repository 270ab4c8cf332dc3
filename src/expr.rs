//! Built-in template renderer.
//!
//! Templates are literal text with `{{ expression }}` segments. Each expression is
//! evaluated with `evalexpr` against the fields of the view: scalar fields are bound
//! under their own names, nested rows (including `_row`) under their path joined
//! with `_`. Dotted keys such as `addr.city` are bound as `addr_city`. Other keys
//! that are not valid identifiers are not bound, and the first binding of a name wins.

use anyhow::{Context, Result};
use evalexpr::{
    Context as _, ContextWithMutableFunctions, ContextWithMutableVariables, Function,
    HashMapContext, Value as EvalValue, eval_with_context,
};
use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use log::debug;
use regex::Regex;

use crate::{
    data::{Value, value_to_evalexpr},
    error::TemplateError,
    middleware::TemplateRenderer,
    rows::Row,
};

const PATH_SEPARATOR: &str = "_";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Expression(&'a str),
}

fn segments(template: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        if start > 0 {
            out.push(Segment::Literal(&rest[..start]));
        }
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| TemplateError::new("unclosed '{{'"))?;
        let expression = after[..end].trim();
        if expression.is_empty() {
            return Err(TemplateError::new("empty expression"));
        }
        out.push(Segment::Expression(expression));
        rest = &after[end + 2..];
    }
    if !rest.is_empty() {
        out.push(Segment::Literal(rest));
    }
    Ok(out)
}

fn string_function(
    context: &mut HashMapContext,
    name: &'static str,
    apply: fn(&str) -> String,
) -> Result<()> {
    context
        .set_function(
            name.into(),
            Function::new(move |arguments| {
                let args = expect_args(arguments, 1, name)?;
                let value = expect_string(&args[0], "value")?;
                Ok(EvalValue::String(apply(value)))
            }),
        )
        .map_err(anyhow::Error::from)
}

fn register_string_functions(context: &mut HashMapContext) -> Result<()> {
    string_function(context, "lowercase", |s| s.to_lowercase())?;
    string_function(context, "uppercase", |s| s.to_uppercase())?;
    string_function(context, "trim", |s| s.trim().to_string())?;
    string_function(context, "snake_case", |s| s.to_snake_case())?;
    string_function(context, "camel_case", |s| s.to_lower_camel_case())?;
    string_function(context, "pascal_case", |s| s.to_upper_camel_case())?;

    context
        .set_function(
            "regex_replace".into(),
            Function::new(|arguments| {
                let args = expect_args(arguments, 3, "regex_replace")?;
                let value = expect_string(&args[0], "value")?;
                let pattern = expect_string(&args[1], "pattern")?;
                let replacement = expect_string(&args[2], "replacement")?;
                let regex = Regex::new(pattern)
                    .map_err(|err| eval_error(&format!("Invalid regex: {err}")))?;
                Ok(EvalValue::String(
                    regex.replace_all(value, replacement).into_owned(),
                ))
            }),
        )
        .map_err(anyhow::Error::from)?;

    context
        .set_function(
            "default".into(),
            Function::new(|arguments| {
                let args = expect_args(arguments, 2, "default")?;
                let missing = match &args[0] {
                    EvalValue::Empty => true,
                    EvalValue::String(s) => s.is_empty(),
                    _ => false,
                };
                Ok(if missing {
                    args[1].clone()
                } else {
                    args[0].clone()
                })
            }),
        )
        .map_err(anyhow::Error::from)?;

    Ok(())
}

fn expect_args(
    arguments: &EvalValue,
    expected: usize,
    name: &str,
) -> Result<Vec<EvalValue>, evalexpr::EvalexprError> {
    match arguments {
        value if expected == 1 && !matches!(value, EvalValue::Tuple(_)) => Ok(vec![value.clone()]),
        EvalValue::Tuple(values) => {
            if values.len() != expected {
                return Err(evalexpr::EvalexprError::wrong_function_argument_amount(
                    values.len(),
                    expected,
                ));
            }
            Ok(values.clone())
        }
        _ => Err(eval_error(&format!(
            "{name} expects {expected} arguments provided as a tuple"
        ))),
    }
}

fn eval_error(message: &str) -> evalexpr::EvalexprError {
    evalexpr::EvalexprError::CustomMessage(message.to_string())
}

fn expect_string<'a>(value: &'a EvalValue, name: &str) -> Result<&'a str, evalexpr::EvalexprError> {
    if let EvalValue::String(s) = value {
        Ok(s)
    } else {
        Err(eval_error(&format!("Expected string for {name}")))
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn bind(context: &mut HashMapContext, key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Row(nested) => {
            for (child, child_value) in nested.iter() {
                bind(context, &format!("{key}{PATH_SEPARATOR}{child}"), child_value)?;
            }
            Ok(())
        }
        scalar => {
            let name = key.replace('.', PATH_SEPARATOR);
            if !is_identifier(&name) {
                return Ok(());
            }
            if context.get_value(&name).is_some() {
                debug!("Template variable '{name}' is already bound; skipping field '{key}'");
                return Ok(());
            }
            context
                .set_value(name, value_to_evalexpr(scalar))
                .with_context(|| format!("Binding field '{key}'"))?;
            Ok(())
        }
    }
}

pub fn build_context(view: &Row) -> Result<HashMapContext> {
    let mut context = HashMapContext::new();
    register_string_functions(&mut context)?;
    for (key, value) in view.iter() {
        bind(&mut context, key, value)?;
    }
    Ok(context)
}

pub fn eval_value_display(value: &EvalValue) -> String {
    match value {
        EvalValue::String(s) => s.clone(),
        EvalValue::Int(i) => i.to_string(),
        EvalValue::Float(f) => Value::Float(*f).as_display(),
        EvalValue::Boolean(b) => b.to_string(),
        EvalValue::Tuple(values) => values
            .iter()
            .map(eval_value_display)
            .collect::<Vec<_>>()
            .join(","),
        EvalValue::Empty => String::new(),
    }
}

/// Evaluates `{{ expression }}` segments with `evalexpr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprTemplateRenderer;

impl TemplateRenderer for ExprTemplateRenderer {
    fn check(&self, template: &str) -> Result<(), TemplateError> {
        segments(template).map(|_| ())
    }

    fn render(&self, template: &str, view: &Row) -> Result<String, TemplateError> {
        let parts = segments(template)?;
        let context = build_context(view).map_err(|err| TemplateError::new(format!("{err:#}")))?;
        let mut out = String::new();
        for part in parts {
            match part {
                Segment::Literal(text) => out.push_str(text),
                Segment::Expression(expression) => {
                    let value = eval_with_context(expression, &context).map_err(|err| {
                        TemplateError::new(format!("evaluating '{expression}': {err}"))
                    })?;
                    out.push_str(&eval_value_display(&value));
                }
            }
        }
        Ok(out)
    }
}
