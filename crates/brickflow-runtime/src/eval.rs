//! Expression resolution against a variable scope.
//!
//! Reduces configuration expressions to plain JSON values: literals pass
//! through (with embedded expression objects resolved in place), variable
//! references walk the scope, and templates render through the
//! [`TemplateRenderer`]. Pipeline expressions carry control flow, not
//! data — resolving one yields null; the execution engine recurses into
//! them instead.

use serde_json::{Map, Value};

use brickflow_types::{Expression, TemplateEngine};

use crate::scope::Scope;
use crate::templates::{TemplateError, TemplateRenderer};

/// Resolve an expression to a value.
///
/// Missing variable paths resolve to null rather than erroring, mirroring
/// template-engine semantics where an undefined reference renders blank.
/// The only failure mode is a template that fails to parse or render.
pub fn resolve_expression(
    expr: &Expression,
    scope: &Scope,
    renderer: &TemplateRenderer,
) -> Result<Value, TemplateError> {
    match expr {
        Expression::Literal(value) => resolve_embedded(value, scope, renderer),
        Expression::Var(path) => Ok(scope.resolve_path(path).unwrap_or(Value::Null)),
        Expression::Template { engine, template } => {
            let context = scope.flatten();
            Ok(Value::String(renderer.render(*engine, template, &context)?))
        }
        Expression::Pipeline(_) => Ok(Value::Null),
    }
}

/// Resolve expression objects embedded inside a literal JSON tree.
///
/// Upgraded v1 configs nest `{"__type__": "var"|"nunjucks"|"mustache"}`
/// objects at arbitrary depth inside object and array values; each is
/// resolved in place. Pipeline objects are left verbatim — they are
/// rendered lazily by the host, not resolved to data.
pub fn resolve_embedded(
    value: &Value,
    scope: &Scope,
    renderer: &TemplateRenderer,
) -> Result<Value, TemplateError> {
    match value {
        Value::Object(map) => {
            if let Some(expr) = embedded_expression(map) {
                return resolve_expression(&expr, scope, renderer);
            }
            let mut resolved = Map::with_capacity(map.len());
            for (key, member) in map {
                resolved.insert(key.clone(), resolve_embedded(member, scope, renderer)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => {
            let resolved = items
                .iter()
                .map(|item| resolve_embedded(item, scope, renderer))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(resolved))
        }
        other => Ok(other.clone()),
    }
}

/// Interpret a JSON object as an embedded value expression, if it is one.
///
/// Only the value-producing kinds are recognized here; pipeline objects
/// stay raw.
pub(crate) fn embedded_expression(map: &Map<String, Value>) -> Option<Expression> {
    let Some(Value::String(tag)) = map.get("__type__") else {
        return None;
    };
    let value = map.get("__value__");
    match (tag.as_str(), value) {
        ("var", Some(Value::String(path))) => Some(Expression::Var(path.clone())),
        ("nunjucks", Some(Value::String(template))) => Some(Expression::Template {
            engine: TemplateEngine::Nunjucks,
            template: template.clone(),
        }),
        ("mustache", Some(Value::String(template))) => Some(Expression::Template {
            engine: TemplateEngine::Mustache,
            template: template.clone(),
        }),
        ("literal", Some(value)) => Some(Expression::Literal(value.clone())),
        _ => None,
    }
}

/// JavaScript-style truthiness, used for step conditions.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
