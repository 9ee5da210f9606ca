//! The tagged value union used throughout pipeline configuration.
//!
//! On the wire an expression is either a bare JSON value (a literal) or an
//! object of the form `{"__type__": "...", "__value__": ...}`. In memory it
//! is a real sum type so that consumers pattern-match exhaustively instead
//! of probing `__type__` strings.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::config::BrickPipeline;

/// Which template engine renders a template expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateEngine {
    /// Jinja-style templates: `{{ @foo }}`, `{% if %}`, filters.
    Nunjucks,
    /// Logic-less mustache templates: `{{ @foo }}`, sections.
    #[default]
    Mustache,
}

impl TemplateEngine {
    /// The wire name, also used as the expression `__type__` tag.
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateEngine::Nunjucks => "nunjucks",
            TemplateEngine::Mustache => "mustache",
        }
    }
}

impl fmt::Display for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration value: literal, variable reference, template, or nested
/// pipeline.
///
/// Invariants mirror the wire format: `Var` carries a single `@`-prefixed
/// path, `Template` a template source string, `Pipeline` an ordered list of
/// brick configs, and `Literal` any JSON value. Expressions are immutable
/// snapshots; they are re-evaluated fresh on every execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A plain JSON value, passed through verbatim.
    Literal(Value),
    /// A variable reference such as `@foo.bar`.
    Var(String),
    /// A template string rendered by the named engine.
    Template {
        engine: TemplateEngine,
        template: String,
    },
    /// A nested sub-pipeline; carries control flow, not data.
    Pipeline(BrickPipeline),
}

impl Expression {
    /// Build a variable reference expression.
    pub fn var(path: impl Into<String>) -> Self {
        Expression::Var(path.into())
    }

    /// Build a template expression for the given engine.
    pub fn template(engine: TemplateEngine, template: impl Into<String>) -> Self {
        Expression::Template {
            engine,
            template: template.into(),
        }
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Literal(value)
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Expression::Literal(Value::String(value.to_owned()))
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Literals serialize bare so v3 documents round-trip unchanged.
            Expression::Literal(value) => value.serialize(serializer),
            Expression::Var(path) => {
                json!({ "__type__": "var", "__value__": path }).serialize(serializer)
            }
            Expression::Template { engine, template } => {
                json!({ "__type__": engine.as_str(), "__value__": template }).serialize(serializer)
            }
            Expression::Pipeline(pipeline) => {
                let blocks =
                    serde_json::to_value(pipeline).map_err(serde::ser::Error::custom)?;
                json!({ "__type__": "pipeline", "__value__": blocks }).serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(value).map_err(D::Error::custom)
    }
}

impl Expression {
    /// Interpret a raw JSON value as an expression.
    ///
    /// Objects carrying a string `__type__` deserialize into the tagged
    /// variants; every other value is a literal. An object with an unknown
    /// `__type__` tag is an error rather than a silent literal, since it is
    /// almost certainly a mis-serialized expression.
    pub fn from_json(value: Value) -> Result<Self, ExpressionFormatError> {
        let Value::Object(map) = value else {
            return Ok(Expression::Literal(value));
        };
        let Some(Value::String(tag)) = map.get("__type__") else {
            return Ok(Expression::Literal(Value::Object(map)));
        };
        let tag = tag.clone();
        let mut map = map;
        let inner = map.remove("__value__").unwrap_or(Value::Null);
        match tag.as_str() {
            "literal" => Ok(Expression::Literal(inner)),
            "var" => match inner {
                Value::String(path) => Ok(Expression::Var(path)),
                other => Err(ExpressionFormatError::BadValue {
                    tag,
                    found: kind_of(&other),
                }),
            },
            "nunjucks" | "mustache" => {
                let engine = if tag == "nunjucks" {
                    TemplateEngine::Nunjucks
                } else {
                    TemplateEngine::Mustache
                };
                match inner {
                    Value::String(template) => Ok(Expression::Template { engine, template }),
                    other => Err(ExpressionFormatError::BadValue {
                        tag,
                        found: kind_of(&other),
                    }),
                }
            }
            "pipeline" => {
                let pipeline: BrickPipeline = serde_json::from_value(inner)
                    .map_err(|e| ExpressionFormatError::BadPipeline(e.to_string()))?;
                Ok(Expression::Pipeline(pipeline))
            }
            _ => Err(ExpressionFormatError::UnknownTag(tag)),
        }
    }
}

/// Error interpreting a raw JSON value as an expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionFormatError {
    #[error("unknown expression __type__ tag: {0:?}")]
    UnknownTag(String),
    #[error("expression tagged {tag:?} carries a {found} __value__, expected a string")]
    BadValue { tag: String, found: &'static str },
    #[error("pipeline expression __value__ is not a brick list: {0}")]
    BadPipeline(String),
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
