//! Schema upgrade: rewriting v1/v2 pipeline configs into the explicit v3
//! expression representation.
//!
//! Legacy configs use bare strings for variables (`"@foo"`) and templates
//! (`"Hello {{ @name }}"`). The upgrade walks every config value guided by
//! the brick's declared input schema and rewrites upgradeable strings into
//! tagged expressions, recursively through nested objects, arrays, `oneOf`
//! alternatives, and `additionalProperties` schemas.
//!
//! Two exclusion mechanisms are checked *before* any string-pattern
//! matching, because converting a selector silently corrupts user CSS:
//! schema nodes tagged `format: "selector"` (including any `oneOf`
//! candidate), and the data-driven brick-id + field-name override table.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use brickflow_types::{
    AdditionalProperties, ApiVersion, BrickConfig, BrickPipeline, Expression, InputSchema,
    RegistryId, SchemaItems, TemplateEngine,
};

use crate::registry::{BrickRegistry, RegistryError};

/// Upgrade failure.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// A step's brick is unknown, so its schema cannot be determined.
    /// Running an un-upgraded config through the v3 engine has undefined
    /// semantics, so this is an explicit failure, never a silent skip.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The surrounding document is not a pipeline document.
    #[error("malformed pipeline document: {0}")]
    Document(String),
}

/// Bare `@`-path grammar: `@root` followed by dotted fields, numeric
/// indices, or quoted bracket keys, with nothing else.
static VAR_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^@[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+|\[\d+\]|\["(?:[^"\\]|\\.)*"\]|\['(?:[^'\\]|\\.)*'\])*$"#,
    )
    .expect("static regex")
});

fn has_template_delimiters(value: &str) -> bool {
    value.contains("{{") || value.contains("{%")
}

/// Rewrite a legacy string value into its v3 expression.
///
/// A bare `@`-path becomes a `var` expression; a string containing
/// template delimiters becomes a template for `engine`; anything else
/// stays a literal.
pub fn upgrade_string_to_expression(value: &str, engine: TemplateEngine) -> Expression {
    if VAR_PATH.is_match(value) {
        Expression::Var(value.to_owned())
    } else if has_template_delimiters(value) {
        Expression::Template {
            engine,
            template: value.to_owned(),
        }
    } else {
        Expression::Literal(Value::String(value.to_owned()))
    }
}

/// Data-driven per-brick field exclusions.
///
/// Some bricks carry fields that the schema-driven logic would convert but
/// that must stay plain strings (discriminators, enum-ish markers). The
/// table is configuration: callers merge in entries enumerated from their
/// registry rather than hard-coding per-brick logic.
#[derive(Debug, Clone, Default)]
pub struct UpgradeOverrides {
    skip: HashMap<RegistryId, HashSet<String>>,
}

impl UpgradeOverrides {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shipped table: the component reader's `framework` discriminator
    /// must remain a plain string.
    pub fn standard() -> Self {
        let mut overrides = Self::new();
        overrides.skip_field(RegistryId::from_parts("core", "component-reader"), "framework");
        overrides
    }

    /// Exclude a field of a brick from conversion.
    pub fn skip_field(&mut self, id: RegistryId, field: impl Into<String>) {
        self.skip.entry(id).or_default().insert(field.into());
    }

    /// Whether a field of a brick is excluded.
    pub fn is_skipped(&self, id: &RegistryId, field: &str) -> bool {
        self.skip.get(id).is_some_and(|fields| fields.contains(field))
    }
}

/// Upgrade a pipeline to the v3 expression representation using the
/// standard override table. Pure: the input pipeline is not mutated.
pub async fn upgrade_pipeline_to_v3(
    pipeline: &BrickPipeline,
    registry: &dyn BrickRegistry,
) -> Result<BrickPipeline, UpgradeError> {
    upgrade_pipeline_with(pipeline, registry, &UpgradeOverrides::standard()).await
}

/// Upgrade a pipeline with a caller-supplied override table.
pub fn upgrade_pipeline_with<'a>(
    pipeline: &'a BrickPipeline,
    registry: &'a dyn BrickRegistry,
    overrides: &'a UpgradeOverrides,
) -> Pin<Box<dyn Future<Output = Result<BrickPipeline, UpgradeError>> + Send + 'a>> {
    Box::pin(async move {
        let mut upgraded = Vec::with_capacity(pipeline.len());
        for block in pipeline {
            upgraded.push(upgrade_block(block, registry, overrides).await?);
        }
        Ok(upgraded)
    })
}

async fn upgrade_block(
    block: &BrickConfig,
    registry: &dyn BrickRegistry,
    overrides: &UpgradeOverrides,
) -> Result<BrickConfig, UpgradeError> {
    let brick = registry.lookup(&block.id).await?;
    let schema = brick.schema();
    let engine = block.upgrade_engine();

    let mut config = BTreeMap::new();
    for (property, value) in &block.config {
        let upgraded = if overrides.is_skipped(&block.id, property) {
            debug!(brick = %block.id, %property, "field excluded by override table");
            value.clone()
        } else {
            match value {
                // Nested sub-pipelines upgrade recursively.
                Expression::Pipeline(sub) => {
                    Expression::Pipeline(upgrade_pipeline_with(sub, registry, overrides).await?)
                }
                // Already-explicit expressions pass through.
                Expression::Var(_) | Expression::Template { .. } => value.clone(),
                Expression::Literal(raw) => {
                    let member = object_member_schema(Some(&schema), property);
                    upgrade_value(raw, member, engine)
                }
            }
        };
        config.insert(property.clone(), upgraded);
    }

    let mut upgraded = block.clone();
    upgraded.config = config;

    // The `if` field converts like config fields: bare `@name` becomes a
    // var, template delimiters select the step's engine.
    if let Some(Expression::Literal(Value::String(condition))) = &block.condition {
        upgraded.condition = Some(upgrade_string_to_expression(condition, engine));
    }

    Ok(upgraded)
}

/// Upgrade one top-level config value against its schema.
fn upgrade_value(value: &Value, schema: Option<&InputSchema>, engine: TemplateEngine) -> Expression {
    if schema.is_some_and(InputSchema::excludes_templates) {
        return Expression::Literal(value.clone());
    }
    match value {
        Value::String(s) => upgrade_string_to_expression(s, engine),
        Value::Object(_) | Value::Array(_) => {
            Expression::Literal(upgrade_json(value, schema, engine))
        }
        // Non-string literals (booleans, numbers, null) are untouched.
        other => Expression::Literal(other.clone()),
    }
}

/// Upgrade a value nested inside a literal tree. Converted strings become
/// embedded expression objects in the JSON.
fn upgrade_json(value: &Value, schema: Option<&InputSchema>, engine: TemplateEngine) -> Value {
    if schema.is_some_and(InputSchema::excludes_templates) {
        return value.clone();
    }
    let schema = effective_schema(schema, value);
    match value {
        Value::String(s) => match upgrade_string_to_expression(s, engine) {
            Expression::Var(path) => json!({"__type__": "var", "__value__": path}),
            Expression::Template { engine, template } => {
                json!({"__type__": engine.as_str(), "__value__": template})
            }
            _ => value.clone(),
        },
        Value::Object(map) => {
            let mut upgraded = Map::with_capacity(map.len());
            for (key, member) in map {
                let member_schema = object_member_schema(schema, key);
                upgraded.insert(key.clone(), upgrade_json(member, member_schema, engine));
            }
            Value::Object(upgraded)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    upgrade_json(item, array_item_schema(schema, index), engine)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Pick the `oneOf` alternative matching a value's JSON type, if the node
/// is a `oneOf` union. Selector exclusion has already been checked against
/// every candidate by this point.
fn effective_schema<'s>(schema: Option<&'s InputSchema>, value: &Value) -> Option<&'s InputSchema> {
    let schema = schema?;
    if schema.one_of.is_empty() {
        return Some(schema);
    }
    let value_type = match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::Null => "null",
    };
    schema
        .one_of
        .iter()
        .find(|candidate| candidate.schema_type.as_deref() == Some(value_type))
        .or(Some(schema))
}

/// Schema applying to an object member: a declared property, else the
/// `additionalProperties` schema.
fn object_member_schema<'s>(
    schema: Option<&'s InputSchema>,
    key: &str,
) -> Option<&'s InputSchema> {
    let schema = schema?;
    if let Some(property) = schema.properties.get(key) {
        return Some(property);
    }
    match &schema.additional_properties {
        Some(AdditionalProperties::Schema(inner)) => Some(inner),
        _ => None,
    }
}

/// Schema applying to an array element: the positional tuple entry, the
/// `additionalItems` schema beyond the tuple, or the single items schema.
fn array_item_schema<'s>(schema: Option<&'s InputSchema>, index: usize) -> Option<&'s InputSchema> {
    match &schema?.items {
        Some(SchemaItems::Single(inner)) => Some(inner),
        Some(SchemaItems::Tuple(tuple)) => tuple
            .get(index)
            .or_else(|| schema?.additional_items.as_deref()),
        None => None,
    }
}

/// Extract and upgrade the pipeline from a pipeline document envelope.
///
/// Consumes only the `apiVersion` and `definition.pipeline` subtree of the
/// `{apiVersion, kind, metadata, definition}` wire format. Documents
/// declared `v1`/`v2` are upgraded before they reach the engine; `v3`
/// documents are returned as-is.
pub async fn load_pipeline(
    document: &Value,
    registry: &dyn BrickRegistry,
) -> Result<BrickPipeline, UpgradeError> {
    let version = match document.get("apiVersion").and_then(Value::as_str) {
        Some("v1") => ApiVersion::V1,
        Some("v2") => ApiVersion::V2,
        Some("v3") => ApiVersion::V3,
        Some(other) => {
            return Err(UpgradeError::Document(format!(
                "unsupported apiVersion {other:?}"
            )))
        }
        None => return Err(UpgradeError::Document("missing apiVersion".to_owned())),
    };

    let Some(pipeline_value) = document.pointer("/definition/pipeline") else {
        return Err(UpgradeError::Document(
            "missing definition.pipeline".to_owned(),
        ));
    };
    let pipeline: BrickPipeline = serde_json::from_value(pipeline_value.clone())
        .map_err(|err| UpgradeError::Document(err.to_string()))?;

    if version.uses_implicit_templates() {
        debug!(%version, steps = pipeline.len(), "upgrading legacy pipeline document");
        upgrade_pipeline_to_v3(&pipeline, registry).await
    } else {
        Ok(pipeline)
    }
}
