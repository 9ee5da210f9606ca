//! Brick input schemas — the JSON-Schema subset the runtime consumes.
//!
//! Only the shapes the upgrade engine and argument validation care about are
//! modeled: `type`, `format`, object properties (with `additionalProperties`
//! as bool-or-schema), `oneOf` alternatives, and array `items` in both the
//! single-schema and positional-tuple forms.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The `format` marker for CSS selector fields.
///
/// Selector-tagged strings are opaque and must never be rewritten as
/// variables or templates, even when they look like one.
pub const FORMAT_SELECTOR: &str = "selector";

/// `additionalProperties`: either a blanket allow/deny or a schema applied
/// to every undeclared property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<InputSchema>),
}

/// `items`: one schema for every element, or a positional tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaItems {
    Single(Box<InputSchema>),
    Tuple(Vec<InputSchema>),
}

/// One node of a brick input schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputSchema {
    /// Declared type: `string`, `boolean`, `number`, `object`, `array`, or
    /// a runtime-specific marker such as `pipeline`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    /// Format refinement; `"selector"` excludes a field from upgrades.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Declared object properties.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, InputSchema>,

    /// Schema (or blanket rule) for undeclared object properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    /// Alternative schemas; a value matches any one of them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<InputSchema>,

    /// Array element schema(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<SchemaItems>,

    /// Schema for elements beyond the `items` tuple length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_items: Option<Box<InputSchema>>,

    /// Required property names.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    /// Help text shown in the editor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InputSchema {
    /// A schema with only a declared type.
    pub fn of_type(schema_type: impl Into<String>) -> Self {
        Self {
            schema_type: Some(schema_type.into()),
            ..Self::default()
        }
    }

    /// A plain string schema.
    pub fn string() -> Self {
        Self::of_type("string")
    }

    /// A boolean schema.
    pub fn boolean() -> Self {
        Self::of_type("boolean")
    }

    /// A string schema tagged as a CSS selector.
    pub fn selector() -> Self {
        Self {
            format: Some(FORMAT_SELECTOR.to_owned()),
            ..Self::of_type("string")
        }
    }

    /// An object schema with no declared properties.
    pub fn object() -> Self {
        Self::of_type("object")
    }

    /// A sub-pipeline property.
    pub fn pipeline() -> Self {
        Self::of_type("pipeline")
    }

    /// An array schema with a single element schema.
    pub fn array(items: InputSchema) -> Self {
        Self {
            items: Some(SchemaItems::Single(Box::new(items))),
            ..Self::of_type("array")
        }
    }

    /// Add a declared property.
    pub fn property(mut self, name: impl Into<String>, schema: InputSchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Set the `additionalProperties` schema.
    pub fn additional(mut self, schema: InputSchema) -> Self {
        self.additional_properties = Some(AdditionalProperties::Schema(Box::new(schema)));
        self
    }

    /// Set `oneOf` alternatives.
    pub fn one_of(mut self, alternatives: impl IntoIterator<Item = InputSchema>) -> Self {
        self.one_of = alternatives.into_iter().collect();
        self
    }

    /// Mark a property as required.
    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    /// Set the description.
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Whether this node, or any `oneOf` alternative, is selector-tagged.
    pub fn excludes_templates(&self) -> bool {
        if self.format.as_deref() == Some(FORMAT_SELECTOR) {
            return true;
        }
        self.one_of.iter().any(InputSchema::excludes_templates)
    }
}
