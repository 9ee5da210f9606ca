//! Pipeline configuration: one step (`BrickConfig`) and ordered sequences
//! of steps (`BrickPipeline`).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::expression::{Expression, TemplateEngine};
use crate::id::{InstanceId, RegistryId};

/// How a step receives its root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootMode {
    /// Use the root inherited from the triggering context.
    #[default]
    Inherit,
    /// Ignore the inherited root and target the whole document.
    Document,
}

/// Which browser context a step targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowTarget {
    /// The frame the pipeline is running in.
    #[default]
    #[serde(rename = "self")]
    Current,
    /// The window that opened this one.
    Opener,
    /// The tab opened by a previous step.
    Target,
    /// The top-level frame of the current tab.
    Top,
    /// Every frame in every tab.
    Broadcast,
}

/// Declared schema version of a pipeline document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    V1,
    V2,
    V3,
}

impl ApiVersion {
    /// Whether configs authored under this version use bare strings for
    /// variables and templates (pre-expression representation).
    pub fn uses_implicit_templates(self) -> bool {
        matches!(self, ApiVersion::V1 | ApiVersion::V2)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::V1 => f.write_str("v1"),
            ApiVersion::V2 => f.write_str("v2"),
            ApiVersion::V3 => f.write_str("v3"),
        }
    }
}

/// One step in a brick pipeline.
///
/// Created when a user adds a brick in the editor or when a pipeline is
/// deserialized from storage; immutable once handed to the execution engine
/// for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrickConfig {
    /// Registry identifier of the brick to run.
    pub id: RegistryId,

    /// Brick input configuration, keyed by property name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Expression>,

    /// Stable placement identifier for trace/editor correlation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<InstanceId>,

    /// Name under which this step's output becomes `@outputKey` for later
    /// steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,

    /// Step condition; the step is skipped when it resolves falsy.
    #[serde(default, rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expression>,

    /// Root-element inheritance override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_mode: Option<RootMode>,

    /// Browser-context targeting override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowTarget>,

    /// Engine used when upgrading legacy string templates in this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_engine: Option<TemplateEngine>,

    /// Human-readable step name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl BrickConfig {
    /// Create a step with an empty configuration.
    pub fn new(id: RegistryId) -> Self {
        Self {
            id,
            config: BTreeMap::new(),
            instance_id: None,
            output_key: None,
            condition: None,
            root_mode: None,
            window: None,
            template_engine: None,
            label: None,
        }
    }

    /// Set a config property.
    pub fn with_config(mut self, property: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.config.insert(property.into(), value.into());
        self
    }

    /// Set the placement identifier.
    pub fn with_instance_id(mut self, instance_id: impl Into<InstanceId>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    /// Set the output key (without the `@` sigil).
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    /// Set the step condition.
    pub fn with_condition(mut self, condition: Expression) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Set the legacy template engine for upgrades.
    pub fn with_template_engine(mut self, engine: TemplateEngine) -> Self {
        self.template_engine = Some(engine);
        self
    }

    /// Set the human-readable step name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The engine used to upgrade this step's legacy strings.
    pub fn upgrade_engine(&self) -> TemplateEngine {
        self.template_engine.unwrap_or_default()
    }
}

/// An ordered sequence of brick invocations; array order is execution order.
pub type BrickPipeline = Vec<BrickConfig>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn deserializes_camel_case_wire_names() {
        let config: BrickConfig = serde_json::from_value(json!({
            "id": "@core/identity",
            "config": {"value": 1},
            "instanceId": "abc-123",
            "outputKey": "result",
            "if": "@flag",
            "rootMode": "document",
            "window": "self",
            "templateEngine": "nunjucks",
            "label": "Copy value",
        }))
        .unwrap();

        assert_eq!(config.id.as_str(), "@core/identity");
        assert_eq!(config.instance_id, Some(InstanceId::new("abc-123")));
        assert_eq!(config.output_key.as_deref(), Some("result"));
        assert_eq!(
            config.condition,
            Some(Expression::Literal(json!("@flag")))
        );
        assert_eq!(config.root_mode, Some(RootMode::Document));
        assert_eq!(config.window, Some(WindowTarget::Current));
        assert_eq!(config.template_engine, Some(TemplateEngine::Nunjucks));
    }

    #[test]
    fn optional_fields_are_omitted_when_unset() {
        let config = BrickConfig::new(RegistryId::from_parts("core", "identity"));
        let wire = serde_json::to_value(&config).unwrap();
        assert_eq!(wire, json!({"id": "@core/identity"}));
    }

    #[test]
    fn upgrade_engine_defaults_to_mustache() {
        let config = BrickConfig::new(RegistryId::from_parts("core", "identity"));
        assert_eq!(config.upgrade_engine(), TemplateEngine::Mustache);
    }

    #[test]
    fn api_version_ordering() {
        assert!(ApiVersion::V1 < ApiVersion::V3);
        assert!(ApiVersion::V1.uses_implicit_templates());
        assert!(ApiVersion::V2.uses_implicit_templates());
        assert!(!ApiVersion::V3.uses_implicit_templates());
    }
}
