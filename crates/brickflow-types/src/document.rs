//! Document renderer element trees.
//!
//! A document renderer brick stores a nested tree of UI elements in its
//! `body` config. Sub-pipelines are embedded inside element config at
//! positions that depend on the element kind (a button's `onClick`, a
//! pipeline element's `pipeline`, a list element's per-item `body`), so the
//! tree walker needs a typed view of the shape rather than a uniform
//! expression property.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::expression::Expression;

/// One element in a document renderer's body tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    /// Element kind: `container`, `row`, `column`, `card`, `text`, `image`,
    /// `button`, `pipeline`, `list`, ...
    #[serde(rename = "type")]
    pub element_type: String,

    /// Element configuration; values may be literals, templates, or
    /// embedded sub-pipelines depending on the element kind.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Expression>,

    /// Nested child elements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementNode>,
}

impl ElementNode {
    /// Create an element of the given kind with empty config.
    pub fn new(element_type: impl Into<String>) -> Self {
        Self {
            element_type: element_type.into(),
            config: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Set a config property.
    pub fn with_config(mut self, property: impl Into<String>, value: impl Into<Expression>) -> Self {
        self.config.insert(property.into(), value.into());
        self
    }

    /// Append a child element.
    pub fn with_child(mut self, child: ElementNode) -> Self {
        self.children.push(child);
        self
    }

    /// The config properties that hold a sub-pipeline for this element kind.
    ///
    /// Elements not listed here carry no pipelines of their own; their
    /// children may still.
    pub fn pipeline_properties(&self) -> &'static [&'static str] {
        match self.element_type.as_str() {
            "button" => &["onClick"],
            "pipeline" => &["pipeline"],
            "list" => &["body"],
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_nested_tree() {
        let tree: Vec<ElementNode> = serde_json::from_value(json!([
            {
                "type": "container",
                "children": [
                    {
                        "type": "button",
                        "config": {
                            "title": "Go",
                            "onClick": {"__type__": "pipeline", "__value__": []},
                        },
                    },
                ],
            },
        ]))
        .unwrap();

        assert_eq!(tree.len(), 1);
        let button = &tree[0].children[0];
        assert_eq!(button.element_type, "button");
        assert_eq!(button.pipeline_properties(), &["onClick"]);
        assert!(matches!(
            button.config.get("onClick"),
            Some(Expression::Pipeline(_))
        ));
    }

    #[test]
    fn plain_elements_have_no_pipeline_properties() {
        let text = ElementNode::new("text").with_config("text", "hello");
        assert!(text.pipeline_properties().is_empty());
    }
}
