//! Document renderer body traversal.
//!
//! A document brick stores its body as a literal JSON element tree, not a
//! uniform pipeline-typed property, so sub-pipelines (a button's `onClick`,
//! a pipeline element's `pipeline`, a list element's per-item `body`) have
//! to be located by walking the tree shape per element kind.

use tracing::warn;

use brickflow_types::{BrickConfig, ElementNode, Expression};

use super::PipelineVisitor;

/// Registry id of the document renderer brick whose body the walker
/// special-cases.
pub const DOCUMENT_BRICK_ID: &str = "@core/document";

/// Walk the element tree in a document brick's `body` config, descending
/// into every embedded sub-pipeline.
pub(crate) fn walk_body(block: &BrickConfig, block_path: &str, visitor: &mut dyn PipelineVisitor) {
    let Some(Expression::Literal(body)) = block.config.get("body") else {
        return;
    };
    let elements: Vec<ElementNode> = match serde_json::from_value(body.clone()) {
        Ok(elements) => elements,
        Err(err) => {
            warn!(brick = %block.id, error = %err, "unparseable document body; skipping traversal");
            return;
        }
    };
    for (index, element) in elements.iter().enumerate() {
        let element_path = format!("{block_path}.config.body.{index}");
        walk_element(element, &element_path, block, visitor);
    }
}

fn walk_element(
    element: &ElementNode,
    element_path: &str,
    owner: &BrickConfig,
    visitor: &mut dyn PipelineVisitor,
) {
    for property in element.pipeline_properties() {
        if let Some(Expression::Pipeline(sub)) = element.config.get(*property) {
            if visitor.enter_sub_pipeline(owner, property) {
                let sub_path = format!("{element_path}.config.{property}.__value__");
                super::walk(sub, &sub_path, owner.instance_id.as_ref(), visitor);
            }
        }
    }
    for (index, child) in element.children.iter().enumerate() {
        let child_path = format!("{element_path}.children.{index}");
        walk_element(child, &child_path, owner, visitor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::for_each_block;
    use brickflow_types::RegistryId;
    use serde_json::json;

    fn document_with_body(body: serde_json::Value) -> BrickConfig {
        BrickConfig::new(RegistryId::new(DOCUMENT_BRICK_ID).unwrap())
            .with_instance_id("doc-1")
            .with_config("body", Expression::Literal(body))
    }

    #[test]
    fn finds_pipeline_in_button_on_click() {
        let doc = document_with_body(json!([
            {
                "type": "container",
                "children": [
                    {
                        "type": "button",
                        "config": {
                            "title": "Run",
                            "onClick": {
                                "__type__": "pipeline",
                                "__value__": [{"id": "@test/click", "config": {}}],
                            },
                        },
                    },
                ],
            },
        ]));

        let mut seen = Vec::new();
        for_each_block(&[doc], |visit| {
            seen.push((visit.path.clone(), visit.block.id.as_str().to_owned()));
        });
        assert_eq!(
            seen,
            vec![
                ("0".to_owned(), DOCUMENT_BRICK_ID.to_owned()),
                (
                    "0.config.body.0.children.0.config.onClick.__value__.0".to_owned(),
                    "@test/click".to_owned(),
                ),
            ],
        );
    }

    #[test]
    fn finds_pipelines_in_pipeline_and_list_elements() {
        let doc = document_with_body(json!([
            {
                "type": "pipeline",
                "config": {
                    "pipeline": {
                        "__type__": "pipeline",
                        "__value__": [{"id": "@test/embedded", "config": {}}],
                    },
                },
            },
            {
                "type": "list",
                "config": {
                    "elements": {"__type__": "var", "__value__": "@rows"},
                    "body": {
                        "__type__": "pipeline",
                        "__value__": [{"id": "@test/row", "config": {}}],
                    },
                },
            },
        ]));

        let mut ids = Vec::new();
        for_each_block(&[doc], |visit| {
            ids.push(visit.block.id.as_str().to_owned());
        });
        assert_eq!(ids, vec![DOCUMENT_BRICK_ID, "@test/embedded", "@test/row"]);
    }

    #[test]
    fn parent_instance_id_is_the_document_brick() {
        let doc = document_with_body(json!([
            {
                "type": "button",
                "config": {
                    "onClick": {
                        "__type__": "pipeline",
                        "__value__": [{"id": "@test/click", "config": {}}],
                    },
                },
            },
        ]));

        let mut parents = Vec::new();
        for_each_block(&[doc], |visit| {
            parents.push(visit.parent_instance_id.map(|id| id.as_str().to_owned()));
        });
        assert_eq!(parents, vec![None, Some("doc-1".to_owned())]);
    }

    #[test]
    fn unparseable_body_is_skipped() {
        let doc = document_with_body(json!("not an element tree"));
        let mut count = 0;
        for_each_block(&[doc], |_| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn nested_document_bricks_recurse() {
        let inner_doc = json!({
            "id": DOCUMENT_BRICK_ID,
            "config": {
                "body": [{
                    "type": "button",
                    "config": {
                        "onClick": {
                            "__type__": "pipeline",
                            "__value__": [{"id": "@test/deep", "config": {}}],
                        },
                    },
                }],
            },
        });
        let doc = document_with_body(json!([
            {
                "type": "pipeline",
                "config": {
                    "pipeline": {"__type__": "pipeline", "__value__": [inner_doc]},
                },
            },
        ]));

        let mut ids = Vec::new();
        for_each_block(&[doc], |visit| {
            ids.push(visit.block.id.as_str().to_owned());
        });
        assert_eq!(
            ids,
            vec![DOCUMENT_BRICK_ID, DOCUMENT_BRICK_ID, "@test/deep"],
        );
    }
}
