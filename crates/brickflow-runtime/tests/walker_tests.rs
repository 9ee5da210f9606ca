//! Traversal properties: completeness, path validity, ordering.

use brickflow_runtime::walker::{for_each_block, traverse_pipeline, BlockVisit, PipelineVisitor};
use brickflow_testutil::resolve_json_path;
use brickflow_types::{BrickConfig, Expression, RegistryId};
use serde_json::json;

fn step(name: &str) -> BrickConfig {
    BrickConfig::new(RegistryId::from_parts("test", name)).with_instance_id(format!("i-{name}"))
}

#[test]
fn visits_exactly_n_plus_m_blocks() {
    // N = 3 top-level bricks, M = 2 nested in the middle one.
    let pipeline = vec![
        step("a"),
        step("loop").with_config(
            "body",
            Expression::Pipeline(vec![step("inner-a"), step("inner-b")]),
        ),
        step("c"),
    ];

    let mut count = 0;
    for_each_block(&pipeline, |_| count += 1);
    assert_eq!(count, 5);
}

#[test]
fn every_path_resolves_to_the_visited_block() {
    let pipeline = vec![
        step("first"),
        step("branch")
            .with_config("if", Expression::Pipeline(vec![step("then")]))
            .with_config(
                "else",
                Expression::Pipeline(vec![step("otherwise"), step("after")]),
            ),
    ];
    let root_json = serde_json::to_value(&pipeline).unwrap();

    let mut checked = 0;
    for_each_block(&pipeline, |visit| {
        let found = resolve_json_path(&root_json, &visit.path)
            .unwrap_or_else(|| panic!("path {} did not resolve", visit.path));
        assert_eq!(found, &serde_json::to_value(visit.block).unwrap());
        checked += 1;
    });
    assert_eq!(checked, 5);
}

#[test]
fn document_paths_resolve_through_the_serialized_tree() {
    let doc = BrickConfig::new(RegistryId::new("@core/document").unwrap())
        .with_instance_id("doc")
        .with_config(
            "body",
            Expression::Literal(json!([
                {
                    "type": "container",
                    "children": [
                        {
                            "type": "button",
                            "config": {
                                "onClick": {
                                    "__type__": "pipeline",
                                    "__value__": [
                                        {"id": "@test/click", "config": {"message": "hi"}},
                                    ],
                                },
                            },
                        },
                    ],
                },
            ])),
        );
    let pipeline = vec![doc];
    let root_json = serde_json::to_value(&pipeline).unwrap();

    let mut paths = Vec::new();
    for_each_block(&pipeline, |visit| {
        let found = resolve_json_path(&root_json, &visit.path)
            .unwrap_or_else(|| panic!("path {} did not resolve", visit.path));
        assert_eq!(found, &serde_json::to_value(visit.block).unwrap());
        paths.push(visit.path.clone());
    });
    assert_eq!(
        paths,
        vec![
            "0".to_owned(),
            "0.config.body.0.children.0.config.onClick.__value__.0".to_owned(),
        ],
    );
}

#[test]
fn pipeline_path_locates_the_containing_pipeline() {
    let pipeline = vec![step("loop").with_config(
        "body",
        Expression::Pipeline(vec![step("inner")]),
    )];

    let mut seen = Vec::new();
    for_each_block(&pipeline, |visit| {
        seen.push((visit.block.id.name().to_owned(), visit.pipeline_path.clone()));
    });
    assert_eq!(
        seen,
        vec![
            ("loop".to_owned(), String::new()),
            ("inner".to_owned(), "0.config.body.__value__".to_owned()),
        ],
    );
}

#[test]
fn skipping_a_branch_skips_its_nested_pipelines_too() {
    // The skipped branch itself contains a sub-pipeline; none of it is
    // visited.
    let nested = step("deep").with_config("body", Expression::Pipeline(vec![step("deeper")]));
    let pipeline = vec![step("branch")
        .with_config("if", Expression::Pipeline(vec![nested]))
        .with_config("else", Expression::Pipeline(vec![step("other")]))];

    let mut visited = Vec::new();
    struct Collect<'c>(&'c mut Vec<String>);
    impl PipelineVisitor for Collect<'_> {
        fn visit_block(&mut self, visit: &BlockVisit<'_>) {
            self.0.push(visit.block.id.name().to_owned());
        }
        fn enter_sub_pipeline(&mut self, _parent: &BrickConfig, property: &str) -> bool {
            property != "if"
        }
    }
    traverse_pipeline(&pipeline, &mut Collect(&mut visited));
    assert_eq!(visited, vec!["branch", "other"]);
}

#[test]
fn input_is_not_mutated_by_traversal() {
    let pipeline = vec![step("loop").with_config(
        "body",
        Expression::Pipeline(vec![step("inner")]),
    )];
    let before = serde_json::to_value(&pipeline).unwrap();
    for_each_block(&pipeline, |_| {});
    assert_eq!(serde_json::to_value(&pipeline).unwrap(), before);
}
