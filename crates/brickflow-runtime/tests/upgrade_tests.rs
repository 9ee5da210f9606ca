//! Upgrade engine: v1/v2 configs rewritten into v3 expressions.

use async_trait::async_trait;
use serde_json::{json, Value};

use brickflow_runtime::brick::{Brick, BrickError, BrickInput, BrickKind};
use brickflow_runtime::engine::BrickContext;
use brickflow_runtime::eval::resolve_expression;
use brickflow_runtime::registry::{InMemoryRegistry, RegistryError};
use brickflow_runtime::templates::TemplateRenderer;
use brickflow_runtime::upgrade::{
    load_pipeline, upgrade_pipeline_to_v3, upgrade_pipeline_with, UpgradeError, UpgradeOverrides,
};
use brickflow_runtime::Scope;
use brickflow_types::{
    BrickConfig, Expression, InputSchema, RegistryId, TemplateEngine,
};

/// Brick stub carrying an arbitrary input schema.
struct SchemaBrick {
    id: RegistryId,
    schema: InputSchema,
}

impl SchemaBrick {
    fn new(id: &str, schema: InputSchema) -> Self {
        Self {
            id: RegistryId::new(id).unwrap(),
            schema,
        }
    }
}

#[async_trait]
impl Brick for SchemaBrick {
    fn id(&self) -> &RegistryId {
        &self.id
    }

    fn kind(&self) -> BrickKind {
        BrickKind::Transform
    }

    fn schema(&self) -> InputSchema {
        self.schema.clone()
    }

    async fn run(
        &self,
        _input: BrickInput,
        _ctx: &mut BrickContext<'_>,
    ) -> Result<Value, BrickError> {
        Ok(Value::Null)
    }
}

fn registry_with(bricks: Vec<SchemaBrick>) -> InMemoryRegistry {
    let mut registry = InMemoryRegistry::new();
    for brick in bricks {
        registry.register(brick);
    }
    registry
}

#[tokio::test]
async fn converts_bare_vars_and_templates() {
    let registry = registry_with(vec![SchemaBrick::new(
        "@test/echo",
        InputSchema::object()
            .property("message", InputSchema::string())
            .property("greeting", InputSchema::string()),
    )]);

    let pipeline = vec![BrickConfig::new(RegistryId::new("@test/echo").unwrap())
        .with_config("message", Expression::Literal(json!("@note")))
        .with_config("greeting", Expression::Literal(json!("Hello {{ @name }}")))];

    let upgraded = upgrade_pipeline_to_v3(&pipeline, &registry).await.unwrap();
    assert_eq!(
        upgraded[0].config.get("message"),
        Some(&Expression::Var("@note".into())),
    );
    assert_eq!(
        upgraded[0].config.get("greeting"),
        Some(&Expression::Template {
            engine: TemplateEngine::Mustache,
            template: "Hello {{ @name }}".into(),
        }),
    );
}

#[tokio::test]
async fn template_engine_field_selects_the_engine() {
    let registry = registry_with(vec![SchemaBrick::new(
        "@test/echo",
        InputSchema::object().property("message", InputSchema::string()),
    )]);

    let pipeline = vec![BrickConfig::new(RegistryId::new("@test/echo").unwrap())
        .with_template_engine(TemplateEngine::Nunjucks)
        .with_config("message", Expression::Literal(json!("{% if @x %}y{% endif %}")))];

    let upgraded = upgrade_pipeline_to_v3(&pipeline, &registry).await.unwrap();
    assert_eq!(
        upgraded[0].config.get("message"),
        Some(&Expression::Template {
            engine: TemplateEngine::Nunjucks,
            template: "{% if @x %}y{% endif %}".into(),
        }),
    );
}

#[tokio::test]
async fn selector_fields_are_never_converted() {
    let registry = registry_with(vec![SchemaBrick::new(
        "@test/click",
        InputSchema::object().property("selector", InputSchema::selector()),
    )]);

    // Looks like a variable reference, but the schema says selector.
    let pipeline = vec![BrickConfig::new(RegistryId::new("@test/click").unwrap())
        .with_config("selector", Expression::Literal(json!("@foo")))];

    let upgraded = upgrade_pipeline_to_v3(&pipeline, &registry).await.unwrap();
    assert_eq!(upgraded, pipeline);
}

#[tokio::test]
async fn additional_properties_selector_object_is_unchanged() {
    // The concrete scenario: {parent: {type: object, additionalProperties
    // {type: string, format: selector}}} with config {parent: {name:
    // "h1.name"}} upgrades to itself.
    let registry = registry_with(vec![SchemaBrick::new(
        "@test/reader",
        InputSchema::object().property(
            "parent",
            InputSchema::object().additional(InputSchema::selector()),
        ),
    )]);

    let pipeline = vec![BrickConfig::new(RegistryId::new("@test/reader").unwrap())
        .with_config("parent", Expression::Literal(json!({"name": "h1.name"})))];

    let upgraded = upgrade_pipeline_to_v3(&pipeline, &registry).await.unwrap();
    assert_eq!(upgraded, pipeline);
}

#[tokio::test]
async fn nested_objects_convert_member_by_member() {
    let registry = registry_with(vec![SchemaBrick::new(
        "@test/form",
        InputSchema::object().property(
            "fields",
            InputSchema::object()
                .property("label", InputSchema::string())
                .property("root", InputSchema::selector()),
        ),
    )]);

    let pipeline = vec![BrickConfig::new(RegistryId::new("@test/form").unwrap())
        .with_config(
            "fields",
            Expression::Literal(json!({"label": "@title", "root": "@title"})),
        )];

    let upgraded = upgrade_pipeline_to_v3(&pipeline, &registry).await.unwrap();
    assert_eq!(
        upgraded[0].config.get("fields"),
        Some(&Expression::Literal(json!({
            "label": {"__type__": "var", "__value__": "@title"},
            "root": "@title",
        }))),
    );
}

#[tokio::test]
async fn non_string_literals_are_untouched() {
    let registry = registry_with(vec![SchemaBrick::new(
        "@test/echo",
        InputSchema::object()
            .property("enabled", InputSchema::boolean())
            .property("count", InputSchema::of_type("number")),
    )]);

    let pipeline = vec![BrickConfig::new(RegistryId::new("@test/echo").unwrap())
        .with_config("enabled", Expression::Literal(json!(true)))
        .with_config("count", Expression::Literal(json!(3)))];

    let upgraded = upgrade_pipeline_to_v3(&pipeline, &registry).await.unwrap();
    assert_eq!(upgraded, pipeline);
}

#[tokio::test]
async fn condition_field_converts_with_the_step_engine() {
    let registry = registry_with(vec![SchemaBrick::new(
        "@test/echo",
        InputSchema::object(),
    )]);

    let bare = vec![BrickConfig::new(RegistryId::new("@test/echo").unwrap())
        .with_condition(Expression::Literal(json!("@flag")))];
    let upgraded = upgrade_pipeline_to_v3(&bare, &registry).await.unwrap();
    assert_eq!(upgraded[0].condition, Some(Expression::Var("@flag".into())));

    let templated = vec![BrickConfig::new(RegistryId::new("@test/echo").unwrap())
        .with_template_engine(TemplateEngine::Nunjucks)
        .with_condition(Expression::Literal(json!("{{ @a }}{{ @b }}")))];
    let upgraded = upgrade_pipeline_to_v3(&templated, &registry).await.unwrap();
    assert_eq!(
        upgraded[0].condition,
        Some(Expression::Template {
            engine: TemplateEngine::Nunjucks,
            template: "{{ @a }}{{ @b }}".into(),
        }),
    );
}

#[tokio::test]
async fn override_table_beats_schema_driven_conversion() {
    let registry = registry_with(vec![SchemaBrick::new(
        "@core/component-reader",
        InputSchema::object()
            .property("framework", InputSchema::string())
            .property("prop", InputSchema::string()),
    )]);

    let pipeline = vec![BrickConfig::new(
        RegistryId::new("@core/component-reader").unwrap(),
    )
    .with_config("framework", Expression::Literal(json!("@react")))
    .with_config("prop", Expression::Literal(json!("@react")))];

    let upgraded = upgrade_pipeline_to_v3(&pipeline, &registry).await.unwrap();
    // The override keeps the discriminator a plain string; the sibling
    // field with the same value still converts.
    assert_eq!(
        upgraded[0].config.get("framework"),
        Some(&Expression::Literal(json!("@react"))),
    );
    assert_eq!(
        upgraded[0].config.get("prop"),
        Some(&Expression::Var("@react".into())),
    );
}

#[tokio::test]
async fn caller_supplied_overrides_extend_the_table() {
    let registry = registry_with(vec![SchemaBrick::new(
        "@acme/widget",
        InputSchema::object().property("mode", InputSchema::string()),
    )]);

    let mut overrides = UpgradeOverrides::standard();
    overrides.skip_field(RegistryId::new("@acme/widget").unwrap(), "mode");

    let pipeline = vec![BrickConfig::new(RegistryId::new("@acme/widget").unwrap())
        .with_config("mode", Expression::Literal(json!("@auto")))];

    let upgraded = upgrade_pipeline_with(&pipeline, &registry, &overrides)
        .await
        .unwrap();
    assert_eq!(
        upgraded[0].config.get("mode"),
        Some(&Expression::Literal(json!("@auto"))),
    );
}

#[tokio::test]
async fn unknown_brick_fails_the_upgrade() {
    let registry = registry_with(vec![]);
    let pipeline = vec![BrickConfig::new(RegistryId::new("@test/ghost").unwrap())];

    let err = upgrade_pipeline_to_v3(&pipeline, &registry).await.unwrap_err();
    let UpgradeError::Registry(RegistryError::UnknownBrick(id)) = err else {
        panic!("expected unknown brick error, got {err}");
    };
    assert_eq!(id.as_str(), "@test/ghost");
}

#[tokio::test]
async fn nested_sub_pipelines_upgrade_recursively() {
    let registry = registry_with(vec![
        SchemaBrick::new(
            "@test/loop",
            InputSchema::object().property("body", InputSchema::pipeline()),
        ),
        SchemaBrick::new(
            "@test/echo",
            InputSchema::object().property("message", InputSchema::string()),
        ),
    ]);

    let inner = BrickConfig::new(RegistryId::new("@test/echo").unwrap())
        .with_config("message", Expression::Literal(json!("@element")));
    let pipeline = vec![BrickConfig::new(RegistryId::new("@test/loop").unwrap())
        .with_config("body", Expression::Pipeline(vec![inner]))];

    let upgraded = upgrade_pipeline_to_v3(&pipeline, &registry).await.unwrap();
    let Some(Expression::Pipeline(body)) = upgraded[0].config.get("body") else {
        panic!("body should remain a pipeline");
    };
    assert_eq!(
        body[0].config.get("message"),
        Some(&Expression::Var("@element".into())),
    );
}

#[tokio::test]
async fn round_trip_upgrade_matches_direct_substitution() {
    // For non-selector string fields, upgrading then resolving must equal
    // substituting the legacy strings directly.
    let registry = registry_with(vec![SchemaBrick::new(
        "@test/echo",
        InputSchema::object()
            .property("message", InputSchema::string())
            .property("greeting", InputSchema::string()),
    )]);

    let pipeline = vec![BrickConfig::new(RegistryId::new("@test/echo").unwrap())
        .with_config("message", Expression::Literal(json!("@note")))
        .with_config("greeting", Expression::Literal(json!("Hello {{ @name }}")))];
    let upgraded = upgrade_pipeline_to_v3(&pipeline, &registry).await.unwrap();

    let mut scope = Scope::new();
    scope.set("@note", json!("a reminder"));
    scope.set("@name", json!("Ada"));
    let renderer = TemplateRenderer::new();

    let message = resolve_expression(
        upgraded[0].config.get("message").unwrap(),
        &scope,
        &renderer,
    )
    .unwrap();
    assert_eq!(message, json!("a reminder"));

    let greeting = resolve_expression(
        upgraded[0].config.get("greeting").unwrap(),
        &scope,
        &renderer,
    )
    .unwrap();
    assert_eq!(greeting, json!("Hello Ada"));
}

#[tokio::test]
async fn load_pipeline_upgrades_v1_documents() {
    let registry = registry_with(vec![SchemaBrick::new(
        "@test/echo",
        InputSchema::object().property("message", InputSchema::string()),
    )]);

    let document = json!({
        "apiVersion": "v1",
        "kind": "extensionPoint",
        "metadata": {"id": "@acme/mod"},
        "definition": {
            "pipeline": [
                {"id": "@test/echo", "config": {"message": "@note"}},
            ],
        },
    });

    let pipeline = load_pipeline(&document, &registry).await.unwrap();
    assert_eq!(
        pipeline[0].config.get("message"),
        Some(&Expression::Var("@note".into())),
    );
}

#[tokio::test]
async fn load_pipeline_passes_v3_documents_through() {
    let registry = registry_with(vec![]);

    let document = json!({
        "apiVersion": "v3",
        "kind": "extensionPoint",
        "metadata": {"id": "@acme/mod"},
        "definition": {
            "pipeline": [
                // A v3 document may reference bricks the local registry
                // does not know; no upgrade means no lookup.
                {"id": "@remote/brick", "config": {"message": "@untouched"}},
            ],
        },
    });

    let pipeline = load_pipeline(&document, &registry).await.unwrap();
    assert_eq!(
        pipeline[0].config.get("message"),
        Some(&Expression::Literal(json!("@untouched"))),
    );
}

#[tokio::test]
async fn load_pipeline_rejects_malformed_documents() {
    let registry = registry_with(vec![]);

    let missing_version = json!({"definition": {"pipeline": []}});
    assert!(matches!(
        load_pipeline(&missing_version, &registry).await,
        Err(UpgradeError::Document(_)),
    ));

    let missing_pipeline = json!({"apiVersion": "v3", "definition": {}});
    assert!(matches!(
        load_pipeline(&missing_pipeline, &registry).await,
        Err(UpgradeError::Document(_)),
    ));

    let bad_version = json!({"apiVersion": "v9", "definition": {"pipeline": []}});
    assert!(matches!(
        load_pipeline(&bad_version, &registry).await,
        Err(UpgradeError::Document(_)),
    ));
}
