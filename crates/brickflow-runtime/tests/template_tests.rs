//! Template subsystem: parsing and rendering agree on variable semantics.

use rstest::rstest;
use serde_json::{json, Map, Value};

use brickflow_runtime::parser::{parse_template_variables, variable_at_position};
use brickflow_runtime::templates::TemplateRenderer;
use brickflow_runtime::Scope;
use brickflow_types::TemplateEngine;

#[rstest]
#[case("a {{@variableA}} {{ @variableB }} template")]
#[case("Hello {{ @foo[0] }}")]
#[case("{% for x in @items %}{{ x.name }}{% endfor %}")]
#[case("{% if @count > 3 %}{{ @count | round }}{% endif %}")]
#[case("no variables at all")]
#[case("")]
fn parsing_is_idempotent(#[case] template: &str) {
    let first = parse_template_variables(template).unwrap();
    let second = parse_template_variables(template).unwrap();
    assert_eq!(first, second);
}

#[test]
fn parsed_variables_are_sufficient_to_render() {
    // Every variable the parser reports, bound in the scope, makes the
    // template render fully.
    let template = "{{ @greeting }}, {{ @user.name }}!{% if @user.admin %} (admin){% endif %}";
    let variables = parse_template_variables(template).unwrap();
    assert_eq!(variables, vec!["@greeting", "@user.name", "@user.admin"]);

    let mut scope = Scope::new();
    scope.set("@greeting", json!("Welcome"));
    scope.set("@user", json!({"name": "Ada", "admin": true}));

    let renderer = TemplateRenderer::new();
    let rendered = renderer
        .render(TemplateEngine::Nunjucks, template, &scope.flatten())
        .unwrap();
    assert_eq!(rendered, "Welcome, Ada! (admin)");
}

#[test]
fn loop_templates_render_with_only_the_loop_source_bound() {
    let template = "{% for x in @items %}[{{ x.name }}]{% endfor %}";
    assert_eq!(parse_template_variables(template).unwrap(), vec!["@items"]);

    let mut scope = Scope::new();
    scope.set("@items", json!([{"name": "a"}, {"name": "b"}]));

    let renderer = TemplateRenderer::new();
    let rendered = renderer
        .render(TemplateEngine::Nunjucks, template, &scope.flatten())
        .unwrap();
    assert_eq!(rendered, "[a][b]");
}

#[test]
fn both_engines_resolve_the_same_variable_reference() {
    let mut context = Map::new();
    context.insert("@city".to_owned(), Value::String("Berlin".to_owned()));

    let renderer = TemplateRenderer::new();
    let nunjucks = renderer
        .render(TemplateEngine::Nunjucks, "in {{ @city }}", &context)
        .unwrap();
    let mustache = renderer
        .render(TemplateEngine::Mustache, "in {{ @city }}", &context)
        .unwrap();
    assert_eq!(nunjucks, "in Berlin");
    assert_eq!(mustache, "in Berlin");
}

#[test]
fn malformed_templates_fail_parsing_not_crash() {
    for template in ["{{ @a", "{% for %}", "{% endif %}", "{{ @a | }}"] {
        assert!(
            parse_template_variables(template).is_err(),
            "{template:?} should be uninterpretable",
        );
    }
}

#[test]
fn position_lookup_matches_reported_variables() {
    let template = "{{ @alpha }} and {{ @alpha.beta }}";
    let variables = parse_template_variables(template).unwrap();
    assert_eq!(variables, vec!["@alpha", "@alpha.beta"]);

    // Query inside the second occurrence resolves to the longer path.
    let offset = template.rfind("@alpha").unwrap();
    assert_eq!(
        variable_at_position(template, offset + 2).unwrap().as_deref(),
        Some("@alpha.beta"),
    );
}
