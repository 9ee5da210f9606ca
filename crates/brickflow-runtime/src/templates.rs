//! Template rendering for `nunjucks` and `mustache` expressions.
//!
//! Pipeline variables are written with an `@` sigil (`{{ @foo.bar }}`),
//! which neither engine accepts as an identifier. Before rendering, the
//! sigil is stripped from every variable occurrence and the context is
//! re-keyed without it, so `{{ @foo }}` looks up `foo`.

use minijinja::{Environment, UndefinedBehavior};
use serde_json::{Map, Value};
use thiserror::Error;

use brickflow_types::TemplateEngine;

use crate::parser::{parse_template, Segment};

/// Failure to lex, parse, validate, or render a template.
///
/// Callers doing static analysis treat any of these as "uninterpretable
/// template" and skip the analysis; at run time they abort the step as a
/// template error, distinguishable from brick-logic failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("unclosed tag at byte {0}")]
    UnclosedTag(usize),
    #[error("unterminated string at byte {0}")]
    UnterminatedString(usize),
    #[error("unexpected character {ch:?} at byte {at}")]
    UnexpectedChar { ch: char, at: usize },
    #[error("unexpected {found} at byte {at}")]
    UnexpectedToken { at: usize, found: String },
    #[error("unexpected end of tag at byte {0}")]
    UnexpectedEnd(usize),
    #[error("unknown tag {name:?} at byte {at}")]
    UnknownTag { at: usize, name: String },
    #[error("unbalanced {name:?} tag at byte {at}")]
    UnbalancedTag { at: usize, name: &'static str },
    #[error("{engine} render failed: {message}")]
    Render {
        engine: TemplateEngine,
        message: String,
    },
}

impl TemplateError {
    fn render(engine: TemplateEngine, err: impl ToString) -> Self {
        TemplateError::Render {
            engine,
            message: err.to_string(),
        }
    }
}

/// Renders template expressions against a variable context.
///
/// This is the standard implementation of the platform's template
/// capability; platform implementations delegate to it unless the host
/// provides its own sandboxed renderer.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Undefined variables render blank, matching the resolution rule
        // that a missing path yields null rather than an error.
        env.set_undefined_behavior(UndefinedBehavior::Lenient);
        Self { env }
    }

    /// Render `template` with the named engine against an `@`-keyed context.
    pub fn render(
        &self,
        engine: TemplateEngine,
        template: &str,
        context: &Map<String, Value>,
    ) -> Result<String, TemplateError> {
        let context = strip_context_sigils(context);
        match engine {
            TemplateEngine::Nunjucks => {
                let source = strip_jinja_sigils(template)?;
                let ctx = minijinja::value::Value::from_serialize(&context);
                self.env
                    .render_str(&source, ctx)
                    .map_err(|e| TemplateError::render(engine, e))
            }
            TemplateEngine::Mustache => {
                let source = strip_mustache_sigils(template);
                let compiled = mustache::compile_str(&source)
                    .map_err(|e| TemplateError::render(engine, e))?;
                let mut out = Vec::new();
                compiled
                    .render(&mut out, &context)
                    .map_err(|e| TemplateError::render(engine, e))?;
                String::from_utf8(out).map_err(|e| TemplateError::render(engine, e))
            }
        }
    }

    /// Check a template for syntax errors without rendering it.
    pub fn validate(&self, engine: TemplateEngine, template: &str) -> Result<(), TemplateError> {
        match engine {
            TemplateEngine::Nunjucks => {
                let source = strip_jinja_sigils(template)?;
                self.env
                    .template_from_str(&source)
                    .map(|_| ())
                    .map_err(|e| TemplateError::render(engine, e))
            }
            TemplateEngine::Mustache => {
                let source = strip_mustache_sigils(template);
                mustache::compile_str(&source)
                    .map(|_| ())
                    .map_err(|e| TemplateError::render(engine, e))
            }
        }
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-key a context map without the `@` sigil.
fn strip_context_sigils(context: &Map<String, Value>) -> Map<String, Value> {
    context
        .iter()
        .map(|(key, value)| {
            let key = key.strip_prefix('@').unwrap_or(key).to_owned();
            (key, value.clone())
        })
        .collect()
}

/// Remove the `@` sigil from every variable occurrence in a jinja-style
/// template, using the parsed variable graph for exact offsets.
fn strip_jinja_sigils(template: &str) -> Result<String, TemplateError> {
    let graph = parse_template(template)?;
    let mut sigil_offsets: Vec<usize> = graph
        .roots()
        .iter()
        .filter(|&&root| matches!(&graph.node(root).segment, Segment::Root(name) if name.starts_with('@')))
        .map(|&root| graph.node(root).start)
        .collect();
    sigil_offsets.sort_unstable();

    let mut out = String::with_capacity(template.len());
    let mut next = sigil_offsets.into_iter().peekable();
    for (offset, ch) in template.char_indices() {
        if next.peek() == Some(&offset) {
            next.next();
            continue;
        }
        out.push(ch);
    }
    Ok(out)
}

/// Remove the `@` sigil after mustache tag openers: `{{@x}}`, `{{#@x}}`,
/// `{{/@x}}`, `{{^@x}}`, `{{&@x}}`, `{{{@x}}}`.
fn strip_mustache_sigils(template: &str) -> String {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' && bytes.get(i + 1) == Some(&b'{') {
            let tag_start = i;
            i += 2;
            if bytes.get(i) == Some(&b'{') {
                i += 1;
            }
            if matches!(bytes.get(i), Some(b'#' | b'/' | b'^' | b'&' | b'>')) {
                i += 1;
            }
            while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
                i += 1;
            }
            out.push_str(&template[tag_start..i]);
            if bytes.get(i) == Some(&b'@') {
                i += 1;
            }
            continue;
        }
        let ch = template[i..].chars().next().unwrap_or('\u{FFFD}');
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn renders_nunjucks_variable() {
        let renderer = TemplateRenderer::new();
        let ctx = context(&[("@name", json!("Ada"))]);
        let out = renderer
            .render(TemplateEngine::Nunjucks, "Hello {{ @name }}!", &ctx)
            .unwrap();
        assert_eq!(out, "Hello Ada!");
    }

    #[test]
    fn renders_nunjucks_nested_path() {
        let renderer = TemplateRenderer::new();
        let ctx = context(&[("@user", json!({"address": {"city": "Berlin"}}))]);
        let out = renderer
            .render(TemplateEngine::Nunjucks, "{{ @user.address.city }}", &ctx)
            .unwrap();
        assert_eq!(out, "Berlin");
    }

    #[test]
    fn renders_nunjucks_control_flow() {
        let renderer = TemplateRenderer::new();
        let ctx = context(&[("@items", json!(["a", "b"]))]);
        let out = renderer
            .render(
                TemplateEngine::Nunjucks,
                "{% for x in @items %}{{ x }};{% endfor %}",
                &ctx,
            )
            .unwrap();
        assert_eq!(out, "a;b;");
    }

    #[test]
    fn undefined_nunjucks_variable_renders_blank() {
        let renderer = TemplateRenderer::new();
        let out = renderer
            .render(TemplateEngine::Nunjucks, "[{{ @missing }}]", &Map::new())
            .unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn renders_mustache_variable() {
        let renderer = TemplateRenderer::new();
        let ctx = context(&[("@greeting", json!("hi"))]);
        let out = renderer
            .render(TemplateEngine::Mustache, "{{ @greeting }} there", &ctx)
            .unwrap();
        assert_eq!(out, "hi there");
    }

    #[test]
    fn renders_mustache_section_with_sigil() {
        let renderer = TemplateRenderer::new();
        let ctx = context(&[("@show", json!(true)), ("@name", json!("x"))]);
        let out = renderer
            .render(
                TemplateEngine::Mustache,
                "{{#@show}}yes {{ @name }}{{/@show}}",
                &ctx,
            )
            .unwrap();
        assert_eq!(out, "yes x");
    }

    #[test]
    fn invalid_nunjucks_template_fails_to_render() {
        let renderer = TemplateRenderer::new();
        assert!(renderer
            .render(TemplateEngine::Nunjucks, "{% if %}", &Map::new())
            .is_err());
    }

    #[test]
    fn validate_accepts_good_and_rejects_bad() {
        let renderer = TemplateRenderer::new();
        assert!(renderer
            .validate(TemplateEngine::Nunjucks, "{{ @a }}{% if @b %}x{% endif %}")
            .is_ok());
        assert!(renderer
            .validate(TemplateEngine::Nunjucks, "{% endif %}")
            .is_err());
        assert!(renderer.validate(TemplateEngine::Mustache, "{{ @a }}").is_ok());
        assert!(renderer
            .validate(TemplateEngine::Mustache, "{{#@a}}unclosed")
            .is_err());
    }

    #[test]
    fn strip_jinja_keeps_loop_locals_untouched() {
        let source =
            strip_jinja_sigils("{% for x in @items %}{{ x.name }}{% endfor %}").unwrap();
        assert_eq!(source, "{% for x in items %}{{ x.name }}{% endfor %}");
    }

    #[test]
    fn strip_mustache_handles_triple_and_section_tags() {
        assert_eq!(strip_mustache_sigils("{{{@raw}}}"), "{{{raw}}}");
        assert_eq!(strip_mustache_sigils("{{# @a }}x{{/ @a }}"), "{{# a }}x{{/ a }}");
        assert_eq!(strip_mustache_sigils("plain {{ text }}"), "plain {{ text }}");
    }
}
