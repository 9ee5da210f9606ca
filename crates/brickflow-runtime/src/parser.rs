//! Template expression parser.
//!
//! Walks the tags produced by the lexer with a recursive-descent grammar and
//! extracts every free variable reference into an arena-allocated
//! [`VariableGraph`]. Nodes reference their parents and children by index,
//! so the graph is a plain owned value with no interior mutability.
//!
//! Loop constructs get special treatment: `{% for x in @items %}` reports
//! `@items` but binds `x`, and references to `x` (or its dotted descendants)
//! inside the loop body are not free variables.

use crate::lexer::{lex_template, Tag, TagKind, Token, TokenKind};
use crate::templates::TemplateError;

/// How one path segment was written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Root name: `@foo` (stored with the sigil) or a bare `item`.
    Root(String),
    /// Dotted field access: `.bar`.
    Field(String),
    /// Numeric index, from `[0]` or `.0`.
    Index(u64),
    /// Bracketed string key: `['bar baz']`.
    Key(String),
}

/// Shape of the value a node is accessed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariableKind {
    /// Leaf access; no children.
    #[default]
    String,
    /// Accessed by field name.
    Object,
    /// Accessed by numeric index.
    List,
}

/// One node in the parsed variable graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub segment: Segment,
    pub kind: VariableKind,
    /// Arena index of the parent segment; `None` for top-level references.
    pub parent: Option<usize>,
    /// Arena indices of child segments.
    pub children: Vec<usize>,
    /// Byte offset of this segment's occurrence in the template.
    pub start: usize,
    /// Byte offset just past the last segment of the reference (kept up to
    /// date on root nodes as the path grows).
    pub end: usize,
}

/// Arena of variable nodes for one parsed template.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VariableGraph {
    nodes: Vec<Variable>,
    roots: Vec<usize>,
}

impl VariableGraph {
    /// Arena indices of parentless references, in first-appearance order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Access a node by arena index.
    pub fn node(&self, index: usize) -> &Variable {
        &self.nodes[index]
    }

    /// Normalized dot-path of the reference rooted at `root`.
    pub fn path_of(&self, root: usize) -> String {
        let mut path = String::new();
        let mut current = Some(root);
        while let Some(index) = current {
            let node = &self.nodes[index];
            match &node.segment {
                Segment::Root(name) => path.push_str(name),
                Segment::Field(name) => {
                    path.push('.');
                    path.push_str(name);
                }
                Segment::Index(n) => {
                    path.push('.');
                    path.push_str(&n.to_string());
                }
                Segment::Key(key) => {
                    if is_identifier(key) {
                        path.push('.');
                        path.push_str(key);
                    } else {
                        path.push_str("[\"");
                        path.push_str(&key.replace('"', "\\\""));
                        path.push_str("\"]");
                    }
                }
            }
            current = node.children.first().copied();
        }
        path
    }

    /// Normalized paths of all parentless references.
    pub fn root_paths(&self) -> Vec<String> {
        self.roots.iter().map(|&r| self.path_of(r)).collect()
    }

    fn add_root(&mut self, name: String, start: usize, end: usize) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Variable {
            segment: Segment::Root(name),
            kind: VariableKind::String,
            parent: None,
            children: Vec::new(),
            start,
            end,
        });
        self.roots.push(index);
        index
    }

    fn add_segment(&mut self, root: usize, parent: usize, segment: Segment, end: usize) -> usize {
        let index = self.nodes.len();
        let kind = match segment {
            Segment::Index(_) => VariableKind::List,
            _ => VariableKind::Object,
        };
        let start = self.nodes[parent].end;
        self.nodes.push(Variable {
            segment,
            kind: VariableKind::String,
            parent: Some(parent),
            children: Vec::new(),
            start,
            end,
        });
        self.nodes[parent].children.push(index);
        self.nodes[parent].kind = kind;
        self.nodes[root].end = end;
        index
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a template and return its variable graph.
pub fn parse_template(template: &str) -> Result<VariableGraph, TemplateError> {
    let tags = lex_template(template)?;
    let mut parser = TemplateParser::default();
    for tag in &tags {
        parser.parse_tag(tag)?;
    }
    if let Some(at) = parser.open_fors.last() {
        return Err(TemplateError::UnbalancedTag {
            at: *at,
            name: "for",
        });
    }
    if let Some(at) = parser.open_ifs.last() {
        return Err(TemplateError::UnbalancedTag { at: *at, name: "if" });
    }
    Ok(parser.graph)
}

/// Free variable paths referenced by a template, in first-appearance order.
///
/// Each textual occurrence is reported once; parsing is pure, so repeated
/// calls return identical lists.
pub fn parse_template_variables(template: &str) -> Result<Vec<String>, TemplateError> {
    Ok(parse_template(template)?.root_paths())
}

/// The variable reference covering `position`, if any.
///
/// Finds the parentless reference whose occurrence starts nearest before
/// (or at) `position` and spans it. Repeated identical names at different
/// offsets resolve to the occurrence at the queried offset, not the first
/// match.
pub fn variable_at_position(
    template: &str,
    position: usize,
) -> Result<Option<String>, TemplateError> {
    let graph = parse_template(template)?;
    let covering = graph
        .roots()
        .iter()
        .copied()
        .filter(|&root| graph.node(root).start <= position)
        .max_by_key(|&root| graph.node(root).start);
    Ok(covering.and_then(|root| {
        let node = graph.node(root);
        (position < node.end).then(|| graph.path_of(root))
    }))
}

#[derive(Default)]
struct TemplateParser {
    graph: VariableGraph,
    /// Stack of loop frames; each frame holds the loop target names.
    loop_frames: Vec<Vec<String>>,
    /// Byte offsets of unclosed `for` tags.
    open_fors: Vec<usize>,
    /// Byte offsets of unclosed `if` tags.
    open_ifs: Vec<usize>,
}

struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Tag end offset, for errors at end-of-tag.
    end: usize,
}

impl<'t> Cursor<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek2(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos + 1)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn error_here(&self) -> TemplateError {
        match self.peek() {
            Some(token) => TemplateError::UnexpectedToken {
                at: token.start,
                found: format!("{:?}", token.kind),
            },
            None => TemplateError::UnexpectedEnd(self.end),
        }
    }
}

impl TemplateParser {
    fn parse_tag(&mut self, tag: &Tag) -> Result<(), TemplateError> {
        let mut cur = Cursor {
            tokens: &tag.tokens,
            pos: 0,
            end: tag.end,
        };
        match tag.kind {
            TagKind::Print => {
                self.parse_expression(&mut cur)?;
                if !cur.at_end() {
                    return Err(cur.error_here());
                }
            }
            TagKind::Control => self.parse_control(&mut cur, tag.start)?,
        }
        Ok(())
    }

    fn parse_control(&mut self, cur: &mut Cursor<'_>, tag_start: usize) -> Result<(), TemplateError> {
        let Some(Token {
            kind: TokenKind::Ident(keyword),
            start,
            ..
        }) = cur.next()
        else {
            return Err(cur.error_here());
        };
        match keyword.as_str() {
            "if" => {
                self.parse_expression(cur)?;
                self.open_ifs.push(tag_start);
            }
            "elif" => {
                self.parse_expression(cur)?;
            }
            "else" => {}
            "endif" => {
                if self.open_ifs.pop().is_none() {
                    return Err(TemplateError::UnbalancedTag {
                        at: *start,
                        name: "endif",
                    });
                }
            }
            "for" => {
                let mut targets = Vec::new();
                loop {
                    match cur.next().map(|t| (&t.kind, t.start)) {
                        Some((TokenKind::Ident(name), _)) => targets.push(name.clone()),
                        _ => return Err(cur.error_here()),
                    }
                    match cur.peek().map(|t| &t.kind) {
                        Some(TokenKind::Comma) => {
                            cur.next();
                        }
                        _ => break,
                    }
                }
                match cur.next().map(|t| &t.kind) {
                    Some(TokenKind::Ident(kw)) if kw == "in" => {}
                    _ => return Err(cur.error_here()),
                }
                // The loop source is parsed in the enclosing scope, before
                // the targets come into effect.
                self.parse_expression(cur)?;
                self.loop_frames.push(targets);
                self.open_fors.push(tag_start);
            }
            "endfor" => {
                if self.loop_frames.pop().is_none() {
                    return Err(TemplateError::UnbalancedTag {
                        at: *start,
                        name: "endfor",
                    });
                }
                self.open_fors.pop();
            }
            other => {
                return Err(TemplateError::UnknownTag {
                    at: *start,
                    name: other.to_owned(),
                });
            }
        }
        if !cur.at_end() {
            return Err(cur.error_here());
        }
        Ok(())
    }

    fn is_loop_target(&self, name: &str) -> bool {
        self.loop_frames
            .iter()
            .any(|frame| frame.iter().any(|target| target == name))
    }

    // expr := and_expr ("or" and_expr)*
    fn parse_expression(&mut self, cur: &mut Cursor<'_>) -> Result<(), TemplateError> {
        self.parse_and(cur)?;
        while matches!(cur.peek().map(|t| &t.kind), Some(TokenKind::Ident(kw)) if kw == "or") {
            cur.next();
            self.parse_and(cur)?;
        }
        Ok(())
    }

    fn parse_and(&mut self, cur: &mut Cursor<'_>) -> Result<(), TemplateError> {
        self.parse_not(cur)?;
        while matches!(cur.peek().map(|t| &t.kind), Some(TokenKind::Ident(kw)) if kw == "and") {
            cur.next();
            self.parse_not(cur)?;
        }
        Ok(())
    }

    fn parse_not(&mut self, cur: &mut Cursor<'_>) -> Result<(), TemplateError> {
        if matches!(cur.peek().map(|t| &t.kind), Some(TokenKind::Ident(kw)) if kw == "not") {
            cur.next();
            return self.parse_not(cur);
        }
        self.parse_comparison(cur)
    }

    fn parse_comparison(&mut self, cur: &mut Cursor<'_>) -> Result<(), TemplateError> {
        self.parse_additive(cur)?;
        loop {
            let is_cmp = match cur.peek().map(|t| &t.kind) {
                Some(
                    TokenKind::Eq
                    | TokenKind::NotEq
                    | TokenKind::Lt
                    | TokenKind::Gt
                    | TokenKind::LtEq
                    | TokenKind::GtEq,
                ) => {
                    cur.next();
                    true
                }
                Some(TokenKind::Ident(kw)) if kw == "in" => {
                    cur.next();
                    true
                }
                Some(TokenKind::Ident(kw)) if kw == "not" => {
                    // `a not in b`
                    if matches!(cur.peek2().map(|t| &t.kind), Some(TokenKind::Ident(kw2)) if kw2 == "in")
                    {
                        cur.next();
                        cur.next();
                        true
                    } else {
                        false
                    }
                }
                _ => false,
            };
            if !is_cmp {
                return Ok(());
            }
            self.parse_additive(cur)?;
        }
    }

    fn parse_additive(&mut self, cur: &mut Cursor<'_>) -> Result<(), TemplateError> {
        self.parse_multiplicative(cur)?;
        while matches!(
            cur.peek().map(|t| &t.kind),
            Some(TokenKind::Plus | TokenKind::Minus | TokenKind::Tilde)
        ) {
            cur.next();
            self.parse_multiplicative(cur)?;
        }
        Ok(())
    }

    fn parse_multiplicative(&mut self, cur: &mut Cursor<'_>) -> Result<(), TemplateError> {
        self.parse_unary(cur)?;
        while matches!(
            cur.peek().map(|t| &t.kind),
            Some(TokenKind::Star | TokenKind::Slash | TokenKind::Percent)
        ) {
            cur.next();
            self.parse_unary(cur)?;
        }
        Ok(())
    }

    fn parse_unary(&mut self, cur: &mut Cursor<'_>) -> Result<(), TemplateError> {
        if matches!(
            cur.peek().map(|t| &t.kind),
            Some(TokenKind::Minus | TokenKind::Plus)
        ) {
            cur.next();
            return self.parse_unary(cur);
        }
        self.parse_filtered(cur)
    }

    // filtered := primary ("|" ident [call-args])*
    fn parse_filtered(&mut self, cur: &mut Cursor<'_>) -> Result<(), TemplateError> {
        self.parse_primary(cur)?;
        while matches!(cur.peek().map(|t| &t.kind), Some(TokenKind::Pipe)) {
            cur.next();
            match cur.next().map(|t| &t.kind) {
                Some(TokenKind::Ident(_)) => {}
                _ => return Err(cur.error_here()),
            }
            if matches!(cur.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
                self.parse_call_args(cur)?;
            }
        }
        Ok(())
    }

    fn parse_primary(&mut self, cur: &mut Cursor<'_>) -> Result<(), TemplateError> {
        let Some(token) = cur.peek() else {
            return Err(cur.error_here());
        };
        match &token.kind {
            TokenKind::Var(name) => {
                let name = name.clone();
                let (start, end) = (token.start, token.end);
                cur.next();
                let root = self
                    .graph
                    .add_root(format!("@{name}"), start, end);
                self.parse_path(cur, Some(root))?;
                if matches!(cur.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
                    self.parse_call_args(cur)?;
                }
                Ok(())
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                let (start, end) = (token.start, token.end);
                cur.next();
                // Keyword literals are not references.
                if matches!(name.as_str(), "true" | "false" | "none" | "null") {
                    return Ok(());
                }
                // Function call: the callee is not a reference, but its
                // arguments are scanned.
                if matches!(cur.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
                    return self.parse_call_args(cur);
                }
                // Loop targets (and their descendants) are bound, not free.
                let root = if self.is_loop_target(&name) {
                    None
                } else {
                    Some(self.graph.add_root(name, start, end))
                };
                self.parse_path(cur, root)
            }
            TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::Str(_) => {
                cur.next();
                Ok(())
            }
            TokenKind::LParen => {
                cur.next();
                self.parse_expression(cur)?;
                match cur.next().map(|t| &t.kind) {
                    Some(TokenKind::RParen) => Ok(()),
                    _ => Err(cur.error_here()),
                }
            }
            TokenKind::LBracket => {
                cur.next();
                if matches!(cur.peek().map(|t| &t.kind), Some(TokenKind::RBracket)) {
                    cur.next();
                    return Ok(());
                }
                loop {
                    self.parse_expression(cur)?;
                    match cur.next().map(|t| &t.kind) {
                        Some(TokenKind::Comma) => {}
                        Some(TokenKind::RBracket) => return Ok(()),
                        _ => return Err(cur.error_here()),
                    }
                }
            }
            _ => Err(cur.error_here()),
        }
    }

    /// Consume `.field`, `.0`, `[0]`, `['key']` and dynamic `[expr]`
    /// segments after a reference root. When `root` is `None` the reference
    /// is suppressed (loop target); segments are consumed but not recorded.
    fn parse_path(&mut self, cur: &mut Cursor<'_>, root: Option<usize>) -> Result<(), TemplateError> {
        let mut tail = root;
        loop {
            match cur.peek().map(|t| &t.kind) {
                Some(TokenKind::Dot) => {
                    cur.next();
                    let Some(token) = cur.next() else {
                        return Err(cur.error_here());
                    };
                    let segment = match &token.kind {
                        TokenKind::Ident(name) => Segment::Field(name.clone()),
                        TokenKind::Int(n) if *n >= 0 => Segment::Index(*n as u64),
                        _ => {
                            return Err(TemplateError::UnexpectedToken {
                                at: token.start,
                                found: format!("{:?}", token.kind),
                            })
                        }
                    };
                    if let (Some(root), Some(parent)) = (root, tail) {
                        tail = Some(self.graph.add_segment(root, parent, segment, token.end));
                    }
                }
                Some(TokenKind::LBracket) => {
                    cur.next();
                    let literal = match cur.peek().map(|t| (&t.kind, t.end)) {
                        Some((TokenKind::Int(n), _)) if *n >= 0 => Some(Segment::Index(*n as u64)),
                        Some((TokenKind::Str(key), _)) => Some(Segment::Key(key.clone())),
                        _ => None,
                    };
                    match literal {
                        Some(segment) => {
                            // Literal key: only the closing bracket may follow.
                            cur.next();
                            let Some(close) = cur.next() else {
                                return Err(cur.error_here());
                            };
                            if close.kind != TokenKind::RBracket {
                                return Err(TemplateError::UnexpectedToken {
                                    at: close.start,
                                    found: format!("{:?}", close.kind),
                                });
                            }
                            if let (Some(root), Some(parent)) = (root, tail) {
                                tail =
                                    Some(self.graph.add_segment(root, parent, segment, close.end));
                            }
                        }
                        None => {
                            // Dynamic key: scan it for references; the path
                            // cannot be extended past it.
                            self.parse_expression(cur)?;
                            match cur.next().map(|t| &t.kind) {
                                Some(TokenKind::RBracket) => {}
                                _ => return Err(cur.error_here()),
                            }
                            tail = None;
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Parse `( expr, name=expr, ... )`, scanning argument expressions.
    fn parse_call_args(&mut self, cur: &mut Cursor<'_>) -> Result<(), TemplateError> {
        match cur.next().map(|t| &t.kind) {
            Some(TokenKind::LParen) => {}
            _ => return Err(cur.error_here()),
        }
        if matches!(cur.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
            cur.next();
            return Ok(());
        }
        loop {
            // Keyword argument: `name=value`; the name is not a reference.
            if matches!(cur.peek().map(|t| &t.kind), Some(TokenKind::Ident(_)))
                && matches!(cur.peek2().map(|t| &t.kind), Some(TokenKind::Assign))
            {
                cur.next();
                cur.next();
            }
            self.parse_expression(cur)?;
            match cur.next().map(|t| &t.kind) {
                Some(TokenKind::Comma) => {}
                Some(TokenKind::RParen) => return Ok(()),
                _ => return Err(cur.error_here()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn vars(template: &str) -> Vec<String> {
        parse_template_variables(template).unwrap()
    }

    #[test]
    fn reports_variables_in_appearance_order() {
        assert_eq!(
            vars("a {{@variableA}} {{ @variableB }} template"),
            vec!["@variableA", "@variableB"],
        );
    }

    #[test]
    fn normalizes_bracket_index_to_dot_form() {
        assert_eq!(vars("Hello {{ @foo[0] }}"), vec!["@foo.0"]);
    }

    #[rstest]
    #[case("{{ @foo.bar.baz }}", "@foo.bar.baz")]
    #[case("{{ @foo['bar'] }}", "@foo.bar")]
    #[case("{{ @foo['bar baz'] }}", "@foo[\"bar baz\"]")]
    #[case("{{ @foo[\"bar baz\"] }}", "@foo[\"bar baz\"]")]
    #[case("{{ @foo.bar[2] }}", "@foo.bar.2")]
    #[case("{{ @foo.0 }}", "@foo.0")]
    fn normalizes_paths(#[case] template: &str, #[case] expected: &str) {
        assert_eq!(vars(template), vec![expected]);
    }

    #[test]
    fn loop_variable_is_not_free() {
        assert_eq!(
            vars("{% for x in @items %}{{ x.name }}{% endfor %}"),
            vec!["@items"],
        );
    }

    #[test]
    fn loop_body_references_enclosing_scope() {
        assert_eq!(
            vars("{% for x in @items %}{{ x }} {{ @prefix }} {{ other }}{% endfor %}"),
            vec!["@items", "@prefix", "other"],
        );
    }

    #[test]
    fn nested_loops_shadow_both_targets() {
        let template =
            "{% for a in @xs %}{% for b in a.items %}{{ b.id }}{{ @sep }}{% endfor %}{% endfor %}";
        assert_eq!(vars(template), vec!["@xs", "@sep"]);
    }

    #[test]
    fn loop_target_unbound_after_endfor() {
        assert_eq!(
            vars("{% for x in @items %}{% endfor %}{{ x }}"),
            vec!["@items", "x"],
        );
    }

    #[test]
    fn tuple_unpack_targets_are_bound() {
        assert_eq!(
            vars("{% for k, v in @entries %}{{ k }}={{ v }}{% endfor %}"),
            vec!["@entries"],
        );
    }

    #[test]
    fn filters_do_not_produce_references() {
        assert_eq!(
            vars("{{ @name | replace('a', @repl) | capitalize }}"),
            vec!["@name", "@repl"],
        );
    }

    #[test]
    fn function_callee_is_not_a_reference() {
        assert_eq!(vars("{{ range(@start, @stop) }}"), vec!["@start", "@stop"]);
    }

    #[test]
    fn keyword_call_args_are_scanned() {
        assert_eq!(
            vars("{{ @text | replace(old=@old, new='x') }}"),
            vec!["@text", "@old"],
        );
    }

    #[test]
    fn comparison_operands_both_scanned() {
        assert_eq!(
            vars("{% if @count > @limit and not @done %}over{% endif %}"),
            vec!["@count", "@limit", "@done"],
        );
    }

    #[test]
    fn bare_identifiers_reported_without_sigil() {
        assert_eq!(vars("{{ item }}"), vec!["item"]);
        assert_eq!(vars("{{ item.name }}"), vec!["item.name"]);
    }

    #[test]
    fn keyword_literals_are_not_references() {
        assert_eq!(vars("{% if @x == true or @y == none %}{% endif %}"), vec!["@x", "@y"]);
    }

    #[test]
    fn dynamic_bracket_key_is_scanned_not_pathed() {
        assert_eq!(vars("{{ @table[@key] }}"), vec!["@table", "@key"]);
    }

    #[test]
    fn duplicate_occurrences_are_both_reported() {
        assert_eq!(vars("{{ @a }} {{ @a }}"), vec!["@a", "@a"]);
    }

    #[test]
    fn parse_is_idempotent() {
        let template = "{% for x in @items %}{{ x.name }}{{ @sep }}{% endfor %}";
        assert_eq!(
            parse_template_variables(template).unwrap(),
            parse_template_variables(template).unwrap(),
        );
    }

    #[test]
    fn malformed_templates_error() {
        assert!(parse_template_variables("{{ @foo").is_err());
        assert!(parse_template_variables("{% endfor %}").is_err());
        assert!(parse_template_variables("{% for in @x %}").is_err());
        assert!(parse_template_variables("{% frob @x %}").is_err());
        assert!(parse_template_variables("{% if @x %}").is_err());
        assert!(parse_template_variables("{{ @a @b }}").is_err());
    }

    #[test]
    fn empty_and_plain_templates_have_no_variables() {
        assert_eq!(vars(""), Vec::<String>::new());
        assert_eq!(vars("no tags here"), Vec::<String>::new());
    }

    #[test]
    fn graph_tracks_parent_child_structure() {
        let graph = parse_template("{{ @foo.bar[0] }}").unwrap();
        assert_eq!(graph.roots().len(), 1);
        let root = graph.node(graph.roots()[0]);
        assert_eq!(root.segment, Segment::Root("@foo".into()));
        assert_eq!(root.kind, VariableKind::Object);
        assert!(root.parent.is_none());

        let bar = graph.node(root.children[0]);
        assert_eq!(bar.segment, Segment::Field("bar".into()));
        assert_eq!(bar.kind, VariableKind::List);

        let zero = graph.node(bar.children[0]);
        assert_eq!(zero.segment, Segment::Index(0));
        assert_eq!(zero.kind, VariableKind::String);
        assert!(zero.children.is_empty());
    }

    #[test]
    fn position_query_finds_covering_reference() {
        let template = "x {{ @alpha }} y {{ @beta.0 }}";
        //              0123456789012345678901234567
        let at = variable_at_position(template, 6).unwrap();
        assert_eq!(at.as_deref(), Some("@alpha"));
        let at = variable_at_position(template, 20).unwrap();
        assert_eq!(at.as_deref(), Some("@beta.0"));
    }

    #[test]
    fn position_query_disambiguates_repeated_names() {
        let template = "{{ @a }} {{ @a }}";
        // First occurrence starts at 3, second at 12.
        assert_eq!(variable_at_position(template, 3).unwrap().as_deref(), Some("@a"));
        assert_eq!(variable_at_position(template, 12).unwrap().as_deref(), Some("@a"));
        // Between the two references: the first has ended, so no cover.
        assert_eq!(variable_at_position(template, 8).unwrap(), None);
    }

    #[test]
    fn position_query_outside_any_reference_is_none() {
        let template = "hello {{ @name }}";
        assert_eq!(variable_at_position(template, 0).unwrap(), None);
        assert_eq!(variable_at_position(template, template.len()).unwrap(), None);
    }

    #[test]
    fn position_query_spans_whole_path() {
        let template = "{{ @foo.bar }}";
        // Offset of 'r' in "bar".
        assert_eq!(
            variable_at_position(template, 10).unwrap().as_deref(),
            Some("@foo.bar"),
        );
    }
}
