//! Variable scope management.
//!
//! Scopes map `@`-prefixed variable names to JSON values, layered in
//! frames: an outer frame holds static context (reader output, mod
//! options), and each pipeline invocation pushes an inner frame that
//! collects `outputKey` bindings as steps complete. Lookup prefers the
//! innermost frame containing the name; a sub-pipeline gets a forked child
//! scope so its bindings never leak to sibling branches.

use std::collections::HashMap;

use serde_json::{Map, Value};

/// Variable bindings visible to a pipeline step.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// Stack of variable frames. Last element is the innermost scope.
    frames: Vec<HashMap<String, Value>>,
}

impl Scope {
    /// Create a new scope with one empty frame.
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    /// Create a scope seeded with context bindings.
    ///
    /// Names are stored as given; callers use the `@name` convention.
    pub fn with_context(context: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            frames: vec![context.into_iter().collect()],
        }
    }

    /// Push a new frame (entering a sub-pipeline or loop iteration).
    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Pop the innermost frame.
    ///
    /// Panics if attempting to pop the last frame.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        } else {
            panic!("cannot pop the root scope frame");
        }
    }

    /// Fork a child scope for a sub-pipeline invocation.
    ///
    /// The child sees every current binding but writes into its own frame;
    /// the parent is never affected.
    pub fn child(&self) -> Scope {
        let mut child = self.clone();
        child.push_frame();
        child
    }

    /// Bind a variable in the current (innermost) frame.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Get a variable by exact name, searching innermost to outermost.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Check whether a variable exists in any frame.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Resolve a dotted path like `@foo.bar.0` or `@foo["bar baz"].x`.
    ///
    /// The first segment names the variable; the rest walk object fields
    /// and array indices. Returns `None` anywhere the path fails to
    /// resolve — a missing path is not an error.
    pub fn resolve_path(&self, path: &str) -> Option<Value> {
        let (root, rest) = split_root(path);
        let mut current = self.get(root)?;
        for segment in PathSegments::new(rest) {
            current = match (&segment, current) {
                (PathSegment::Field(name), Value::Object(map)) => map.get(name.as_ref())?,
                (PathSegment::Field(name), Value::Array(items)) => {
                    let index: usize = name.parse().ok()?;
                    items.get(index)?
                }
                _ => return None,
            };
        }
        Some(current.clone())
    }

    /// Flatten every visible binding into one map, inner frames shadowing
    /// outer ones. Used as the template rendering context.
    pub fn flatten(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        for frame in &self.frames {
            for (name, value) in frame {
                merged.insert(name.clone(), value.clone());
            }
        }
        merged
    }
}

/// Split `@foo.bar["x"]` into the root name (`@foo`) and the remainder.
fn split_root(path: &str) -> (&str, &str) {
    let body_start = usize::from(path.starts_with('@'));
    match path[body_start..].find(['.', '[']) {
        Some(offset) => path.split_at(body_start + offset),
        None => (path, ""),
    }
}

enum PathSegment<'p> {
    Field(std::borrow::Cow<'p, str>),
    Invalid,
}

/// Iterator over `.field`, `.0`, and `["quoted key"]` path segments.
struct PathSegments<'p> {
    rest: &'p str,
}

impl<'p> PathSegments<'p> {
    fn new(rest: &'p str) -> Self {
        Self { rest }
    }
}

impl<'p> Iterator for PathSegments<'p> {
    type Item = PathSegment<'p>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        if let Some(stripped) = self.rest.strip_prefix('.') {
            let end = stripped.find(['.', '[']).unwrap_or(stripped.len());
            self.rest = &stripped[end..];
            return Some(PathSegment::Field(std::borrow::Cow::Borrowed(
                &stripped[..end],
            )));
        }
        if let Some(stripped) = self.rest.strip_prefix("[\"") {
            // Quoted key; unescape embedded quotes.
            let mut key = String::new();
            let mut chars = stripped.char_indices();
            while let Some((offset, ch)) = chars.next() {
                match ch {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            key.push(escaped);
                        }
                    }
                    '"' => {
                        let after = &stripped[offset + 1..];
                        let Some(after) = after.strip_prefix(']') else {
                            self.rest = "";
                            return Some(PathSegment::Invalid);
                        };
                        self.rest = after;
                        return Some(PathSegment::Field(std::borrow::Cow::Owned(key)));
                    }
                    _ => key.push(ch),
                }
            }
        }
        self.rest = "";
        Some(PathSegment::Invalid)
    }
}
