//! Template tag lexer.
//!
//! Scans a template string for `{{ ... }}` print tags and `{% ... %}`
//! control tags, tokenizing the contents of each tag with template-global
//! byte offsets so the parser can report where every variable occurrence
//! lives. Literal text between tags and `{# ... #}` comments are skipped.

use crate::templates::TemplateError;

/// A token inside a template tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare identifier or keyword (`if`, `for`, `in`, `and`, ...).
    Ident(String),
    /// `@`-prefixed variable root; the name is stored without the sigil.
    Var(String),
    Int(i64),
    Float(f64),
    Str(String),
    Dot,
    Comma,
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Assign,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Tilde,
}

/// A token plus its byte span in the full template string.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

/// The two tag syntaxes that reference variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `{{ expr }}`
    Print,
    /// `{% keyword ... %}`
    Control,
}

/// One lexed tag: its kind, tokens, and span.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub kind: TagKind,
    pub tokens: Vec<Token>,
    pub start: usize,
    pub end: usize,
}

/// Lex every tag in a template.
pub fn lex_template(template: &str) -> Result<Vec<Tag>, TemplateError> {
    let bytes = template.as_bytes();
    let mut tags = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' || i + 1 >= bytes.len() {
            i += 1;
            continue;
        }
        match bytes[i + 1] {
            b'#' => {
                // Comment: skip to the matching close.
                let Some(off) = find_bytes(&bytes[i + 2..], b"#}") else {
                    return Err(TemplateError::UnclosedTag(i));
                };
                i += 2 + off + 2;
            }
            b'{' => {
                let (tag, next) = lex_tag(template, i, TagKind::Print)?;
                tags.push(tag);
                i = next;
            }
            b'%' => {
                let (tag, next) = lex_tag(template, i, TagKind::Control)?;
                tags.push(tag);
                i = next;
            }
            _ => i += 1,
        }
    }

    Ok(tags)
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Lex a single tag starting at `start` (pointing at `{{` or `{%`).
/// Returns the tag and the offset just past its close delimiter.
fn lex_tag(template: &str, start: usize, kind: TagKind) -> Result<(Tag, usize), TemplateError> {
    let bytes = template.as_bytes();
    let close: &[u8] = match kind {
        TagKind::Print => b"}}",
        TagKind::Control => b"%}",
    };

    let mut i = start + 2;
    // Whitespace-trim marker after the open delimiter.
    if i < bytes.len() && bytes[i] == b'-' {
        i += 1;
    }

    let mut tokens = Vec::new();
    loop {
        // Skip whitespace.
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return Err(TemplateError::UnclosedTag(start));
        }
        // Close delimiter, with optional trim marker.
        if bytes[i..].starts_with(close) {
            i += 2;
            break;
        }
        if bytes[i] == b'-' && bytes[i + 1..].starts_with(close) {
            i += 3;
            break;
        }

        let token_start = i;
        let kind = match bytes[i] {
            b'@' => {
                let name_start = i + 1;
                let name_end = scan_ident(bytes, name_start);
                if name_end == name_start {
                    return Err(TemplateError::UnexpectedChar {
                        ch: char_at(template, i),
                        at: i,
                    });
                }
                i = name_end;
                TokenKind::Var(template[name_start..name_end].to_owned())
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let end = scan_ident(bytes, i);
                let ident = template[i..end].to_owned();
                i = end;
                TokenKind::Ident(ident)
            }
            b'0'..=b'9' => {
                let (kind, end) = scan_number(template, i)?;
                i = end;
                kind
            }
            b'\'' | b'"' => {
                let (text, end) = scan_string(template, i)?;
                i = end;
                TokenKind::Str(text)
            }
            b'.' => single(&mut i, TokenKind::Dot),
            b',' => single(&mut i, TokenKind::Comma),
            b'|' => single(&mut i, TokenKind::Pipe),
            b'(' => single(&mut i, TokenKind::LParen),
            b')' => single(&mut i, TokenKind::RParen),
            b'[' => single(&mut i, TokenKind::LBracket),
            b']' => single(&mut i, TokenKind::RBracket),
            b'+' => single(&mut i, TokenKind::Plus),
            b'-' => single(&mut i, TokenKind::Minus),
            b'*' => single(&mut i, TokenKind::Star),
            b'/' => single(&mut i, TokenKind::Slash),
            b'%' => single(&mut i, TokenKind::Percent),
            b'~' => single(&mut i, TokenKind::Tilde),
            b'=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                    TokenKind::Eq
                } else {
                    i += 1;
                    TokenKind::Assign
                }
            }
            b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                    TokenKind::NotEq
                } else {
                    return Err(TemplateError::UnexpectedChar {
                        ch: char_at(template, i),
                        at: i,
                    });
                }
            }
            b'<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                    TokenKind::LtEq
                } else {
                    i += 1;
                    TokenKind::Lt
                }
            }
            b'>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    i += 2;
                    TokenKind::GtEq
                } else {
                    i += 1;
                    TokenKind::Gt
                }
            }
            _ => {
                return Err(TemplateError::UnexpectedChar {
                    ch: char_at(template, i),
                    at: i,
                })
            }
        };
        tokens.push(Token {
            kind,
            start: token_start,
            end: i,
        });
    }

    Ok((
        Tag {
            kind,
            tokens,
            start,
            end: i,
        },
        i,
    ))
}

fn single(i: &mut usize, kind: TokenKind) -> TokenKind {
    *i += 1;
    kind
}

fn char_at(template: &str, at: usize) -> char {
    template[at..].chars().next().unwrap_or('\u{FFFD}')
}

fn scan_ident(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    i
}

fn scan_number(template: &str, start: usize) -> Result<(TokenKind, usize), TemplateError> {
    let bytes = template.as_bytes();
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut is_float = false;
    if i < bytes.len() && bytes[i] == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        is_float = true;
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    let text = &template[start..i];
    let kind = if is_float {
        TokenKind::Float(text.parse().map_err(|_| TemplateError::UnexpectedToken {
            at: start,
            found: text.to_owned(),
        })?)
    } else {
        TokenKind::Int(text.parse().map_err(|_| TemplateError::UnexpectedToken {
            at: start,
            found: text.to_owned(),
        })?)
    };
    Ok((kind, i))
}

fn scan_string(template: &str, start: usize) -> Result<(String, usize), TemplateError> {
    let bytes = template.as_bytes();
    let quote = bytes[start];
    let mut text = String::new();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => {
                text.push(bytes[i + 1] as char);
                i += 2;
            }
            b if b == quote => return Ok((text, i + 1)),
            _ => {
                let ch = char_at(template, i);
                text.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    Err(TemplateError::UnterminatedString(start))
}
