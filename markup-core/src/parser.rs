//! Tokenizer and tag-tree builder.
//!
//! Parsing runs in two passes:
//!
//! 1. [`tokenize`] cuts the source into text runs and classified tags
//!    (openers, `else`, close markers). Tag bodies are split into subject
//!    and pipe chain here.
//! 2. [`match_closes`] pairs openers with their close tags, then
//!    [`Builder`] nests the matched ranges and splits `if` bodies at
//!    `else`, producing the [`Node`] tree.
//!
//! Tag body grammar: `subject ( '|' name ( '>' arg )* )*`. Subject and pipe
//! names are trimmed; arguments are kept verbatim. `\|`, `\>` and `\\`
//! escape the delimiters inside a body.

use std::collections::HashMap;
use std::iter::Peekable;
use std::mem;
use std::ops::Range;
use std::str::Chars;

use crate::error::ParseError;
use crate::template::{Node, PipeInvocation, Position, Subject, Tag};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const IF_CLOSE: &str = "if";

// ---------------------------------------------------------------------------
// Pass 1: tokens
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Token {
    Text(String),
    Open(Opener),
    Else(Position),
    Close { name: String, at: Position },
}

#[derive(Debug)]
struct Opener {
    tag: Tag,
    conditional: bool,
    /// `{{tag /}}` never opens a section.
    self_closing: bool,
}

/// Byte offset → line/column lookup.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { starts }
    }

    fn position(&self, source: &str, offset: usize) -> Position {
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line - 1];
        Position {
            line,
            column: source[start..offset].chars().count() + 1,
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let lines = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut rest = 0;

    while let Some(found) = source[rest..].find(OPEN) {
        let start = rest + found;
        if start > rest {
            tokens.push(Token::Text(source[rest..start].to_string()));
        }
        let at = lines.position(source, start);
        let body_start = start + OPEN.len();
        let end = source[body_start..]
            .find(CLOSE)
            .map(|i| body_start + i)
            .ok_or(ParseError::Unterminated { at })?;
        tokens.push(classify(&source[body_start..end], at)?);
        rest = end + CLOSE.len();
    }
    if rest < source.len() {
        tokens.push(Token::Text(source[rest..].to_string()));
    }
    Ok(tokens)
}

fn classify(body: &str, at: Position) -> Result<Token, ParseError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyTag { at });
    }
    if let Some(name) = trimmed.strip_prefix('/') {
        let name = name.trim();
        if name.is_empty() {
            return Err(ParseError::EmptyTag { at });
        }
        return Ok(Token::Close {
            name: name.to_string(),
            at,
        });
    }
    if trimmed == "else" {
        return Ok(Token::Else(at));
    }

    let (body, self_closing) = match body.strip_suffix('/') {
        Some(inner) => (inner, true),
        None => (body, false),
    };

    let mut segments = split_segments(body).into_iter();
    let head = segments.next().unwrap_or_default();
    if head.len() > 1 {
        return Err(ParseError::InvalidPath {
            path: body.trim().to_string(),
            at,
        });
    }
    let head = head.first().map(|s| s.trim()).unwrap_or_default();

    let (conditional, subject_text) = match head.strip_prefix("if") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
            (true, rest.trim())
        }
        _ => (false, head),
    };
    let subject = parse_subject(subject_text, at)?;

    let pipes = segments
        .map(|mut parts| {
            let name = parts.remove(0).trim().to_string();
            if name.is_empty() {
                return Err(ParseError::EmptyPipe {
                    tag: body.trim().to_string(),
                    at,
                });
            }
            Ok(PipeInvocation::new(name, parts))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Token::Open(Opener {
        tag: Tag { subject, pipes, at },
        conditional,
        self_closing,
    }))
}

/// Split a tag body on unescaped `|`, then each segment on unescaped `>`.
/// Always yields at least one segment holding at least one part.
fn split_segments(body: &str) -> Vec<Vec<String>> {
    let mut segments = Vec::new();
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars: Peekable<Chars<'_>> = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&next @ ('|' | '>' | '\\')) => {
                    current.push(next);
                    chars.next();
                }
                _ => current.push('\\'),
            },
            '|' => {
                parts.push(mem::take(&mut current));
                segments.push(mem::take(&mut parts));
            }
            '>' => parts.push(mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    segments.push(parts);
    segments
}

fn parse_subject(text: &str, at: Position) -> Result<Subject, ParseError> {
    match text {
        "" => Err(ParseError::EmptyTag { at }),
        "." => Ok(Subject::Current),
        "#" => Ok(Subject::Index),
        "##" => Ok(Subject::Ordinal),
        _ => {
            let segments: Vec<String> = text.split('.').map(|s| s.trim().to_string()).collect();
            let valid = segments.iter().all(|segment| {
                !segment.is_empty()
                    && !segment.contains(|c: char| c.is_whitespace() || matches!(c, '{' | '}' | '#'))
            });
            if valid {
                Ok(Subject::Path(segments))
            } else {
                Err(ParseError::InvalidPath {
                    path: text.to_string(),
                    at,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pass 2: tree
// ---------------------------------------------------------------------------

enum Item {
    Node(Node),
    Else(Position),
}

struct Builder<'t> {
    tokens: &'t [Token],
    /// Matching close index per opener token.
    closes: Vec<Option<usize>>,
}

impl Builder<'_> {
    /// Nodes of a body that must not contain a bare `else`.
    fn block(&self, range: Range<usize>) -> Result<Vec<Node>, ParseError> {
        self.items(range)?
            .into_iter()
            .map(|item| match item {
                Item::Node(node) => Ok(node),
                Item::Else(at) => Err(ParseError::StrayElse { at }),
            })
            .collect()
    }

    fn items(&self, range: Range<usize>) -> Result<Vec<Item>, ParseError> {
        let mut items = Vec::new();
        let mut i = range.start;

        while i < range.end {
            match &self.tokens[i] {
                Token::Text(text) => items.push(Item::Node(Node::Text(text.clone()))),
                Token::Else(at) => items.push(Item::Else(*at)),
                Token::Close { name, at } => {
                    return Err(ParseError::UnmatchedClose {
                        name: name.clone(),
                        at: *at,
                    })
                }
                Token::Open(opener) if opener.conditional => {
                    let close = self
                        .close_of(i, range.end)
                        .ok_or(ParseError::UnclosedIf { at: opener.tag.at })?;
                    let (then, otherwise) = split_else(self.items(i + 1..close)?)?;
                    items.push(Item::Node(Node::If {
                        tag: opener.tag.clone(),
                        then,
                        otherwise,
                    }));
                    i = close;
                }
                Token::Open(opener) => {
                    let close = match opener.tag.subject.section_name() {
                        Some(_) if !opener.self_closing => self.close_of(i, range.end),
                        _ => None,
                    };
                    match close {
                        Some(close) => {
                            let body = self.block(i + 1..close)?;
                            items.push(Item::Node(Node::Section {
                                tag: opener.tag.clone(),
                                body,
                            }));
                            i = close;
                        }
                        None => items.push(Item::Node(Node::Leaf(opener.tag.clone()))),
                    }
                }
            }
            i += 1;
        }
        Ok(items)
    }

    /// Close index for an opener, if it closes before `to`.
    fn close_of(&self, open: usize, to: usize) -> Option<usize> {
        self.closes[open].filter(|&close| close < to)
    }
}

/// Pairs every opener with its close tag in one pass.
///
/// A close pairs with the most recent unmatched opener of the same name;
/// `if` blocks share the `if` name, which no section can carry.
fn match_closes(tokens: &[Token]) -> Vec<Option<usize>> {
    let mut closes = vec![None; tokens.len()];
    let mut pending: HashMap<String, Vec<usize>> = HashMap::new();

    for (j, token) in tokens.iter().enumerate() {
        match token {
            Token::Open(o) if o.conditional => {
                pending.entry(IF_CLOSE.to_string()).or_default().push(j);
            }
            Token::Open(o) if !o.self_closing => {
                if let Some(name) = o.tag.subject.section_name() {
                    pending.entry(name).or_default().push(j);
                }
            }
            Token::Close { name, .. } => {
                if let Some(opener) = pending.get_mut(name).and_then(Vec::pop) {
                    closes[opener] = Some(j);
                }
            }
            _ => {}
        }
    }
    closes
}

fn split_else(items: Vec<Item>) -> Result<(Vec<Node>, Vec<Node>), ParseError> {
    let mut then = Vec::new();
    let mut otherwise = Vec::new();
    let mut seen_else = false;
    for item in items {
        match item {
            Item::Node(node) if seen_else => otherwise.push(node),
            Item::Node(node) => then.push(node),
            Item::Else(at) if seen_else => return Err(ParseError::DuplicateElse { at }),
            Item::Else(_) => seen_else = true,
        }
    }
    Ok((then, otherwise))
}

/// Parse a template source into its node list.
pub(crate) fn parse(source: &str) -> Result<Vec<Node>, ParseError> {
    let tokens = tokenize(source)?;
    let closes = match_closes(&tokens);
    Builder {
        tokens: &tokens,
        closes,
    }
    .block(0..tokens.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
