//! Path pattern compilation and matching.
//!
//! A pattern is split on `/` into segments:
//!
//! | Segment            | Kind       | Matches                              |
//! |--------------------|------------|--------------------------------------|
//! | `users`            | literal    | exactly `users`                      |
//! | `:id` or `{id}`    | parameter  | one non-empty segment, bound to `id` |
//! | `*rest`/`{*rest}`  | wildcard   | every remaining segment (may be none)|
//!
//! A wildcard must be the last segment. One trailing slash is ignored on both
//! patterns and request paths, so `/users/` and `/users` are the same.
//!
//! # Precedence
//!
//! When several patterns match one path, the registry tries them in the order
//! given by [`CompiledPath::precedence`]: segments are compared left to right,
//! literal before parameter before wildcard. `/users/active` therefore wins
//! over `/users/:id`, which wins over `/users/*rest`.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::PatternError;

/// One compiled pattern segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
    Wildcard(String),
}

impl Segment {
    fn rank(&self) -> u8 {
        match self {
            Self::Literal(_) => 0,
            Self::Param(_) => 1,
            Self::Wildcard(_) => 2,
        }
    }
}

/// A parsed, matchable path pattern. Built once, read concurrently.
#[derive(Clone, Debug)]
pub struct CompiledPath {
    pattern: String,
    segments: Vec<Segment>,
}

impl CompiledPath {
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        if !pattern.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(pattern.to_owned()));
        }
        // `split` drops the edge slashes, so `//` would otherwise pass as `/`.
        if pattern.contains("//") {
            return Err(PatternError::EmptySegment(pattern.to_owned()));
        }

        let raw: Vec<&str> = split(pattern).collect();
        let mut segments = Vec::with_capacity(raw.len());

        for (i, seg) in raw.iter().enumerate() {
            if seg.is_empty() {
                return Err(PatternError::EmptySegment(pattern.to_owned()));
            }
            let segment = parse_segment(seg);
            if let Segment::Literal(lit) = &segment {
                if lit.contains(['{', '}']) {
                    return Err(PatternError::UnbalancedBrace {
                        pattern: pattern.to_owned(),
                        segment: lit.clone(),
                    });
                }
            }
            if let Segment::Param(name) | Segment::Wildcard(name) = &segment {
                if !is_identifier(name) {
                    return Err(PatternError::InvalidParamName {
                        pattern: pattern.to_owned(),
                        name: name.clone(),
                    });
                }
                let taken = segments.iter().any(|s: &Segment| {
                    matches!(s, Segment::Param(n) | Segment::Wildcard(n) if n == name)
                });
                if taken {
                    return Err(PatternError::DuplicateParam {
                        pattern: pattern.to_owned(),
                        name: name.clone(),
                    });
                }
            }
            if matches!(segment, Segment::Wildcard(_)) && i + 1 != raw.len() {
                return Err(PatternError::WildcardNotLast(pattern.to_owned()));
            }
            segments.push(segment);
        }

        Ok(Self { pattern: pattern.to_owned(), segments })
    }

    pub fn pattern(&self) -> &str { &self.pattern }
    pub fn segments(&self) -> &[Segment] { &self.segments }

    /// Tests `path` against this pattern and returns the captured parameters.
    ///
    /// Captured values are percent-decoded; a value that does not decode to
    /// UTF-8 is kept verbatim.
    pub fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = split(path).collect();
        let has_wildcard = matches!(self.segments.last(), Some(Segment::Wildcard(_)));

        let fixed = if has_wildcard { self.segments.len() - 1 } else { self.segments.len() };
        if parts.len() < fixed || (!has_wildcard && parts.len() != fixed) {
            return None;
        }

        let mut params = HashMap::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(lit) => {
                    if parts[i] != lit {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if parts[i].is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), decode(parts[i]));
                }
                Segment::Wildcard(name) => {
                    params.insert(name.clone(), decode(&parts[i..].join("/")));
                }
            }
        }
        Some(params)
    }

    /// Total order used to break ties between patterns matching one path.
    ///
    /// `Ordering::Less` means `self` is tried first.
    pub fn precedence(&self, other: &Self) -> Ordering {
        self.segments
            .iter()
            .map(Segment::rank)
            .cmp(other.segments.iter().map(Segment::rank))
    }

    /// Whether both patterns match exactly the same set of paths.
    ///
    /// Parameter names are irrelevant: `/users/:id` and `/users/{uid}` are
    /// the same shape.
    pub fn same_shape(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|pair| match pair {
                (Segment::Literal(a), Segment::Literal(b)) => a == b,
                (Segment::Param(_), Segment::Param(_)) => true,
                (Segment::Wildcard(_), Segment::Wildcard(_)) => true,
                _ => false,
            })
    }
}

/// Splits a path into segments, ignoring the leading slash and one trailing
/// slash. `/` yields no segments.
fn split(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    trimmed.split('/').filter({
        let root = trimmed.is_empty();
        move |_| !root
    })
}

fn parse_segment(seg: &str) -> Segment {
    if let Some(inner) = seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        return match inner.strip_prefix('*') {
            Some(name) => Segment::Wildcard(name.to_owned()),
            None => Segment::Param(inner.to_owned()),
        };
    }
    if let Some(name) = seg.strip_prefix(':') {
        return Segment::Param(name.to_owned());
    }
    if let Some(name) = seg.strip_prefix('*') {
        return Segment::Wildcard(name.to_owned());
    }
    Segment::Literal(seg.to_owned())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_owned(), |s| s.into_owned())
}
