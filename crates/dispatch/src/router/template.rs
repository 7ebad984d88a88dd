//! Route templates: `/`-delimited segment sequences where a `{name}` segment captures the
//! corresponding path segment.

use crate::error::RouteError;
use crate::request::RouteValues;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// A parsed, normalized route template.
///
/// Normalization adds a leading `/`, collapses repeated separators and drops a trailing `/`
/// (the root template stays `/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    normalized: String,
    segments: Vec<Segment>,
}

impl RouteTemplate {
    pub fn parse(template: &str) -> Result<Self, RouteError> {
        let trimmed = template.strip_prefix('/').unwrap_or(template);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Ok(Self { normalized: "/".to_owned(), segments: Vec::new() });
        }

        let mut segments = Vec::new();
        for raw in trimmed.split('/') {
            segments.push(parse_segment(template, raw)?);
        }

        let mut names: Vec<&str> = Vec::new();
        for segment in &segments {
            if let Segment::Capture(name) = segment {
                if names.iter().any(|n| eq_ignore_case(n, name)) {
                    return Err(RouteError::DuplicatePlaceholder { template: template.to_owned(), name: name.clone() });
                }
                names.push(name);
            }
        }

        Ok(Self { normalized: format!("/{trimmed}"), segments })
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Number of `/`-separated parts, counting the empty part before the leading slash.
    pub fn segment_count(&self) -> usize {
        // "/" splits into ["", ""], "/a/b" into ["", "a", "b"]
        if self.segments.is_empty() { 2 } else { self.segments.len() + 1 }
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Capture(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Matches a path (query already stripped) against this template.
    ///
    /// Segment counts must be equal; literals compare case-insensitively, captures take the path
    /// segment verbatim.
    pub fn matches(&self, path: &str) -> Option<RouteValues> {
        let mut parts = path.split('/');
        // both sides start with the part before the first slash
        if !parts.next()?.is_empty() {
            return None;
        }

        let mut values = RouteValues::new();
        if self.segments.is_empty() {
            return match (parts.next(), parts.next()) {
                (Some(""), None) => Some(values),
                _ => None,
            };
        }

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if !eq_ignore_case(literal, part) {
                        return None;
                    }
                }
                Segment::Capture(name) => values.insert(name, part),
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(values)
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

fn parse_segment(template: &str, raw: &str) -> Result<Segment, RouteError> {
    if raw.is_empty() {
        return Err(RouteError::EmptySegment { template: template.to_owned() });
    }

    let opens = raw.matches('{').count();
    let closes = raw.matches('}').count();
    if opens == 0 && closes == 0 {
        return Ok(Segment::Literal(raw.to_owned()));
    }

    if opens != 1 || closes != 1 || !raw.starts_with('{') || !raw.ends_with('}') {
        return Err(RouteError::UnbalancedBraces { template: template.to_owned(), segment: raw.to_owned() });
    }

    let name = raw[1..raw.len() - 1].trim();
    if name.is_empty() {
        return Err(RouteError::EmptyPlaceholder { template: template.to_owned() });
    }
    Ok(Segment::Capture(name.to_owned()))
}

/// Compares two path texts ignoring case, non-ascii letters included (`Ärzte` equals `ärzte`).
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.chars().flat_map(char::to_lowercase).eq(b.chars().flat_map(char::to_lowercase))
}

/// Adds the leading `/`, collapses runs of `/` and trims the trailing one.
pub fn normalize(template: &str) -> String {
    let mut normalized = String::with_capacity(template.len() + 1);
    for part in template.split('/').filter(|part| !part.is_empty()) {
        normalized.push('/');
        normalized.push_str(part);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

/// Joins a controller base path and an action path into one normalized template.
pub fn compose(base: &str, relative: &str) -> String {
    normalize(&format!("{base}/{relative}"))
}
