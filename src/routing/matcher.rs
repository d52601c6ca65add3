//! Path pattern matching.
//!
//! # Responsibilities
//! - Compile path templates (`/`, `/goodbye`, `/{id:<regex>}`) at startup
//! - Match a concrete path segment by segment
//! - Extract named parameters
//!
//! # Design Decisions
//! - Literal segments match exactly (case-sensitive)
//! - Constrained segments use an anchored regex; the constraint must match
//!   the whole segment
//! - A bare `{name}` accepts any non-empty segment
//! - No trailing-slash folding: `/goodbye/` is not `/goodbye`

use regex::Regex;

/// Constraint for version 1-5 UUIDs with an RFC 4122 variant, lower-case.
pub const UUID_PATTERN: &str =
    "[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}";

/// Error produced while compiling a path template.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("route template '{template}' must start with '/'")]
    MissingLeadingSlash { template: String },
    #[error("route template '{template}' has a malformed segment '{segment}'")]
    MalformedSegment { template: String, segment: String },
    #[error("route template '{template}' repeats parameter '{name}'")]
    DuplicateParam { template: String, name: String },
    #[error("route template '{template}' has an invalid constraint: {source}")]
    InvalidConstraint {
        template: String,
        #[source]
        source: regex::Error,
    },
}

/// Parameters captured from a matched path, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    /// Value of the named parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param { name: String, constraint: Option<Regex> },
}

impl Segment {
    fn parse(template: &str, raw: &str) -> Result<Self, RouteError> {
        let Some(inner) = raw.strip_prefix('{') else {
            if raw.contains(['{', '}']) {
                return Err(malformed(template, raw));
            }
            return Ok(Segment::Literal(raw.to_string()));
        };
        let inner = inner
            .strip_suffix('}')
            .ok_or_else(|| malformed(template, raw))?;

        let (name, constraint) = match inner.split_once(':') {
            Some((name, pattern)) => (name, Some(pattern)),
            None => (inner, None),
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(malformed(template, raw));
        }

        let constraint = constraint
            .map(|pattern| {
                Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                    RouteError::InvalidConstraint {
                        template: template.to_string(),
                        source,
                    }
                })
            })
            .transpose()?;

        Ok(Segment::Param {
            name: name.to_string(),
            constraint,
        })
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Segment::Literal(literal) => literal == value,
            Segment::Param { constraint: Some(re), .. } => re.is_match(value),
            Segment::Param { constraint: None, .. } => !value.is_empty(),
        }
    }
}

fn malformed(template: &str, segment: &str) -> RouteError {
    RouteError::MalformedSegment {
        template: template.to_string(),
        segment: segment.to_string(),
    }
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a template. Constraint regexes may not contain `/`.
    pub fn parse(template: &str) -> Result<Self, RouteError> {
        let rest = template
            .strip_prefix('/')
            .ok_or_else(|| RouteError::MissingLeadingSlash {
                template: template.to_string(),
            })?;

        let segments = rest
            .split('/')
            .map(|raw| Segment::parse(template, raw))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = Vec::new();
        for segment in &segments {
            if let Segment::Param { name, .. } = segment {
                if seen.contains(&name) {
                    return Err(RouteError::DuplicateParam {
                        template: template.to_string(),
                        name: name.clone(),
                    });
                }
                seen.push(name);
            }
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Match a request path, returning captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let rest = path.strip_prefix('/')?;
        let mut values = rest.split('/');
        let mut params = Vec::new();

        for segment in &self.segments {
            let value = values.next()?;
            if !segment.matches(value) {
                return None;
            }
            if let Segment::Param { name, .. } = segment {
                params.push((name.clone(), value.to_string()));
            }
        }

        if values.next().is_some() {
            return None;
        }
        Some(PathParams(params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid_route() -> PathPattern {
        PathPattern::parse(&format!("/{{id:{UUID_PATTERN}}}")).unwrap()
    }

    #[test]
    fn root_matches_only_root() {
        let root = PathPattern::parse("/").unwrap();
        assert_eq!(root.matches("/"), Some(PathParams::default()));
        assert!(root.matches("/goodbye").is_none());
        assert!(root.matches("").is_none());
    }

    #[test]
    fn literal_match_is_exact() {
        let goodbye = PathPattern::parse("/goodbye").unwrap();
        assert!(goodbye.matches("/goodbye").is_some());
        assert!(goodbye.matches("/Goodbye").is_none());
        assert!(goodbye.matches("/goodbye/").is_none());
        assert!(goodbye.matches("/goodbye/now").is_none());
    }

    #[test]
    fn uuid_constraint_extracts_id() {
        let route = uuid_route();
        let params = route
            .matches("/3f2504e0-4f89-41d3-9a0c-0305e82c3301")
            .unwrap();
        assert_eq!(params.get("id"), Some("3f2504e0-4f89-41d3-9a0c-0305e82c3301"));
    }

    #[test]
    fn uuid_constraint_rejects_near_misses() {
        let route = uuid_route();
        for path in [
            "/not-a-uuid",
            // version digit outside 1-5
            "/3f2504e0-4f89-61d3-9a0c-0305e82c3301",
            // variant nibble outside 8,9,a,b
            "/3f2504e0-4f89-41d3-7a0c-0305e82c3301",
            // upper case
            "/3F2504E0-4F89-41D3-9A0C-0305E82C3301",
            // trailing garbage must not slip past the anchor
            "/3f2504e0-4f89-41d3-9a0c-0305e82c3301x",
            "/",
        ] {
            assert!(route.matches(path).is_none(), "{path} should not match");
        }
    }

    #[test]
    fn bare_param_needs_a_value() {
        let route = PathPattern::parse("/items/{name}").unwrap();
        assert_eq!(route.matches("/items/cup").unwrap().get("name"), Some("cup"));
        assert!(route.matches("/items/").is_none());
    }

    #[test]
    fn rejects_bad_templates() {
        assert!(matches!(
            PathPattern::parse("goodbye"),
            Err(RouteError::MissingLeadingSlash { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/{id"),
            Err(RouteError::MalformedSegment { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/a{id}"),
            Err(RouteError::MalformedSegment { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/{id:[}"),
            Err(RouteError::InvalidConstraint { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/{id}/{id}"),
            Err(RouteError::DuplicateParam { .. })
        ));
    }
}
