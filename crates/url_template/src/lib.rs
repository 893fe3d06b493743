//! Registry URL templates: patterns like
//! `https://esm.sh/{package}@{version}{path}` that a
//! [`registry_resolver`](../registry_resolver) `Provider` expands per
//! package. Parsing eagerly validates the variable set so a typo in a
//! provider's config surfaces at load time, not mid-resolve.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown template variable {{{0}}}")]
    UnknownVariable(String),
    #[error("unterminated variable placeholder in {0:?}")]
    Unterminated(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Var {
    Package,
    Name,
    Scope,
    Version,
    Path,
}

impl Var {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "package" => Some(Var::Package),
            "name" => Some(Var::Name),
            "scope" => Some(Var::Scope),
            "version" => Some(Var::Version),
            "path" => Some(Var::Path),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(Var),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    segments: Vec<Segment>,
}

impl UrlTemplate {
    pub fn parse(pattern: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = pattern;
        loop {
            match rest.find('{') {
                None => {
                    if !rest.is_empty() {
                        segments.push(Segment::Literal(rest.to_string()));
                    }
                    break;
                }
                Some(start) => {
                    if start > 0 {
                        segments.push(Segment::Literal(rest[..start].to_string()));
                    }
                    let after = &rest[start + 1..];
                    let end = after
                        .find('}')
                        .ok_or_else(|| TemplateError::Unterminated(pattern.to_string()))?;
                    let var_name = &after[..end];
                    let var = Var::parse(var_name)
                        .ok_or_else(|| TemplateError::UnknownVariable(var_name.to_string()))?;
                    segments.push(Segment::Var(var));
                    rest = &after[end + 1..];
                }
            }
        }
        Ok(Self { segments })
    }
}

/// The values a template may reference. Any field left `None` expands to
/// the empty string — missing values expand to empty strings rather than
/// failing expansion.
#[derive(Debug, Clone, Default)]
pub struct TemplateValues<'a> {
    pub package: Option<&'a str>,
    pub name: Option<&'a str>,
    pub scope: Option<&'a str>,
    pub version: Option<&'a str>,
    pub path: Option<&'a str>,
}

impl<'a> TemplateValues<'a> {
    /// Builds `name`/`scope` from a full package name: scoped names
    /// (`@scope/name`) split on the first `/`; unscoped names have an
    /// empty scope.
    pub fn from_package_name(package: &'a str) -> (Option<&'a str>, Option<&'a str>) {
        if let Some(rest) = package.strip_prefix('@') {
            if let Some((scope, name)) = rest.split_once('/') {
                return (Some(name), Some(scope));
            }
        }
        (Some(package), Some(""))
    }
}

pub fn expand(template: &UrlTemplate, values: &TemplateValues) -> String {
    let mut out = String::new();
    for segment in &template.segments {
        match segment {
            Segment::Literal(s) => out.push_str(s),
            Segment::Var(Var::Package) => out.push_str(values.package.unwrap_or("")),
            Segment::Var(Var::Name) => out.push_str(values.name.unwrap_or("")),
            Segment::Var(Var::Scope) => out.push_str(values.scope.unwrap_or("")),
            Segment::Var(Var::Version) => out.push_str(values.version.unwrap_or("")),
            Segment::Var(Var::Path) => out.push_str(values.path.unwrap_or("")),
        }
    }
    out
}
