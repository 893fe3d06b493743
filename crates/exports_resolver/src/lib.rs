//! Implements the manifest exports/imports algebra.
//!
//! `clean_path` is a standard relative-path normalization, and the
//! wildcard substring matching in [`match_subpath_wildcard`] follows the
//! usual split-on-`*`/strip-prefix-then-suffix approach common exports
//! matchers use. One deliberate divergence from a typical exports
//! resolver: `"default"` is just another condition key here, not
//! special-cased to be checked last regardless of its position in the
//! caller's condition list — precedence is entirely the caller's ordered
//! `conditions` list.

use manifest::{ExportsValue, Manifest};

/// Ordered list of condition identifiers to try when descending a
/// conditional export/import map. Default is `["browser", "import", "default"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    pub conditions: Vec<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            conditions: vec![
                "browser".to_string(),
                "import".to_string(),
                "default".to_string(),
            ],
        }
    }
}

impl ResolveOptions {
    pub fn new(conditions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            conditions: conditions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Strips a leading `./` from a resolved target: entries are stored as a
/// relative path *without* a leading `./`.
fn clean_path(p: &str) -> String {
    p.strip_prefix("./").unwrap_or(p).to_string()
}

/// Recursively resolves a selected export/import value against the active
/// condition list. Subpath maps are not expected here —
/// they only ever appear at the top of an `exports`/`imports` tree.
fn resolve_value(value: &ExportsValue, conditions: &[String]) -> Option<String> {
    match value {
        ExportsValue::Path(p) => Some(clean_path(p)),
        ExportsValue::Null | ExportsValue::Invalid => None,
        ExportsValue::Fallback(items) => items.iter().find_map(|v| resolve_value(v, conditions)),
        ExportsValue::Conditional(map) => conditions
            .iter()
            .find_map(|cond| map.get(cond).map(|v| resolve_value(v, conditions)))
            .flatten(),
        // A nested subpath map has no business appearing under a condition;
        // malformed like any other bad shape: not exported, never a panic.
        ExportsValue::Subpaths(_) => None,
    }
}

fn top_level(value: &ExportsValue, subpath: &str, conditions: &[String]) -> Option<String> {
    match value {
        ExportsValue::Path(_) | ExportsValue::Conditional(_) | ExportsValue::Fallback(_) => {
            if subpath != "." {
                return None;
            }
            resolve_value(value, conditions)
        }
        ExportsValue::Null | ExportsValue::Invalid => None,
        ExportsValue::Subpaths(map) => map.get(subpath).and_then(|v| resolve_value(v, conditions)),
    }
}

/// Resolves `subpath` (`"."` or `"./..."`) against `manifest.exports` under
/// the active conditions. Returns `None` (the "not exported" sentinel) on
/// every failure mode — the resolver never panics on malformed input.
pub fn resolve_export(manifest: &Manifest, subpath: &str, options: &ResolveOptions) -> Option<String> {
    match &manifest.exports {
        None => {
            if subpath == "." {
                manifest.main.as_deref().map(clean_path)
            } else {
                None
            }
        }
        Some(value) => top_level(value, subpath, &options.conditions),
    }
}

/// Same algorithm, against `manifest.imports` — same shape, no `main` fallback.
/// `imports` has no `main` fallback — there is no legacy equivalent.
pub fn resolve_import(manifest: &Manifest, subpath: &str, options: &ResolveOptions) -> Option<String> {
    match &manifest.imports {
        None => None,
        Some(value) => top_level(value, subpath, &options.conditions),
    }
}

/// A literal (non-wildcard) export entry: `(subpath, target)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub subpath: String,
    pub target: String,
}

/// A wildcard export entry: `(pattern, target_prefix)`, where `pattern`
/// ends in `*` and `target_prefix` is the portion of the resolved target
/// before its own `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardExport {
    pub pattern: String,
    pub target_prefix: String,
}

/// Every non-wildcard subpath with its resolved target under the active
/// conditions, skipping subpaths that resolve to "not exported". Synthesizes
/// a single `(".", main)` entry if the manifest has no usable `exports` map
/// but does have `main`.
pub fn explicit_entries(manifest: &Manifest, options: &ResolveOptions) -> Vec<ExportEntry> {
    let mut entries = Vec::new();
    if let Some(ExportsValue::Subpaths(map)) = &manifest.exports {
        for (subpath, value) in map {
            if subpath.contains('*') {
                continue;
            }
            if let Some(target) = resolve_value(value, &options.conditions) {
                entries.push(ExportEntry {
                    subpath: subpath.clone(),
                    target,
                });
            }
        }
    } else if let Some(target) = resolve_export(manifest, ".", options) {
        entries.push(ExportEntry {
            subpath: ".".to_string(),
            target,
        });
    }

    if entries.is_empty() {
        if let Some(main) = &manifest.main {
            entries.push(ExportEntry {
                subpath: ".".to_string(),
                target: clean_path(main),
            });
        }
    }
    entries
}

/// Every wildcard subpath with its resolved target prefix (the text before
/// `*` in the resolved target).
pub fn wildcard_entries(manifest: &Manifest, options: &ResolveOptions) -> Vec<WildcardExport> {
    let Some(ExportsValue::Subpaths(map)) = &manifest.exports else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (pattern, value) in map {
        if !pattern.contains('*') {
            continue;
        }
        if let Some(target) = resolve_value(value, &options.conditions) {
            let prefix = target.split('*').next().unwrap_or(&target).to_string();
            out.push(WildcardExport {
                pattern: pattern.clone(),
                target_prefix: prefix,
            });
        }
    }
    out
}

/// A package is trailing-slash-capable if it has any wildcard export, or
/// has no `exports` mapping at all.
pub fn is_trailing_slash_capable(manifest: &Manifest, options: &ResolveOptions) -> bool {
    match &manifest.exports {
        None => true,
        Some(ExportsValue::Subpaths(_)) => !wildcard_entries(manifest, options).is_empty(),
        Some(_) => false,
    }
}

/// Matches a package-relative subpath against a wildcard export pattern,
/// returning the captured `*` text. Used for specifier-directed resolution
/// of a subpath that has no literal export entry but does match a wildcard
/// (a case `resolve_export` deliberately does not handle on its own —
/// wildcards are enumerated, not matched inline).
pub fn match_subpath_wildcard(pattern: &str, target_prefix: &str, subpath: &str) -> Option<String> {
    let (prefix, suffix) = pattern.split_once('*')?;
    let remainder = subpath.strip_prefix(prefix)?;
    let captured = if suffix.is_empty() {
        remainder
    } else {
        remainder.strip_suffix(suffix)?
    };
    Some(format!("{target_prefix}{captured}"))
}

/// Convenience used by a specifier-directed resolution path: try the literal
/// export, then fall back to a matching wildcard, before the caller falls
/// back to the literal subpath itself.
pub fn resolve_export_or_wildcard(
    manifest: &Manifest,
    subpath: &str,
    options: &ResolveOptions,
) -> Option<String> {
    if let Some(target) = resolve_export(manifest, subpath, options) {
        return Some(target);
    }
    for wildcard in wildcard_entries(manifest, options) {
        if let Some(resolved) =
            match_subpath_wildcard(&wildcard.pattern, &wildcard.target_prefix, subpath)
        {
            return Some(resolved);
        }
    }
    None
}
