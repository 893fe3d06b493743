//! The recursive `exports`/`imports` value algebra.
//!
//! Modeled as a tagged variant: `String(path) | Conditional(ordered map) |
//! Subpaths(ordered map) | Fallback(sequence)`, plus two terminal markers:
//! `Null` (the subpath is declared but explicitly private, `"./x": null`)
//! and `Invalid` for anything the classifier can't make sense of (a mixed
//! subpath/condition map, a non-string fallback entry). `Invalid` is not a
//! parse error — the manifest still parses; resolution against an
//! `Invalid` node simply never succeeds, the same unrecognized-path
//! sentinel shape used by comparable `package.json` exports matchers.

use indexmap::IndexMap;
use serde::de::{Deserializer, Error as DeError};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExportsValue {
    #[default]
    Null,
    Path(String),
    /// Keys are condition identifiers (`"import"`, `"browser"`, ...). Order
    /// is whatever the manifest declared them in; it is irrelevant to
    /// resolution (the caller's condition list governs precedence) but is
    /// preserved for `explicit_entries`/serialization-adjacent uses.
    Conditional(IndexMap<String, ExportsValue>),
    /// Keys are subpaths (`"."`, `"./foo"`, `"./foo/*"`, `"./foo/"`).
    Subpaths(IndexMap<String, ExportsValue>),
    Fallback(Vec<ExportsValue>),
    Invalid,
}

impl<'de> Deserialize<'de> for ExportsValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawValue::deserialize(deserializer)?;
        Ok(ExportsValue::from(raw))
    }
}

/// Intermediate representation deserialized directly from JSON, before we
/// classify object keys as subpaths vs. conditions.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Null,
    Bool(bool),
    Str(String),
    Arr(Vec<RawValue>),
    Map(IndexMap<String, RawValue>),
}

impl From<RawValue> for ExportsValue {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Null => ExportsValue::Null,
            // `false` marks a subpath as explicitly blocked, same as `null`.
            RawValue::Bool(false) => ExportsValue::Null,
            RawValue::Bool(true) => ExportsValue::Invalid,
            RawValue::Str(s) => ExportsValue::Path(s),
            RawValue::Arr(items) => {
                ExportsValue::Fallback(items.into_iter().map(ExportsValue::from).collect())
            }
            RawValue::Map(map) => classify_map(map),
        }
    }
}

fn classify_map(map: IndexMap<String, RawValue>) -> ExportsValue {
    if map.is_empty() {
        // an empty conditional object never matches anything; treat it as
        // an (empty) conditional map rather than guessing subpaths.
        return ExportsValue::Conditional(IndexMap::new());
    }

    let subpath_keys = map.keys().filter(|k| k.starts_with('.')).count();
    let is_all_subpaths = subpath_keys == map.len();
    let is_all_conditions = subpath_keys == 0;

    if !is_all_subpaths && !is_all_conditions {
        return ExportsValue::Invalid;
    }

    let converted: IndexMap<String, ExportsValue> = map
        .into_iter()
        .map(|(k, v)| (k, ExportsValue::from(v)))
        .collect();

    if is_all_subpaths {
        ExportsValue::Subpaths(converted)
    } else {
        ExportsValue::Conditional(converted)
    }
}

impl ExportsValue {
    /// True for manifests that declared no usable `exports` field at all:
    /// absent, or a top-level value the classifier rejected.
    pub fn is_invalid(&self) -> bool {
        matches!(self, ExportsValue::Invalid)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(json: &str) -> ExportsValue {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn classifies_subpaths() {
        let v = parse(r#"{".": "./index.js", "./foo": "./foo.js"}"#);
        assert!(matches!(v, ExportsValue::Subpaths(_)));
    }

    #[test]
    fn classifies_conditions() {
        let v = parse(r#"{"import": "./index.mjs", "default": "./index.js"}"#);
        assert!(matches!(v, ExportsValue::Conditional(_)));
    }

    #[test]
    fn mixed_keys_are_invalid() {
        let v = parse(r#"{".": "./index.js", "import": "./index.mjs"}"#);
        assert!(v.is_invalid());
    }

    #[test]
    fn null_marks_private_subpath() {
        let v = parse(r#"{"./internal": null}"#);
        if let ExportsValue::Subpaths(map) = v {
            assert_eq!(map.get("./internal"), Some(&ExportsValue::Null));
        } else {
            panic!("expected subpaths");
        }
    }

    #[test]
    fn fallback_array_preserves_order() {
        let v = parse(r#"["./a.js", "./b.js"]"#);
        assert_eq!(
            v,
            ExportsValue::Fallback(vec![
                ExportsValue::Path("./a.js".into()),
                ExportsValue::Path("./b.js".into())
            ])
        );
    }
}
