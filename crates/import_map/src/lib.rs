//! The import-map wire model and its operations: `merge`, `clone`,
//! `simplify`, `serialize`. `ImportMap` itself is a thin
//! `IndexMap`-backed struct — insertion order is preserved for callers that
//! care about it, but [`serialize`] always emits keys in sorted order so
//! two structurally equal maps always produce byte-identical output.

use indexmap::IndexMap;

pub type SpecifierMap = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportMap {
    pub imports: SpecifierMap,
    pub scopes: IndexMap<String, SpecifierMap>,
    pub integrity: SpecifierMap,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep merge: `overlay` wins on key collision, scopes merge per-scope.
    /// Neither input is mutated.
    pub fn merge(base: &ImportMap, overlay: &ImportMap) -> ImportMap {
        let mut imports = base.imports.clone();
        for (k, v) in &overlay.imports {
            imports.insert(k.clone(), v.clone());
        }

        let mut scopes = base.scopes.clone();
        for (scope_key, overlay_map) in &overlay.scopes {
            let entry = scopes.entry(scope_key.clone()).or_default();
            for (k, v) in overlay_map {
                entry.insert(k.clone(), v.clone());
            }
        }

        let mut integrity = base.integrity.clone();
        for (k, v) in &overlay.integrity {
            integrity.insert(k.clone(), v.clone());
        }

        let mut merged = ImportMap {
            imports,
            scopes,
            integrity,
        };
        merged.drop_empty_scopes();
        merged
    }

    fn drop_empty_scopes(&mut self) {
        self.scopes.retain(|_, m| !m.is_empty());
    }

    /// Removes any non-slash key subsumed by a trailing-slash key in the
    /// same map (the "trailing-slash subsumption" rule), applied
    /// independently to `imports` and to each scope's map. Idempotent:
    /// running it again on an already-simplified map is a no-op.
    pub fn simplify(&mut self) {
        simplify_map(&mut self.imports);
        for (_, map) in self.scopes.iter_mut() {
            simplify_map(map);
        }
        self.drop_empty_scopes();
    }

    /// Deterministic JSON with stable (lexicographic) key ordering at every
    /// level, so two structurally equal maps always serialize identically
    /// regardless of insertion order.
    pub fn serialize(&self) -> String {
        serde_json::to_string_pretty(&self.to_sorted_value()).expect("ImportMap is always valid JSON")
    }

    fn to_sorted_value(&self) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        if !self.imports.is_empty() {
            root.insert("imports".to_string(), sorted_object(&self.imports));
        }
        if !self.scopes.is_empty() {
            let mut scopes_obj = serde_json::Map::new();
            let mut keys: Vec<&String> = self.scopes.keys().collect();
            keys.sort();
            for key in keys {
                scopes_obj.insert(key.clone(), sorted_object(&self.scopes[key]));
            }
            root.insert("scopes".to_string(), serde_json::Value::Object(scopes_obj));
        }
        if !self.integrity.is_empty() {
            root.insert("integrity".to_string(), sorted_object(&self.integrity));
        }
        serde_json::Value::Object(root)
    }
}

fn sorted_object(map: &SpecifierMap) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    for key in keys {
        obj.insert(key.clone(), serde_json::Value::String(map[key].clone()));
    }
    serde_json::Value::Object(obj)
}

fn simplify_map(map: &mut SpecifierMap) {
    let slash_keys: Vec<String> = map
        .keys()
        .filter(|k| k.ends_with('/'))
        .cloned()
        .collect();
    if slash_keys.is_empty() {
        return;
    }
    map.retain(|k, _| {
        if k.ends_with('/') {
            return true;
        }
        !slash_keys.iter().any(|t| k.starts_with(t.as_str()))
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(pairs: &[(&str, &str)]) -> SpecifierMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn merge_overlay_wins_on_collision() {
        let base = ImportMap {
            imports: map(&[("lit", "/a.js")]),
            ..Default::default()
        };
        let overlay = ImportMap {
            imports: map(&[("lit", "/b.js")]),
            ..Default::default()
        };
        let merged = ImportMap::merge(&base, &overlay);
        assert_eq!(merged.imports.get("lit"), Some(&"/b.js".to_string()));
    }

    #[test]
    fn merge_scopes_per_scope() {
        let base = ImportMap {
            scopes: [("/a/".to_string(), map(&[("x", "/a/x.js")]))].into_iter().collect(),
            ..Default::default()
        };
        let overlay = ImportMap {
            scopes: [("/a/".to_string(), map(&[("y", "/a/y.js")]))].into_iter().collect(),
            ..Default::default()
        };
        let merged = ImportMap::merge(&base, &overlay);
        let scope = merged.scopes.get("/a/").unwrap();
        assert_eq!(scope.get("x"), Some(&"/a/x.js".to_string()));
        assert_eq!(scope.get("y"), Some(&"/a/y.js".to_string()));
    }

    #[test]
    fn merge_omits_empty_sub_maps() {
        let base = ImportMap::default();
        let overlay = ImportMap {
            scopes: [("/empty/".to_string(), SpecifierMap::new())].into_iter().collect(),
            ..Default::default()
        };
        let merged = ImportMap::merge(&base, &overlay);
        assert!(merged.scopes.is_empty());
    }

    #[test]
    fn simplify_removes_keys_subsumed_by_trailing_slash() {
        let mut m = ImportMap {
            imports: map(&[("lib/", "/src/"), ("lib/button.js", "/src/button.js")]),
            ..Default::default()
        };
        m.simplify();
        assert_eq!(m.imports.len(), 1);
        assert!(m.imports.contains_key("lib/"));
    }

    #[test]
    fn simplify_is_idempotent() {
        let mut m = ImportMap {
            imports: map(&[("lib/", "/src/"), ("lib/button.js", "/src/button.js")]),
            ..Default::default()
        };
        m.simplify();
        let once = m.clone();
        m.simplify();
        assert_eq!(m, once);
    }

    #[test]
    fn simplify_leaves_unrelated_keys_alone() {
        let mut m = ImportMap {
            imports: map(&[("lib/", "/src/"), ("other.js", "/other.js")]),
            ..Default::default()
        };
        m.simplify();
        assert_eq!(m.imports.len(), 2);
    }

    #[test]
    fn serialize_is_deterministic_regardless_of_insertion_order() {
        let a = ImportMap {
            imports: map(&[("b", "/b.js"), ("a", "/a.js")]),
            ..Default::default()
        };
        let b = ImportMap {
            imports: map(&[("a", "/a.js"), ("b", "/b.js")]),
            ..Default::default()
        };
        assert_eq!(a.serialize(), b.serialize());
    }
}
