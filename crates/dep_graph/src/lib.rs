//! Package dependency graph and incremental re-resolution.
//!
//! Forward and inverse adjacency are kept as separate maps rather than a
//! single edge list, and traversal is a frontier-based BFS rather than
//! recursion — a comparable graph over files would parallelize frontier
//! expansion with `rayon`, but here the frontier is package names and
//! stays small enough that a plain sequential BFS is the right match for
//! the work size.

use ahashmap::AHashSet;
use import_map::ImportMap;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    depends_on: HashMap<String, AHashSet<String>>,
    dependents: HashMap<String, AHashSet<String>>,
    scope_keys: HashMap<String, String>,
    package_paths: HashMap<String, std::path::PathBuf>,
    workspace_packages: AHashSet<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dependency(&mut self, from: &str, to: &str) {
        self.depends_on
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self.dependents
            .entry(to.to_string())
            .or_default()
            .insert(from.to_string());
    }

    pub fn set_scope_key(&mut self, package: &str, scope_key: impl Into<String>) {
        self.scope_keys.insert(package.to_string(), scope_key.into());
    }

    pub fn scope_key(&self, package: &str) -> Option<&str> {
        self.scope_keys.get(package).map(String::as_str)
    }

    pub fn set_package_path(&mut self, package: &str, path: impl Into<std::path::PathBuf>) {
        self.package_paths.insert(package.to_string(), path.into());
    }

    pub fn package_path(&self, package: &str) -> Option<&std::path::Path> {
        self.package_paths.get(package).map(std::path::PathBuf::as_path)
    }

    pub fn add_workspace_package(&mut self, package: &str) {
        self.workspace_packages.insert(package.to_string());
    }

    pub fn is_workspace_package(&self, package: &str) -> bool {
        self.workspace_packages.contains(package)
    }

    pub fn direct_dependents(&self, package: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .dependents
            .get(package)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    /// BFS over inverse edges from `package`, excluding `package` itself.
    /// Output is sorted for determinism.
    pub fn transitive_dependents(&self, package: &str) -> Vec<String> {
        let mut visited: AHashSet<String> = AHashSet::default();
        visited.insert(package.to_string());
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(package.to_string());
        let mut result = AHashSet::default();

        while let Some(current) = queue.pop_front() {
            let Some(parents) = self.dependents.get(&current) else {
                continue;
            };
            for parent in parents {
                if visited.insert(parent.clone()) {
                    result.insert(parent.clone());
                    queue.push_back(parent.clone());
                }
            }
        }

        let mut out: Vec<String> = result.into_iter().collect();
        out.sort();
        out
    }

    /// Removes every edge touching `package` and drops its metadata,
    /// returning its direct dependents (computed before removal).
    pub fn remove_package(&mut self, package: &str) -> Vec<String> {
        let direct_dependents = self.direct_dependents(package);

        if let Some(deps) = self.depends_on.remove(package) {
            for dep in &deps {
                if let Some(back) = self.dependents.get_mut(dep) {
                    back.remove(package);
                }
            }
        }
        if let Some(parents) = self.dependents.remove(package) {
            for parent in &parents {
                if let Some(fwd) = self.depends_on.get_mut(parent) {
                    fwd.remove(package);
                }
            }
        }
        self.scope_keys.remove(package);
        self.package_paths.remove(package);
        self.workspace_packages.remove(package);

        direct_dependents
    }
}

/// The set of packages to re-resolve for an incremental update: every
/// changed package plus everything transitively depending on one.
pub fn affected_packages(graph: &DependencyGraph, changed: &[String]) -> Vec<String> {
    let mut affected: AHashSet<String> = changed.iter().cloned().collect();
    for package in changed {
        affected.extend(graph.transitive_dependents(package));
    }
    let mut out: Vec<String> = affected.into_iter().collect();
    out.sort();
    out
}

/// Removes every import-map entry that belongs to `package`: its own key,
/// any subpath key (`package/...`), and its directory-root key
/// (`package/`), plus the scope recorded for it in the graph.
pub fn purge_package_entries(map: &mut ImportMap, graph: &DependencyGraph, package: &str) {
    let prefix_slash = format!("{package}/");
    map.imports
        .retain(|k, _| k != package && k != &prefix_slash && !k.starts_with(&prefix_slash));
    if let Some(scope_key) = graph.scope_key(package) {
        map.scopes.remove(scope_key);
    }
}

/// Re-resolves every affected package and merges the results back into a
/// clone of the previous map. `resolve_one` is handed the package name
/// and whether it's a workspace package, and
/// returns the fragment of import map that package alone contributes
/// (`None` if re-resolution of that package produced nothing, e.g. it no
/// longer exists on disk).
pub fn resolve_incremental<F>(
    previous_map: &ImportMap,
    previous_graph: &DependencyGraph,
    changed: &[String],
    mut resolve_one: F,
) -> (ImportMap, DependencyGraph)
where
    F: FnMut(&str, bool) -> Option<ImportMap>,
{
    if changed.is_empty() {
        return (previous_map.clone(), previous_graph.clone());
    }

    let affected = affected_packages(previous_graph, changed);
    let mut map = previous_map.clone();
    let graph = previous_graph.clone();

    for package in &affected {
        purge_package_entries(&mut map, &graph, package);
    }

    for package in &affected {
        let is_workspace = graph.is_workspace_package(package);
        if let Some(fragment) = resolve_one(package, is_workspace) {
            map = ImportMap::merge(&map, &fragment);
        }
    }

    map.simplify();
    (map, graph)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn graph_with_chain() -> DependencyGraph {
        // app -> lib-a -> lib-b
        let mut g = DependencyGraph::new();
        g.add_dependency("app", "lib-a");
        g.add_dependency("lib-a", "lib-b");
        g
    }

    #[test]
    fn transitive_dependents_is_sorted_bfs() {
        let g = graph_with_chain();
        assert_eq!(g.transitive_dependents("lib-b"), vec!["app", "lib-a"]);
        assert_eq!(g.transitive_dependents("lib-a"), vec!["app"]);
        assert!(g.transitive_dependents("app").is_empty());
    }

    #[test]
    fn remove_package_erases_all_edges_and_returns_direct_dependents() {
        let mut g = graph_with_chain();
        let direct = g.remove_package("lib-a");
        assert_eq!(direct, vec!["app"]);
        assert!(g.transitive_dependents("lib-b").is_empty());
        assert!(g.direct_dependents("app").is_empty());
    }

    #[test]
    fn metadata_round_trips() {
        let mut g = DependencyGraph::new();
        g.set_scope_key("lib-a", "/lib-a/");
        g.set_package_path("lib-a", "/pkgs/lib-a");
        g.add_workspace_package("lib-a");
        assert_eq!(g.scope_key("lib-a"), Some("/lib-a/"));
        assert_eq!(g.package_path("lib-a"), Some(std::path::Path::new("/pkgs/lib-a")));
        assert!(g.is_workspace_package("lib-a"));
    }

    #[test]
    fn affected_packages_includes_changed_and_dependents() {
        let g = graph_with_chain();
        let affected = affected_packages(&g, &["lib-b".to_string()]);
        assert_eq!(affected, vec!["app", "lib-a", "lib-b"]);
    }

    #[test]
    fn purge_removes_exact_subpath_and_directory_keys_only() {
        let mut map = ImportMap::new();
        map.imports.insert("lib-a".to_string(), "/a.js".to_string());
        map.imports.insert("lib-a/button.js".to_string(), "/a/button.js".to_string());
        map.imports.insert("lib-a/".to_string(), "/a/".to_string());
        map.imports.insert("lib-abc".to_string(), "/abc.js".to_string());
        let g = DependencyGraph::new();
        purge_package_entries(&mut map, &g, "lib-a");
        assert_eq!(map.imports.len(), 1);
        assert!(map.imports.contains_key("lib-abc"));
    }

    #[test]
    fn resolve_incremental_with_empty_change_set_is_a_no_op() {
        let map = ImportMap::new();
        let graph = DependencyGraph::new();
        let (new_map, _) = resolve_incremental(&map, &graph, &[], |_, _| None);
        assert_eq!(new_map, map);
    }

    #[test]
    fn resolve_incremental_merges_fragments_for_affected_packages() {
        let mut graph = graph_with_chain();
        graph.set_scope_key("lib-a", "/lib-a/");
        let mut previous = ImportMap::new();
        previous.imports.insert("lib-a".to_string(), "/old/a.js".to_string());

        let (new_map, _) = resolve_incremental(&previous, &graph, &["lib-a".to_string()], |pkg, _| {
            let mut fragment = ImportMap::new();
            fragment.imports.insert(pkg.to_string(), format!("/new/{pkg}.js"));
            Some(fragment)
        });

        assert_eq!(new_map.imports.get("lib-a"), Some(&"/new/lib-a.js".to_string()));
        assert_eq!(new_map.imports.get("app"), Some(&"/new/app.js".to_string()));
    }
}
