//! Wires the local/workspace resolver's per-package primitives into a
//! stateful incremental pipeline: holds the last computed map and graph,
//! and re-resolves only what a set of changed package names actually
//! touches.
//!
//! The filesystem is taken by reference on every call rather than stored,
//! the same way `local_resolver`'s own functions do — so callers are free
//! to mutate the backing `node_modules` tree between an initial resolve
//! and a later `update`.

use std::path::{Path, PathBuf};

use dep_graph::DependencyGraph;
use import_map::ImportMap;
use local_resolver::{LocalResolverConfig, WorkspacePackage};
use logger::Logger;
use manifest::Manifest;
use package_cache::PackageCache;
use path_utils::Filesystem;

/// Owns the cache and last resolution result for one project root, so
/// repeated calls to `update` only redo the work a change actually
/// affects instead of re-walking the whole tree.
pub struct LocalProject {
    cache: PackageCache<PathBuf, Manifest>,
    root_dir: PathBuf,
    config: LocalResolverConfig,
    map: ImportMap,
    graph: DependencyGraph,
}

impl LocalProject {
    /// Runs a full resolve and seeds the incremental state from it.
    pub fn new<L: Logger + Sync>(
        fs: &dyn Filesystem,
        root_dir: impl Into<PathBuf>,
        config: LocalResolverConfig,
        additional_packages: &[String],
        input_map: &ImportMap,
        logger: &L,
    ) -> Self {
        let cache = PackageCache::unbounded();
        let root_dir = root_dir.into();
        let (map, graph) = local_resolver::resolve(fs, &cache, &root_dir, &config, additional_packages, input_map, logger);
        Self {
            cache,
            root_dir,
            config,
            map,
            graph,
        }
    }

    pub fn map(&self) -> &ImportMap {
        &self.map
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Re-resolves `changed` (and everything transitively depending on it)
    /// against the current on-disk state, reusing the rest of the
    /// previous map untouched.
    ///
    /// Invalidates the cache entries recorded for each changed package
    /// before re-resolving, so a stale parsed manifest never survives a
    /// reported change.
    pub fn update<L: Logger + Sync>(&mut self, fs: &dyn Filesystem, changed: &[String], logger: &L) {
        for package in changed {
            if let Some(path) = self.graph.package_path(package) {
                self.cache.invalidate(&manifest_cache_key(path));
            }
        }

        let cache = &self.cache;
        let root_dir = &self.root_dir;
        let config = &self.config;
        let graph_before = &self.graph;

        let (map, graph) = dep_graph::resolve_incremental(&self.map, &self.graph, changed, |name, is_workspace| {
            resolve_one_affected(fs, cache, root_dir, config, graph_before, name, is_workspace, logger)
        });

        self.map = map;
        self.graph = graph;
    }
}

fn manifest_cache_key(dir: &Path) -> PathBuf {
    dir.join("package.json")
}

/// Builds the fragment one affected package contributes: its own exports,
/// plus (when it is itself a scope owner — a direct, non-workspace
/// dependency with transitive dependencies of its own) the rebuilt
/// contents of that scope.
#[allow(clippy::too_many_arguments)]
fn resolve_one_affected<L: Logger>(
    fs: &dyn Filesystem,
    cache: &PackageCache<PathBuf, Manifest>,
    root_dir: &Path,
    config: &LocalResolverConfig,
    graph: &DependencyGraph,
    name: &str,
    is_workspace: bool,
    logger: &L,
) -> Option<ImportMap> {
    let mut fragment = if is_workspace {
        let package = config
            .workspace_packages
            .as_ref()
            .and_then(|packages| packages.iter().find(|p| p.name == name))
            .cloned()
            .or_else(|| workspace_package_from_graph(graph, name))?;
        local_resolver::resolve_single_workspace_package(fs, cache, root_dir, &package, config)?
    } else {
        local_resolver::resolve_package(fs, cache, root_dir, name, config, logger)?
    };

    if let Some(scope_key) = graph.scope_key(name).map(str::to_string) {
        let transitive = local_resolver::collect_transitive_dependencies(fs, cache, root_dir, name, config, logger);
        if !transitive.is_empty() {
            let scope_map = fragment.scopes.entry(scope_key).or_default();
            for dep_name in &transitive {
                if let Some(dep_fragment) = local_resolver::resolve_package(fs, cache, root_dir, dep_name, config, logger) {
                    for (k, v) in dep_fragment.imports {
                        scope_map.insert(k, v);
                    }
                }
            }
        }
    }

    Some(fragment)
}

fn workspace_package_from_graph(graph: &DependencyGraph, name: &str) -> Option<WorkspacePackage> {
    if !graph.is_workspace_package(name) {
        return None;
    }
    Some(WorkspacePackage {
        name: name.to_string(),
        path: graph.package_path(name)?.to_path_buf(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use logger::NullLogger;
    use path_utils::MemFilesystem;
    use pretty_assertions::assert_eq;

    fn fixture() -> MemFilesystem {
        MemFilesystem::new()
            .with_file("/app/package.json", r#"{"name":"app","dependencies":{"lit":"^2.0.0"}}"#)
            .with_file(
                "/app/node_modules/lit/package.json",
                r#"{"name":"lit","main":"./index.js","dependencies":{"lit-element":"^3.0.0"}}"#,
            )
            .with_file(
                "/app/node_modules/lit-element/package.json",
                r#"{"name":"lit-element","main":"./index.js"}"#,
            )
    }

    #[test]
    fn update_picks_up_a_changed_dependency_without_touching_unrelated_entries() {
        let mut fs = fixture();
        let config = LocalResolverConfig::default();
        let mut project = LocalProject::new(&fs, "/app", config, &[], &ImportMap::new(), &NullLogger);
        assert_eq!(
            project.map().imports.get("lit"),
            Some(&"/node_modules/lit/index.js".to_string())
        );

        fs.insert(
            "/app/node_modules/lit/package.json",
            r#"{"name":"lit","main":"./v2.js","dependencies":{"lit-element":"^3.0.0"}}"#,
        );
        project.update(&fs, &["lit".to_string()], &NullLogger);

        assert_eq!(
            project.map().imports.get("lit"),
            Some(&"/node_modules/lit/v2.js".to_string())
        );
        let scope = project
            .map()
            .scopes
            .get("/node_modules/lit/")
            .expect("lit's transitive scope should survive the update");
        assert_eq!(
            scope.get("lit-element"),
            Some(&"/node_modules/lit-element/index.js".to_string())
        );
    }

    #[test]
    fn update_with_empty_change_set_is_a_no_op() {
        let fs = fixture();
        let config = LocalResolverConfig::default();
        let mut project = LocalProject::new(&fs, "/app", config, &[], &ImportMap::new(), &NullLogger);
        let before = project.map().clone();
        project.update(&fs, &[], &NullLogger);
        assert_eq!(project.map(), &before);
    }
}
