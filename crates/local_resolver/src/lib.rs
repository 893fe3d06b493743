//! Filesystem (`node_modules`) and workspace import-map resolution
//! pipelines.
//!
//! The fan-out-then-merge-under-a-lock shape mirrors a bounded concurrent
//! worker pool paired with a parallel `rayon` BFS: workers build a local
//! delta first, then merge into the shared state under one lock, so the
//! lock is held only for the cheap merge, never for the I/O-bound work.

mod workspace;

use ahashmap::AHashSet;
use anyhow::Result;
use dep_graph::DependencyGraph;
use exports_resolver::{explicit_entries, is_trailing_slash_capable, wildcard_entries, ResolveOptions};
use import_map::ImportMap;
use logger::Logger;
use manifest::Manifest;
use package_cache::PackageCache;
use parking_lot::Mutex;
use path_utils::Filesystem;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url_template::{expand, TemplateValues, UrlTemplate};

pub use workspace::{discover_workspace_packages, resolve_single_workspace_package, resolve_workspace, WorkspacePackage};

pub struct LocalResolverConfig {
    pub conditions: ResolveOptions,
    pub module_template: UrlTemplate,
    pub include_root_exports: bool,
    pub worker_count: usize,
    /// Explicit workspace package list; when set, the workspace pipeline
    /// runs unconditionally.
    pub workspace_packages: Option<Vec<WorkspacePackage>>,
}

impl Default for LocalResolverConfig {
    fn default() -> Self {
        Self {
            conditions: ResolveOptions::default(),
            module_template: UrlTemplate::parse("/node_modules/{package}/{path}")
                .expect("the default module template is always valid"),
            include_root_exports: false,
            worker_count: 10,
            workspace_packages: None,
        }
    }
}

fn manifest_cache_key(dir: &Path) -> PathBuf {
    dir.join("package.json")
}

fn load_manifest(
    fs: &dyn Filesystem,
    cache: &PackageCache<PathBuf, Manifest>,
    dir: &Path,
) -> Option<Arc<Manifest>> {
    let key = manifest_cache_key(dir);
    cache
        .get_or_load(key.clone(), || {
            let body = fs.read_to_string(&key)?;
            Manifest::parse(&body)
        })
        .ok()
}

/// Walks up from `start` until a directory contains a `node_modules`
/// subdirectory, a manifest declaring `workspaces`, or a `.git` directory.
/// Falls back to `start` itself.
fn find_workspace_root(fs: &dyn Filesystem, cache: &PackageCache<PathBuf, Manifest>, start: &Path) -> PathBuf {
    let mut current = start;
    loop {
        if fs.exists(&current.join("node_modules")) || fs.exists(&current.join(".git")) {
            return current.to_path_buf();
        }
        if let Some(manifest) = load_manifest(fs, cache, current) {
            if manifest.is_workspace_root() {
                return current.to_path_buf();
            }
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return start.to_path_buf(),
        }
    }
}

/// The scope-key URL (trailing slash enforced) a package's dependents use
/// to key its transitive scope.
pub fn scope_key_for(config: &LocalResolverConfig, name: &str) -> String {
    format!("{}/", package_target_url(&config.module_template, name, ""))
}

fn package_target_url(template: &UrlTemplate, name: &str, path: &str) -> String {
    let (pkg_name, scope) = TemplateValues::from_package_name(name);
    expand(
        template,
        &TemplateValues {
            package: Some(name),
            name: pkg_name,
            scope,
            version: None,
            path: Some(path),
        },
    )
}

/// The fragment of map contributed by a single package: the bare-name (and
/// literal-subpath) entries, plus its directory mapping if trailing-slash
/// capable.
struct PackageFragment {
    entries: Vec<(String, String)>,
}

fn resolve_one_package<L: Logger>(
    fs: &dyn Filesystem,
    cache: &PackageCache<PathBuf, Manifest>,
    node_modules_root: &Path,
    name: &str,
    config: &LocalResolverConfig,
    logger: &L,
) -> Option<(Arc<Manifest>, PackageFragment)> {
    let package_dir = node_modules_root.join("node_modules").join(name);
    if !fs.exists(&package_dir) {
        logger.warning(format!("package {name} not found under node_modules, skipping"));
        return None;
    }

    let manifest = load_manifest(fs, cache, &package_dir)?;
    let entries = explicit_entries(&manifest, &config.conditions);
    if entries.is_empty() && manifest.main.is_none() {
        logger.warning(format!("{name}: no exports or main field, only subpath imports will work"));
    }

    let mut map_entries = Vec::new();
    for entry in &entries {
        let key = if entry.subpath == "." {
            name.to_string()
        } else {
            format!("{name}{}", &entry.subpath[1..])
        };
        map_entries.push((key, package_target_url(&config.module_template, name, &entry.target)));
    }

    let trailing_slash_capable =
        is_trailing_slash_capable(&manifest, &config.conditions) && wildcard_entries(&manifest, &config.conditions).is_empty();
    if trailing_slash_capable {
        map_entries.push((
            format!("{name}/"),
            package_target_url(&config.module_template, name, ""),
        ));
    }

    Some((manifest, PackageFragment { entries: map_entries }))
}

/// Recursively collects the transitive dependency set of `name`, guarded by
/// a process-wide visited set keyed by package name so the first traversal
/// to reach a given dependency wins.
fn collect_transitive<L: Logger>(
    fs: &dyn Filesystem,
    cache: &PackageCache<PathBuf, Manifest>,
    node_modules_root: &Path,
    name: &str,
    config: &LocalResolverConfig,
    logger: &L,
    visited: &Mutex<AHashSet<String>>,
) -> Vec<String> {
    let package_dir = node_modules_root.join("node_modules").join(name);
    let Some(manifest) = load_manifest(fs, cache, &package_dir) else {
        return Vec::new();
    };

    let mut direct: Vec<String> = manifest
        .direct_dependencies(false)
        .into_iter()
        .filter(|dep| visited.lock().insert(dep.to_string()))
        .map(str::to_string)
        .collect();

    let nested: Vec<Vec<String>> = direct
        .par_iter()
        .map(|dep| collect_transitive(fs, cache, node_modules_root, dep, config, logger, visited))
        .collect();
    for mut n in nested {
        direct.append(&mut n);
    }
    direct
}

/// Re-resolves a single package's own fragment of import map — its
/// bare-name, subpath, and trailing-slash entries — without touching
/// scopes. Used by the incremental engine to re-emit one changed,
/// non-workspace package's exports.
pub fn resolve_package<L: Logger>(
    fs: &dyn Filesystem,
    cache: &PackageCache<PathBuf, Manifest>,
    node_modules_root: &Path,
    name: &str,
    config: &LocalResolverConfig,
    logger: &L,
) -> Option<ImportMap> {
    let (_, fragment) = resolve_one_package(fs, cache, node_modules_root, name, config, logger)?;
    let mut map = ImportMap::new();
    for (k, v) in fragment.entries {
        map.imports.insert(k, v);
    }
    Some(map)
}

/// The full transitive dependency set of `name`, freshly computed — used
/// by the incremental engine to rebuild a package's transitive scope.
pub fn collect_transitive_dependencies<L: Logger>(
    fs: &dyn Filesystem,
    cache: &PackageCache<PathBuf, Manifest>,
    node_modules_root: &Path,
    name: &str,
    config: &LocalResolverConfig,
    logger: &L,
) -> Vec<String> {
    let visited = Mutex::new(AHashSet::default());
    collect_transitive(fs, cache, node_modules_root, name, config, logger, &visited)
}

/// `resolve(root_dir)`, falling through to the workspace
/// pipeline when applicable.
pub fn resolve<L: Logger + Sync>(
    fs: &dyn Filesystem,
    cache: &PackageCache<PathBuf, Manifest>,
    root_dir: &Path,
    config: &LocalResolverConfig,
    additional_packages: &[String],
    input_map: &ImportMap,
    logger: &L,
) -> (ImportMap, DependencyGraph) {
    if config.workspace_packages.is_some() {
        return resolve_workspace(fs, cache, root_dir, config, input_map, logger);
    }
    if let Some(root_manifest) = load_manifest(fs, cache, root_dir) {
        if root_manifest.is_workspace_root() {
            return resolve_workspace(fs, cache, root_dir, config, input_map, logger);
        }
    }

    let workspace_root = find_workspace_root(fs, cache, root_dir);
    let Some(root_manifest) = load_manifest(fs, cache, &workspace_root) else {
        return (input_map.clone(), DependencyGraph::new());
    };

    let mut map = ImportMap::new();
    if config.include_root_exports {
        for entry in explicit_entries(&root_manifest, &config.conditions) {
            let key = if entry.subpath == "." {
                "/".to_string()
            } else {
                format!("/{}", &entry.subpath[2..])
            };
            map.imports.insert(key, format!("/{}", entry.target));
        }
    }

    let mut to_process: Vec<String> = root_manifest
        .direct_dependencies(false)
        .into_iter()
        .map(str::to_string)
        .collect();
    for pkg in additional_packages {
        if !to_process.contains(pkg) {
            to_process.push(pkg.clone());
        }
    }
    to_process.sort();
    to_process.dedup();

    let shared = Mutex::new((map, DependencyGraph::new()));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count)
        .build()
        .expect("building a bounded thread pool should not fail");

    pool.install(|| {
        to_process.par_iter().for_each(|name| {
            if let Some((_, fragment)) = resolve_one_package(fs, cache, &workspace_root, name, config, logger) {
                let mut guard = shared.lock();
                for (k, v) in fragment.entries {
                    guard.0.imports.insert(k, v);
                }
                guard.1.add_dependency("__root__", name);
                guard
                    .1
                    .set_scope_key(name, format!("{}/", package_target_url(&config.module_template, name, "")));
                guard
                    .1
                    .set_package_path(name, workspace_root.join("node_modules").join(name));
            }
        });
    });

    let visited: Mutex<AHashSet<String>> = Mutex::new(to_process.iter().cloned().collect());
    let scope_fragments: Vec<(String, Vec<String>)> = pool.install(|| {
        to_process
            .par_iter()
            .map(|direct_dep| {
                let transitive = collect_transitive(fs, cache, &workspace_root, direct_dep, config, logger, &visited);
                (direct_dep.clone(), transitive)
            })
            .collect()
    });

    {
        let mut guard = shared.lock();
        for (direct_dep, transitive) in scope_fragments {
            if transitive.is_empty() {
                continue;
            }
            let scope_key = format!("{}/", package_target_url(&config.module_template, &direct_dep, ""));
            for dep_name in &transitive {
                if let Some((_, fragment)) = resolve_one_package(fs, cache, &workspace_root, dep_name, config, logger) {
                    let scope_map = guard.0.scopes.entry(scope_key.clone()).or_default();
                    for (k, v) in fragment.entries {
                        scope_map.insert(k, v);
                    }
                    guard.1.add_dependency(&direct_dep, dep_name);
                }
            }
        }
    }

    let (mut computed, graph) = shared.into_inner();
    computed.simplify();
    (ImportMap::merge(&computed, input_map), graph)
}

/// `resolve_specifiers(root, specifiers)`: the minimal map for
/// a tracer-driven pipeline. For each bare specifier `pkg[/sub]`, resolve
/// `sub` (or `.`) against the package's exports, falling back to the
/// literal subpath (or `main`/`index.js` for `.`), then apply the template.
pub fn resolve_specifiers<L: Logger>(
    fs: &dyn Filesystem,
    cache: &PackageCache<PathBuf, Manifest>,
    node_modules_root: &Path,
    specifiers: &[String],
    config: &LocalResolverConfig,
    logger: &L,
) -> ImportMap {
    let mut map = ImportMap::new();
    for specifier in specifiers {
        let (name, subpath) = split_specifier(specifier);
        let package_dir = node_modules_root.join("node_modules").join(&name);
        if !fs.exists(&package_dir) {
            logger.warning(format!("package {name} not found under node_modules, skipping"));
            continue;
        }
        let Some(manifest) = load_manifest(fs, cache, &package_dir) else {
            continue;
        };

        let lookup_subpath = subpath.clone().unwrap_or_else(|| ".".to_string());
        let target = exports_resolver::resolve_export_or_wildcard(&manifest, &lookup_subpath, &config.conditions)
            .or_else(|| {
                if lookup_subpath == "." {
                    manifest.main.clone().map(|m| m.trim_start_matches("./").to_string())
                } else {
                    Some(lookup_subpath.trim_start_matches("./").to_string())
                }
            })
            .unwrap_or_else(|| "index.js".to_string());

        map.imports
            .insert(specifier.clone(), package_target_url(&config.module_template, &name, &target));
    }
    map
}

/// Splits a bare specifier into its package name and optional subpath. A
/// scoped name (`@scope/name`) carries one slash of its own, so its
/// subpath boundary is the *second* slash in the specifier, not the first.
fn split_specifier(specifier: &str) -> (String, Option<String>) {
    if specifier.starts_with('@') {
        let boundary = specifier.match_indices('/').nth(1).map(|(idx, _)| idx);
        return match boundary {
            Some(idx) => {
                let sub = &specifier[idx + 1..];
                (
                    specifier[..idx].to_string(),
                    if sub.is_empty() { None } else { Some(format!("./{sub}")) },
                )
            }
            None => (specifier.to_string(), None),
        };
    }
    match specifier.find('/') {
        Some(slash) => {
            let sub = &specifier[slash + 1..];
            (
                specifier[..slash].to_string(),
                if sub.is_empty() { None } else { Some(format!("./{sub}")) },
            )
        }
        None => (specifier.to_string(), None),
    }
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
            .with_file("/app/.git/HEAD", "ref: refs/heads/main")
            .with_file(
                "/app/node_modules/lit/package.json",
                r#"{"name":"lit","main":"./index.js","exports":{".":"./index.js","./decorators.js":"./decorators.js"}}"#,
            )
    }

    #[test]
    fn resolves_direct_dependency_bare_name() {
        let fs = fixture();
        let cache = PackageCache::unbounded();
        let config = LocalResolverConfig::default();
        let (map, _) = resolve(
            &fs,
            &cache,
            Path::new("/app"),
            &config,
            &[],
            &ImportMap::new(),
            &NullLogger,
        );
        assert_eq!(map.imports.get("lit"), Some(&"/node_modules/lit/index.js".to_string()));
        assert_eq!(
            map.imports.get("lit/decorators.js"),
            Some(&"/node_modules/lit/decorators.js".to_string())
        );
    }

    #[test]
    fn input_map_wins_on_collision() {
        let fs = fixture();
        let cache = PackageCache::unbounded();
        let config = LocalResolverConfig::default();
        let mut input = ImportMap::new();
        input.imports.insert("lit".to_string(), "/custom/lit.js".to_string());
        let (map, _) = resolve(&fs, &cache, Path::new("/app"), &config, &[], &input, &NullLogger);
        assert_eq!(map.imports.get("lit"), Some(&"/custom/lit.js".to_string()));
    }

    #[test]
    fn resolve_specifiers_produces_minimal_map() {
        let fs = fixture();
        let cache = PackageCache::unbounded();
        let config = LocalResolverConfig::default();
        let map = resolve_specifiers(
            &fs,
            &cache,
            Path::new("/app"),
            &["lit/decorators.js".to_string()],
            &config,
            &NullLogger,
        );
        assert_eq!(
            map.imports.get("lit/decorators.js"),
            Some(&"/node_modules/lit/decorators.js".to_string())
        );
    }

    #[test]
    fn resolve_package_re_emits_one_package_fragment() {
        let fs = fixture();
        let cache = PackageCache::unbounded();
        let config = LocalResolverConfig::default();
        let map = resolve_package(&fs, &cache, Path::new("/app"), "lit", &config, &NullLogger).unwrap();
        assert_eq!(map.imports.get("lit"), Some(&"/node_modules/lit/index.js".to_string()));
    }

    #[test]
    fn scope_key_for_matches_the_scope_recorded_by_resolve() {
        let fs = fixture();
        let cache = PackageCache::unbounded();
        let config = LocalResolverConfig::default();
        let (_, graph) = resolve(
            &fs,
            &cache,
            Path::new("/app"),
            &config,
            &[],
            &ImportMap::new(),
            &NullLogger,
        );
        assert_eq!(graph.scope_key("lit"), Some(scope_key_for(&config, "lit").as_str()));
    }

    #[test]
    fn split_specifier_handles_scoped_and_unscoped() {
        assert_eq!(
            split_specifier("@lit/reactive-element/decorators.js"),
            ("@lit/reactive-element".to_string(), Some("./decorators.js".to_string()))
        );
        assert_eq!(split_specifier("lit"), ("lit".to_string(), None));
        assert_eq!(
            split_specifier("@lit/reactive-element"),
            ("@lit/reactive-element".to_string(), None)
        );
    }
}
