//! Workspace (monorepo) discovery and resolution pipeline.

use crate::{collect_transitive, load_manifest, package_target_url, resolve_one_package, LocalResolverConfig};
use ahashmap::AHashSet;
use dep_graph::DependencyGraph;
use exports_resolver::explicit_entries;
use import_map::ImportMap;
use logger::Logger;
use manifest::Manifest;
use package_cache::PackageCache;
use parking_lot::Mutex;
use path_utils::Filesystem;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePackage {
    pub name: String,
    pub path: PathBuf,
}

/// Reads the root manifest's `workspaces` field and expands each pattern:
/// `/*`-suffixed patterns enumerate first-level subdirectories of the base
/// that contain a valid, named manifest; literal patterns are taken
/// verbatim.
pub fn discover_workspace_packages(
    fs: &dyn Filesystem,
    cache: &PackageCache<PathBuf, Manifest>,
    root_dir: &Path,
    root_manifest: &Manifest,
) -> Vec<WorkspacePackage> {
    let Some(workspaces) = &root_manifest.workspaces else {
        return Vec::new();
    };

    let mut packages = Vec::new();
    for pattern in workspaces.patterns() {
        if let Some(base_pattern) = pattern.strip_suffix("/*") {
            let base = root_dir.join(base_pattern);
            let Ok(entries) = fs.read_dir(&base) else {
                continue;
            };
            let mut names: Vec<_> = entries.into_iter().filter(|e| e.is_dir).map(|e| e.name).collect();
            names.sort();
            for name in names {
                let candidate = base.join(&name);
                if let Some(manifest) = load_manifest(fs, cache, &candidate) {
                    if manifest.name.as_deref().is_some_and(|n| !n.is_empty()) {
                        packages.push(WorkspacePackage {
                            name: manifest.name.clone().unwrap(),
                            path: candidate,
                        });
                    }
                }
            }
        } else {
            let candidate = root_dir.join(pattern);
            if let Some(manifest) = load_manifest(fs, cache, &candidate) {
                if manifest.name.as_deref().is_some_and(|n| !n.is_empty()) {
                    packages.push(WorkspacePackage {
                        name: manifest.name.clone().unwrap(),
                        path: candidate,
                    });
                }
            }
        }
    }
    packages
}

fn web_path_join(root_dir: &Path, package_path: &Path, target: &str) -> String {
    let relative = path_utils::as_relative_slash_path(package_path.strip_prefix(root_dir).unwrap_or(package_path))
        .map(|r| r.to_string())
        .unwrap_or_else(|_| package_path.display().to_string());
    if target.is_empty() {
        format!("/{relative}/")
    } else {
        format!("/{relative}/{target}")
    }
}

/// Re-emits a single workspace package's own fragment of import map — the
/// workspace-path branch of incremental re-resolution.
pub fn resolve_single_workspace_package(
    fs: &dyn Filesystem,
    cache: &PackageCache<PathBuf, Manifest>,
    root_dir: &Path,
    package: &WorkspacePackage,
    config: &LocalResolverConfig,
) -> Option<ImportMap> {
    let package_manifest = load_manifest(fs, cache, &package.path)?;
    let mut map = ImportMap::new();
    for entry in explicit_entries(&package_manifest, &config.conditions) {
        let key = if entry.subpath == "." {
            package.name.clone()
        } else {
            format!("{}{}", package.name, &entry.subpath[1..])
        };
        map.imports.insert(key, web_path_join(root_dir, &package.path, &entry.target));
    }
    if exports_resolver::is_trailing_slash_capable(&package_manifest, &config.conditions)
        && exports_resolver::wildcard_entries(&package_manifest, &config.conditions).is_empty()
    {
        map.imports
            .insert(format!("{}/", package.name), web_path_join(root_dir, &package.path, ""));
    }
    Some(map)
}

pub fn resolve_workspace<L: Logger + Sync>(
    fs: &dyn Filesystem,
    cache: &PackageCache<PathBuf, Manifest>,
    root_dir: &Path,
    config: &LocalResolverConfig,
    input_map: &ImportMap,
    logger: &L,
) -> (ImportMap, DependencyGraph) {
    let Some(root_manifest) = load_manifest(fs, cache, root_dir) else {
        return (input_map.clone(), DependencyGraph::new());
    };

    let packages = config
        .workspace_packages
        .clone()
        .unwrap_or_else(|| discover_workspace_packages(fs, cache, root_dir, &root_manifest));
    let workspace_names: AHashSet<String> = packages.iter().map(|p| p.name.clone()).collect();

    let mut map = ImportMap::new();
    let mut graph = DependencyGraph::new();
    let mut dependency_union: Vec<String> = Vec::new();
    let mut per_package_deps: Vec<(String, Vec<String>)> = Vec::new();

    for package in &packages {
        let Some(package_manifest) = load_manifest(fs, cache, &package.path) else {
            logger.warning(format!("workspace package {} has no readable manifest", package.name));
            continue;
        };

        for entry in explicit_entries(&package_manifest, &config.conditions) {
            let key = if entry.subpath == "." {
                package.name.clone()
            } else {
                format!("{}{}", package.name, &entry.subpath[1..])
            };
            map.imports.insert(key, web_path_join(root_dir, &package.path, &entry.target));
        }
        if exports_resolver::is_trailing_slash_capable(&package_manifest, &config.conditions)
            && exports_resolver::wildcard_entries(&package_manifest, &config.conditions).is_empty()
        {
            map.imports
                .insert(format!("{}/", package.name), web_path_join(root_dir, &package.path, ""));
        }

        graph.add_workspace_package(&package.name);
        graph.set_package_path(&package.name, package.path.clone());

        let mut own_deps = Vec::new();
        for dep in package_manifest.direct_dependencies(false) {
            if !workspace_names.contains(dep) {
                own_deps.push(dep.to_string());
                if !dependency_union.contains(&dep.to_string()) {
                    dependency_union.push(dep.to_string());
                }
            }
        }
        per_package_deps.push((package.name.clone(), own_deps));
    }
    dependency_union.sort();

    let shared = Mutex::new((map, graph));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count)
        .build()
        .expect("building a bounded thread pool should not fail");

    pool.install(|| {
        dependency_union.par_iter().for_each(|name| {
            if let Some((_, fragment)) = resolve_one_package(fs, cache, root_dir, name, config, logger) {
                let mut guard = shared.lock();
                for (k, v) in fragment.entries {
                    guard.0.imports.insert(k, v);
                }
                guard.1.set_package_path(name, root_dir.join("node_modules").join(name));
            }
        });
    });

    {
        let mut guard = shared.lock();
        for (package_name, deps) in &per_package_deps {
            for dep in deps {
                guard.1.add_dependency(package_name, dep);
            }
        }
    }

    let visited: Mutex<AHashSet<String>> = Mutex::new(dependency_union.iter().cloned().collect());
    let scope_fragments: Vec<(String, Vec<String>)> = pool.install(|| {
        dependency_union
            .par_iter()
            .map(|name| {
                let transitive = collect_transitive(fs, cache, root_dir, name, config, logger, &visited);
                (name.clone(), transitive)
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
                if let Some((_, fragment)) = resolve_one_package(fs, cache, root_dir, dep_name, config, logger) {
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

#[cfg(test)]
mod test {
    use super::*;
    use logger::NullLogger;
    use path_utils::MemFilesystem;
    use pretty_assertions::assert_eq;

    fn fixture() -> MemFilesystem {
        MemFilesystem::new()
            .with_file(
                "/app/package.json",
                r#"{"name":"root","workspaces":["packages/*"]}"#,
            )
            .with_file(
                "/app/packages/ui/package.json",
                r#"{"name":"@app/ui","main":"./index.js","dependencies":{"lit":"^2.0.0"}}"#,
            )
            .with_file(
                "/app/node_modules/lit/package.json",
                r#"{"name":"lit","main":"./index.js"}"#,
            )
    }

    #[test]
    fn discovers_packages_matching_glob_pattern() {
        let fs = fixture();
        let cache = PackageCache::unbounded();
        let root_manifest = load_manifest(&fs, &cache, Path::new("/app")).unwrap();
        let packages = discover_workspace_packages(&fs, &cache, Path::new("/app"), &root_manifest);
        assert_eq!(packages, vec![WorkspacePackage {
            name: "@app/ui".to_string(),
            path: PathBuf::from("/app/packages/ui"),
        }]);
    }

    #[test]
    fn emits_workspace_package_as_web_path() {
        let fs = fixture();
        let cache = PackageCache::unbounded();
        let config = LocalResolverConfig::default();
        let (map, _) = resolve_workspace(&fs, &cache, Path::new("/app"), &config, &ImportMap::new(), &NullLogger);
        assert_eq!(
            map.imports.get("@app/ui"),
            Some(&"/packages/ui/index.js".to_string())
        );
    }

    #[test]
    fn resolves_workspace_package_dependencies_from_node_modules() {
        let fs = fixture();
        let cache = PackageCache::unbounded();
        let config = LocalResolverConfig::default();
        let (map, _) = resolve_workspace(&fs, &cache, Path::new("/app"), &config, &ImportMap::new(), &NullLogger);
        assert_eq!(map.imports.get("lit"), Some(&"/node_modules/lit/index.js".to_string()));
    }

    #[test]
    fn resolve_single_workspace_package_matches_full_pipeline() {
        let fs = fixture();
        let cache = PackageCache::unbounded();
        let config = LocalResolverConfig::default();
        let package = WorkspacePackage {
            name: "@app/ui".to_string(),
            path: PathBuf::from("/app/packages/ui"),
        };
        let fragment = resolve_single_workspace_package(&fs, &cache, Path::new("/app"), &package, &config).unwrap();
        assert_eq!(fragment.imports.get("@app/ui"), Some(&"/packages/ui/index.js".to_string()));
    }

    #[test]
    fn records_workspace_package_to_dependency_edge() {
        let fs = fixture();
        let cache = PackageCache::unbounded();
        let config = LocalResolverConfig::default();
        let (_, graph) = resolve_workspace(&fs, &cache, Path::new("/app"), &config, &ImportMap::new(), &NullLogger);
        assert_eq!(graph.direct_dependents("lit"), vec!["@app/ui".to_string()]);
    }
}
