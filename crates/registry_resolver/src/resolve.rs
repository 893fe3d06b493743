//! The transitive resolution pipeline: the filesystem is replaced by HTTP,
//! but the same fan-out-then-merge shape applies
//! as [`local_resolver::resolve`], with a `max_depth` recursion cap that has
//! no filesystem analogue (a CDN dependency chain has no natural floor the
//! way `node_modules` flattening does).

use crate::fetch::Fetcher;
use crate::provider::Provider;
use crate::registry::Registry;
use ahashmap::AHashSet;
use dep_graph::DependencyGraph;
use exports_resolver::{explicit_entries, is_trailing_slash_capable, wildcard_entries, ResolveOptions};
use import_map::ImportMap;
use logger::Logger;
use manifest::Manifest;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::Arc;
use url_template::{expand, TemplateValues};

pub struct RegistryResolverConfig {
    pub conditions: ResolveOptions,
    pub worker_count: usize,
    /// Caps transitive recursion depth; `0` means unlimited.
    pub max_depth: usize,
}

impl Default for RegistryResolverConfig {
    fn default() -> Self {
        Self {
            conditions: ResolveOptions::default(),
            worker_count: 10,
            max_depth: 0,
        }
    }
}

fn module_url(provider: &Provider, name: &str, version: &str, path: &str) -> String {
    let (pkg_name, scope) = TemplateValues::from_package_name(name);
    expand(
        &provider.module_template,
        &TemplateValues {
            package: Some(name),
            name: pkg_name,
            scope,
            version: Some(version),
            path: Some(path),
        },
    )
}

fn load_versioned_manifest<F: Fetcher, L: Logger>(
    registry: &Registry<F>,
    provider: &Provider,
    name: &str,
    range: &str,
    logger: &L,
) -> Option<(String, Arc<Manifest>)> {
    let version = match registry.resolve_version(name, range) {
        Ok(v) => v,
        Err(e) => {
            logger.warning(format!("{name}@{range}: {e}"));
            return None;
        }
    };
    match registry.fetch_package_json(provider, name, &version) {
        Ok(m) => Some((version, m)),
        Err(e) => {
            logger.warning(format!("{name}@{version}: {e}"));
            None
        }
    }
}

struct PackageFragment {
    entries: Vec<(String, String)>,
}

fn resolve_one_package<F: Fetcher, L: Logger>(
    registry: &Registry<F>,
    provider: &Provider,
    name: &str,
    range: &str,
    config: &RegistryResolverConfig,
    logger: &L,
) -> Option<(String, PackageFragment)> {
    let (version, manifest) = load_versioned_manifest(registry, provider, name, range, logger)?;

    let entries = explicit_entries(&manifest, &config.conditions);
    if entries.is_empty() && manifest.main.is_none() {
        logger.warning(format!("{name}@{version}: no exports or main field, only subpath imports will work"));
    }

    let mut map_entries = Vec::new();
    for entry in &entries {
        let key = if entry.subpath == "." {
            name.to_string()
        } else {
            format!("{name}{}", &entry.subpath[1..])
        };
        map_entries.push((key, module_url(provider, name, &version, &entry.target)));
    }

    let trailing_slash_capable =
        is_trailing_slash_capable(&manifest, &config.conditions) && wildcard_entries(&manifest, &config.conditions).is_empty();
    if trailing_slash_capable {
        map_entries.push((format!("{name}/"), module_url(provider, name, &version, "")));
    }

    Some((version, PackageFragment { entries: map_entries }))
}

/// Recursively collects `(name, range)` pairs for `name`'s transitive
/// dependencies, guarded by a process-wide visited-by-name set (first
/// traversal wins, mirroring `local_resolver::collect_transitive`) and
/// capped by `config.max_depth`.
fn collect_transitive<F: Fetcher, L: Logger>(
    registry: &Registry<F>,
    provider: &Provider,
    name: &str,
    range: &str,
    config: &RegistryResolverConfig,
    logger: &L,
    visited: &Mutex<AHashSet<String>>,
    depth: usize,
) -> Vec<(String, String)> {
    if config.max_depth != 0 && depth >= config.max_depth {
        return Vec::new();
    }
    let Some((_, manifest)) = load_versioned_manifest(registry, provider, name, range, logger) else {
        return Vec::new();
    };

    let direct: Vec<(String, String)> = manifest
        .direct_dependencies(false)
        .into_iter()
        .filter(|dep| visited.lock().insert(dep.to_string()))
        .map(|dep| {
            let range = manifest.dependency_range(dep).unwrap_or("*").to_string();
            (dep.to_string(), range)
        })
        .collect();

    let nested: Vec<Vec<(String, String)>> = direct
        .par_iter()
        .map(|(dep_name, dep_range)| {
            collect_transitive(registry, provider, dep_name, dep_range, config, logger, visited, depth + 1)
        })
        .collect();

    let mut out = direct;
    for mut n in nested {
        out.append(&mut n);
    }
    out
}

/// Resolves `root_manifest`'s direct dependencies (plus `additional_packages`,
/// each an explicit `(name, range)`) against `provider`, building bare-name
/// entries and per-package scopes the way `local_resolver::resolve` does for
/// `node_modules`.
pub fn resolve<F: Fetcher, L: Logger + Sync>(
    registry: &Registry<F>,
    provider: &Provider,
    root_manifest: &Manifest,
    config: &RegistryResolverConfig,
    additional_packages: &[(String, String)],
    input_map: &ImportMap,
    logger: &L,
) -> (ImportMap, DependencyGraph) {
    let mut to_process: Vec<(String, String)> = root_manifest
        .direct_dependencies(false)
        .into_iter()
        .map(|name| {
            let range = root_manifest.dependency_range(name).unwrap_or("*").to_string();
            (name.to_string(), range)
        })
        .collect();
    for (name, range) in additional_packages {
        if !to_process.iter().any(|(n, _)| n == name) {
            to_process.push((name.clone(), range.clone()));
        }
    }
    to_process.sort_by(|a, b| a.0.cmp(&b.0));

    let shared = Mutex::new((ImportMap::new(), DependencyGraph::new()));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_count)
        .build()
        .expect("building a bounded thread pool should not fail");

    pool.install(|| {
        to_process.par_iter().for_each(|(name, range)| {
            if let Some((version, fragment)) = resolve_one_package(registry, provider, name, range, config, logger) {
                let mut guard = shared.lock();
                for (k, v) in fragment.entries {
                    guard.0.imports.insert(k, v);
                }
                guard.1.add_dependency("__root__", name);
                guard.1.set_scope_key(name, format!("{}/", module_url(provider, name, &version, "")));
            }
        });
    });

    let visited: Mutex<AHashSet<String>> = Mutex::new(to_process.iter().map(|(n, _)| n.clone()).collect());
    let scope_fragments: Vec<(String, Vec<(String, String)>)> = pool.install(|| {
        to_process
            .par_iter()
            .map(|(name, range)| {
                let transitive = collect_transitive(registry, provider, name, range, config, logger, &visited, 1);
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
            let Some(scope_key) = guard.1.scope_key(&direct_dep).map(str::to_string) else {
                continue;
            };
            for (dep_name, dep_range) in &transitive {
                if let Some((version, fragment)) = resolve_one_package(registry, provider, dep_name, dep_range, config, logger)
                {
                    let scope_map = guard.0.scopes.entry(scope_key.clone()).or_default();
                    for (k, v) in fragment.entries {
                        scope_map.insert(k, v);
                    }
                    guard.1.add_dependency(&direct_dep, dep_name);
                    guard
                        .1
                        .set_scope_key(dep_name, format!("{}/", module_url(provider, dep_name, &version, "")));
                }
            }
        }
    }

    let (mut computed, graph) = shared.into_inner();
    computed.simplify();
    (ImportMap::merge(&computed, input_map), graph)
}

/// Tracer-driven minimal map: for each bare specifier `pkg[/sub]` already
/// pinned to a concrete `version` (typically by an earlier full resolve),
/// resolve `sub` (or `.`) against the package's exports, falling back to
/// the literal subpath (the shared tracer-driven pipeline;
/// mirrors `local_resolver::resolve_specifiers`).
pub fn resolve_specifiers<F: Fetcher, L: Logger>(
    registry: &Registry<F>,
    provider: &Provider,
    specifiers: &[(String, String)],
    config: &RegistryResolverConfig,
    logger: &L,
) -> ImportMap {
    let mut map = ImportMap::new();
    for (specifier, version) in specifiers {
        let (name, subpath) = split_specifier(specifier);
        let manifest = match registry.fetch_package_json(provider, &name, version) {
            Ok(m) => m,
            Err(e) => {
                logger.warning(format!("{name}@{version}: {e}"));
                continue;
            }
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

        map.imports.insert(specifier.clone(), module_url(provider, &name, &version, &target));
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
