//! Tracer-driven resolver orchestration: given a traced module graph,
//! emit the minimal import map that covers exactly the bare specifiers
//! the trace found, instead of every package under `node_modules`.
//!
//! `ModuleGraph::bare_specifiers` only keeps package *names* (the tracer
//! follows into packages by name, so that's all it needs); resolving a
//! deep subpath correctly — e.g. falling back to the literal path when a
//! package's `exports` doesn't list it — needs the full specifier, so
//! this module re-derives the bare specifier set from each module's own
//! import list rather than from the deduplicated name set.

use std::path::Path;

use ahashmap::AHashSet;
use logger::Logger;
use manifest::Manifest;
use module_tracer::{classify, ModuleGraph, SpecifierKind};
use package_cache::PackageCache;
use path_utils::Filesystem;

/// Every bare specifier (full, with subpath) imported anywhere in `graph`,
/// sorted for deterministic fan-out.
pub fn bare_specifiers(graph: &ModuleGraph) -> Vec<String> {
    let mut set: AHashSet<String> = AHashSet::default();
    for module in graph.modules.values() {
        for import in &module.imports {
            if classify(&import.specifier) == SpecifierKind::Bare {
                set.insert(import.specifier.clone());
            }
        }
    }
    let mut out: Vec<String> = set.into_iter().collect();
    out.sort();
    out
}

/// The minimal import map for a traced module graph: resolves exactly the
/// bare specifiers the trace collected against `node_modules`, falling
/// back to the literal subpath for anything not explicitly exported.
pub fn resolve_traced<L: Logger>(
    fs: &dyn Filesystem,
    cache: &PackageCache<std::path::PathBuf, Manifest>,
    node_modules_root: &Path,
    graph: &ModuleGraph,
    config: &local_resolver::LocalResolverConfig,
    logger: &L,
) -> import_map::ImportMap {
    let specifiers = bare_specifiers(graph);
    local_resolver::resolve_specifiers(fs, cache, node_modules_root, &specifiers, config, logger)
}
