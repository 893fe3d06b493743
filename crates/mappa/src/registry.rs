//! Thin pass-through to the registry/CDN resolver. Unlike [`crate::local`],
//! this has no incremental-update story: a registry package has no
//! `package_path` on disk to invalidate by, and the incremental engine's
//! invariant is framed in terms of on-disk manifests changing, which has
//! no registry analogue. Registry resolution is always a full resolve.

use dep_graph::DependencyGraph;
use import_map::ImportMap;
use logger::Logger;
use manifest::Manifest;
use registry_resolver::{Fetcher, Provider, Registry, RegistryResolverConfig};

pub fn resolve<F: Fetcher, L: Logger + Sync>(
    registry: &Registry<F>,
    provider: &Provider,
    root_manifest: &Manifest,
    config: &RegistryResolverConfig,
    additional_packages: &[(String, String)],
    input_map: &ImportMap,
    logger: &L,
) -> (ImportMap, DependencyGraph) {
    registry_resolver::resolve(registry, provider, root_manifest, config, additional_packages, input_map, logger)
}
