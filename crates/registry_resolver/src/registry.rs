//! The **Registry** facade: given `(name, range)`, resolves a
//! concrete version by fetching the registry's index document, honoring
//! dist-tags before falling through to the semver matcher; separately,
//! fetches and caches a concrete version's `package.json` through a
//! [`Provider`](crate::provider::Provider).

use crate::document::RegistryDocument;
use crate::fetch::Fetcher;
use crate::provider::Provider;
use anyhow::{anyhow, Result};
use manifest::Manifest;
use package_cache::{registry_key, PackageCache};
use std::sync::Arc;
use url_template::{expand, TemplateValues, UrlTemplate};

/// The npm-style registry index endpoint, e.g.
/// `https://registry.npmjs.org/{package}`.
pub struct Registry<F: Fetcher> {
    fetcher: F,
    index_template: UrlTemplate,
    documents: PackageCache<String, RegistryDocument>,
    versions: PackageCache<String, String>,
    manifests: PackageCache<String, Manifest>,
}

impl<F: Fetcher> Registry<F> {
    pub fn new(fetcher: F, index_template: UrlTemplate) -> Self {
        Self {
            fetcher,
            index_template,
            documents: PackageCache::unbounded(),
            versions: PackageCache::unbounded(),
            manifests: PackageCache::unbounded(),
        }
    }

    pub fn npm(fetcher: F) -> Self {
        Self::new(
            fetcher,
            UrlTemplate::parse("https://registry.npmjs.org/{package}")
                .expect("the default registry index template is always valid"),
        )
    }

    fn fetch_document(&self, name: &str) -> Result<Arc<RegistryDocument>> {
        self.documents.get_or_load(name.to_string(), || {
            let (pkg_name, scope) = TemplateValues::from_package_name(name);
            let url = expand(
                &self.index_template,
                &TemplateValues {
                    package: Some(name),
                    name: pkg_name,
                    scope,
                    version: None,
                    path: None,
                },
            );
            let body = self.fetcher.get_string(&url).map_err(|e| anyhow!(e))?;
            RegistryDocument::parse(&body)
        })
    }

    /// Resolves `name@range` to a concrete version string: dist-tag names
    /// (`"latest"`, `"next"`, ...) are honored verbatim before `range` is
    /// handed to the semver matcher.
    pub fn resolve_version(&self, name: &str, range: &str) -> Result<String> {
        let cache_key = format!("{name}@{range}");
        self.versions.get_or_load(cache_key, || {
            let doc = self.fetch_document(name)?;
            if let Some(tagged) = doc.dist_tags.get(range) {
                return Ok(tagged.clone());
            }
            let candidates = doc.version_strings();
            semver_range::match_versions(&candidates, range)
                .ok_or_else(|| anyhow!("no version of {name} satisfies {range}"))
        }).map(|v| v.as_str().to_string())
    }

    /// Retrieves and parses `name@version`'s `package.json` via `provider`,
    /// through the manifest cache.
    pub fn fetch_package_json(&self, provider: &Provider, name: &str, version: &str) -> Result<Arc<Manifest>> {
        self.manifests.get_or_load(registry_key(name, version), || {
            let (pkg_name, scope) = TemplateValues::from_package_name(name);
            let url = expand(
                &provider.package_json_template,
                &TemplateValues {
                    package: Some(name),
                    name: pkg_name,
                    scope,
                    version: Some(version),
                    path: Some(""),
                },
            );
            let body = self.fetcher.get_string(&url).map_err(|e| anyhow!(e))?;
            Manifest::parse(&body)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fetch::test_support::MapFetcher;
    use pretty_assertions::assert_eq;

    fn registry() -> Registry<MapFetcher> {
        let fetcher = MapFetcher::new().with_response(
            "https://registry.npmjs.org/lit",
            r#"{
                "dist-tags": {"latest": "2.8.0"},
                "versions": {
                    "2.8.0": {"name": "lit", "version": "2.8.0"},
                    "2.7.0": {"name": "lit", "version": "2.7.0"}
                }
            }"#,
        );
        Registry::npm(fetcher)
    }

    #[test]
    fn resolves_dist_tag() {
        let r = registry();
        assert_eq!(r.resolve_version("lit", "latest").unwrap(), "2.8.0");
    }

    #[test]
    fn resolves_semver_range() {
        let r = registry();
        assert_eq!(r.resolve_version("lit", "^2.7.0").unwrap(), "2.8.0");
    }

    #[test]
    fn fetch_package_json_is_cached_per_version() {
        let fetcher = MapFetcher::new().with_response(
            "https://esm.sh/lit@2.8.0/package.json",
            r#"{"name": "lit", "version": "2.8.0", "main": "./index.js"}"#,
        );
        let registry = Registry::npm(fetcher);
        let provider = Provider::esm_sh();
        let manifest = registry.fetch_package_json(&provider, "lit", "2.8.0").unwrap();
        assert_eq!(manifest.main.as_deref(), Some("./index.js"));
    }
}
