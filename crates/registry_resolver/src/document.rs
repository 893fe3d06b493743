//! The registry index document: `dist-tags` plus a `versions` map keyed by
//! version string, each value shaped like a manifest.

use indexmap::IndexMap;
use manifest::Manifest;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RegistryDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: IndexMap<String, String>,
    #[serde(default)]
    pub versions: IndexMap<String, Manifest>,
}

impl RegistryDocument {
    pub fn parse(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn version_strings(&self) -> Vec<String> {
        self.versions.keys().cloned().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_dist_tags_and_versions() {
        let doc = RegistryDocument::parse(
            r#"{
                "dist-tags": {"latest": "2.8.0"},
                "versions": {
                    "2.8.0": {"name": "lit", "version": "2.8.0", "main": "./index.js"},
                    "2.7.0": {"name": "lit", "version": "2.7.0", "main": "./index.js"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(doc.dist_tags.get("latest"), Some(&"2.8.0".to_string()));
        assert_eq!(doc.versions.len(), 2);
    }
}
