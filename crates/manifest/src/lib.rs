//! Manifest model: the subset of `package.json` this system reads. A
//! `serde`-derived struct with `main`/`exports` optionality, generalized
//! with `version`, `imports`, `dependencies`/`devDependencies`, and
//! `workspaces`, and with `exports`/`imports` modeled as the recursive
//! [`ExportsValue`] algebra rather than a flat `name → target` map.

pub mod exports;

use indexmap::IndexMap;
use serde::Deserialize;

pub use exports::ExportsValue;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Manifest {
    /// Absent/empty only valid for the root manifest of a resolve.
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub main: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub exports: Option<ExportsValue>,
    #[serde(default)]
    pub imports: Option<ExportsValue>,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(rename = "devDependencies", default)]
    pub dev_dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub workspaces: Option<WorkspacesField>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WorkspacesField {
    Patterns(Vec<String>),
    Object { packages: Vec<String> },
}

impl WorkspacesField {
    pub fn patterns(&self) -> &[String] {
        match self {
            WorkspacesField::Patterns(p) => p,
            WorkspacesField::Object { packages } => packages,
        }
    }
}

impl Manifest {
    pub fn parse(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Direct dependency names, optionally including `devDependencies`, in
    /// manifest declaration order.
    pub fn direct_dependencies(&self, include_dev: bool) -> Vec<&str> {
        let mut names: Vec<&str> = self.dependencies.keys().map(String::as_str).collect();
        if include_dev {
            names.extend(self.dev_dependencies.keys().map(String::as_str));
        }
        names
    }

    pub fn dependency_range(&self, name: &str) -> Option<&str> {
        self.dependencies
            .get(name)
            .or_else(|| self.dev_dependencies.get(name))
            .map(String::as_str)
    }

    pub fn is_workspace_root(&self) -> bool {
        self.workspaces.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_minimal_manifest() {
        let m = Manifest::parse(r#"{"name":"lit","main":"./index.js"}"#).unwrap();
        assert_eq!(m.name.as_deref(), Some("lit"));
        assert_eq!(m.main.as_deref(), Some("./index.js"));
        assert!(m.exports.is_none());
    }

    #[test]
    fn parses_dependencies_and_workspaces() {
        let m = Manifest::parse(
            r#"{
                "name": "root",
                "dependencies": {"lit": "^2.0.0"},
                "devDependencies": {"typescript": "^5.0.0"},
                "workspaces": ["packages/*"]
            }"#,
        )
        .unwrap();
        assert_eq!(m.dependency_range("lit"), Some("^2.0.0"));
        assert_eq!(m.direct_dependencies(false), vec!["lit"]);
        assert_eq!(m.direct_dependencies(true), vec!["lit", "typescript"]);
        assert_eq!(
            m.workspaces.as_ref().unwrap().patterns(),
            &["packages/*".to_string()]
        );
    }

    #[test]
    fn workspaces_object_form() {
        let m = Manifest::parse(r#"{"workspaces": {"packages": ["apps/*", "libs/*"]}}"#).unwrap();
        assert_eq!(
            m.workspaces.unwrap().patterns(),
            &["apps/*".to_string(), "libs/*".to_string()]
        );
    }
}
