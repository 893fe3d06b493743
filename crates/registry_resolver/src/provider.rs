//! A CDN **Provider**: a pair of URL templates, one for fetching
//! a given version's `package.json`, one for module URLs embedded in the
//! final import map.

use url_template::{TemplateError, UrlTemplate};

#[derive(Debug, Clone)]
pub struct Provider {
    pub name: String,
    pub package_json_template: UrlTemplate,
    pub module_template: UrlTemplate,
}

impl Provider {
    pub fn new(
        name: impl Into<String>,
        package_json_pattern: &str,
        module_pattern: &str,
    ) -> Result<Self, TemplateError> {
        Ok(Self {
            name: name.into(),
            package_json_template: UrlTemplate::parse(package_json_pattern)?,
            module_template: UrlTemplate::parse(module_pattern)?,
        })
    }

    pub fn esm_sh() -> Self {
        Self::new(
            "esm.sh",
            "https://esm.sh/{package}@{version}/package.json",
            "https://esm.sh/{package}@{version}{path}",
        )
        .expect("built-in provider templates are always valid")
    }

    pub fn unpkg() -> Self {
        Self::new(
            "unpkg",
            "https://unpkg.com/{package}@{version}/package.json",
            "https://unpkg.com/{package}@{version}{path}",
        )
        .expect("built-in provider templates are always valid")
    }

    pub fn jsdelivr() -> Self {
        Self::new(
            "jsdelivr",
            "https://cdn.jsdelivr.net/npm/{package}@{version}/package.json",
            "https://cdn.jsdelivr.net/npm/{package}@{version}{path}",
        )
        .expect("built-in provider templates are always valid")
    }

    /// Recognizes a handful of common aliases; falls back to `esm.sh`, the
    /// default provider.
    pub fn by_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "esm.sh" | "esmsh" | "esm" => Self::esm_sh(),
            "unpkg" => Self::unpkg(),
            "jsdelivr" | "jsdelivr.net" | "cdn.jsdelivr.net" => Self::jsdelivr(),
            _ => Self::esm_sh(),
        }
    }
}

impl Default for Provider {
    fn default() -> Self {
        Self::esm_sh()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recognizes_known_aliases() {
        assert_eq!(Provider::by_name("esmsh").name, "esm.sh");
        assert_eq!(Provider::by_name("UNPKG").name, "unpkg");
        assert_eq!(Provider::by_name("cdn.jsdelivr.net").name, "jsdelivr");
    }

    #[test]
    fn unknown_name_falls_back_to_default() {
        assert_eq!(Provider::by_name("some-other-cdn").name, "esm.sh");
    }
}
