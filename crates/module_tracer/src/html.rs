//! HTML front-end: walks every `<script>`
//! element in a parsed DOM and classifies it as a module entrypoint,
//! inline module source, or non-module script (dynamic imports only).

use scraper::{Html, Selector};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptTag {
    /// `<script type="module" src="...">`: an entrypoint to queue.
    ModuleSrc { src: String },
    /// `<script type="module">...</script>`: traced for static + dynamic
    /// imports.
    ModuleInline { content: String },
    /// Any other `<script>`: only its dynamic `import()` calls matter.
    NonModule { content: String },
}

pub fn extract_script_tags(html: &str) -> Vec<ScriptTag> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").expect("\"script\" is a valid CSS selector");

    document
        .select(&selector)
        .map(|el| {
            let is_module = el
                .value()
                .attr("type")
                .map(|t| t.eq_ignore_ascii_case("module"))
                .unwrap_or(false);
            let src = el.value().attr("src").map(str::to_string);
            let content: String = el.text().collect();

            match (is_module, src) {
                (true, Some(src)) => ScriptTag::ModuleSrc { src },
                (true, None) => ScriptTag::ModuleInline { content },
                (false, _) => ScriptTag::NonModule { content },
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_module_entrypoint() {
        let tags = extract_script_tags(r#"<script type="module" src="/main.js"></script>"#);
        assert_eq!(
            tags,
            vec![ScriptTag::ModuleSrc {
                src: "/main.js".to_string()
            }]
        );
    }

    #[test]
    fn extracts_inline_module_content() {
        let tags = extract_script_tags(r#"<script type="module">import './a.js';</script>"#);
        assert_eq!(
            tags,
            vec![ScriptTag::ModuleInline {
                content: "import './a.js';".to_string()
            }]
        );
    }

    #[test]
    fn non_module_script_is_separately_tagged() {
        let tags = extract_script_tags(r#"<script>console.log(1);</script>"#);
        assert_eq!(
            tags,
            vec![ScriptTag::NonModule {
                content: "console.log(1);".to_string()
            }]
        );
    }
}
