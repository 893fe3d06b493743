//! The graph walker: starts from a set of
//! entrypoints, follows relative/absolute specifiers, and collects bare
//! specifiers it doesn't resolve itself.

use crate::html::{extract_script_tags, ScriptTag};
use crate::js::{extract_imports, ModuleImport};
use crate::specifier::{classify, package_name, SpecifierKind};
use ahashmap::AHashSet;
use path_utils::Filesystem;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub path: PathBuf,
    pub imports: Vec<ModuleImport>,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    pub entrypoints: Vec<PathBuf>,
    pub modules: HashMap<PathBuf, Module>,
    pub bare_specifiers: AHashSet<String>,
    pub errors: Vec<String>,
}

/// Optional hook letting the caller follow a bare specifier into its
/// package's own files when a `node_modules` root is configured and the
/// packager can resolve the specifier to a path.
pub type PackageFollower<'a> = dyn Fn(&str) -> Option<PathBuf> + 'a;

#[derive(Default)]
pub struct TraceConfig<'a> {
    /// Filesystem root that root-absolute (`/x`) specifiers resolve against.
    pub web_root: PathBuf,
    pub follow_into_packages: Option<&'a PackageFollower<'a>>,
}

fn canonicalize_best_effort(path: &Path) -> PathBuf {
    path.components().collect::<PathBuf>()
}

fn resolve_relative(from_dir: &Path, specifier: &str) -> PathBuf {
    canonicalize_best_effort(&from_dir.join(specifier))
}

fn resolve_absolute(web_root: &Path, specifier: &str) -> PathBuf {
    canonicalize_best_effort(&web_root.join(specifier.trim_start_matches('/')))
}

fn is_html(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("html")
}

/// Extracts every import a given source file contributes: for HTML, the
/// union of all inline-module and non-module-dynamic imports, plus any
/// `<script type="module" src="...">` entrypoints it queues separately.
fn read_module_imports(
    fs: &dyn Filesystem,
    path: &Path,
    graph: &mut ModuleGraph,
    pending: &mut Vec<PathBuf>,
) -> Vec<ModuleImport> {
    let source = match fs.read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            graph.errors.push(format!("{}: {e}", path.display()));
            return Vec::new();
        }
    };

    if is_html(path) {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut imports = Vec::new();
        for tag in extract_script_tags(&source) {
            match tag {
                ScriptTag::ModuleSrc { src } => {
                    let resolved = resolve_module_src(dir, &src);
                    pending.push(resolved);
                }
                ScriptTag::ModuleInline { content } => {
                    match extract_imports(&path.display().to_string(), &content) {
                        Ok(found) => imports.extend(found),
                        Err(e) => graph.errors.push(format!("{}: {e}", path.display())),
                    }
                }
                ScriptTag::NonModule { content } => {
                    match extract_imports(&path.display().to_string(), &content) {
                        Ok(found) => imports.extend(found.into_iter().filter(|i| i.is_dynamic)),
                        Err(e) => graph.errors.push(format!("{}: {e}", path.display())),
                    }
                }
            }
        }
        imports
    } else {
        match extract_imports(&path.display().to_string(), &source) {
            Ok(found) => found,
            Err(e) => {
                graph.errors.push(format!("{}: {e}", path.display()));
                Vec::new()
            }
        }
    }
}

fn resolve_module_src(html_dir: &Path, src: &str) -> PathBuf {
    match classify(src) {
        SpecifierKind::Absolute => canonicalize_best_effort(&PathBuf::from(src.trim_start_matches('/'))),
        _ => resolve_relative(html_dir, src),
    }
}

/// Walks the module graph starting from `entrypoints` (absolute paths to
/// `.html` or JS/TS files), following relative and root-absolute
/// specifiers and collecting bare specifiers that aren't followed.
pub fn trace(fs: &dyn Filesystem, entrypoints: &[PathBuf], config: &TraceConfig) -> ModuleGraph {
    let mut graph = ModuleGraph {
        entrypoints: entrypoints.to_vec(),
        ..Default::default()
    };
    let mut pending: Vec<PathBuf> = entrypoints.to_vec();

    while let Some(path) = pending.pop() {
        let canonical = canonicalize_best_effort(&path);
        if graph.modules.contains_key(&canonical) {
            continue;
        }

        let imports = read_module_imports(fs, &canonical, &mut graph, &mut pending);
        let module_dir = canonical.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();

        for import in &imports {
            match classify(&import.specifier) {
                SpecifierKind::Relative => {
                    pending.push(resolve_relative(&module_dir, &import.specifier));
                }
                SpecifierKind::Absolute => {
                    pending.push(resolve_absolute(&config.web_root, &import.specifier));
                }
                SpecifierKind::Url => {}
                SpecifierKind::Bare => {
                    graph.bare_specifiers.insert(package_name(&import.specifier).to_string());
                    if let Some(follow) = config.follow_into_packages {
                        if let Some(target) = follow(&import.specifier) {
                            pending.push(target);
                        }
                    }
                }
            }
        }

        graph.modules.insert(
            canonical.clone(),
            Module {
                path: canonical,
                imports,
            },
        );
    }

    graph
}

#[cfg(test)]
mod test {
    use super::*;
    use path_utils::MemFilesystem;
    use pretty_assertions::assert_eq;

    #[test]
    fn follows_relative_imports_and_dedups() {
        let fs = MemFilesystem::new()
            .with_file("/app/a.js", "import './b.js'; import './b.js';")
            .with_file("/app/b.js", "export const x = 1;");
        let graph = trace(&fs, &[PathBuf::from("/app/a.js")], &TraceConfig::default());
        assert_eq!(graph.modules.len(), 2);
        assert!(graph.modules.contains_key(Path::new("/app/b.js")));
    }

    #[test]
    fn collects_bare_specifiers() {
        let fs = MemFilesystem::new().with_file("/app/a.js", "import 'lit/decorators.js';");
        let graph = trace(&fs, &[PathBuf::from("/app/a.js")], &TraceConfig::default());
        assert!(graph.bare_specifiers.contains("lit"));
    }

    #[test]
    fn html_entrypoint_queues_module_src_and_traces_inline() {
        let fs = MemFilesystem::new()
            .with_file(
                "/app/index.html",
                r#"<script type="module" src="./main.js"></script>
                   <script type="module">import './inline-dep.js';</script>
                   <script>import('./dynamic-dep.js');</script>"#,
            )
            .with_file("/app/main.js", "export const x = 1;")
            .with_file("/app/inline-dep.js", "export const y = 1;")
            .with_file("/app/dynamic-dep.js", "export const z = 1;");
        let graph = trace(&fs, &[PathBuf::from("/app/index.html")], &TraceConfig::default());
        assert!(graph.modules.contains_key(Path::new("/app/main.js")));
        assert!(graph.modules.contains_key(Path::new("/app/inline-dep.js")));
        assert!(graph.modules.contains_key(Path::new("/app/dynamic-dep.js")));
    }

    #[test]
    fn parse_errors_are_accumulated_not_fatal() {
        let fs = MemFilesystem::new()
            .with_file("/app/a.js", "import './broken.js'; import './ok.js';")
            .with_file("/app/broken.js", "const = ;")
            .with_file("/app/ok.js", "export const x = 1;");
        let graph = trace(&fs, &[PathBuf::from("/app/a.js")], &TraceConfig::default());
        assert_eq!(graph.errors.len(), 1);
        assert!(graph.modules.contains_key(Path::new("/app/ok.js")));
    }
}
