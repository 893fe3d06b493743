//! Static/dynamic import extraction from a parsed JS/TS module, via an
//! `swc_ecma_visit::Visit` impl that overrides the handful of node kinds
//! that can name another module, always calling `visit_children_with`
//! first so nested nodes (an `import()` inside a function body, say) are
//! still reached.

use swc_common::SourceMap;
use swc_ecma_ast::{CallExpr, Callee, ExportAll, Expr, ImportDecl, Lit, NamedExport};
use swc_ecma_visit::{Visit, VisitWith};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImport {
    pub specifier: String,
    pub is_dynamic: bool,
    pub line: usize,
}

pub struct ImportVisitor<'a> {
    cm: &'a SourceMap,
    pub imports: Vec<ModuleImport>,
}

impl<'a> ImportVisitor<'a> {
    pub fn new(cm: &'a SourceMap) -> Self {
        Self {
            cm,
            imports: Vec::new(),
        }
    }

    fn push(&mut self, specifier: String, is_dynamic: bool, lo: swc_common::BytePos) {
        let line = self.cm.lookup_char_pos(lo).line;
        self.imports.push(ModuleImport {
            specifier,
            is_dynamic,
            line,
        });
    }
}

fn string_literal_arg(expr: &CallExpr) -> Option<(String, swc_common::BytePos)> {
    let first = expr.args.first()?;
    if let Expr::Lit(Lit::Str(s)) = &*first.expr {
        Some((s.value.to_string(), s.span.lo))
    } else {
        None
    }
}

impl Visit for ImportVisitor<'_> {
    fn visit_import_decl(&mut self, import: &ImportDecl) {
        import.visit_children_with(self);
        self.push(import.src.value.to_string(), false, import.span.lo);
    }

    fn visit_named_export(&mut self, export: &NamedExport) {
        export.visit_children_with(self);
        if let Some(source) = &export.src {
            self.push(source.value.to_string(), false, export.span.lo);
        }
    }

    fn visit_export_all(&mut self, export: &ExportAll) {
        export.visit_children_with(self);
        self.push(export.src.value.to_string(), false, export.span.lo);
    }

    fn visit_call_expr(&mut self, expr: &CallExpr) {
        expr.visit_children_with(self);
        if matches!(expr.callee, Callee::Import(_)) {
            if let Some((specifier, lo)) = string_literal_arg(expr) {
                self.push(specifier, true, lo);
            }
        }
    }
}

/// Parses `source` and extracts every static import/re-export and
/// string-literal dynamic `import()` call.
pub fn extract_imports(name: &str, source: &str) -> Result<Vec<ModuleImport>, js_parser::ParseError> {
    let (cm, module) = js_parser::parse_ecma_src(name, source)?;
    let mut visitor = ImportVisitor::new(&cm);
    module.visit_with(&mut visitor);
    Ok(visitor.imports)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_static_import() {
        let imports = extract_imports("a.ts", "import { foo } from './foo.js';").unwrap();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].specifier, "./foo.js");
        assert!(!imports[0].is_dynamic);
    }

    #[test]
    fn extracts_re_export() {
        let imports = extract_imports("a.ts", "export { foo } from './foo.js';\nexport * from './bar.js';").unwrap();
        let specifiers: Vec<&str> = imports.iter().map(|i| i.specifier.as_str()).collect();
        assert_eq!(specifiers, vec!["./foo.js", "./bar.js"]);
    }

    #[test]
    fn extracts_dynamic_import_with_line() {
        let imports = extract_imports("a.ts", "\n\nconst mod = await import('./lazy.js');").unwrap();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].specifier, "./lazy.js");
        assert!(imports[0].is_dynamic);
        assert_eq!(imports[0].line, 3);
    }

    #[test]
    fn ignores_dynamic_import_with_non_literal_argument() {
        let imports = extract_imports("a.ts", "const p = 'x.js'; import(p);").unwrap();
        assert!(imports.is_empty());
    }

    #[test]
    fn extracts_bare_specifier_import() {
        let imports = extract_imports("a.ts", "import 'lit';").unwrap();
        assert_eq!(imports[0].specifier, "lit");
    }
}
