//! Parses JS/TS source into an `swc` AST. Keeps `create_lexer` /
//! `parse_ecma_src` / `parse_ecma_src_comments` as one lexing-and-parsing
//! crate rather than splitting parse and print concerns across two; no
//! AST-printing helpers live here since tracing a module graph only ever
//! needs to read an AST, never to re-emit source from one.

use swc_common::comments::Comments;
use swc_common::sync::Lrc;
use swc_common::{FileName, SourceFile, SourceMap};
use swc_ecma_ast::Module;
use swc_ecma_parser::{lexer::Lexer, Capturing, Parser, StringInput, Syntax, TsSyntax};

pub fn create_lexer<'a>(fm: &'a SourceFile, comments: Option<&'a dyn Comments>) -> Lexer<'a> {
    let filename = fm.name.to_string();
    Lexer::new(
        Syntax::Typescript(TsSyntax {
            tsx: filename.ends_with(".tsx") || filename.ends_with(".jsx"),
            decorators: true,
            ..Default::default()
        }),
        Default::default(),
        StringInput::from(fm),
        comments,
    )
}

#[derive(Debug, thiserror::Error)]
#[error("failed to parse module {name}: {message}")]
pub struct ParseError {
    pub name: String,
    pub message: String,
}

pub fn parse_ecma_src<TName, TBody>(name: TName, body: TBody) -> Result<(Lrc<SourceMap>, Module), ParseError>
where
    TName: Into<String>,
    TBody: ToString,
{
    parse_ecma_src_comments(name, body, None)
}

pub fn parse_ecma_src_comments<TName, TBody>(
    name: TName,
    body: TBody,
    comments: Option<&dyn Comments>,
) -> Result<(Lrc<SourceMap>, Module), ParseError>
where
    TName: Into<String>,
    TBody: ToString,
{
    let name = name.into();
    let cm = Lrc::<SourceMap>::default();
    let fname: Lrc<FileName> = Lrc::new(FileName::Custom(name.clone()));
    let fm = cm.new_source_file(fname, body.to_string());

    let lexer = create_lexer(&fm, comments);
    let capturing = Capturing::new(lexer);
    let mut parser: Parser<Capturing<Lexer<'_>>> = Parser::new_from(capturing);
    let module = parser.parse_typescript_module().map_err(|e| ParseError {
        name,
        message: format!("{e:?}"),
    })?;

    Ok((cm, module))
}
