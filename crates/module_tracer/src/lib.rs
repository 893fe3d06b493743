//! HTML/JS module graph tracer. Two front-ends — [`html`] and
//! [`js`] — feed a single graph walker ([`graph::trace`]) that follows
//! relative/absolute specifiers and collects bare ones.

mod graph;
mod html;
mod js;
mod specifier;

pub use graph::{trace, Module, ModuleGraph, PackageFollower, TraceConfig};
pub use js::ModuleImport;
pub use specifier::{classify, package_name, SpecifierKind};
