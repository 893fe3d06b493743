//! Ties the manifest, resolver, tracer, and dependency-graph crates into
//! one resolution pipeline: a root directory (or a traced module graph)
//! goes in, an [`import_map::ImportMap`] comes out.
//!
//! Three entry points, matching the three ways a root can produce a map:
//! a full filesystem/workspace resolve that also seeds incremental
//! updates ([`local::LocalProject`]), a registry/CDN resolve
//! ([`registry::resolve`]), and the tracer-driven minimal map
//! ([`trace::resolve_traced`]) built from exactly the specifiers a module
//! graph walk found. Building the CLI surface that drives these — option
//! parsing, glob expansion for HTML entrypoints, writing the
//! `<script type="importmap">` tag back into a file — is someone else's
//! job; this crate only carries the resolution core.

pub mod local;
pub mod registry;
pub mod trace;

pub use local::LocalProject;
pub use trace::{bare_specifiers, resolve_traced};
