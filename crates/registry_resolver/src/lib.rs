//! CDN/registry-backed import-map resolution: the network
//! analogue of [`local_resolver`], with HTTP standing in for the
//! filesystem the same way [`path_utils::Filesystem`] stands in for disk
//! access there.

mod document;
mod fetch;
mod provider;
mod registry;
mod resolve;

pub use document::RegistryDocument;
pub use fetch::{FetchError, Fetcher};
pub use provider::Provider;
pub use registry::Registry;
pub use resolve::{resolve, resolve_specifiers, RegistryResolverConfig};
