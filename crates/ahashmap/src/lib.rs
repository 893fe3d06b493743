//! Hash-map/set aliases that default to `ahash` for speed, falling back to
//! the standard-library hasher when the `ahash` feature is disabled.

#[cfg(feature = "ahash")]
pub type AHashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
#[cfg(feature = "ahash")]
pub type AHashSet<K> = std::collections::HashSet<K, ahash::RandomState>;

#[cfg(not(feature = "ahash"))]
pub type AHashMap<K, V> = std::collections::HashMap<K, V>;
#[cfg(not(feature = "ahash"))]
pub type AHashSet<K> = std::collections::HashSet<K>;
