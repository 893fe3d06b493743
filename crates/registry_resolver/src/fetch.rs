//! The opaque HTTP boundary, consumed but not
//! defined here the same way [`path_utils::Filesystem`] stands in for the
//! disk on the local-resolver side: tests drive a fake, production code
//! plugs in whatever blocking HTTP client the embedding application prefers.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("fetching {url}: {message}")]
pub struct FetchError {
    pub url: String,
    pub status: Option<u16>,
    pub message: String,
}

impl FetchError {
    pub fn new(url: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

/// A blocking GET. Implementations are free to wrap any HTTP client; a
/// caller on an async runtime can implement this over `block_in_place`.
pub trait Fetcher: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    fn get_string(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.get(url)?;
        String::from_utf8(bytes).map_err(|e| FetchError::new(url, None, format!("response is not UTF-8: {e}")))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MapFetcher {
        pub responses: Mutex<HashMap<String, String>>,
    }

    impl MapFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(self, url: impl Into<String>, body: impl Into<String>) -> Self {
            self.responses.lock().unwrap().insert(url.into(), body.into());
            self
        }
    }

    impl Fetcher for MapFetcher {
        fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.responses
                .lock()
                .unwrap()
                .get(url)
                .map(|s| s.clone().into_bytes())
                .ok_or_else(|| FetchError::new(url, Some(404), "not found"))
        }
    }
}
