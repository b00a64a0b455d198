//! Retrieval of state documents, from the network or from local files.

mod file;
pub use file::FileStateFetcher;

mod url;
pub use url::UrlStateFetcher;

mod locator;
pub use locator::{Locator, format_registry_url, validate_file_path};

use async_trait::async_trait;
use sat_model::State;

use crate::errors::StateError;

/// Pulls one state document.
#[async_trait]
pub trait StateFetcher: Send + Sync {
    /// Where the state comes from, for logs.
    fn source(&self) -> &str;

    async fn fetch(&self) -> Result<State, StateError>;
}
