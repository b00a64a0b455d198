use async_trait::async_trait;
use reqwest::{Client, Url};
use sat_model::State;
use tracing::debug;

use super::StateFetcher;
use crate::errors::StateError;

/// Fetches a state document over HTTP with basic auth.
#[derive(Debug, Clone)]
pub struct UrlStateFetcher {
    client: Client,
    url: Url,
    username: String,
    password: String,
}

impl UrlStateFetcher {
    pub fn new(client: Client, url: Url, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client,
            url,
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl StateFetcher for UrlStateFetcher {
    fn source(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch(&self) -> Result<State, StateError> {
        let mut request = self.client.get(self.url.clone());
        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StateError::Rejected(format!(
                "GET {} returned {status}",
                self.url
            )));
        }

        let body = response.bytes().await?;
        debug!(url = %self.url, bytes = body.len(), "state fetched");
        Ok(State::from_json(&body)?)
    }
}
