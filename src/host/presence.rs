//! Meeting presence from the mutesync local API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::{PresenceClient, PresenceSnapshot};

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("mutesync request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mutesync answered {0}")]
    Status(StatusCode),

    #[error("token is not a valid header value")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),

    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Deserialize)]
struct StateResponse {
    #[serde(alias = "Data")]
    data: StateData,
}

#[derive(Debug, Deserialize)]
struct StateData {
    in_meeting: bool,
    muted: bool,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default, rename = "user-id")]
    user_id: Option<String>,
}

impl From<StateData> for PresenceSnapshot {
    fn from(data: StateData) -> Self {
        PresenceSnapshot {
            in_meeting: data.in_meeting,
            muted: data.muted,
        }
    }
}

pub struct MuteSync {
    client: reqwest::Client,
    url: String,
}

impl MuteSync {
    pub fn new(ip: &str, port: u16, token: &str) -> Result<Self, PresenceError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url: format!("http://{}:{}/state", ip, port),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PresenceClient for MuteSync {
    async fn query(&self) -> Result<PresenceSnapshot, PresenceError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PresenceError::Status(status));
        }
        let state: StateResponse = response.json().await?;
        debug!(
            "mutesync state for {} ({}): in_meeting={} muted={}",
            state.data.hostname.as_deref().unwrap_or("?"),
            state.data.user_id.as_deref().unwrap_or("?"),
            state.data.in_meeting,
            state.data.muted
        );
        Ok(state.data.into())
    }
}
