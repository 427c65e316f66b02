use super::{Endpoint, Reply, RequestAdapter, RequestPayload, contract};
use crate::config::BackendConfig;
use crate::error::{AdapterError, AdapterResult};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

/// reqwest client for the ResQ-Her backend
pub struct HttpAdapter {
    client: Client,
    config: BackendConfig,
}

impl HttpAdapter {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn url_for(&self, endpoint: Endpoint) -> AdapterResult<String> {
        let base = self
            .config
            .base_url
            .as_deref()
            .ok_or(AdapterError::MissingConfiguration)?;
        Ok(format!("{}{}", base, endpoint.path()))
    }

    fn classify(&self, err: reqwest::Error) -> AdapterError {
        match self.config.request_timeout {
            Some(after) if err.is_timeout() => AdapterError::timed_out(after),
            _ => AdapterError::from(err),
        }
    }
}

#[async_trait]
impl RequestAdapter for HttpAdapter {
    async fn send(&self, endpoint: Endpoint, payload: RequestPayload) -> AdapterResult<Reply> {
        // Checked before any I/O so a missing address never looks like an outage.
        let url = self.url_for(endpoint)?;
        let body = contract::encode(endpoint, &payload)?;

        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        if let Some(timeout) = self.config.request_timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!(endpoint = endpoint.path(), "Sending backend request");

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            tracing::debug!(
                endpoint = endpoint.path(),
                status = status.as_u16(),
                body = %body,
                "Backend returned error status"
            );
            return Err(AdapterError::BadStatus(status.as_u16()));
        }

        contract::decode(endpoint, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_and_path() {
        let adapter = HttpAdapter::new(BackendConfig::new("http://localhost:8000/"));
        assert_eq!(
            adapter.url_for(Endpoint::LawBot).unwrap(),
            "http://localhost:8000/api/law_bot"
        );
    }

    #[test]
    fn unset_base_is_missing_configuration() {
        let adapter = HttpAdapter::new(BackendConfig::default());
        assert_eq!(
            adapter.url_for(Endpoint::ExpandMessage),
            Err(AdapterError::MissingConfiguration)
        );
    }
}
