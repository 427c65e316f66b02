//! Backend access for the ResQ-Her surfaces
//!
//! All calls are JSON over HTTP to a single configured base address. The
//! request adapter performs exactly one attempt per call and classifies the
//! outcome into [`AdapterError`](crate::error::AdapterError); retrying is the
//! session controller's business.
//!
//! # Architecture
//!
//! - `client` - reqwest-backed [`HttpAdapter`]
//! - `contract` - per-endpoint request/response bodies
//!
//! # Usage
//!
//! ```rust,no_run
//! use resqher::backend::{Endpoint, HttpAdapter, RequestAdapter, RequestPayload};
//! use resqher::config::BackendConfig;
//!
//! # async fn example() -> Result<(), resqher::error::AdapterError> {
//! let adapter = HttpAdapter::new(BackendConfig::new("http://localhost:8000"));
//! let reply = adapter
//!     .send(Endpoint::LawBot, RequestPayload::Question("What are my rights?".into()))
//!     .await?;
//! println!("{} ({} sources)", reply.text, reply.citations.len());
//! # Ok(())
//! # }
//! ```
mod client;
mod contract;

pub use client::HttpAdapter;

use crate::error::AdapterResult;
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    LawBot,
    LoadLegalData,
    ExpandMessage,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::LawBot => "/api/law_bot",
            Endpoint::LoadLegalData => "/api/load_legal_data",
            Endpoint::ExpandMessage => "/api/expand_message",
        }
    }

    /// Wrap a user utterance in the payload shape this endpoint expects.
    pub fn payload_for(self, text: &str) -> RequestPayload {
        match self {
            Endpoint::LawBot => RequestPayload::Question(text.to_string()),
            Endpoint::ExpandMessage => RequestPayload::Keywords(text.to_string()),
            Endpoint::LoadLegalData => RequestPayload::Empty,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestPayload {
    Question(String),
    Keywords(String),
    Empty,
}

/// Normalized backend response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub citations: Vec<String>,
    pub model_used: Option<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_citations<I, S>(mut self, citations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.citations = citations.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
pub trait RequestAdapter: Send + Sync {
    async fn send(&self, endpoint: Endpoint, payload: RequestPayload) -> AdapterResult<Reply>;
}
