use super::{Endpoint, Reply, RequestPayload};
use crate::error::{AdapterError, AdapterResult};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct LawBotRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct LawBotResponse {
    answer: String,
    #[serde(default)]
    sources: Vec<String>,
}

#[derive(Serialize)]
struct ExpandMessageRequest<'a> {
    keywords: &'a str,
}

#[derive(Deserialize)]
struct ExpandedMessage {
    expanded_text: String,
    #[serde(default)]
    model_used: Option<String>,
}

#[derive(Deserialize)]
struct LoadLegalDataResponse {
    message: Option<String>,
}

/// JSON body for a request, or `None` when the endpoint takes no body.
pub(crate) fn encode(endpoint: Endpoint, payload: &RequestPayload) -> AdapterResult<Option<String>> {
    let body = match (endpoint, payload) {
        (Endpoint::LawBot, RequestPayload::Question(question)) => {
            serde_json::to_string(&LawBotRequest { question })?
        }
        (Endpoint::ExpandMessage, RequestPayload::Keywords(keywords)) => {
            serde_json::to_string(&ExpandMessageRequest { keywords })?
        }
        (Endpoint::LoadLegalData, RequestPayload::Empty) => return Ok(None),
        (endpoint, payload) => {
            return Err(AdapterError::MalformedPayload(format!(
                "{payload:?} cannot be sent to {}",
                endpoint.path()
            )));
        }
    };
    Ok(Some(body))
}

/// Decode a 2xx response body according to the endpoint's contract.
pub(crate) fn decode(endpoint: Endpoint, body: &str) -> AdapterResult<Reply> {
    match endpoint {
        Endpoint::LawBot => {
            let parsed: LawBotResponse = serde_json::from_str(body)?;
            Ok(Reply {
                text: parsed.answer,
                citations: parsed.sources,
                model_used: None,
            })
        }
        Endpoint::ExpandMessage => {
            let parsed: ExpandedMessage = serde_json::from_str(body)?;
            Ok(Reply {
                text: parsed.expanded_text,
                citations: Vec::new(),
                model_used: parsed.model_used,
            })
        }
        // Any 2xx counts; the body is informational only.
        Endpoint::LoadLegalData => {
            let message = serde_json::from_str::<LoadLegalDataResponse>(body)
                .ok()
                .and_then(|parsed| parsed.message)
                .unwrap_or_default();
            Ok(Reply {
                text: message,
                ..Reply::default()
            })
        }
    }
}
