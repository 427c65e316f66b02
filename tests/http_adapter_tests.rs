//! Integration tests for the HTTP request adapter
//!
//! Runs the reqwest adapter against a local wiremock server.

use resqher::backend::{Endpoint, HttpAdapter, RequestAdapter, RequestPayload};
use resqher::config::BackendConfig;
use resqher::error::AdapterError;
use resqher::session::{PrimeOutcome, SubmitOutcome};
use resqher::surfaces::legal_session;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter_for(server: &MockServer) -> HttpAdapter {
    HttpAdapter::new(BackendConfig::new(server.uri()))
}

mod contract_tests {
    use super::*;

    #[tokio::test]
    async fn test_law_bot_question_and_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/law_bot"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "question": "What are my rights?" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "answer": "You have the right to...",
                "sources": ["Statute A"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = adapter_for(&server)
            .send(
                Endpoint::LawBot,
                RequestPayload::Question("What are my rights?".into()),
            )
            .await
            .expect("law bot reply");

        assert_eq!(reply.text, "You have the right to...");
        assert_eq!(reply.citations, vec!["Statute A"]);
    }

    #[tokio::test]
    async fn test_expand_message_keywords() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/expand_message"))
            .and(body_json(json!({ "keywords": "trap, locked, address is 123" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "expanded_text": "I am locked in at 123 and need urgent help.",
                "model_used": "gemini-2.5-flash"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = adapter_for(&server)
            .send(
                Endpoint::ExpandMessage,
                RequestPayload::Keywords("trap, locked, address is 123".into()),
            )
            .await
            .expect("expanded message");

        assert_eq!(reply.text, "I am locked in at 123 and need urgent help.");
        assert_eq!(reply.model_used.as_deref(), Some("gemini-2.5-flash"));
    }

    #[tokio::test]
    async fn test_load_legal_data_accepts_any_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/load_legal_data"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let reply = adapter_for(&server)
            .send(Endpoint::LoadLegalData, RequestPayload::Empty)
            .await;

        assert!(reply.is_ok());
    }
}

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_non_success_status_is_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/law_bot"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({ "detail": "Law Bot query failed: boom" })),
            )
            .mount(&server)
            .await;

        let err = adapter_for(&server)
            .send(Endpoint::LawBot, RequestPayload::Question("hi".into()))
            .await
            .unwrap_err();

        assert_eq!(err, AdapterError::BadStatus(500));
    }

    #[tokio::test]
    async fn test_unexpected_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/expand_message"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
            .mount(&server)
            .await;

        let err = adapter_for(&server)
            .send(Endpoint::ExpandMessage, RequestPayload::Keywords("help".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn test_missing_base_address_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let adapter = HttpAdapter::new(BackendConfig::default());
        let err = adapter
            .send(Endpoint::LawBot, RequestPayload::Question("hi".into()))
            .await
            .unwrap_err();

        assert_eq!(err, AdapterError::MissingConfiguration);
    }

    #[tokio::test]
    async fn test_closed_port_is_network_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let adapter = HttpAdapter::new(BackendConfig::new(format!("http://127.0.0.1:{port}")));

        let err = adapter
            .send(Endpoint::LawBot, RequestPayload::Question("hi".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::NetworkUnreachable(_)));
    }

    #[tokio::test]
    async fn test_configured_timeout_is_enforced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/law_bot"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "answer": "late", "sources": [] }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let adapter = HttpAdapter::new(
            BackendConfig::new(server.uri()).with_timeout(Duration::from_millis(100)),
        );
        let err = adapter
            .send(Endpoint::LawBot, RequestPayload::Question("hi".into()))
            .await
            .unwrap_err();

        assert!(
            matches!(err, AdapterError::NetworkUnreachable(ref msg) if msg.contains("timed out")),
            "unexpected error: {err:?}"
        );
    }
}

mod session_over_http_tests {
    use super::*;

    #[tokio::test]
    async fn test_legal_session_primes_once_and_answers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/load_legal_data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "Successfully loaded 8 legal documents."
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/law_bot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "answer": "You may request a protection order.",
                "sources": ["Protection of Women from Domestic Violence Act"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = legal_session(Arc::new(adapter_for(&server)));
        session.activate().unwrap().await.unwrap();
        assert_eq!(session.ensure_loaded().await, Some(PrimeOutcome::AlreadyLoaded));

        assert_eq!(
            session.submit("Can I get protection?").await,
            SubmitOutcome::Answered
        );
        let last = session.messages().pop().unwrap();
        assert_eq!(last.text, "You may request a protection order.");
        assert_eq!(
            last.citations,
            vec!["Protection of Women from Domestic Violence Act"]
        );
    }
}
