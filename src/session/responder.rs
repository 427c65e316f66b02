use crate::backend::{Endpoint, Reply, RequestAdapter};
use crate::error::AdapterResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Source of assistant replies for a session.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, text: &str) -> AdapterResult<Reply>;
}

/// Answers by calling one backend endpoint through a request adapter.
pub struct RemoteResponder {
    adapter: Arc<dyn RequestAdapter>,
    endpoint: Endpoint,
}

impl RemoteResponder {
    pub fn new(adapter: Arc<dyn RequestAdapter>, endpoint: Endpoint) -> Self {
        Self { adapter, endpoint }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }
}

#[async_trait]
impl Responder for RemoteResponder {
    async fn respond(&self, text: &str) -> AdapterResult<Reply> {
        self.adapter
            .send(self.endpoint, self.endpoint.payload_for(text))
            .await
    }
}

/// Stand-in for a surface with no backend: waits, then returns a canned reply.
pub struct SimulatedResponder {
    delay: Duration,
    reply: String,
}

impl SimulatedResponder {
    pub fn new(delay: Duration, reply: impl Into<String>) -> Self {
        Self {
            delay,
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl Responder for SimulatedResponder {
    async fn respond(&self, _text: &str) -> AdapterResult<Reply> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Reply::text(self.reply.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RequestPayload;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAdapter {
        seen: Mutex<Vec<(Endpoint, RequestPayload)>>,
    }

    #[async_trait]
    impl RequestAdapter for RecordingAdapter {
        async fn send(&self, endpoint: Endpoint, payload: RequestPayload) -> AdapterResult<Reply> {
            self.seen.lock().unwrap().push((endpoint, payload));
            Ok(Reply::text("ok"))
        }
    }

    #[tokio::test]
    async fn remote_responder_wraps_text_for_its_endpoint() {
        let adapter = Arc::new(RecordingAdapter::default());
        let responder = RemoteResponder::new(adapter.clone(), Endpoint::ExpandMessage);

        let reply = responder.respond("locked in, 123 Main").await.unwrap();

        assert_eq!(reply.text, "ok");
        assert_eq!(
            adapter.seen.lock().unwrap().as_slice(),
            &[(
                Endpoint::ExpandMessage,
                RequestPayload::Keywords("locked in, 123 Main".into())
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_responder_waits_before_replying() {
        let responder = SimulatedResponder::new(Duration::from_secs(2), "I hear you.");
        let started = tokio::time::Instant::now();

        let reply = responder.respond("hi").await.unwrap();

        assert_eq!(reply.text, "I hear you.");
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
