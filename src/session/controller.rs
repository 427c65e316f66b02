use super::primer::{KnowledgeBasePrimer, PrimeOutcome};
use super::responder::Responder;
use crate::backend::Reply;
use crate::config::RetryPolicy;
use crate::error::{AdapterError, AdapterResult};
use crate::surfaces::SurfaceConfig;
use crate::types::{Message, MessageId, Phase, Sender, SessionSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use time::OffsetDateTime;
use tokio::task::JoinHandle;

/// Shown in place of the assistant turn while a reply is outstanding.
pub const PENDING_PLACEHOLDER: &str = "…";

/// `last_error` for a submission whose future was dropped mid-request.
pub const CANCELLED: &str = "request cancelled";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    /// A submission is already in flight for this session.
    Busy,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Answered,
    /// The apology was appended; the error is the diagnostic.
    Failed(AdapterError),
    Ignored(IgnoreReason),
}

#[derive(Default)]
struct SessionState {
    messages: Vec<Message>,
    phase: Phase,
    last_error: Option<String>,
    last_answered_at: Option<OffsetDateTime>,
    next_id: u64,
}

impl SessionState {
    fn append(&mut self, sender: Sender, text: String, citations: Vec<String>) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            text,
            sender,
            citations,
            created_at: OffsetDateTime::now_utc(),
        });
        id
    }
}

struct Inner {
    surface: SurfaceConfig,
    responder: Arc<dyn Responder>,
    primer: Option<KnowledgeBasePrimer>,
    retry: RetryPolicy,
    activated: AtomicBool,
    state: Mutex<SessionState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter_awaiting_prerequisite(&self) {
        let mut state = self.lock();
        if state.phase == Phase::Idle {
            state.phase = Phase::AwaitingPrerequisite;
        }
    }

    /// A submission that ran meanwhile owns the phase; leave it alone.
    fn leave_awaiting_prerequisite(&self) {
        let mut state = self.lock();
        if state.phase == Phase::AwaitingPrerequisite {
            state.phase = Phase::Idle;
        }
    }

    fn apply(&self, result: AdapterResult<Reply>) -> SubmitOutcome {
        let surface = &self.surface;
        let mut state = self.lock();
        match result {
            Ok(reply) => {
                if surface.dispatch_replies {
                    tracing::info!(
                        target: "resqher::dispatch",
                        to = "emergency contacts and police",
                        model = reply.model_used.as_deref().unwrap_or("unknown"),
                        alert = %reply.text,
                        "Dispatching alert"
                    );
                }
                state.append(Sender::Assistant, reply.text, reply.citations);
                state.phase = Phase::Idle;
                state.last_answered_at = Some(OffsetDateTime::now_utc());
                SubmitOutcome::Answered
            }
            Err(err) => {
                tracing::warn!(surface = surface.kind.name(), error = %err, "Request failed");
                state.append(Sender::Assistant, surface.apology.clone(), Vec::new());
                state.phase = Phase::Error;
                state.last_error = Some(err.to_string());
                SubmitOutcome::Failed(err)
            }
        }
    }

    /// The submission future was dropped before its reply arrived.
    fn cancel_submission(&self) {
        let mut state = self.lock();
        if state.phase != Phase::Submitting {
            return;
        }
        tracing::warn!(
            surface = self.surface.kind.name(),
            "Submission dropped before its reply arrived"
        );
        state.append(Sender::Assistant, self.surface.apology.clone(), Vec::new());
        state.phase = Phase::Error;
        state.last_error = Some(CANCELLED.to_string());
    }
}

/// A submission between its user turn and its reply. Dropped unsettled, it
/// ends the turn as cancelled so the session takes input again.
struct PendingSubmission<'a> {
    inner: &'a Inner,
    settled: bool,
}

impl PendingSubmission<'_> {
    fn settle(mut self, result: AdapterResult<Reply>) -> SubmitOutcome {
        self.settled = true;
        self.inner.apply(result)
    }
}

impl Drop for PendingSubmission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.inner.cancel_submission();
        }
    }
}

/// Holds the session in `AwaitingPrerequisite` until dropped.
struct PrerequisiteWindow<'a>(&'a Inner);

impl<'a> PrerequisiteWindow<'a> {
    fn enter(inner: &'a Inner) -> Self {
        inner.enter_awaiting_prerequisite();
        Self(inner)
    }
}

impl Drop for PrerequisiteWindow<'_> {
    fn drop(&mut self) {
        self.0.leave_awaiting_prerequisite();
    }
}

/// Priming spawned by `activate`. Only weakly tied to its session; an
/// aborted task releases the primer and the phase it took.
struct DetachedPriming {
    session: Weak<Inner>,
    surface: &'static str,
    settled: bool,
}

impl DetachedPriming {
    fn settle(mut self, result: AdapterResult<Reply>) {
        self.settled = true;
        let Some(inner) = self.session.upgrade() else {
            tracing::debug!(surface = self.surface, "Session unmounted; discarding priming result");
            return;
        };
        if let Some(primer) = inner.primer.as_ref() {
            primer.finish(result);
        }
        inner.leave_awaiting_prerequisite();
    }
}

impl Drop for DetachedPriming {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(inner) = self.session.upgrade() {
            if let Some(primer) = inner.primer.as_ref() {
                primer.release();
            }
            inner.leave_awaiting_prerequisite();
        }
    }
}

/// Assembles a [`SessionController`]; everything is fixed once built.
pub struct SessionBuilder {
    surface: SurfaceConfig,
    responder: Arc<dyn Responder>,
    primer: Option<KnowledgeBasePrimer>,
    retry: RetryPolicy,
}

impl SessionBuilder {
    /// Attach a knowledge base that must be primed.
    pub fn primer(mut self, primer: KnowledgeBasePrimer) -> Self {
        self.primer = Some(primer);
        self
    }

    /// Opt in to automatic retries.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> SessionController {
        let mut state = SessionState::default();
        if let Some(greeting) = self.surface.greeting.clone() {
            state.append(Sender::Assistant, greeting, Vec::new());
        }
        SessionController {
            inner: Arc::new(Inner {
                surface: self.surface,
                responder: self.responder,
                primer: self.primer,
                retry: self.retry,
                activated: AtomicBool::new(false),
                state: Mutex::new(state),
            }),
        }
    }
}

/// One conversation: transcript, phase and the request lifecycle.
///
/// Handles are cheap to clone and share one session. The session is
/// unmounted when the last handle is dropped; priming started by
/// [`activate`](Self::activate) only holds a weak reference and discards its
/// result if that has happened.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(surface: SurfaceConfig, responder: Arc<dyn Responder>) -> Self {
        Self::builder(surface, responder).build()
    }

    pub fn builder(surface: SurfaceConfig, responder: Arc<dyn Responder>) -> SessionBuilder {
        SessionBuilder {
            surface,
            responder,
            primer: None,
            retry: RetryPolicy::disabled(),
        }
    }

    pub fn surface(&self) -> &SurfaceConfig {
        &self.inner.surface
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().messages.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }

    /// `None` for surfaces without a knowledge base.
    pub fn is_primed(&self) -> Option<bool> {
        self.inner.primer.as_ref().map(KnowledgeBasePrimer::is_loaded)
    }

    /// Why the last priming attempt failed, if it did. Never shown in the transcript.
    pub fn prerequisite_diagnostic(&self) -> Option<String> {
        self.inner
            .primer
            .as_ref()
            .and_then(KnowledgeBasePrimer::last_diagnostic)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let primed = self.is_primed();
        let state = self.inner.lock();
        SessionSnapshot {
            messages: state.messages.clone(),
            phase: state.phase,
            last_error: state.last_error.clone(),
            last_answered_at: state.last_answered_at,
            primed,
            pending_placeholder: (state.phase == Phase::Submitting).then_some(PENDING_PLACEHOLDER),
        }
    }

    /// Submit one user turn and wait for the assistant's reply.
    ///
    /// The user message is appended before the first suspension point. Blank
    /// input (per the surface policy) and submissions made while another is
    /// in flight return `Ignored` without touching the session.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let surface = &self.inner.surface;
        let Some(text) = surface.prepare_input(text) else {
            tracing::debug!(surface = surface.kind.name(), "Ignoring blank submission");
            return SubmitOutcome::Ignored(IgnoreReason::EmptyInput);
        };

        {
            let mut state = self.inner.lock();
            if state.phase == Phase::Submitting {
                tracing::debug!(
                    surface = surface.kind.name(),
                    "Submission already in flight; ignoring"
                );
                return SubmitOutcome::Ignored(IgnoreReason::Busy);
            }
            state.append(Sender::User, text.clone(), Vec::new());
            state.phase = Phase::Submitting;
            state.last_error = None;
        }

        let pending = PendingSubmission {
            inner: &self.inner,
            settled: false,
        };
        let result = self.request_reply(&text).await;
        pending.settle(result)
    }

    async fn request_reply(&self, text: &str) -> AdapterResult<Reply> {
        let retry = self.inner.retry;
        let mut attempt = 0;
        loop {
            match self.inner.responder.respond(text).await {
                Err(err) if err.is_retryable() && attempt < retry.max_retries => {
                    let delay = retry.delay_for(attempt);
                    attempt += 1;
                    tracing::info!(
                        surface = self.inner.surface.kind.name(),
                        error = %err,
                        attempt,
                        ?delay,
                        "Retrying failed request"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    /// Prime the knowledge base inline. `None` when the surface has none.
    pub async fn ensure_loaded(&self) -> Option<PrimeOutcome> {
        let primer = self.inner.primer.as_ref()?;
        let claim = match primer.begin() {
            Ok(claim) => claim,
            Err(skipped) => return Some(skipped),
        };
        let _window = PrerequisiteWindow::enter(&self.inner);
        let result = primer.request().await;
        Some(claim.finish(result))
    }

    /// Start priming in the background the first time the surface becomes
    /// active. Later calls, and surfaces without a primer, return `None`.
    ///
    /// Must be called within a tokio runtime.
    pub fn activate(&self) -> Option<JoinHandle<()>> {
        let primer = self.inner.primer.as_ref()?;
        if self.inner.activated.swap(true, Ordering::AcqRel) {
            return None;
        }
        let claim = primer.begin().ok()?;
        self.inner.enter_awaiting_prerequisite();

        let request = primer.request();
        claim.detach();
        let pending = DetachedPriming {
            session: Arc::downgrade(&self.inner),
            surface: self.inner.surface.kind.name(),
            settled: false,
        };
        Some(tokio::spawn(async move {
            let result = request.await;
            pending.settle(result);
        }))
    }
}
