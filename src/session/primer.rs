use crate::backend::{Endpoint, Reply, RequestAdapter, RequestPayload};
use crate::error::{AdapterError, AdapterResult};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrimeOutcome {
    /// Already primed earlier; no call was made.
    AlreadyLoaded,
    /// Another priming call is outstanding; no call was made.
    InFlight,
    Loaded,
    Failed(AdapterError),
}

/// One-time readiness call for the legal knowledge base.
///
/// Owns the `loaded` flag for the life of its session. A failed call leaves
/// the flag unset so a later `ensure_loaded` may try again; it never blocks
/// the session from taking questions.
pub struct KnowledgeBasePrimer {
    adapter: Arc<dyn RequestAdapter>,
    endpoint: Endpoint,
    loaded: AtomicBool,
    in_flight: AtomicBool,
    last_diagnostic: Mutex<Option<String>>,
}

impl KnowledgeBasePrimer {
    pub fn new(adapter: Arc<dyn RequestAdapter>) -> Self {
        Self::with_endpoint(adapter, Endpoint::LoadLegalData)
    }

    pub fn with_endpoint(adapter: Arc<dyn RequestAdapter>, endpoint: Endpoint) -> Self {
        Self {
            adapter,
            endpoint,
            loaded: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            last_diagnostic: Mutex::new(None),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Diagnostic from the most recent failed priming call.
    pub fn last_diagnostic(&self) -> Option<String> {
        self.last_diagnostic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn ensure_loaded(&self) -> PrimeOutcome {
        let claim = match self.begin() {
            Ok(claim) => claim,
            Err(skipped) => return skipped,
        };
        let result = self.request().await;
        claim.finish(result)
    }

    /// Claim the right to issue the priming call. Returns the outcome to
    /// report instead when no call should be made.
    pub(crate) fn begin(&self) -> Result<PrimeClaim<'_>, PrimeOutcome> {
        if self.is_loaded() {
            return Err(PrimeOutcome::AlreadyLoaded);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PrimeOutcome::InFlight);
        }
        Ok(PrimeClaim {
            primer: self,
            settled: false,
        })
    }

    /// The priming call itself. Holds no reference to the primer, so it can
    /// outlive the session that started it.
    pub(crate) fn request(&self) -> BoxFuture<'static, AdapterResult<Reply>> {
        let adapter = Arc::clone(&self.adapter);
        let endpoint = self.endpoint;
        async move { adapter.send(endpoint, RequestPayload::Empty).await }.boxed()
    }

    pub(crate) fn finish(&self, result: AdapterResult<Reply>) -> PrimeOutcome {
        let outcome = match result {
            Ok(reply) => {
                self.loaded.store(true, Ordering::Release);
                tracing::info!(detail = %reply.text, "Legal knowledge base primed");
                PrimeOutcome::Loaded
            }
            Err(err) => {
                tracing::warn!(error = %err, "Priming the legal knowledge base failed");
                *self
                    .last_diagnostic
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(err.to_string());
                PrimeOutcome::Failed(err)
            }
        };
        self.in_flight.store(false, Ordering::Release);
        outcome
    }

    /// Give up a claim whose call will never settle.
    pub(crate) fn release(&self) {
        tracing::debug!("Priming call dropped before it settled");
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Exclusive right to issue the priming call.
///
/// Dropping an unsettled claim releases it, so a cancelled call never leaves
/// the primer stuck in flight.
pub(crate) struct PrimeClaim<'a> {
    primer: &'a KnowledgeBasePrimer,
    settled: bool,
}

impl PrimeClaim<'_> {
    pub(crate) fn finish(mut self, result: AdapterResult<Reply>) -> PrimeOutcome {
        self.settled = true;
        self.primer.finish(result)
    }

    /// Hand the claim to an owner that settles it through the primer directly.
    pub(crate) fn detach(mut self) {
        self.settled = true;
    }
}

impl Drop for PrimeClaim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.primer.release();
        }
    }
}
