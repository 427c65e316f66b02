//! Conversational session controller shared by every assistant surface.
//!
//! - `controller` - transcript, phase and single-flight submission
//! - `primer` - one-time knowledge base readiness call
//! - `responder` - where replies come from (backend or simulated)
mod controller;
mod primer;
mod responder;

pub use controller::{
    CANCELLED, IgnoreReason, PENDING_PLACEHOLDER, SessionBuilder, SessionController, SubmitOutcome,
};
pub use primer::{KnowledgeBasePrimer, PrimeOutcome};
pub use responder::{RemoteResponder, Responder, SimulatedResponder};
