//! The three assistant surfaces, each one configuration of [`SessionController`].

use crate::backend::{Endpoint, HttpAdapter, RequestAdapter};
use crate::config::AppConfig;
use crate::session::{
    KnowledgeBasePrimer, RemoteResponder, SessionBuilder, SessionController, SimulatedResponder,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const LEGAL_GREETING: &str = "Hello! I am the ResQ-Her Law Bot. I provide confidential guidance on your legal rights based on our knowledge base. Ask me anything about your rights.";
const LEGAL_APOLOGY: &str =
    "I'm sorry, I couldn't reach the legal AI service just now. Please try asking again in a moment.";

const SOS_GREETING: &str =
    "Use the button or enter keywords to generate a formal alert message for authorities.";
const SOS_APOLOGY: &str =
    "Failed to connect to the SOS service. Please check your network and try again.";
pub const SOS_DEFAULT_KEYWORDS: &str = "Immediate help needed at my location.";

const THERAPY_GREETING: &str =
    "I am here to listen without judgment. All conversations are private and confidential.";
const THERAPY_APOLOGY: &str =
    "I'm sorry, I couldn't respond just now. I'm still here whenever you're ready to try again.";
pub const THERAPY_REPLY: &str =
    "I hear you. Take a deep breath. What would you like to share with me today?";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Legal,
    Sos,
    Therapy,
}

impl SurfaceKind {
    pub fn name(self) -> &'static str {
        match self {
            SurfaceKind::Legal => "legal",
            SurfaceKind::Sos => "sos",
            SurfaceKind::Therapy => "therapy",
        }
    }
}

impl FromStr for SurfaceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legal" | "law" | "law-bot" => Ok(SurfaceKind::Legal),
            "sos" => Ok(SurfaceKind::Sos),
            "therapy" | "therapy-bot" => Ok(SurfaceKind::Therapy),
            other => Err(format!(
                "unknown surface {other:?}; expected legal, sos or therapy"
            )),
        }
    }
}

/// What a submission with blank text does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmptyInputPolicy {
    Reject,
    /// Submit this text instead.
    Substitute(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub kind: SurfaceKind,
    pub greeting: Option<String>,
    /// Fixed text shown in place of any failed reply.
    pub apology: String,
    pub empty_input: EmptyInputPolicy,
    /// Log each successful reply as an outgoing alert.
    pub dispatch_replies: bool,
}

impl SurfaceConfig {
    pub fn legal() -> Self {
        Self {
            kind: SurfaceKind::Legal,
            greeting: Some(LEGAL_GREETING.to_string()),
            apology: LEGAL_APOLOGY.to_string(),
            empty_input: EmptyInputPolicy::Reject,
            dispatch_replies: false,
        }
    }

    pub fn sos() -> Self {
        Self {
            kind: SurfaceKind::Sos,
            greeting: Some(SOS_GREETING.to_string()),
            apology: SOS_APOLOGY.to_string(),
            empty_input: EmptyInputPolicy::Substitute(SOS_DEFAULT_KEYWORDS.to_string()),
            dispatch_replies: true,
        }
    }

    pub fn therapy() -> Self {
        Self {
            kind: SurfaceKind::Therapy,
            greeting: Some(THERAPY_GREETING.to_string()),
            apology: THERAPY_APOLOGY.to_string(),
            empty_input: EmptyInputPolicy::Reject,
            dispatch_replies: false,
        }
    }

    pub fn for_kind(kind: SurfaceKind) -> Self {
        match kind {
            SurfaceKind::Legal => Self::legal(),
            SurfaceKind::Sos => Self::sos(),
            SurfaceKind::Therapy => Self::therapy(),
        }
    }

    /// Trimmed text to submit, or `None` when the input should be ignored.
    pub fn prepare_input(&self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
        match &self.empty_input {
            EmptyInputPolicy::Reject => None,
            EmptyInputPolicy::Substitute(default) => Some(default.clone()),
        }
    }
}

/// Legal Q&A with knowledge-base priming, ready for further configuration.
pub fn legal_builder(adapter: Arc<dyn RequestAdapter>) -> SessionBuilder {
    let primer = KnowledgeBasePrimer::new(Arc::clone(&adapter));
    let responder = RemoteResponder::new(adapter, Endpoint::LawBot);
    SessionController::builder(SurfaceConfig::legal(), Arc::new(responder)).primer(primer)
}

pub fn sos_builder(adapter: Arc<dyn RequestAdapter>) -> SessionBuilder {
    let responder = RemoteResponder::new(adapter, Endpoint::ExpandMessage);
    SessionController::builder(SurfaceConfig::sos(), Arc::new(responder))
}

/// Supportive chat. No backend exists for it yet, so replies are simulated.
pub fn therapy_builder(delay: Duration) -> SessionBuilder {
    let responder = SimulatedResponder::new(delay, THERAPY_REPLY);
    SessionController::builder(SurfaceConfig::therapy(), Arc::new(responder))
}

pub fn legal_session(adapter: Arc<dyn RequestAdapter>) -> SessionController {
    legal_builder(adapter).build()
}

pub fn sos_session(adapter: Arc<dyn RequestAdapter>) -> SessionController {
    sos_builder(adapter).build()
}

pub fn therapy_session(delay: Duration) -> SessionController {
    therapy_builder(delay).build()
}

/// Build the session for `kind` against the configured HTTP backend.
pub fn open(kind: SurfaceKind, config: &AppConfig) -> SessionController {
    let adapter: Arc<dyn RequestAdapter> = Arc::new(HttpAdapter::new(config.backend.clone()));
    let builder = match kind {
        SurfaceKind::Legal => legal_builder(adapter),
        SurfaceKind::Sos => sos_builder(adapter),
        SurfaceKind::Therapy => therapy_builder(config.therapy_delay),
    };
    builder.retry(config.retry).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_names() {
        assert_eq!("legal".parse::<SurfaceKind>(), Ok(SurfaceKind::Legal));
        assert_eq!(" SOS ".parse::<SurfaceKind>(), Ok(SurfaceKind::Sos));
        assert_eq!("therapy-bot".parse::<SurfaceKind>(), Ok(SurfaceKind::Therapy));
        assert!("chat".parse::<SurfaceKind>().is_err());
    }

    #[test]
    fn legal_rejects_blank_input() {
        let surface = SurfaceConfig::legal();
        assert_eq!(surface.prepare_input("   \n\t"), None);
        assert_eq!(
            surface.prepare_input("  What are my rights?  ").as_deref(),
            Some("What are my rights?")
        );
    }

    #[test]
    fn sos_substitutes_default_keywords() {
        let surface = SurfaceConfig::sos();
        assert_eq!(
            surface.prepare_input("").as_deref(),
            Some(SOS_DEFAULT_KEYWORDS)
        );
        assert_eq!(surface.prepare_input(" trapped ").as_deref(), Some("trapped"));
    }

    #[test]
    fn every_surface_has_a_distinct_apology() {
        let apologies = [
            SurfaceConfig::legal().apology,
            SurfaceConfig::sos().apology,
            SurfaceConfig::therapy().apology,
        ];
        assert_ne!(apologies[0], apologies[1]);
        assert_ne!(apologies[1], apologies[2]);
    }

    #[test]
    fn open_configures_priming_only_for_legal() {
        let config = AppConfig::default();
        assert_eq!(open(SurfaceKind::Legal, &config).is_primed(), Some(false));
        assert_eq!(open(SurfaceKind::Sos, &config).is_primed(), None);
        assert_eq!(open(SurfaceKind::Therapy, &config).is_primed(), None);
    }
}
