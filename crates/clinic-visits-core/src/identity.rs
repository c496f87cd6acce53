//! Identity of the user operating the front desk.
//!
//! Only used to stamp `created_by` on new visits. A missing identity never
//! blocks an operation; [`ANONYMOUS_SUBJECT`] is used instead.

use crate::config::IdentityConfig;

/// Marker stamped on visits created without an identity.
pub const ANONYMOUS_SUBJECT: &str = "anon";

/// Source of the current subject id.
pub trait IdentityProvider: Send {
    fn current_subject_id(&self) -> Option<String>;

    /// The subject id, or [`ANONYMOUS_SUBJECT`] when there is none.
    fn subject_or_anonymous(&self) -> String {
        self.current_subject_id()
            .unwrap_or_else(|| ANONYMOUS_SUBJECT.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Signed in as a configured subject
    SignedIn { subject: String },
    /// Anonymous session with a generated subject
    Anonymous { subject: String },
    SignedOut,
}

/// A sign-in session resolved at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySession {
    state: SessionState,
}

impl IdentitySession {
    /// Sign in as the configured subject, falling back to an anonymous
    /// session when allowed.
    pub fn sign_in(config: &IdentityConfig) -> Self {
        let subject = config
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let state = match subject {
            Some(subject) => SessionState::SignedIn {
                subject: subject.to_string(),
            },
            None if config.allow_anonymous => SessionState::Anonymous {
                subject: uuid::Uuid::new_v4().simple().to_string(),
            },
            None => {
                tracing::warn!("no identity configured; visits will be stamped anonymous");
                SessionState::SignedOut
            }
        };

        tracing::debug!(state = ?state, "identity session established");
        Self { state }
    }

    pub fn signed_out() -> Self {
        Self {
            state: SessionState::SignedOut,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn sign_out(&mut self) {
        self.state = SessionState::SignedOut;
    }
}

impl IdentityProvider for IdentitySession {
    fn current_subject_id(&self) -> Option<String> {
        match &self.state {
            SessionState::SignedIn { subject } | SessionState::Anonymous { subject } => {
                Some(subject.clone())
            }
            SessionState::SignedOut => None,
        }
    }
}
