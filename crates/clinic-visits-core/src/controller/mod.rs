//! Visit lifecycle controller.
//!
//! The single owner of the in-memory visit list. Writes go to the store
//! first; when a write fails, check-in, mark-seen and delete fall back to a
//! local change that is never reconciled with the store. Edits do not.

mod list;

pub use list::*;

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::feed::{ChangeEvent, Subscription};
use crate::identity::IdentityProvider;
use crate::models::{CheckInForm, FormError, NewVisit, Visit, VisitFields, VisitUpdate};
use crate::stats::DailyStats;
use crate::store::{StoreError, VisitStore};

/// Controller errors. Display text is the banner shown to staff.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Fetch Error: {0}")]
    Fetch(#[source] StoreError),

    #[error("Insert Error: {0}")]
    Insert(#[source] StoreError),

    #[error("Update Error: {0}")]
    Update(#[source] StoreError),

    #[error("Delete Error: {0}")]
    Delete(#[source] StoreError),

    #[error("Subscribe Error: {0}")]
    Subscribe(#[source] StoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] FormError),
}

pub type ControllerResult<T> = Result<T, ControllerError>;

/// Result of a successful check-in.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckInOutcome {
    Created(Visit),
    Updated(Visit),
}

impl CheckInOutcome {
    pub fn visit(&self) -> &Visit {
        match self {
            CheckInOutcome::Created(visit) | CheckInOutcome::Updated(visit) => visit,
        }
    }
}

/// Owns the visit list and mediates every change to it.
pub struct VisitController<S: VisitStore, I: IdentityProvider> {
    store: S,
    identity: I,
    visits: VisitList,
    form: CheckInForm,
    subscription: Option<Subscription>,
    last_error: Option<String>,
    loading: bool,
}

impl<S: VisitStore, I: IdentityProvider> VisitController<S, I> {
    pub fn new(store: S, identity: I) -> Self {
        Self {
            store,
            identity,
            visits: VisitList::default(),
            form: CheckInForm::default(),
            subscription: None,
            last_error: None,
            loading: true,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// All visits, newest first.
    pub fn visits(&self) -> &[Visit] {
        self.visits.as_slice()
    }

    pub fn visit(&self, id: &str) -> Option<&Visit> {
        self.visits.get(id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn form(&self) -> &CheckInForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut CheckInForm {
        &mut self.form
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.form.editing_id.as_deref()
    }

    /// Most recent store failure, verbatim. Stays until cleared.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_last_error(&mut self) {
        self.last_error = None;
    }

    /// True until the first load attempt finishes.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Today's statistics on the local clock.
    pub fn stats(&self) -> DailyStats {
        DailyStats::compute(self.visits())
    }

    pub fn stats_at<Tz: TimeZone>(&self, now: DateTime<Tz>) -> DailyStats {
        DailyStats::compute_at(self.visits(), now)
    }

    fn fail(&mut self, error: ControllerError) -> ControllerError {
        tracing::warn!(error = %error, "visit store operation failed");
        self.last_error = Some(error.to_string());
        error
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Replace the list with the store's current contents.
    ///
    /// On failure the list is left empty.
    pub fn load(&mut self) -> ControllerResult<usize> {
        let result = self.store.list();
        self.loading = false;

        match result {
            Ok(visits) => {
                self.visits = VisitList::from(visits);
                tracing::info!(count = self.visits.len(), "loaded visits");
                Ok(self.visits.len())
            }
            Err(e) => {
                self.visits.clear();
                Err(self.fail(ControllerError::Fetch(e)))
            }
        }
    }

    /// Start listening to the store's change feed. A second call is a no-op.
    pub fn subscribe(&mut self) -> ControllerResult<()> {
        if self.subscription.is_some() {
            return Ok(());
        }
        match self.store.subscribe() {
            Ok(subscription) => {
                tracing::info!("subscribed to visit changes");
                self.subscription = Some(subscription);
                Ok(())
            }
            Err(e) => Err(self.fail(ControllerError::Subscribe(e))),
        }
    }

    /// Apply every pending feed event in arrival order. Returns how many
    /// changed the list.
    pub fn sync_changes(&mut self) -> usize {
        let events = match &self.subscription {
            Some(subscription) => subscription.drain(),
            None => return 0,
        };
        events
            .into_iter()
            .map(|event| self.apply_change(event))
            .filter(|changed| *changed)
            .count()
    }

    /// Apply a single feed event. Malformed rows are logged and skipped.
    pub fn apply_change(&mut self, event: ChangeEvent) -> bool {
        let id = event.visit_id().to_string();
        match self.visits.apply(event) {
            Ok(changed) => {
                tracing::debug!(visit = %id, changed, "applied change event");
                changed
            }
            Err(e) => {
                tracing::warn!(visit = %id, error = %e, "skipping malformed change event");
                false
            }
        }
    }

    /// Stop listening to the change feed.
    pub fn dispose(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::info!("unsubscribed from visit changes");
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Register a new visit, or update the details of `editing_id`.
    ///
    /// A failed insert still shows a local placeholder; a failed edit changes
    /// nothing locally.
    pub fn check_in(
        &mut self,
        fields: VisitFields,
        editing_id: Option<&str>,
    ) -> ControllerResult<CheckInOutcome> {
        if fields.name.trim().is_empty() {
            return Err(FormError::MissingName.into());
        }

        match editing_id {
            None => {
                let new = NewVisit::new(fields, self.identity.subject_or_anonymous());
                match self.store.insert(&new) {
                    Ok(visit) => {
                        tracing::debug!(visit = %visit.id, "visit checked in");
                        self.visits.prepend(visit.clone());
                        Ok(CheckInOutcome::Created(visit))
                    }
                    Err(e) => {
                        let placeholder = Visit::local_placeholder(&new);
                        tracing::debug!(visit = %placeholder.id, "showing unsaved placeholder");
                        self.visits.prepend(placeholder);
                        Err(self.fail(ControllerError::Insert(e)))
                    }
                }
            }
            Some(id) => match self.store.update(id, &VisitUpdate::Details(fields)) {
                Ok(visit) => {
                    tracing::debug!(visit = %visit.id, "visit details updated");
                    self.visits.merge(&visit);
                    Ok(CheckInOutcome::Updated(visit))
                }
                Err(e) => Err(self.fail(ControllerError::Update(e))),
            },
        }
    }

    /// Submit the check-in form.
    ///
    /// The form is reset after any insert and after a successful edit. A
    /// failed edit keeps the form and its edit target for a retry.
    pub fn submit(&mut self) -> ControllerResult<CheckInOutcome> {
        let fields = self.form.to_fields()?;
        let editing_id = self.form.editing_id.clone();

        self.form.submitting = true;
        let result = self.check_in(fields, editing_id.as_deref());
        self.form.submitting = false;

        if editing_id.is_none() || result.is_ok() {
            self.form.reset();
        }
        result
    }

    /// Load a visit into the form for editing.
    pub fn start_edit(&mut self, id: &str) -> bool {
        match self.visits.get(id) {
            Some(visit) => {
                let visit = visit.clone();
                self.form.load_from(&visit);
                true
            }
            None => false,
        }
    }

    pub fn cancel_edit(&mut self) {
        self.form.reset();
    }

    /// Check a patient out. Already-seen visits are left alone.
    pub fn mark_seen(&mut self, id: &str) -> ControllerResult<()> {
        if self.visits.get(id).is_some_and(Visit::is_seen) {
            tracing::debug!(visit = %id, "visit already seen");
            return Ok(());
        }

        let seen_at = Utc::now();
        match self.store.update(id, &VisitUpdate::MarkSeen { seen_at }) {
            Ok(visit) => {
                self.visits.merge(&visit);
                Ok(())
            }
            Err(e) => {
                self.visits.mark_seen(id, seen_at);
                Err(self.fail(ControllerError::Update(e)))
            }
        }
    }

    /// Delete a visit. The local copy is removed whether or not the store
    /// call succeeds.
    pub fn delete(&mut self, id: &str) -> ControllerResult<()> {
        let result = self.store.delete(id);
        self.visits.remove(id);
        result.map_err(|e| self.fail(ControllerError::Delete(e)))
    }
}
