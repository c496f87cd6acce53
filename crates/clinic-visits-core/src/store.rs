//! Visit store contract and the SQLite-backed implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::config::StoreConfig;
use crate::db::{Database, DbError};
use crate::feed::{ChangeEvent, ChangeFeed, Subscription};
use crate::models::{NewVisit, Visit, VisitStatus, VisitUpdate};

/// Store errors. The display text is what the front desk sees.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Database(#[from] DbError),

    #[error("visit not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unsupported store url: {0}")]
    Unsupported(String),

    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The table of visit records the lifecycle controller reads and writes.
pub trait VisitStore: Send {
    /// All visits, newest check-in first.
    fn list(&self) -> StoreResult<Vec<Visit>>;

    /// Create a waiting visit and return the stored record with its assigned id.
    fn insert(&self, new: &NewVisit) -> StoreResult<Visit>;

    /// Apply an update and return the stored record.
    fn update(&self, id: &str, update: &VisitUpdate) -> StoreResult<Visit>;

    fn delete(&self, id: &str) -> StoreResult<()>;

    /// Open a live feed of committed changes.
    fn subscribe(&self) -> StoreResult<Subscription>;
}

impl<S: VisitStore + Sync + ?Sized> VisitStore for Arc<S> {
    fn list(&self) -> StoreResult<Vec<Visit>> {
        (**self).list()
    }

    fn insert(&self, new: &NewVisit) -> StoreResult<Visit> {
        (**self).insert(new)
    }

    fn update(&self, id: &str, update: &VisitUpdate) -> StoreResult<Visit> {
        (**self).update(id, update)
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        (**self).delete(id)
    }

    fn subscribe(&self) -> StoreResult<Subscription> {
        (**self).subscribe()
    }
}

/// [`VisitStore`] over the local SQLite [`Database`], publishing every
/// committed change to an in-process [`ChangeFeed`].
pub struct SqliteVisitStore {
    db: Mutex<Database>,
    feed: Arc<ChangeFeed>,
}

impl SqliteVisitStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Mutex::new(db),
            feed: ChangeFeed::new(),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Open the store named by `config.url`: `sqlite://<path>` or `sqlite::memory:`.
    pub fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let url = config.url.trim();
        if config.anon_key.is_some() {
            tracing::debug!("SQLite visit store does not use the anon key");
        }
        if url == "sqlite::memory:" {
            return Self::open_in_memory();
        }
        match url.strip_prefix("sqlite://") {
            Some(path) if !path.is_empty() => {
                tracing::info!(path, "opening visit store");
                Self::open(path)
            }
            _ => Err(StoreError::Unsupported(url.to_string())),
        }
    }

    /// The feed this store publishes to.
    pub fn feed(&self) -> &Arc<ChangeFeed> {
        &self.feed
    }

    fn load(db: &Database, id: &str) -> StoreResult<Visit> {
        db.get_visit(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

impl VisitStore for SqliteVisitStore {
    fn list(&self) -> StoreResult<Vec<Visit>> {
        let db = self.db.lock()?;
        Ok(db.list_visits()?)
    }

    fn insert(&self, new: &NewVisit) -> StoreResult<Visit> {
        let db = self.db.lock()?;
        let visit = Visit {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.fields.name.clone(),
            age: new.fields.age,
            gender: new.fields.gender.clone(),
            service: new.fields.service,
            status: VisitStatus::Waiting,
            created_at: new.created_at,
            seen_at: None,
            created_by: new.created_by.clone(),
        };
        db.insert_visit(&visit)?;

        // Read back so the caller gets timestamps at stored precision
        let stored = Self::load(&db, &visit.id)?;
        self.feed.publish(ChangeEvent::Insert(stored.to_record()));
        Ok(stored)
    }

    fn update(&self, id: &str, update: &VisitUpdate) -> StoreResult<Visit> {
        let db = self.db.lock()?;
        let found = match update {
            VisitUpdate::Details(fields) => db.update_visit_details(id, fields)?,
            VisitUpdate::MarkSeen { seen_at } => db.mark_visit_seen(id, seen_at)?,
        };
        if !found {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let stored = Self::load(&db, id)?;
        self.feed.publish(ChangeEvent::Update(stored.to_record()));
        Ok(stored)
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        let db = self.db.lock()?;
        if db.delete_visit(id)? {
            self.feed.publish(ChangeEvent::Delete { id: id.to_string() });
        }
        Ok(())
    }

    fn subscribe(&self) -> StoreResult<Subscription> {
        Ok(self.feed.subscribe())
    }
}
