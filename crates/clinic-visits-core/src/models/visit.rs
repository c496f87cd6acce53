//! Visit models: the normalized in-memory record and its wire/row form.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::department::Department;

/// Prefix of ids generated client-side when the store rejects an insert.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Soft upper bound on patient age, enforced at input validation only.
pub const MAX_AGE: u32 = 150;

/// Errors converting a wire record into a [`Visit`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("invalid timestamp in {field}: {value}")]
    Timestamp { field: &'static str, value: String },

    #[error("unknown visit status: {0}")]
    Status(String),

    #[error("unknown department: {0}")]
    Department(String),

    #[error("visit {0} is seen but has no seen_at")]
    SeenWithoutTimestamp(String),

    #[error("visit {0} is waiting but has a seen_at")]
    WaitingWithTimestamp(String),
}

/// Visit lifecycle status. `Waiting -> Seen` only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VisitStatus {
    Waiting,
    Seen,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Waiting => "waiting",
            VisitStatus::Seen => "seen",
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(VisitStatus::Waiting),
            "seen" => Ok(VisitStatus::Seen),
            other => Err(RecordError::Status(other.to_string())),
        }
    }
}

/// Format a timestamp the way the store persists it.
///
/// Fixed-width microsecond UTC so that text ordering matches time ordering.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp from the store into UTC.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, RecordError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| RecordError::Timestamp {
            field,
            value: value.to_string(),
        })
}

/// The editable patient details of a visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitFields {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub service: Department,
}

/// Payload for creating a visit. New visits always start out waiting.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVisit {
    pub fields: VisitFields,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl NewVisit {
    pub fn new(fields: VisitFields, created_by: String) -> Self {
        Self {
            fields,
            created_at: Utc::now(),
            created_by,
        }
    }
}

/// A change sent to the store for an existing visit.
#[derive(Debug, Clone, PartialEq)]
pub enum VisitUpdate {
    /// Manual edit: name, age, gender, and service only.
    Details(VisitFields),
    /// Checkout: status becomes seen, stamped with `seen_at`.
    MarkSeen { seen_at: DateTime<Utc> },
}

/// A visit as held by the lifecycle controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    /// Store-assigned id, or `local-<uuid>` for an unreconciled placeholder
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub service: Department,
    pub status: VisitStatus,
    /// Check-in time; never changes after creation
    pub created_at: DateTime<Utc>,
    /// Set exactly once, when the patient is seen
    pub seen_at: Option<DateTime<Utc>>,
    /// Identity subject of the registering user, or the anonymous marker
    pub created_by: String,
}

impl Visit {
    /// Build the client-side placeholder shown when the store rejects an insert.
    pub fn local_placeholder(new: &NewVisit) -> Self {
        Self {
            id: format!("{}{}", LOCAL_ID_PREFIX, uuid::Uuid::new_v4()),
            name: new.fields.name.clone(),
            age: new.fields.age,
            gender: new.fields.gender.clone(),
            service: new.fields.service,
            status: VisitStatus::Waiting,
            created_at: new.created_at,
            seen_at: None,
            created_by: new.created_by.clone(),
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.status == VisitStatus::Waiting
    }

    pub fn is_seen(&self) -> bool {
        self.status == VisitStatus::Seen
    }

    /// Whether this record only exists locally.
    pub fn is_local_placeholder(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }

    /// The editable details of this visit.
    pub fn fields(&self) -> VisitFields {
        VisitFields {
            name: self.name.clone(),
            age: self.age,
            gender: self.gender.clone(),
            service: self.service,
        }
    }

    /// Transition to seen. Returns false if the visit was already seen,
    /// in which case `seen_at` is left untouched.
    pub fn mark_seen(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_seen() {
            return false;
        }
        self.status = VisitStatus::Seen;
        self.seen_at = Some(at);
        true
    }

    /// Take the mutable fields of an authoritative copy of this visit.
    ///
    /// `id`, `created_at`, and `created_by` are kept.
    pub fn merge_from(&mut self, other: &Visit) {
        self.name = other.name.clone();
        self.age = other.age;
        self.gender = other.gender.clone();
        self.service = other.service;
        self.status = other.status;
        self.seen_at = other.seen_at;
    }

    /// Convert to the store's row form.
    pub fn to_record(&self) -> VisitRecord {
        VisitRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            age: self.age,
            gender: self.gender.clone(),
            service: self.service.label().to_string(),
            status: self.status.as_str().to_string(),
            created_at: format_timestamp(&self.created_at),
            created_by: self.created_by.clone(),
            seen_at: self.seen_at.as_ref().map(format_timestamp),
        }
    }
}

/// A `patient_visits` row as the store returns it: snake_case columns,
/// RFC 3339 text timestamps, free-text status and service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitRecord {
    pub id: String,
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub gender: String,
    pub service: String,
    pub status: String,
    pub created_at: String,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub seen_at: Option<String>,
}

impl TryFrom<VisitRecord> for Visit {
    type Error = RecordError;

    /// Normalize a wire record: parse timestamps and labels, check the
    /// status/`seen_at` pairing.
    fn try_from(record: VisitRecord) -> Result<Self, Self::Error> {
        let status: VisitStatus = record.status.parse()?;
        let service: Department = record
            .service
            .parse()
            .map_err(|_| RecordError::Department(record.service.clone()))?;
        let created_at = parse_timestamp("created_at", &record.created_at)?;
        let seen_at = record
            .seen_at
            .as_deref()
            .map(|s| parse_timestamp("seen_at", s))
            .transpose()?;

        match (status, seen_at.is_some()) {
            (VisitStatus::Seen, false) => return Err(RecordError::SeenWithoutTimestamp(record.id)),
            (VisitStatus::Waiting, true) => return Err(RecordError::WaitingWithTimestamp(record.id)),
            _ => {}
        }

        Ok(Visit {
            id: record.id,
            name: record.name,
            age: record.age,
            gender: record.gender,
            service,
            status,
            created_at,
            seen_at,
            created_by: record.created_by,
        })
    }
}
