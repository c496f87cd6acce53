//! Check-in form state.

use serde::{Deserialize, Serialize};

use super::department::{Department, DEFAULT_GENDER};
use super::visit::{Visit, VisitFields, MAX_AGE};

/// Why a form could not be turned into [`VisitFields`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("patient name is required")]
    MissingName,

    #[error("patient age is required")]
    MissingAge,

    #[error("age must be a whole number between 0 and 150: {0}")]
    InvalidAge(String),
}

/// The front-desk entry form, holding raw text input until submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckInForm {
    pub name: String,
    /// Raw age text as typed
    pub age: String,
    pub gender: String,
    pub service: Department,
    /// Visit being edited, if any
    pub editing_id: Option<String>,
    /// True while a submission is outstanding
    pub submitting: bool,
}

impl Default for CheckInForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: String::new(),
            gender: DEFAULT_GENDER.to_string(),
            service: Department::default(),
            editing_id: None,
            submitting: false,
        }
    }
}

impl CheckInForm {
    /// Clear all input and drop the edit target.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Prefill from an existing visit and make it the edit target.
    pub fn load_from(&mut self, visit: &Visit) {
        self.name = visit.name.clone();
        self.age = visit.age.to_string();
        self.gender = visit.gender.clone();
        self.service = visit.service;
        self.editing_id = Some(visit.id.clone());
    }

    pub fn is_editing(&self) -> bool {
        self.editing_id.is_some()
    }

    /// Validate the input.
    pub fn to_fields(&self) -> Result<VisitFields, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::MissingName);
        }

        let age = self.age.trim();
        if age.is_empty() {
            return Err(FormError::MissingAge);
        }
        let age: u32 = age
            .parse()
            .map_err(|_| FormError::InvalidAge(self.age.clone()))?;
        if age > MAX_AGE {
            return Err(FormError::InvalidAge(self.age.clone()));
        }

        Ok(VisitFields {
            name: name.to_string(),
            age,
            gender: self.gender.clone(),
            service: self.service,
        })
    }
}
