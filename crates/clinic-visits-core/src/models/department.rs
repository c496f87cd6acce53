//! Clinic departments and patient-facing option lists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Gender options offered by the check-in form. The field itself is open text.
pub const GENDER_OPTIONS: [&str; 3] = ["Male", "Female", "Other"];

/// Default gender preselected on a fresh form.
pub const DEFAULT_GENDER: &str = "Male";

/// A clinic department a visit is routed to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Department {
    #[default]
    #[serde(rename = "General Consultation")]
    GeneralConsultation,
    #[serde(rename = "Laboratory")]
    Laboratory,
    #[serde(rename = "Pharmacy")]
    Pharmacy,
    #[serde(rename = "Dental")]
    Dental,
    #[serde(rename = "Maternity")]
    Maternity,
    #[serde(rename = "Emergency")]
    Emergency,
    #[serde(rename = "Triage")]
    Triage,
}

impl Department {
    /// All departments in display order.
    pub const ALL: [Department; 7] = [
        Department::GeneralConsultation,
        Department::Laboratory,
        Department::Pharmacy,
        Department::Dental,
        Department::Maternity,
        Department::Emergency,
        Department::Triage,
    ];

    /// Label as stored in the `service` column.
    pub fn label(&self) -> &'static str {
        match self {
            Department::GeneralConsultation => "General Consultation",
            Department::Laboratory => "Laboratory",
            Department::Pharmacy => "Pharmacy",
            Department::Dental => "Dental",
            Department::Maternity => "Maternity",
            Department::Emergency => "Emergency",
            Department::Triage => "Triage",
        }
    }

    /// Labels of every department, for select controls.
    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(Department::label).collect()
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error for a label outside the department list.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown department: {0}")]
pub struct UnknownDepartment(pub String);

impl FromStr for Department {
    type Err = UnknownDepartment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.label() == s)
            .ok_or_else(|| UnknownDepartment(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for dept in Department::ALL {
            assert_eq!(dept.label().parse::<Department>().unwrap(), dept);
        }
    }

    #[test]
    fn test_unknown_label_rejected() {
        let err = "Radiology".parse::<Department>().unwrap_err();
        assert_eq!(err, UnknownDepartment("Radiology".into()));
        // Labels are matched exactly
        assert!("dental".parse::<Department>().is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Department::GeneralConsultation).unwrap();
        assert_eq!(json, "\"General Consultation\"");
    }
}
