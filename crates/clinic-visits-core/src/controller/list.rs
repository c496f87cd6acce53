//! The ordered in-memory visit collection.

use chrono::{DateTime, Utc};

use crate::feed::ChangeEvent;
use crate::models::{RecordError, Visit};

/// Visits, newest check-in first, with unique ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitList {
    visits: Vec<Visit>,
}

impl From<Vec<Visit>> for VisitList {
    /// Takes visits already in newest-first order; later duplicates are dropped.
    fn from(visits: Vec<Visit>) -> Self {
        let mut list = Self::default();
        for visit in visits {
            if !list.contains(&visit.id) {
                list.visits.push(visit);
            }
        }
        list
    }
}

impl VisitList {
    pub fn as_slice(&self) -> &[Visit] {
        &self.visits
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Visit> {
        self.visits.iter().find(|v| v.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn clear(&mut self) {
        self.visits.clear();
    }

    /// Add a visit at the front unless its id is already present.
    pub fn prepend(&mut self, visit: Visit) -> bool {
        if self.contains(&visit.id) {
            return false;
        }
        self.visits.insert(0, visit);
        true
    }

    /// Take the fields of an authoritative copy, keeping the position.
    pub fn merge(&mut self, visit: &Visit) -> bool {
        match self.visits.iter_mut().find(|v| v.id == visit.id) {
            Some(existing) => {
                existing.merge_from(visit);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Visit> {
        let index = self.visits.iter().position(|v| v.id == id)?;
        Some(self.visits.remove(index))
    }

    /// Mark a visit seen locally. Returns false if absent or already seen.
    pub fn mark_seen(&mut self, id: &str, at: DateTime<Utc>) -> bool {
        self.visits
            .iter_mut()
            .find(|v| v.id == id)
            .map(|v| v.mark_seen(at))
            .unwrap_or(false)
    }

    /// Apply one feed event. Returns whether the list changed.
    pub fn apply(&mut self, event: ChangeEvent) -> Result<bool, RecordError> {
        match event {
            ChangeEvent::Insert(record) => Ok(self.prepend(Visit::try_from(record)?)),
            ChangeEvent::Update(record) => {
                let visit = Visit::try_from(record)?;
                Ok(self.merge(&visit))
            }
            ChangeEvent::Delete { id } => Ok(self.remove(&id).is_some()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Department, VisitRecord};

    fn make_record(id: &str, name: &str) -> VisitRecord {
        VisitRecord {
            id: id.into(),
            name: name.into(),
            age: 30,
            gender: "Female".into(),
            service: "Dental".into(),
            status: "waiting".into(),
            created_at: "2026-10-19T08:15:00.000000Z".into(),
            created_by: "uid-1".into(),
            seen_at: None,
        }
    }

    fn ids(list: &VisitList) -> Vec<&str> {
        list.as_slice().iter().map(|v| v.id.as_str()).collect()
    }

    #[test]
    fn test_insert_prepends_and_dedups() {
        let mut list = VisitList::default();
        assert!(list.apply(ChangeEvent::Insert(make_record("a", "Ann"))).unwrap());
        assert!(list.apply(ChangeEvent::Insert(make_record("b", "Bob"))).unwrap());
        assert!(!list.apply(ChangeEvent::Insert(make_record("a", "Ann again"))).unwrap());

        assert_eq!(ids(&list), vec!["b", "a"]);
        assert_eq!(list.get("a").unwrap().name, "Ann");
    }

    #[test]
    fn test_update_keeps_position() {
        let mut list = VisitList::default();
        for (id, name) in [("a", "Ann"), ("b", "Bob"), ("c", "Cat")] {
            list.apply(ChangeEvent::Insert(make_record(id, name))).unwrap();
        }

        let mut record = make_record("b", "Bobby");
        record.service = "Pharmacy".into();
        assert!(list.apply(ChangeEvent::Update(record)).unwrap());

        assert_eq!(ids(&list), vec!["c", "b", "a"]);
        let bob = list.get("b").unwrap();
        assert_eq!(bob.name, "Bobby");
        assert_eq!(bob.service, Department::Pharmacy);
    }

    #[test]
    fn test_update_unknown_id_ignored() {
        let mut list = VisitList::default();
        assert!(!list.apply(ChangeEvent::Update(make_record("zz", "Ghost"))).unwrap());
        assert!(list.is_empty());
    }

    #[test]
    fn test_delete() {
        let mut list = VisitList::default();
        list.apply(ChangeEvent::Insert(make_record("a", "Ann"))).unwrap();
        assert!(list.apply(ChangeEvent::Delete { id: "a".into() }).unwrap());
        assert!(!list.apply(ChangeEvent::Delete { id: "a".into() }).unwrap());
        assert!(list.is_empty());
    }

    #[test]
    fn test_malformed_event_leaves_list_unchanged() {
        let mut list = VisitList::default();
        list.apply(ChangeEvent::Insert(make_record("a", "Ann"))).unwrap();
        let before = list.clone();

        let mut bad = make_record("a", "Ann");
        bad.created_at = "not a time".into();
        assert!(list.apply(ChangeEvent::Update(bad)).is_err());
        assert_eq!(list, before);
    }

    #[test]
    fn test_from_vec_drops_duplicates() {
        let a = Visit::try_from(make_record("a", "Ann")).unwrap();
        let b = Visit::try_from(make_record("b", "Bob")).unwrap();
        let list = VisitList::from(vec![a.clone(), b, a]);
        assert_eq!(ids(&list), vec!["a", "b"]);
    }
}
