//! Visit database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult};
use crate::models::{format_timestamp, Visit, VisitFields, VisitRecord};

const VISIT_COLUMNS: &str =
    "id, name, age, gender, service, status, created_at, created_by, seen_at";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<VisitRecord> {
    Ok(VisitRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        gender: row.get(3)?,
        service: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        created_by: row.get(7)?,
        seen_at: row.get(8)?,
    })
}

impl Database {
    /// Insert a new visit row.
    pub fn insert_visit(&self, visit: &Visit) -> DbResult<()> {
        let record = visit.to_record();
        self.conn.execute(
            r#"
            INSERT INTO patient_visits (
                id, name, age, gender, service, status, created_at, created_by, seen_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.id,
                record.name,
                record.age,
                record.gender,
                record.service,
                record.status,
                record.created_at,
                record.created_by,
                record.seen_at,
            ],
        )?;
        Ok(())
    }

    /// Get a visit by ID.
    pub fn get_visit(&self, id: &str) -> DbResult<Option<Visit>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {} FROM patient_visits WHERE id = ?", VISIT_COLUMNS),
                [id],
                row_to_record,
            )
            .optional()?;

        match record {
            Some(record) => Ok(Some(Visit::try_from(record)?)),
            None => Ok(None),
        }
    }

    /// List all visits, newest check-in first.
    pub fn list_visits(&self) -> DbResult<Vec<Visit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patient_visits ORDER BY created_at DESC, rowid DESC",
            VISIT_COLUMNS
        ))?;

        let records = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        records
            .into_iter()
            .map(|record| Visit::try_from(record).map_err(Into::into))
            .collect()
    }

    /// Overwrite the editable details of a visit.
    ///
    /// Status, timestamps and creator are never touched.
    pub fn update_visit_details(&self, id: &str, fields: &VisitFields) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patient_visits SET
                name = ?2,
                age = ?3,
                gender = ?4,
                service = ?5
            WHERE id = ?1
            "#,
            params![
                id,
                fields.name,
                fields.age,
                fields.gender,
                fields.service.label(),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Mark a visit seen. An existing `seen_at` is kept.
    pub fn mark_visit_seen(&self, id: &str, seen_at: &DateTime<Utc>) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patient_visits SET
                status = 'seen',
                seen_at = COALESCE(seen_at, ?2)
            WHERE id = ?1
            "#,
            params![id, format_timestamp(seen_at)],
        )?;
        Ok(rows_affected > 0)
    }

    /// Delete a visit.
    pub fn delete_visit(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patient_visits WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Count all visits.
    pub fn count_visits(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patient_visits", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Department, NewVisit, VisitStatus};
    use chrono::{Duration, TimeZone};

    fn make_visit(id: &str, name: &str, created_at: DateTime<Utc>) -> Visit {
        let mut new = NewVisit::new(
            VisitFields {
                name: name.into(),
                age: 42,
                gender: "Male".into(),
                service: Department::Laboratory,
            },
            "uid-1".into(),
        );
        new.created_at = created_at;
        let mut visit = Visit::local_placeholder(&new);
        visit.id = id.into();
        visit
    }

    #[test]
    fn test_insert_and_get_visit() {
        let db = Database::open_in_memory().unwrap();
        // Whole seconds, since rows keep microsecond precision
        let created_at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        let visit = make_visit("v1", "John", created_at);

        db.insert_visit(&visit).unwrap();

        let retrieved = db.get_visit("v1").unwrap().unwrap();
        assert_eq!(retrieved, visit);
        assert!(db.get_visit("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let base = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();

        db.insert_visit(&make_visit("a", "First", base)).unwrap();
        db.insert_visit(&make_visit("c", "Third", base + Duration::minutes(20)))
            .unwrap();
        db.insert_visit(&make_visit("b", "Second", base + Duration::minutes(10)))
            .unwrap();

        let ids: Vec<_> = db.list_visits().unwrap().into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(db.count_visits().unwrap(), 3);
    }

    #[test]
    fn test_update_details_leaves_status_and_creation() {
        let db = Database::open_in_memory().unwrap();
        let visit = make_visit("v1", "John", Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap());
        db.insert_visit(&visit).unwrap();

        let fields = VisitFields {
            name: "Johnny".into(),
            age: 43,
            gender: "Other".into(),
            service: Department::Pharmacy,
        };
        assert!(db.update_visit_details("v1", &fields).unwrap());

        let updated = db.get_visit("v1").unwrap().unwrap();
        assert_eq!(updated.fields(), fields);
        assert_eq!(updated.status, VisitStatus::Waiting);
        assert_eq!(updated.created_at, visit.created_at);
        assert_eq!(updated.created_by, visit.created_by);

        assert!(!db.update_visit_details("missing", &fields).unwrap());
    }

    #[test]
    fn test_mark_seen_keeps_first_timestamp() {
        let db = Database::open_in_memory().unwrap();
        db.insert_visit(&make_visit("v1", "John", Utc::now())).unwrap();

        let first = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let second = first + Duration::hours(1);

        assert!(db.mark_visit_seen("v1", &first).unwrap());
        assert!(db.mark_visit_seen("v1", &second).unwrap());

        let visit = db.get_visit("v1").unwrap().unwrap();
        assert_eq!(visit.status, VisitStatus::Seen);
        assert_eq!(visit.seen_at, Some(first));
    }

    #[test]
    fn test_delete_visit() {
        let db = Database::open_in_memory().unwrap();
        db.insert_visit(&make_visit("v1", "John", Utc::now())).unwrap();

        assert!(db.delete_visit("v1").unwrap());
        assert!(!db.delete_visit("v1").unwrap());
        assert_eq!(db.count_visits().unwrap(), 0);
    }

    #[test]
    fn test_schema_rejects_inconsistent_seen_row() {
        let db = Database::open_in_memory().unwrap();
        let result = db.conn().execute(
            r#"
            INSERT INTO patient_visits (id, name, age, service, status, created_at, created_by)
            VALUES ('x', 'Ann', 20, 'Dental', 'seen', '2026-10-19T08:00:00.000000Z', 'anon')
            "#,
            [],
        );
        assert!(result.is_err());
    }
}
