//! SQLite schema definition.

/// Name of the visit table.
pub const TABLE_NAME: &str = "patient_visits";

/// Complete database schema for clinic visits.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patient Visits
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient_visits (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    age INTEGER NOT NULL CHECK (age >= 0),
    gender TEXT NOT NULL DEFAULT '',
    service TEXT NOT NULL CHECK (service IN (
        'General Consultation', 'Laboratory', 'Pharmacy', 'Dental',
        'Maternity', 'Emergency', 'Triage'
    )),
    status TEXT NOT NULL DEFAULT 'waiting' CHECK (status IN ('waiting', 'seen')),
    created_at TEXT NOT NULL,                    -- RFC 3339, UTC, microseconds
    created_by TEXT NOT NULL,
    seen_at TEXT,                                -- set iff status = 'seen'
    CHECK ((status = 'seen') = (seen_at IS NOT NULL))
);

-- Dashboard and log views read newest first
CREATE INDEX IF NOT EXISTS idx_visits_created_at ON patient_visits(created_at);
"#;
