use std::sync::{Mutex, RwLock};

use chrono::Datelike;
use rusqlite::Connection;
use uuid::Uuid;

use super::repository::{get_report, get_reports_for_profile, get_reports_in_month, insert_report};
use super::DatabaseError;
use crate::models::SafetyReport;

/// Persistence contract for safety reports. History is append-only.
pub trait ReportStore {
    /// Rejects a report whose scan_id is already stored.
    fn save_report(&self, report: &SafetyReport) -> Result<(), DatabaseError>;

    fn get_report(&self, scan_id: &Uuid) -> Result<Option<SafetyReport>, DatabaseError>;

    /// Oldest first.
    fn reports_for_profile(&self, profile_id: &Uuid) -> Result<Vec<SafetyReport>, DatabaseError>;

    /// Oldest first.
    fn reports_in_month(
        &self,
        profile_id: &Uuid,
        year: i32,
        month: u32,
    ) -> Result<Vec<SafetyReport>, DatabaseError>;
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// In-memory report store backed by RwLock.
#[derive(Default)]
pub struct MemoryReportStore {
    reports: RwLock<Vec<SafetyReport>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn filtered(
        &self,
        keep: impl Fn(&SafetyReport) -> bool,
    ) -> Result<Vec<SafetyReport>, DatabaseError> {
        let reports = self.reports.read().map_err(|_| DatabaseError::LockFailed)?;
        let mut matched: Vec<SafetyReport> = reports.iter().filter(|r| keep(r)).cloned().collect();
        matched.sort_by_key(|r| r.timestamp);
        Ok(matched)
    }
}

impl ReportStore for MemoryReportStore {
    fn save_report(&self, report: &SafetyReport) -> Result<(), DatabaseError> {
        let mut reports = self.reports.write().map_err(|_| DatabaseError::LockFailed)?;
        if reports.iter().any(|r| r.scan_id == report.scan_id) {
            return Err(DatabaseError::ConstraintViolation(format!(
                "safety report {} already stored",
                report.scan_id
            )));
        }
        reports.push(report.clone());
        Ok(())
    }

    fn get_report(&self, scan_id: &Uuid) -> Result<Option<SafetyReport>, DatabaseError> {
        let reports = self.reports.read().map_err(|_| DatabaseError::LockFailed)?;
        Ok(reports.iter().find(|r| &r.scan_id == scan_id).cloned())
    }

    fn reports_for_profile(&self, profile_id: &Uuid) -> Result<Vec<SafetyReport>, DatabaseError> {
        self.filtered(|r| &r.profile_id == profile_id)
    }

    fn reports_in_month(
        &self,
        profile_id: &Uuid,
        year: i32,
        month: u32,
    ) -> Result<Vec<SafetyReport>, DatabaseError> {
        self.filtered(|r| {
            &r.profile_id == profile_id
                && r.timestamp.year() == year
                && r.timestamp.month() == month
        })
    }
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

pub struct SqliteReportStore {
    conn: Mutex<Connection>,
}

impl SqliteReportStore {
    /// Wrap a connection that already ran migrations.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &std::path::Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(super::sqlite::open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(super::sqlite::open_memory_database()?))
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockFailed)?;
        f(&conn)
    }
}

impl ReportStore for SqliteReportStore {
    fn save_report(&self, report: &SafetyReport) -> Result<(), DatabaseError> {
        self.with_conn(|conn| insert_report(conn, report))?;
        tracing::debug!(scan_id = %report.scan_id, "Safety report stored");
        Ok(())
    }

    fn get_report(&self, scan_id: &Uuid) -> Result<Option<SafetyReport>, DatabaseError> {
        self.with_conn(|conn| get_report(conn, scan_id))
    }

    fn reports_for_profile(&self, profile_id: &Uuid) -> Result<Vec<SafetyReport>, DatabaseError> {
        self.with_conn(|conn| get_reports_for_profile(conn, profile_id))
    }

    fn reports_in_month(
        &self,
        profile_id: &Uuid,
        year: i32,
        month: u32,
    ) -> Result<Vec<SafetyReport>, DatabaseError> {
        self.with_conn(|conn| get_reports_in_month(conn, profile_id, year, month))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analysis::{DefaultSafetyEngine, SafetyEngine, ScanRequest};
    use crate::history::trend;
    use crate::models::enums::Sex;
    use crate::models::{NutrientAmount, NutrientId, UserProfile};
    use crate::reference::ReferenceSnapshot;

    fn stores() -> Vec<Box<dyn ReportStore>> {
        vec![
            Box::new(MemoryReportStore::new()),
            Box::new(SqliteReportStore::open_in_memory().unwrap()),
        ]
    }

    fn scan_at(profile_id: Uuid, day: u32, zinc_mg: f64) -> ScanRequest {
        ScanRequest::new(profile_id, vec![NutrientAmount::new("Zinc", zinc_mg, "mg")]).at(
            chrono::NaiveDate::from_ymd_opt(2026, 6, day)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn both_stores_follow_the_contract() {
        let engine = DefaultSafetyEngine::new(Arc::new(ReferenceSnapshot::load_test()));
        let profile = UserProfile::new(70, Sex::Male);
        let p = Uuid::new_v4();

        for store in stores() {
            let later = engine.evaluate(&scan_at(p, 20, 30.0), &profile);
            let earlier = engine.evaluate(&scan_at(p, 3, 11.0), &profile);
            store.save_report(&later).unwrap();
            store.save_report(&earlier).unwrap();

            assert!(matches!(
                store.save_report(&later),
                Err(DatabaseError::ConstraintViolation(_))
            ));
            assert_eq!(store.get_report(&later.scan_id).unwrap(), Some(later.clone()));

            let history = store.reports_for_profile(&p).unwrap();
            assert_eq!(history.len(), 2);
            assert_eq!(history[0].scan_id, earlier.scan_id);

            assert_eq!(store.reports_in_month(&p, 2026, 6).unwrap().len(), 2);
            assert!(store.reports_in_month(&p, 2026, 7).unwrap().is_empty());

            let summary = trend(&history);
            let zinc = summary.get(&NutrientId::new("zinc")).unwrap();
            assert_eq!(zinc.appearances, 2);
            assert_eq!(zinc.repeated_risk_count, 1);
        }
    }
}
