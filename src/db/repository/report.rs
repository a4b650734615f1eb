use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::SafetyReport;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Insert a report. Reports are append-only: an existing scan_id is rejected.
pub fn insert_report(conn: &Connection, report: &SafetyReport) -> Result<(), DatabaseError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM safety_reports WHERE scan_id = ?1)",
        params![report.scan_id.to_string()],
        |row| row.get(0),
    )?;
    if exists {
        return Err(DatabaseError::ConstraintViolation(format!(
            "safety report {} already stored",
            report.scan_id
        )));
    }

    let report_json = serde_json::to_string(report)?;
    conn.execute(
        "INSERT INTO safety_reports
         (scan_id, profile_id, timestamp, product_name, overall_signal, verdict_count, report_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            report.scan_id.to_string(),
            report.profile_id.to_string(),
            report.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            report.product_name,
            report.overall_signal.as_str(),
            report.verdicts.len() as i64,
            report_json,
        ],
    )?;
    Ok(())
}

pub fn get_report(conn: &Connection, scan_id: &Uuid) -> Result<Option<SafetyReport>, DatabaseError> {
    let json: Option<String> = conn
        .query_row(
            "SELECT report_json FROM safety_reports WHERE scan_id = ?1",
            params![scan_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    json.map(|j| serde_json::from_str(&j).map_err(DatabaseError::from))
        .transpose()
}

/// All reports of a profile, oldest first.
pub fn get_reports_for_profile(
    conn: &Connection,
    profile_id: &Uuid,
) -> Result<Vec<SafetyReport>, DatabaseError> {
    query_reports(
        conn,
        "SELECT report_json FROM safety_reports
         WHERE profile_id = ?1
         ORDER BY timestamp ASC, rowid ASC",
        params![profile_id.to_string()],
    )
}

/// Reports of a profile within one calendar month, oldest first.
pub fn get_reports_in_month(
    conn: &Connection,
    profile_id: &Uuid,
    year: i32,
    month: u32,
) -> Result<Vec<SafetyReport>, DatabaseError> {
    query_reports(
        conn,
        "SELECT report_json FROM safety_reports
         WHERE profile_id = ?1 AND substr(timestamp, 1, 7) = ?2
         ORDER BY timestamp ASC, rowid ASC",
        params![profile_id.to_string(), format!("{year:04}-{month:02}")],
    )
}

fn query_reports(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<SafetyReport>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;

    let mut reports = Vec::new();
    for row in rows {
        reports.push(serde_json::from_str(&row?)?);
    }
    Ok(reports)
}
