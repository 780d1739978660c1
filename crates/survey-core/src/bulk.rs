// SPDX-License-Identifier: BUSL-1.1
//! # Bulk Coordinator Upload
//!
//! Ingests a CSV of `(masterProjectId, email, role, surveyAdmin)` rows into
//! [`CoordinatorAssignment`]s. Columns are matched by header, ignoring case;
//! `projectId` and `emailType` are accepted as aliases. Form-level
//! [`BulkDefaults`] fill in any column the file lacks or leaves blank.
//!
//! Each row is a set-union into one role array of one project's
//! assignment, so replaying a file changes nothing. Bad rows are skipped
//! and reported with their line number; the upload as a whole is
//! best-effort, not transactional.

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::model::coordinator::normalize_email;
use crate::model::{CoordinatorAssignment, CoordinatorRole, Record};
use crate::store::{Collection, UpsertOutcome};

/// Values applied to rows that do not carry their own.
#[derive(Debug, Clone, Default)]
pub struct BulkDefaults {
    pub master_project_id: Option<String>,
    pub role: Option<CoordinatorRole>,
    pub survey_admin: Option<String>,
}

/// One well-formed CSV row.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkRow {
    pub line: u64,
    pub master_project_id: String,
    pub role: CoordinatorRole,
    pub email: String,
    pub survey_admin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RowError {
    pub line: u64,
    pub reason: String,
}

/// Per-row outcome counts for one upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkReport {
    pub rows_processed: usize,
    /// Rows that created a project's assignment.
    pub inserted: usize,
    /// Rows that added a new email (or a new surveyAdmin) to an assignment.
    pub updated: usize,
    /// Rows whose email was already present.
    pub duplicates: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

/// The report plus every assignment the upload wrote, for persistence.
#[derive(Debug, Clone)]
pub struct BulkOutcome {
    pub report: BulkReport,
    pub touched: Vec<Record<CoordinatorAssignment>>,
}

#[derive(Debug, Default)]
struct Columns {
    project: Option<usize>,
    email: Option<usize>,
    role: Option<usize>,
    survey_admin: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut cols = Self::default();
        for (idx, name) in headers.iter().enumerate() {
            match name.trim().to_ascii_lowercase().as_str() {
                "masterprojectid" | "projectid" => cols.project = Some(idx),
                "email" => cols.email = Some(idx),
                "role" | "emailtype" => cols.role = Some(idx),
                "surveyadmin" => cols.survey_admin = Some(idx),
                _ => {}
            }
        }
        cols
    }
}

fn cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parse an upload into well-formed rows and per-line rejections.
///
/// Only a file whose header cannot be read, or that has no `email` column,
/// is an error; everything else is reported per row.
pub fn parse_csv(bytes: &[u8], defaults: &BulkDefaults) -> CoreResult<(Vec<BulkRow>, Vec<RowError>)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let cols = Columns::from_headers(reader.headers()?);
    if cols.email.is_none() {
        return Err(CoreError::validation("CSV must have an email column"));
    }

    let mut rows = Vec::new();
    let mut errors = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let fallback_line = idx as u64 + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map_or(fallback_line, csv::Position::line);
                errors.push(RowError {
                    line,
                    reason: format!("unreadable row: {e}"),
                });
                continue;
            }
        };
        let line = record.position().map_or(fallback_line, csv::Position::line);
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        match parse_row(&record, &cols, defaults, line) {
            Ok(row) => rows.push(row),
            Err(reason) => errors.push(RowError { line, reason }),
        }
    }
    Ok((rows, errors))
}

fn parse_row(
    record: &csv::StringRecord,
    cols: &Columns,
    defaults: &BulkDefaults,
    line: u64,
) -> Result<BulkRow, String> {
    let master_project_id = cell(record, cols.project)
        .map(str::to_string)
        .or_else(|| defaults.master_project_id.clone())
        .ok_or("missing masterProjectId")?;
    let role = match cell(record, cols.role) {
        Some(tag) => {
            CoordinatorRole::from_tag(tag).ok_or_else(|| format!("unrecognized role '{tag}'"))?
        }
        None => defaults.role.ok_or("missing role")?,
    };
    let raw_email = cell(record, cols.email).ok_or("missing email")?;
    let email = normalize_email(raw_email).ok_or_else(|| format!("invalid email '{raw_email}'"))?;
    let survey_admin = cell(record, cols.survey_admin)
        .map(str::to_string)
        .or_else(|| defaults.survey_admin.clone());
    Ok(BulkRow {
        line,
        master_project_id,
        role,
        email,
        survey_admin,
    })
}

/// Merge parsed rows into the collection, one atomic upsert per row.
pub fn apply(
    assignments: &Collection<CoordinatorAssignment>,
    rows: Vec<BulkRow>,
    report: &mut BulkReport,
) -> Vec<Record<CoordinatorAssignment>> {
    let mut touched: HashMap<Uuid, Record<CoordinatorAssignment>> = HashMap::new();
    for row in rows {
        report.rows_processed += 1;
        let project = row.master_project_id.clone();
        let result = assignments.upsert_with(
            |a| a.master_project_id == project,
            |existing| {
                let mut next = existing
                    .cloned()
                    .unwrap_or_else(|| CoordinatorAssignment::new(row.master_project_id.clone()));
                let mut changed = next.add_email(row.role, &row.email);
                if row.survey_admin.is_some() && next.survey_admin != row.survey_admin {
                    next.survey_admin = row.survey_admin.clone();
                    changed = true;
                }
                Ok((existing.is_none() || changed).then_some(next))
            },
        );
        match result {
            Ok((record, outcome)) => {
                match outcome {
                    UpsertOutcome::Created => report.inserted += 1,
                    UpsertOutcome::Updated => report.updated += 1,
                    UpsertOutcome::Unchanged => report.duplicates += 1,
                }
                if outcome != UpsertOutcome::Unchanged {
                    touched.insert(record.id, record);
                }
            }
            Err(e) => {
                report.skipped += 1;
                report.errors.push(RowError {
                    line: row.line,
                    reason: e.to_string(),
                });
            }
        }
    }
    let mut touched: Vec<_> = touched.into_values().collect();
    touched.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
    touched
}

/// Parse and apply an upload.
pub fn ingest(
    assignments: &Collection<CoordinatorAssignment>,
    bytes: &[u8],
    defaults: &BulkDefaults,
) -> CoreResult<BulkOutcome> {
    let (rows, errors) = parse_csv(bytes, defaults)?;
    let mut report = BulkReport {
        rows_processed: errors.len(),
        skipped: errors.len(),
        errors,
        ..Default::default()
    };
    let touched = apply(assignments, rows, &mut report);
    report.errors.sort_by_key(|e| e.line);
    tracing::info!(
        rows = report.rows_processed,
        inserted = report.inserted,
        updated = report.updated,
        duplicates = report.duplicates,
        skipped = report.skipped,
        "bulk coordinator upload applied"
    );
    Ok(BulkOutcome { report, touched })
}
