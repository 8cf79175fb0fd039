//! Append-only audit ledger derived from execution results.
//!
//! One record per executed operation, in execution order. Records are never
//! updated, merged, or deduplicated; the ledger's row order is the
//! historical order of attempts.
use crate::exec::ExecutionResult;
use crate::workbook::{Row, Workbook};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Ledger sheet name in the workbook.
pub const AUDIT_SHEET: &str = "Change Log";

/// Ledger header, in column order. This is the schema the storage
/// collaborator depends on.
pub const AUDIT_COLUMNS: [&str; 6] = [
    "Timestamp",
    "WWID",
    "Operation",
    "Status",
    "Details (generated id)",
    "CLI Output",
];

#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub timestamp: String,
    pub wwid: String,
    pub operation: String,
    pub status: String,
    pub details: String,
    pub cli_output: String,
}

/// Build exactly one audit record per execution result, preserving order.
pub fn build_records(results: &[ExecutionResult], wwid: &str) -> Vec<AuditRecord> {
    results
        .iter()
        .map(|result| AuditRecord {
            timestamp: result.timestamp.clone(),
            wwid: wwid.to_string(),
            operation: format!("{} - Row {}", result.operation.operation, result.operation.row),
            status: result.status.label().to_string(),
            details: match &result.generated_id {
                Some(id) => format!("ID: {id}"),
                None => "No ID extracted".to_string(),
            },
            cli_output: result.cli_output.clone(),
        })
        .collect()
}

/// Single bulk append of records to the ledger sheet, creating it with its
/// header when absent.
pub fn append_to_workbook(workbook: &mut Workbook, records: &[AuditRecord]) {
    let rows = records
        .iter()
        .map(|record| {
            let mut cells = BTreeMap::new();
            cells.insert(AUDIT_COLUMNS[0].to_string(), Value::String(record.timestamp.clone()));
            cells.insert(AUDIT_COLUMNS[1].to_string(), Value::String(record.wwid.clone()));
            cells.insert(AUDIT_COLUMNS[2].to_string(), Value::String(record.operation.clone()));
            cells.insert(AUDIT_COLUMNS[3].to_string(), Value::String(record.status.clone()));
            cells.insert(AUDIT_COLUMNS[4].to_string(), Value::String(record.details.clone()));
            cells.insert(AUDIT_COLUMNS[5].to_string(), Value::String(record.cli_output.clone()));
            Row(cells)
        })
        .collect();
    workbook.append_rows(AUDIT_SHEET, &AUDIT_COLUMNS, rows);
}

/// The most recent `count` ledger rows, oldest first.
pub fn recent(workbook: &Workbook, count: usize) -> Vec<&Row> {
    let Some(sheet) = workbook.sheet(AUDIT_SHEET) else {
        return Vec::new();
    };
    let start = sheet.rows.len().saturating_sub(count);
    sheet.rows[start..].iter().collect()
}
