//! Workbook validation: sheet presence, column presence, row completeness.
//!
//! Issues are aggregated, never fail-fast, so the operator sees the whole
//! list in one pass. Any issue blocks planning and execution.
use crate::registry::{Registry, STATUS_COLUMN};
use crate::workbook::{Sheet, Workbook};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingSheet,
    MissingColumn,
    IncompleteRow,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub sheet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

/// Operator-facing per-sheet overview, reported alongside issues.
#[derive(Debug, Clone, Serialize)]
pub struct SheetSummary {
    pub sheet: String,
    pub present: bool,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub summaries: Vec<SheetSummary>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validate every registered operation's sheet, in registration order.
/// Never mutates the workbook; optional and extra columns are ignored.
pub fn validate(workbook: &Workbook, registry: &Registry) -> ValidationReport {
    let mut report = ValidationReport::default();

    for spec in registry.all() {
        let Some(sheet) = workbook.sheet(&spec.sheet) else {
            report.summaries.push(SheetSummary {
                sheet: spec.sheet.clone(),
                present: false,
                rows: 0,
                columns: 0,
            });
            report.issues.push(ValidationIssue {
                kind: IssueKind::MissingSheet,
                sheet: spec.sheet.clone(),
                row: None,
                column: None,
                message: format!("workbook has no sheet '{}'", spec.sheet),
            });
            continue;
        };
        report.summaries.push(SheetSummary {
            sheet: spec.sheet.clone(),
            present: true,
            rows: sheet.rows.len(),
            columns: sheet.columns.len(),
        });

        let mut columns_ok = true;
        for column in spec
            .required_columns
            .iter()
            .map(String::as_str)
            .chain([STATUS_COLUMN])
        {
            if !sheet.columns.iter().any(|present| present == column) {
                columns_ok = false;
                report.issues.push(ValidationIssue {
                    kind: IssueKind::MissingColumn,
                    sheet: spec.sheet.clone(),
                    row: None,
                    column: Some(column.to_string()),
                    message: format!(
                        "sheet '{}' is missing required column '{}'",
                        spec.sheet, column
                    ),
                });
            }
        }
        if !columns_ok {
            continue;
        }

        check_row_completeness(sheet, &spec.sheet, &spec.required_columns, &mut report.issues);
    }

    report
}

/// All-or-nothing rule: a row with any required column populated must have
/// them all. Fully blank rows are spacing, not errors.
fn check_row_completeness(
    sheet: &Sheet,
    sheet_name: &str,
    required_columns: &[String],
    issues: &mut Vec<ValidationIssue>,
) {
    for (index, row) in sheet.rows.iter().enumerate() {
        let row_number = index + 1;
        let filled = required_columns
            .iter()
            .filter(|column| !row.field(column).is_empty())
            .count();
        if filled == 0 || filled == required_columns.len() {
            continue;
        }
        // required_columns order makes the reported column deterministic
        let first_empty = required_columns
            .iter()
            .find(|column| row.field(column).is_empty())
            .cloned()
            .unwrap_or_default();
        issues.push(ValidationIssue {
            kind: IssueKind::IncompleteRow,
            sheet: sheet_name.to_string(),
            row: Some(row_number),
            column: Some(first_empty.clone()),
            message: format!(
                "sheet '{sheet_name}' row {row_number} is partially populated; first empty required column is '{first_empty}'"
            ),
        });
    }
}
