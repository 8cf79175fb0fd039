//! Agent-status classification and side-effect-free planning.
//!
//! Planning turns validated tables into fully rendered command descriptions.
//! Nothing here touches the outside world; a planned operation is an
//! ephemeral intent that lives only for the current invocation.
use crate::registry::{OperationSpec, Registry, STATUS_COLUMN};
use crate::validate::ValidationReport;
use crate::workbook::{Row, Workbook};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("tables have not passed validation ({issues} issue(s)); refusing to plan")]
    NotValidated { issues: usize },
}

/// Row processing state derived from the status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Ready,
    Completed,
    Failed,
    InProgress,
    Unrecognized,
}

impl AgentStatus {
    /// Map the raw status cell to a state. Unknown non-empty text is treated
    /// as not ready rather than guessing intent.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return AgentStatus::Ready;
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "completed" | "success" | "done" => AgentStatus::Completed,
            "failed" | "error" => AgentStatus::Failed,
            "processing" => AgentStatus::InProgress,
            _ => AgentStatus::Unrecognized,
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, AgentStatus::Ready)
    }
}

/// A fully rendered, not-yet-executed command plus its provenance.
/// Field names are the machine-readable plan contract; do not rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedOperation {
    pub operation: String,
    pub sheet: String,
    pub row: usize,
    pub command: String,
    pub input_data: BTreeMap<String, String>,
}

/// Top-level plan output consumed by review tooling.
#[derive(Debug, Serialize)]
pub struct PlanDocument {
    pub operations: Vec<PlannedOperation>,
}

#[derive(Debug)]
pub struct PlanOutcome {
    pub operations: Vec<PlannedOperation>,
    /// Rows passed over because their status marked them not ready.
    pub skipped: usize,
}

/// Plan every eligible row of every selected operation, in registration and
/// then row order. The caller must have validated first; `validation` is the
/// proof.
pub fn plan(
    workbook: &Workbook,
    registry: &Registry,
    selected: Option<&BTreeSet<String>>,
    validation: &ValidationReport,
) -> Result<PlanOutcome, PlanError> {
    if !validation.is_valid() {
        return Err(PlanError::NotValidated {
            issues: validation.issues.len(),
        });
    }

    let mut operations = Vec::new();
    let mut skipped = 0;
    for spec in registry.all() {
        if let Some(selected) = selected {
            if !selected.contains(&spec.name) {
                continue;
            }
        }
        let Some(sheet) = workbook.sheet(&spec.sheet) else {
            continue;
        };
        for (index, row) in sheet.rows.iter().enumerate() {
            let row_number = index + 1;
            let status = AgentStatus::classify(&row.field(STATUS_COLUMN));
            if !status.is_ready() {
                tracing::debug!(
                    sheet = %spec.sheet,
                    row = row_number,
                    ?status,
                    "skipping row"
                );
                skipped += 1;
                continue;
            }
            if spec
                .required_columns
                .iter()
                .all(|column| row.field(column).is_empty())
            {
                continue;
            }
            operations.push(PlannedOperation {
                operation: spec.name.clone(),
                sheet: spec.sheet.clone(),
                row: row_number,
                command: spec.template.render(row),
                input_data: input_data(spec, row),
            });
        }
    }
    tracing::info!(planned = operations.len(), skipped, "planning complete");
    Ok(PlanOutcome { operations, skipped })
}

fn input_data(spec: &OperationSpec, row: &Row) -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();
    for column in &spec.required_columns {
        data.insert(column.clone(), row.field(column));
    }
    for column in &spec.optional_columns {
        if row.has_column(column) {
            data.insert(column.clone(), row.field(column));
        }
    }
    data
}
