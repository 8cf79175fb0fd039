//! JSON workbook shim: ordered sheets of named-column rows.
//!
//! The core treats workbook storage as an external collaborator; this module
//! is the thin in-memory table model plus load/save. No spreadsheet format
//! parsing happens here.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Whole workbook: sheets in file order.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Workbook {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

/// One sheet: declared column order plus data rows.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Sheet {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// A data row: column name to scalar cell value. Read-only to the pipeline.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(transparent)]
pub struct Row(pub BTreeMap<String, Value>);

impl Row {
    /// Normalized cell content: trimmed string form; absent and null cells
    /// read as empty.
    pub fn field(&self, column: &str) -> String {
        match self.0.get(column) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.trim().to_string(),
            Some(other) => other.to_string(),
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }
}

impl Workbook {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("read workbook {}", path.display()))?;
        let workbook = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse workbook JSON {}", path.display()))?;
        Ok(workbook)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serialize workbook")?;
        fs::write(path, json).with_context(|| format!("write workbook {}", path.display()))?;
        Ok(())
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    /// Append rows to a sheet, creating it with the given header when absent.
    /// Existing rows are never touched; the sheet only grows.
    pub fn append_rows(&mut self, sheet_name: &str, columns: &[&str], rows: Vec<Row>) {
        let index = match self.sheets.iter().position(|sheet| sheet.name == sheet_name) {
            Some(index) => index,
            None => {
                self.sheets.push(Sheet {
                    name: sheet_name.to_string(),
                    columns: columns.iter().map(|column| column.to_string()).collect(),
                    rows: Vec::new(),
                });
                self.sheets.len() - 1
            }
        };
        self.sheets[index].rows.extend(rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        serde_json::from_value(value).expect("row from JSON")
    }

    #[test]
    fn field_normalizes_scalars() {
        let row = row(json!({
            "Name": "  Pump seal  ",
            "Severity": 3,
            "Comments": null
        }));
        assert_eq!(row.field("Name"), "Pump seal");
        assert_eq!(row.field("Severity"), "3");
        assert_eq!(row.field("Comments"), "");
        assert_eq!(row.field("Absent"), "");
    }

    #[test]
    fn load_save_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("workbook.json");
        let document = json!({
            "sheets": [{
                "name": "Create Causes",
                "columns": ["Fail Mode ID", "Cause Name"],
                "rows": [{"Fail Mode ID": "FM-1", "Cause Name": "Wear"}]
            }]
        });
        std::fs::write(&path, document.to_string()).expect("write fixture");

        let workbook = Workbook::load(&path).expect("load");
        assert_eq!(workbook.sheets.len(), 1);
        assert_eq!(
            workbook.sheet("Create Causes").expect("sheet").rows[0].field("Cause Name"),
            "Wear"
        );

        workbook.save(&path).expect("save");
        let reloaded = Workbook::load(&path).expect("reload");
        assert_eq!(reloaded.sheets.len(), 1);
    }

    #[test]
    fn append_rows_creates_sheet_once_and_only_grows() {
        let mut workbook = Workbook::default();
        let mut cells = BTreeMap::new();
        cells.insert("Status".to_string(), Value::String("Success".to_string()));
        workbook.append_rows("Change Log", &["Status"], vec![Row(cells.clone())]);
        workbook.append_rows("Change Log", &["Status"], vec![Row(cells)]);

        assert_eq!(workbook.sheets.len(), 1);
        let sheet = workbook.sheet("Change Log").expect("audit sheet");
        assert_eq!(sheet.columns, vec!["Status".to_string()]);
        assert_eq!(sheet.rows.len(), 2);
    }
}
