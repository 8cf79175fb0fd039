//! Operation definitions and the registry mapping workbook sheets to them.
//!
//! Templates are data: an argv skeleton where field arguments pull from row
//! columns. All quoting flows through `shell_words::join`, so a rendered
//! command parses back into the exact argv it was built from.
use crate::workbook::Row;
use thiserror::Error;

/// Column whose value marks a row's processing state. Required to exist in
/// every operation sheet but excluded from row-completeness checks, since an
/// empty status is what makes a row eligible.
pub const STATUS_COLUMN: &str = "Agent Status";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("an operation for sheet '{0}' is already registered")]
    DuplicateOperation(String),
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),
}

/// One argv element of a command template.
#[derive(Debug, Clone)]
pub enum TemplateArg {
    /// Fixed argv element, emitted verbatim.
    Literal(String),
    /// Prefix completed with a row column's value, e.g. `--field=Name=<v>`.
    Field { prefix: String, column: String },
}

/// Pure mapping from a row's field values to a command string.
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    pub argv: Vec<TemplateArg>,
}

impl CommandTemplate {
    /// Render the full command line for one row. Deterministic: the same row
    /// always yields the same string, and every element is shell-quoted.
    pub fn render(&self, row: &Row) -> String {
        let rendered: Vec<String> = self
            .argv
            .iter()
            .map(|arg| match arg {
                TemplateArg::Literal(text) => text.clone(),
                TemplateArg::Field { prefix, column } => {
                    format!("{prefix}{}", row.field(column))
                }
            })
            .collect();
        shell_words::join(&rendered)
    }
}

/// A registered operation: which sheet feeds it, which columns it needs, and
/// how a row becomes a command.
#[derive(Debug, Clone)]
pub struct OperationSpec {
    pub sheet: String,
    pub name: String,
    pub required_columns: Vec<String>,
    pub optional_columns: Vec<String>,
    pub template: CommandTemplate,
}

/// Instantiable registry; iteration order is registration order.
#[derive(Debug, Default)]
pub struct Registry {
    operations: Vec<OperationSpec>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: OperationSpec) -> Result<(), RegistryError> {
        if self.operations.iter().any(|existing| existing.sheet == spec.sheet) {
            return Err(RegistryError::DuplicateOperation(spec.sheet));
        }
        self.operations.push(spec);
        Ok(())
    }

    pub fn get(&self, sheet: &str) -> Result<&OperationSpec, RegistryError> {
        self.operations
            .iter()
            .find(|spec| spec.sheet == sheet)
            .ok_or_else(|| RegistryError::UnknownOperation(sheet.to_string()))
    }

    pub fn by_name(&self, name: &str) -> Result<&OperationSpec, RegistryError> {
        self.operations
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| RegistryError::UnknownOperation(name.to_string()))
    }

    pub fn all(&self) -> &[OperationSpec] {
        &self.operations
    }

    /// The built-in operation set for the FM&C modification workbook.
    /// `im_program` is the change-tracking CLI executable name or path.
    pub fn standard(im_program: &str) -> Self {
        let mut registry = Registry::new();
        let specs = vec![
            issue_operation(
                im_program,
                "Create Fail Modes",
                "Create Fail Mode",
                "Fail Mode",
                &[
                    ("Functional System ID", "Functional System ID"),
                    ("Name", "Fail Mode Name"),
                    ("Description", "Fail Mode Description"),
                ],
                &["Comments", "Priority", "Severity"],
            ),
            issue_operation(
                im_program,
                "Create Causes",
                "Create Cause",
                "Cause",
                &[
                    ("Fail Mode ID", "Fail Mode ID"),
                    ("Name", "Cause Name"),
                    ("Description", "Cause Description"),
                ],
                &["Comments", "Probability", "Impact"],
            ),
            issue_operation(
                im_program,
                "Create Controls",
                "Create Control",
                "Control",
                &[
                    ("Control Type", "Control Type"),
                    ("Name", "Control Name"),
                    ("Description", "Control Description"),
                ],
                &["Comments", "Effectiveness", "Implementation Status"],
            ),
            relationship_operation(im_program),
        ];
        for spec in specs {
            registry
                .register(spec)
                .expect("built-in operation sheets are unique");
        }
        registry
    }
}

fn issue_operation(
    im_program: &str,
    sheet: &str,
    name: &str,
    issue_type: &str,
    fields: &[(&str, &str)],
    optional: &[&str],
) -> OperationSpec {
    let mut argv = vec![
        TemplateArg::Literal(im_program.to_string()),
        TemplateArg::Literal("createissue".to_string()),
        TemplateArg::Literal(format!("--type={issue_type}")),
    ];
    for (field, column) in fields {
        argv.push(TemplateArg::Field {
            prefix: format!("--field={field}="),
            column: (*column).to_string(),
        });
    }
    OperationSpec {
        sheet: sheet.to_string(),
        name: name.to_string(),
        required_columns: fields.iter().map(|(_, column)| (*column).to_string()).collect(),
        optional_columns: optional.iter().map(|column| column.to_string()).collect(),
        template: CommandTemplate { argv },
    }
}

fn relationship_operation(im_program: &str) -> OperationSpec {
    OperationSpec {
        sheet: "Create Control Causes".to_string(),
        name: "Create Control Cause".to_string(),
        required_columns: vec!["Control ID".to_string(), "Cause ID".to_string()],
        optional_columns: vec!["Comments".to_string(), "Relationship Type".to_string()],
        template: CommandTemplate {
            argv: vec![
                TemplateArg::Literal(im_program.to_string()),
                TemplateArg::Literal("createrelationship".to_string()),
                TemplateArg::Literal("--type=Control-Cause".to_string()),
                TemplateArg::Field {
                    prefix: "--field=Control ID=".to_string(),
                    column: "Control ID".to_string(),
                },
                TemplateArg::Field {
                    prefix: "--field=Cause ID=".to_string(),
                    column: "Cause ID".to_string(),
                },
            ],
        },
    }
}
