use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Missing expected columns: {}. Please ensure your spreadsheet includes these headers (case is ignored for matching).", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Error in spreadsheet data at source row {row}: {}.", join_problems(.problems))]
    RowValidation {
        row: usize,
        problems: Vec<FieldProblem>,
    },

    #[error("Spreadsheet is empty or has no header row.")]
    NoHeaderRow,

    #[error("Workbook contains no worksheets")]
    EmptyWorkbook,

    #[error("Unsupported file type '{0}': expected .xlsx, .xlsm, .xls, .xlsb, .ods or .csv")]
    UnsupportedFormat(String),

    #[error("Invalid fiscal year label '{0}': expected 'FY YYYY-YYYY' with consecutive years")]
    InvalidFiscalYear(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse spreadsheet: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Failed to write workbook: {0}")]
    XlsxError(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Error reading file: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

/// A single field-level defect found while normalizing one spreadsheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldProblem {
    /// Column header as it appears in the source file.
    pub column: String,
    pub kind: ProblemKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProblemKind {
    MissingValue,
    InvalidNumber { value: String },
    NegativeQuantity { value: String },
    ImpossibleDate { value: String },
    UnparseableDate { value: String },
    InvalidDateSerial { value: String },
}

impl FieldProblem {
    pub fn new(column: impl Into<String>, kind: ProblemKind) -> Self {
        Self {
            column: column.into(),
            kind,
        }
    }
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = &self.column;
        match &self.kind {
            ProblemKind::MissingValue => {
                write!(f, "Missing value for required column '{}'", column)
            }
            ProblemKind::InvalidNumber { value } => {
                write!(f, "Invalid number for '{}': \"{}\"", column, value)
            }
            ProblemKind::NegativeQuantity { value } => {
                write!(f, "Negative quantity for '{}': \"{}\"", column, value)
            }
            ProblemKind::ImpossibleDate { value } => write!(
                f,
                "Invalid date in '{}': \"{}\" (dd/mm/yyyy format but creates invalid date)",
                column, value
            ),
            ProblemKind::UnparseableDate { value } => write!(
                f,
                "Invalid or unparseable date format for '{}': \"{}\". Expected dd/mm/yyyy or ISO format (YYYY-MM-DD)",
                column, value
            ),
            ProblemKind::InvalidDateSerial { value } => {
                write!(f, "Invalid date serial for '{}': \"{}\"", column, value)
            }
        }
    }
}

fn join_problems(problems: &[FieldProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
