use thiserror::Error;

/// An item or sheet is missing data Curator expects.
///
/// Never fatal: callers log it and carry on with the field treated as empty.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataShapeError {
    #[error("sheet '{sheet}' has no '{column}' column")]
    MissingColumn { sheet: String, column: String },

    #[error("item '{item}' has no value for '{field}'")]
    MissingField { item: String, field: String },
}
