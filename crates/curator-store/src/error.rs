use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("workbook not found: {0}")]
    WorkbookNotFound(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not replace sheet: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("{0}")]
    Other(String),
}
