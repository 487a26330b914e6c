//! Storage layer: the workbook, a directory of CSV sheets keyed by item identifier.

mod error;
pub use error::StoreError;

mod workbook;
pub use workbook::{
    COLLECTIONS_FILE, LIKED_FILE, Workbook, WorkbookStore, carry_annotations,
};
