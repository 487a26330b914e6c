pub mod columns;
pub mod error;
pub mod item;
pub mod text;

pub use error::DataShapeError;
pub use item::{CollectionRecord, Item};
pub use text::{join_list, normalize_text, split_list, split_tags, tokenize};
