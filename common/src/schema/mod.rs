pub mod model;
pub mod json;
pub mod context;

pub use model::{Column, DatabaseSchema, ForeignKey, Table};
