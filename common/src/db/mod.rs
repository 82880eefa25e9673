pub mod pool;
pub mod extractor;
pub mod cache;

pub use cache::{CachedSchema, SchemaCache};
pub use extractor::{PgSchemaExtractor, SchemaSource};
pub use pool::DatabaseProbe;
pub use deadpool_postgres::Pool;
