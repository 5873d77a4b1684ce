pub mod store;
pub use store::{clearable, fetch_all, fetch_optional, from_row, to_patch_row, to_row, DataStore, Filter, Query, Row, Sort, Table};
pub mod memory_store;
pub use memory_store::MemoryStore;
pub mod pg_store;
pub use pg_store::PgStore;
