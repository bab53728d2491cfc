mod collection;
mod counter;
mod errors;
mod store;

pub use collection::{ensure_indexes_exist, u32_id_filter, Coll, MongoCollection};
pub use counter::{ensure_counters_exist, Counter};
pub use errors::{is_duplicate_key_error, DUPLICATE_KEY};
pub use store::MongoStore;
