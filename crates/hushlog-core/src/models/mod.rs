pub mod model;
pub mod project;
pub mod query_record;
pub mod token_count;
pub mod usage;
