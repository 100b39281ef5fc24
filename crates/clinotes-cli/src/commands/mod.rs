//! Command implementations.

pub mod extract;
pub mod models;
pub mod schema;

pub use self::extract::{execute_extract, run_extraction};
pub use self::models::execute_models;
pub use self::schema::execute_schema;
