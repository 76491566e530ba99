//! Search API / 搜索接口
//!
//! - query: public read endpoints (tables, tools, search, lookup)
//! - admin: index rebuild and status

pub mod admin;
pub mod query;
pub mod types;

pub use admin::{get_index_status, rebuild_index, run_rebuild};
pub use query::{list_tables, list_tools, lookup_row, search};
