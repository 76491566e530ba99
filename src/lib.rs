pub mod api;
pub mod config;
pub mod error;
pub mod search;
pub mod source;
pub mod state;

pub use error::{Error, Result};
