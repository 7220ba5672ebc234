pub mod cache;
pub mod config;
pub mod dashboard;
pub mod detection;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod output;
pub mod parser;
pub mod server;
pub mod stats;

pub use error::{FeedError, Result};
