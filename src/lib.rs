pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod planner;
pub mod snapshot;
pub mod store;
