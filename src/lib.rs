pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod models;
pub mod price;
pub mod summary_stats;
