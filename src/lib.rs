// src/lib.rs

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod utils;

// Re-export specific items for convenience if needed
pub use db::{Registry, page_query};
pub use error::AppError;
