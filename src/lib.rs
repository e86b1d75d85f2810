#![forbid(unsafe_code)]

pub mod classifier;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod lifecycle;
pub mod llm;
pub mod models;
pub mod persistence;
pub mod slack;
pub mod state;
pub mod tasks;
pub mod webhook;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
