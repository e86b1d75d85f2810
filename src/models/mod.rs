//! Domain model modules.

pub mod event;
pub mod history;
pub mod incident;
pub mod message;
pub mod session;
pub mod task;
