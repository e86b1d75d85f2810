//! Slack bridge layer modules.

pub mod blocks;
pub mod gateway;
