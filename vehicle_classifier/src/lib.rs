mod app;
mod commands;

pub mod acquisition;
pub mod candidate;
pub mod config;
pub mod error;
pub mod labels;
pub mod prediction;
pub mod ranking;
pub mod render;
pub mod runtime;
pub mod session;
pub mod workflow;

pub use app::start_app;
