//! Multichat daemon library
//!
//! This module re-exports the daemon's modules for integration testing.

pub mod app;
pub mod cli;
pub mod config;
pub mod version;
pub mod viewer;

pub use app::{start_adapters, Daemon};
pub use config::MultichatConfig;
