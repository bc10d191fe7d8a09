//! hexvault - Hex editor backed by a chunked key-value store
//!
//! This library provides shared functionality for hexvault (TUI editor) and hvstore (CLI tool).

pub mod app;
pub mod buffer;
pub mod config;
pub mod logging;
pub mod store;
pub mod ui;
pub mod view;
