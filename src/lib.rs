// src/lib.rs
// ────────────────────────────────────────────────────────────────────────────
// Public library entry point.  Re-export everything for both binaries and
// integration tests.

pub mod collector;
pub mod config;
pub mod db;
pub mod events;
pub mod logging;
pub mod pipeline;
