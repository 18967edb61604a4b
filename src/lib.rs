//! Backup, restore and lifecycle management for a self-hosted docker compose stack

pub mod core;
pub mod utils;
