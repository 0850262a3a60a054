//! Layered configuration with references, typed reads and bean binding.

pub mod cli;
pub mod config;
pub mod error;
