//! Monorun CLI library functions for testing

pub mod cli;
pub mod commands;
pub mod config;
pub mod input;
pub mod output;
