//! Layered rc configuration library
//!
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod format;
pub mod logging;
pub mod strings;
