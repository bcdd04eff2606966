//! Command line host for jsbridge.
//!
//! Selects a runtime (`--runtime` beats `JSBRIDGE_RUNTIME`, which beats
//! auto-detection), evaluates code in a fresh context and prints the result.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;
