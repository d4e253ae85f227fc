//! Command-line interface
//!
//! Argument parsing, command dispatch, and output rendering.

pub mod args;
pub mod commands;
pub mod render;
