//! CLI module for local-rag
//!
//! Handles command-line argument parsing.

pub mod args;

pub use args::{Args, Commands, IndexArgs};
