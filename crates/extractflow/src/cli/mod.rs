//! Command-line interface for extractflow
//!
//! Each command module exposes an args struct and a `run` function.

pub mod build;
pub mod config;
pub mod error;
pub mod inspect;
pub mod output;
pub mod publish;
pub mod refresh;
