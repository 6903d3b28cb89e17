pub mod cli;
pub mod common;
pub mod core;
pub mod frontend;
pub mod monitor;

pub use anyhow::{Context, Result};
