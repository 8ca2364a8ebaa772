#![doc = include_str!("../README.md")]

pub mod analysis;
pub mod cascade;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod export;
pub mod result;
pub mod run;
pub mod runner;
pub mod sequence;
pub mod tool;
pub mod utils;
pub mod verify;

#[doc(inline)]
pub use crate::cli::Cli;
#[doc(inline)]
pub use crate::config::Config;
#[doc(inline)]
pub use crate::error::Error;
#[doc(inline)]
pub use crate::tool::{Tool, Virus};
#[doc(inline)]
pub use utils::verbosity::Verbosity;
