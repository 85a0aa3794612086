//! Command-line interface for lcadata.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{
    Cli, Commands, DescriptorArgs, FetchArgs, IndexArgs, LoadArgs, MetadataArgs, PruneArgs,
    StatusArgs,
};
pub use commands::{Command, CommandContext, CommandDispatcher, CommandResult};
