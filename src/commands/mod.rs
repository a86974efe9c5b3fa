//! Command implementations behind the CLI subcommands.

pub mod export;
pub mod status;

pub use export::{ExportArgs, export};
pub use status::{StatusArgs, status};
