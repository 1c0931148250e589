//! CLI subcommand implementations.

pub mod compute;
pub mod report;
pub mod util;
