//! CLI subcommands.

pub mod eligibility;
pub mod migrate;
pub mod seed;
