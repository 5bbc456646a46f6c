//! CLI commands

pub mod artifacts;
pub mod bind;
pub mod order;
pub mod shards;
pub mod status;
