//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - unreadable manifest, unknown kind or bad artifact spec
pub const INPUT_ERROR: i32 = 2;

/// Configuration error - invalid account configuration
pub const CONFIG_ERROR: i32 = 3;

/// Unhealthy - `status --check` found a manifest that is not stable
pub const UNHEALTHY: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
