//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - one or more actions failed
pub const ERROR: i32 = 1;

/// Validation error - local files cannot be planned or an action was refused
pub const VALIDATION_ERROR: i32 = 2;

/// Cluster error - connection failure or ConfigMaps could not be listed
pub const CLUSTER_ERROR: i32 = 3;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or configuration (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
