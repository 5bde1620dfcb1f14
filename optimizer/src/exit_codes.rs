//! Stable exit codes for the optimizer CLI.

/// All requested iterations ran.
pub const OK: i32 = 0;
/// Invalid arguments, config, credentials, or an I/O failure.
pub const INVALID: i32 = 1;
/// The provider failed after retries; partial results were reported.
pub const ABORTED: i32 = 2;
