//! Stable exit codes for supervisor CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid payload, policy configuration, or internal failure.
pub const INVALID: i32 = 1;
/// Action is not valid for the run's current state.
pub const CONFLICT: i32 = 2;
/// Run not found.
pub const NOT_FOUND: i32 = 3;

/// Map an HTTP-style status code from the control layer to an exit code.
pub fn from_status(status: u16) -> i32 {
    match status {
        404 => NOT_FOUND,
        409 => CONFLICT,
        _ => INVALID,
    }
}
