/// Orderly shutdown
pub const EXIT_SUCCESS: i32 = 0;
/// A participant or the supervisor hit a fatal error
pub const EXIT_ERROR: i32 = 1;
