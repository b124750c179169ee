//! CLI exit codes.
//!
//! Scripts rely on these; do not renumber.
//!
//! | Code | Meaning                                    |
//! |------|--------------------------------------------|
//! | 0    | Success                                    |
//! | 1    | General error                              |
//! | 2    | Usage error (bad args, unknown sheet)      |
//! | 3    | I/O error reading or writing a file        |
//! | 4    | Input is not a readable snapshot           |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, sheet selector matching nothing.
pub const EXIT_USAGE: u8 = 2;

/// File or stream could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Missing envelope or unparseable sheets payload.
pub const EXIT_SNAPSHOT: u8 = 4;
