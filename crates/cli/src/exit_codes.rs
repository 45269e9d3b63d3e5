//! CLI Exit Code Registry
//!
//! Single source of truth for `bhmigrate` exit codes. Scripts wrapping the
//! migration rely on them to tell a bad environment from a dead server.
//!
//! | Code | Meaning                                                      |
//! |------|--------------------------------------------------------------|
//! | 0    | Success                                                      |
//! | 1    | General error (unspecified)                                  |
//! | 2    | Usage error (no action flag, bad arguments)                  |
//! | 10   | Configuration missing or malformed (environment)             |
//! | 11   | Cannot reach or authenticate to the server                   |
//! | 12   | Input file does not have the expected structure              |
//! | 13   | File-system error (read, write or remove)                    |
//!
//! Per-query failures inside an import or delete pass never change the exit
//! code; they are printed and the pass continues.

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - no action requested, bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// A required `BHE_*` variable is missing or malformed.
pub const EXIT_CONFIG: u8 = 10;

/// Client construction, version fetch, or listing failed.
pub const EXIT_CONNECT: u8 = 11;

/// Legacy or new-format file is not the expected JSON shape.
pub const EXIT_INPUT: u8 = 12;

/// Reading an input file, or writing/removing the intermediate file, failed.
pub const EXIT_IO: u8 = 13;
