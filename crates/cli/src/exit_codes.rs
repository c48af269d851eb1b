//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | General error (unspecified)                      |
//! | 2    | CLI usage error (bad args, malformed KEY=VALUE)  |
//! | 3    | Unsupported file format (binary profile)         |
//! | 4    | Not found (config file, backup, preset, setting) |
//! | 5    | Precondition failed (game running)               |
//! | 6    | Validation failed (value out of range/type)      |
//! | 7    | Filesystem error                                 |

use fieldtuner_core::FieldTunerError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Binary PROFSAVE profile, or otherwise unreadable format.
pub const EXIT_FORMAT: u8 = 3;

/// Config file, backup, preset or setting does not exist.
pub const EXIT_NOT_FOUND: u8 = 4;

/// Write refused because the game is running.
pub const EXIT_PRECONDITION: u8 = 5;

/// Value rejected by the settings registry.
pub const EXIT_VALIDATION: u8 = 6;

/// Read/write/copy failure.
pub const EXIT_IO: u8 = 7;

/// Map a library error to its exit code.
pub fn error_exit_code(err: &FieldTunerError) -> u8 {
    match err {
        FieldTunerError::Format { .. } => EXIT_FORMAT,
        FieldTunerError::NotFound { .. } => EXIT_NOT_FOUND,
        FieldTunerError::Precondition(_) => EXIT_PRECONDITION,
        FieldTunerError::Validation { .. } => EXIT_VALIDATION,
        FieldTunerError::Io { .. } => EXIT_IO,
        FieldTunerError::Catalog(_) => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldtuner_core::Resource;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_FORMAT,
            EXIT_NOT_FOUND,
            EXIT_PRECONDITION,
            EXIT_VALIDATION,
            EXIT_IO,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn errors_map_to_codes() {
        let err = FieldTunerError::not_found(Resource::Preset, "potato");
        assert_eq!(error_exit_code(&err), EXIT_NOT_FOUND);
        let err = FieldTunerError::Precondition("bf6.exe is running".into());
        assert_eq!(error_exit_code(&err), EXIT_PRECONDITION);
        let err = FieldTunerError::validation("GstRender.VSyncMode", "not a boolean");
        assert_eq!(error_exit_code(&err), EXIT_VALIDATION);
    }
}
