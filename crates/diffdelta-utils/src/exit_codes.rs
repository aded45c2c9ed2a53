//! Exit code constants for the diffdelta binary.
//!
//! The contract is deliberately narrow: `0` when every source finished
//! `ok` or `disabled`, `1` otherwise (at least one source error, missing
//! configuration, or an engine invariant violation).

/// Process exit code, mapped at the CLI boundary only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// All sources ok or disabled.
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// At least one source error, missing config, or invariant violation.
    pub const FAILURE: ExitCode = ExitCode(1);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}
