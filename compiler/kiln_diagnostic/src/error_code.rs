//! Error codes for all compiler diagnostics.
//!
//! Each error code is a unique identifier (e.g., `E7001`) with the first digit
//! indicating the compiler phase.

use std::fmt;

/// Error codes for all compiler diagnostics.
///
/// Format: E#### where first digit indicates phase:
/// - E7xxx: Synthetic item errors
/// - E9xxx: Internal compiler errors
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Synthetic Item Errors (E7xxx)
    /// Intermediate artifact compiled without its synthesizing context
    E7001,
    /// Synthetic marker names an unknown kind
    E7002,
    /// Synthetic marker was written by an incompatible compiler version
    E7003,
    /// Synthetic marker payload is malformed
    E7004,
    /// Synthetic input marker on a classpath class
    W7001,

    // Internal Errors (E9xxx)
    /// Internal compiler error
    E9001,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E7001 => "E7001",
            ErrorCode::E7002 => "E7002",
            ErrorCode::E7003 => "E7003",
            ErrorCode::E7004 => "E7004",
            ErrorCode::W7001 => "W7001",
            ErrorCode::E9001 => "E9001",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E7001 => "intermediate artifact compiled without its context",
            ErrorCode::E7002 => "unknown synthetic kind in marker",
            ErrorCode::E7003 => "synthetic marker version mismatch",
            ErrorCode::E7004 => "malformed synthetic marker",
            ErrorCode::W7001 => "synthetic marker ignored on a non-program class",
            ErrorCode::E9001 => "internal compiler error",
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ErrorCode::W7001)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
