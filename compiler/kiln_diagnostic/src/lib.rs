//! Diagnostic system for whole-program passes.
//!
//! Diagnostics carry an error code for searchability, a message, the origin
//! of the offending input, and optional notes.
//!
//! # Error Guarantees
//!
//! The `ErrorGuaranteed` type provides type-level proof that at least one
//! error was reported. Only [`Reporter::error`] hands one out.
//!
//! ```text
//! let guarantee = reporter.error(diagnostic);
//! fn collect_inputs() -> Result<Inputs, ErrorGuaranteed> { ... }
//! ```

mod diagnostic;
mod error_code;
mod guarantee;
mod reporter;

pub use diagnostic::{Diagnostic, Severity};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use reporter::Reporter;
