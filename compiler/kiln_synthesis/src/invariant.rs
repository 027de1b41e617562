//! Internal invariant checks.
//!
//! Checks are compiled in with `debug_assertions` or the `strict-invariants`
//! feature. A failed check is a compiler bug, never a user error.

/// Panic with a message naming the offending item when `$cond` is false.
macro_rules! invariant {
    ($cond:expr, $($arg:tt)+) => {
        if cfg!(any(debug_assertions, feature = "strict-invariants")) && !$cond {
            panic!("synthetic items invariant violated: {}", format_args!($($arg)+));
        }
    };
}

pub(crate) use invariant;
