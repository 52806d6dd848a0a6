//! Logging helpers layered on top of `tracing`.
//!
//! Library crates log with the plain `tracing` macros. [`success!`](crate::success)
//! marks a positive status line, which the terminal formatter renders with its own symbol.

/// Target used for positive status lines.
pub const SUCCESS_TARGET: &str = "culler::success";

/// Target used for raw, prefix-less report lines.
pub const PRINT_TARGET: &str = "culler::print";

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::__tracing::info!(target: "culler::success", $($arg)*)
    };
}
