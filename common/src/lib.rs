pub mod config;
pub mod slide;

#[doc(hidden)]
pub use tracing as __tracing;

/// Log target used for lines that are already fully formatted for the terminal.
pub const PRINT_TARGET: &str = "medid::print";
/// Log target used for positive outcomes, rendered with a distinct marker.
pub const SUCCESS_TARGET: &str = "medid::success";

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::__tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::__tracing::info!(target: "medid::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::__tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::__tracing::error!($($arg)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::__tracing::debug!($($arg)*)
    };
}
