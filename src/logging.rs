//! Crate-internal logging macros over `tracing`.
//!
//! Every event is emitted under the `event_confirmer` target. Without the `tracing` feature
//! each call compiles to a no-op that still borrows its field expressions, so disabling the
//! feature never produces unused-variable warnings.

#[cfg(feature = "tracing")]
macro_rules! emit {
    ($level:ident, $($arg:tt)*) => {
        tracing::$level!(target: "event_confirmer", $($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! emit {
    ($level:ident, $($arg:tt)*) => {
        $crate::__trace_consume!($($arg)*)
    };
}

#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => { emit!(error, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => { emit!(warn, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => { emit!(info, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => { emit!(debug, $($arg)*) };
}

#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => { emit!(trace, $($arg)*) };
}

/// Swallows `tracing`-style arguments: `name = %expr`, `name = ?expr`, `name = expr`, then a
/// trailing message literal.
#[doc(hidden)]
#[macro_export]
#[cfg(not(feature = "tracing"))]
macro_rules! __trace_consume {
    ($field:ident = % $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        $crate::__trace_consume!($($rest)*);
    }};
    ($field:ident = ? $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        $crate::__trace_consume!($($rest)*);
    }};
    ($field:ident = $value:expr, $($rest:tt)*) => {{
        let _ = &$value;
        $crate::__trace_consume!($($rest)*);
    }};
    ($lit:literal $($rest:tt)*) => {
        $crate::__trace_consume!($($rest)*)
    };
    () => {};
}
