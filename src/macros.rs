/// Report an invariant violation and stop the current execution context.
///
/// Never returns. Anything that reaches this has found the tables in a state
/// that continuing from could silently corrupt memory.
#[macro_export]
macro_rules! bug {
    ($($arg:tt)*) => ($crate::stop::fatal(format_args!($($arg)*)));
}

/// [`bug!`] if the condition holds.
#[macro_export]
macro_rules! bug_on {
    ($cond:expr) => (
        if $cond {
            $crate::bug!("BUG_ON({})", stringify!($cond));
        }
    );
    ($cond:expr, $($arg:tt)*) => (
        if $cond {
            $crate::bug!($($arg)*);
        }
    );
}
