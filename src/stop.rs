//! The fatal path.
//!
//! Invariant violations are reported through the diagnostic sink and then
//! raised as a panic. On the target the panic handler halts the core for
//! good; under test the panic is what `#[should_panic]` observes.

use core::fmt;

#[cold]
#[inline(never)]
#[track_caller]
pub fn fatal(args: fmt::Arguments<'_>) -> ! {
    log::error!("BUG: {}", args);
    panic!("{}", args)
}
