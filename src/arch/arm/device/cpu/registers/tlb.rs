//! Functions to flush the translation lookaside buffer (TLB).

use core::arch::asm;

/// Invalidate the whole unified TLB.
pub unsafe fn flush_all() {
    asm!("mcr p15, 0, {}, c8, c7, 0", in(reg) 0u32, options(nostack));
}
