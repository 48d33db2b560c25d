//! Functions to read and write CP15 control registers.

use core::arch::asm;

/// Main ID register
pub unsafe fn midr() -> u32 {
    let ret: u32;
    asm!("mrc p15, 0, {}, c0, c0, 0", out(reg) ret, options(nomem, nostack));
    ret
}

/// Translation table base
pub unsafe fn ttb_write(val: u32) {
    asm!("mcr p15, 0, {}, c2, c0, 0", in(reg) val, options(nostack));
}
