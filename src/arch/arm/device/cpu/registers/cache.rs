//! Cache and write buffer maintenance for the ARM926 family.

use core::arch::asm;

/// Clean and invalidate the whole data cache, then invalidate the
/// instruction cache.
///
/// Uses the test, clean and invalidate operation, which keeps going until
/// no dirty line is left.
pub unsafe fn clean_invalidate_all() {
    asm!(
        "1:",
        "mrc p15, 0, APSR_nzcv, c7, c14, 3",
        "bne 1b",
        "mcr p15, 0, {zero}, c7, c5, 0",
        zero = in(reg) 0u32,
        options(nostack),
    );
}

pub unsafe fn drain_write_buffer() {
    asm!("mcr p15, 0, {}, c7, c10, 4", in(reg) 0u32, options(nostack));
}

/// Wait for interrupt.
pub unsafe fn wait_for_interrupt() {
    asm!("mcr p15, 0, {}, c7, c0, 4", in(reg) 0u32, options(nomem, nostack));
}
