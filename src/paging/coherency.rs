//! Barrier sequences around translation table updates.
//!
//! ARMv5 caches are virtually indexed, so a translation must not change while
//! dirty lines for it are still in the data cache, and the TLB must be
//! invalidated whenever a translation it may hold has changed.

use crate::arch::Arch;
use crate::common::PhysicalAddress;

/// Before a live translation is removed or replaced.
pub fn before_unmap<A: Arch>(arch: &A) {
    arch.clean_invalidate_cache();
    arch.invalidate_tlb();
}

/// After a translation has been removed.
pub fn after_unmap<A: Arch>(arch: &A) {
    arch.invalidate_tlb();
}

/// After a translation has been written.
pub fn after_map<A: Arch>(arch: &A) {
    arch.clean_invalidate_cache();
    arch.invalidate_tlb();
}

/// Move the hardware onto the first-level table at `pgd`.
///
/// # Safety
/// See [`Arch::set_ttb`].
pub unsafe fn switch_ttb<A: Arch>(arch: &A, pgd: PhysicalAddress) {
    arch.clean_invalidate_cache();
    arch.drain_write_buffer();
    arch.invalidate_tlb();
    arch.set_ttb(pgd);
    arch.invalidate_tlb();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::emulate::{EmulateArch, Op};

    #[test]
    fn unmap_sequences() {
        let arch = EmulateArch::new();
        before_unmap(&arch);
        after_unmap(&arch);
        assert_eq!(arch.take_journal(), [Op::CleanInvalidateCache, Op::InvalidateTlb, Op::InvalidateTlb]);
    }

    #[test]
    fn ttb_switch_sequence() {
        let arch = EmulateArch::new();
        let pgd = PhysicalAddress::new(0x0004_4000);
        unsafe { switch_ttb(&arch, pgd) };
        assert_eq!(
            arch.take_journal(),
            [
                Op::CleanInvalidateCache,
                Op::DrainWriteBuffer,
                Op::InvalidateTlb,
                Op::SetTtb(pgd),
                Op::InvalidateTlb,
            ]
        );
        assert_eq!(arch.ttb(), Some(pgd));
    }
}
