//! Architecture seam.
//!
//! Everything the translation table code needs from the hardware goes through
//! [`Arch`]. The real implementation lives in [`arm`]; tests run against
//! [`emulate::EmulateArch`].

use crate::common::{PhysicalAddress, VirtualAddress};
use crate::paging::TableArea;

pub mod arm;
pub use self::arm::consts;

#[cfg(test)]
pub mod emulate;

/// Primitive cache, TLB and translation-base operations.
///
/// Every operation is a blocking barrier: it has completed by the time the
/// call returns. Ordering between them is the job of
/// [`crate::paging::coherency`], not of implementors.
pub trait Arch {
    /// Clean the data cache to memory and invalidate it, then invalidate the
    /// instruction cache.
    fn clean_invalidate_cache(&self);

    /// Drop every cached translation.
    fn invalidate_tlb(&self);

    /// Wait until every buffered write has reached memory.
    fn drain_write_buffer(&self);

    /// Program the translation table base register.
    ///
    /// # Safety
    /// `pgd` must be the physical address of a first-level table that maps
    /// the code and data in use at the time of the call.
    unsafe fn set_ttb(&self, pgd: PhysicalAddress);

    /// Storage for a table area that lives at `virt`.
    ///
    /// # Safety
    /// `virt` must be mapped writable for the whole size of a [`TableArea`],
    /// aligned to it, and not referenced from anywhere else.
    unsafe fn table_area_at(&self, virt: VirtualAddress) -> &'static mut TableArea;
}
