//! Moving the boot table area next to the kernel image.

use crate::arch::consts::{PGD_ENTRY_TOTAL, PMD_SIZE};
use crate::arch::Arch;
use crate::common::VirtualAddress;
use crate::layout::KernelLayout;

use super::coherency;
use super::entry::PgdKind;
use super::flags::MapFlags;
use super::mapper::PageTables;
use super::table::{pgd_index, pool_index, PgdTable, PMD_POOL_OFFSET};

impl<A: Arch> PageTables<A> {
    /// Move the table area from where the boot code put it to the first
    /// table-aligned address after the kernel image, switch the hardware
    /// over, and unmap the old area.
    ///
    /// The new location has to be covered by coarse tables already, so the
    /// kernel's last section must have been remapped as pages. Done once.
    pub fn relocate_page_tables(&mut self) {
        bug_on!(self.relocated, "page tables are already relocated");

        let (pt_start, pt_end) = self.layout.pt_bounds();
        let pt_area_size = KernelLayout::pt_area_size();
        let pt_new = self.layout.pt_relocation_target();
        let reloc_offset = pt_start.get().wrapping_sub(pt_new.get());
        bug_on!(reloc_offset % PMD_SIZE != 0, "relocation offset {:#x} is not 1K aligned", reloc_offset);
        bug_on!(
            pt_new < pt_end && pt_start < pt_new.add(pt_area_size),
            "table area {:#x} overlaps its new home {:#x}",
            pt_start,
            pt_new
        );

        let phys_old = self.layout.virt_to_phys(pt_start);
        let phys_new = self.layout.virt_to_phys(pt_new);

        // Map the new area so it can be written through
        self.add_mapping(phys_new, pt_new, pt_area_size, MapFlags::IO_DEFAULT);

        // Copy everything, the first-level table and the pool
        let area = unsafe { self.arch.table_area_at(pt_new) };
        area.copy_from(&*self.area);
        self.area = area;

        // Coarse entries still point at the old pool
        let old_base = phys_old.add(PMD_POOL_OFFSET);
        let new_base = phys_new.add(PMD_POOL_OFFSET);
        let used = self.pmds_used;
        for entry in self.area.pgd.entries_mut() {
            if let PgdKind::Coarse(pmd) = entry.kind() {
                let index = match pool_index(old_base, used, pmd) {
                    Some(index) => index,
                    None => bug!("coarse entry {:#x} is outside the table area being relocated", pmd),
                };
                *entry = entry.repoint(new_base.add(index as u32 * PMD_SIZE));
            }
        }

        unsafe { coherency::switch_ttb(&self.arch, phys_new) };

        self.remove_section_mapping(pt_start);

        self.layout.move_pt_area(pt_new);
        self.relocated = true;

        log::info!("Initial page table area relocated from phys {:#x} to {:#x}", phys_old, phys_new);

        #[cfg(feature = "dump_tables")]
        self.dump_tables();
    }
}

/// Copy the first-level entries covering `start..end` from `from` into `to`.
///
/// An `end` in the first megabyte means the top of the address space.
pub fn copy_pgds_by_vrange(to: &mut PgdTable, from: &PgdTable, start: VirtualAddress, end: VirtualAddress) {
    let start_i = pgd_index(start);
    let end_i = match pgd_index(end) {
        0 => PGD_ENTRY_TOTAL,
        end_i => end_i,
    };
    bug_on!(end_i < start_i, "pgd range {:#x} - {:#x} is inverted", start, end);

    to.copy_range_from(from, start_i, end_i);
}
