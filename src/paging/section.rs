//! Boot-time section mappings and their promotion to small pages.

use crate::arch::consts::{PAGE_SIZE, PGD_ENTRY_TOTAL, PMD_ENTRY_TOTAL, SECTION_SIZE};
use crate::arch::Arch;
use crate::common::{PhysicalAddress, VirtualAddress};

use super::coherency;
use super::entry::{AccessPermission, CacheFlags, PgdEntry, PgdKind, PmdEntry};
use super::flags::MapFlags;
use super::mapper::PageTables;
use super::page_count;
use super::table::pgd_index;

impl<A: Arch> PageTables<A> {
    /// Map `size` sections at `vaddr` onto `paddr`, kernel read-write, before
    /// the MMU is running.
    ///
    /// Both addresses are rounded down to a section. No cache or TLB
    /// maintenance is done, there is nothing to maintain yet.
    pub fn add_section_mapping_init(&mut self, paddr: PhysicalAddress, vaddr: VirtualAddress, size: u32, flags: CacheFlags) {
        let psection = paddr.align_down(SECTION_SIZE);
        let vsection = vaddr.align_down(SECTION_SIZE);
        if size == 0 {
            return;
        }

        let first = pgd_index(vsection);
        let count = size as usize;
        bug_on!(
            count > PGD_ENTRY_TOTAL - first,
            "{} sections from {:#x} run past the end of the address space",
            size,
            vsection
        );

        let pgd = &mut self.area.pgd;
        for i in 0..count {
            let base = psection.add(i as u32 * SECTION_SIZE);
            pgd.set_entry(first + i, PgdEntry::section(base, AccessPermission::SvcRwUsrNone, flags));
        }
    }

    /// Remove the section mapping `vaddr`, which must be one.
    pub fn remove_section_mapping(&mut self, vaddr: VirtualAddress) {
        let pgd_i = pgd_index(vaddr);
        let entry = self.area.pgd.entry(pgd_i);
        match entry.kind() {
            PgdKind::Section(_) => self.area.pgd.set_entry(pgd_i, PgdEntry::FAULT),
            kind => bug!("removing section mapping at {:#x}, but it is {:?}", vaddr, kind),
        }
        coherency::after_unmap(&self.arch);
    }

    /// Replace the section mapping the kernel area at `vstart` with a coarse
    /// table of small pages onto the same frames.
    ///
    /// `vstart` must start a section, and `vend` end within it. The whole
    /// section is remapped, pages past `vend` included, with the kernel's
    /// default permissions.
    pub fn remap_as_pages(&mut self, vstart: VirtualAddress, vend: VirtualAddress) {
        bug_on!(!vstart.is_aligned(SECTION_SIZE), "remap start {:#x} is not section aligned", vstart);
        bug_on!(
            vend <= vstart || vend.get() - vstart.get() > SECTION_SIZE,
            "remap end {:#x} is not within the section at {:#x}",
            vend,
            vstart
        );

        let pgd_i = pgd_index(vstart);
        let base = match self.area.pgd.entry(pgd_i).kind() {
            PgdKind::Section(base) => base,
            kind => bug!("remapping {:#x} as pages, but it is {:?}", vstart, kind),
        };
        let attrs = match MapFlags::SVC_DEFAULT.to_page_attributes() {
            Some(attrs) => attrs,
            None => bug!("kernel map flags have no hardware encoding"),
        };

        let (arch, pgd, mut pool) = self.split();
        let pmd_phys = pool.alloc();
        let pmd = pool.table_mut(pmd_phys);
        for i in 0..PMD_ENTRY_TOTAL {
            pmd.set_entry(i, PmdEntry::small(base.add(i as u32 * PAGE_SIZE), attrs));
        }

        // The section is live, nothing may be cached through it when it goes
        coherency::before_unmap(arch);
        pgd.set_entry(pgd_i, PgdEntry::coarse(pmd_phys));

        log::info!(
            "Kernel area {:#x} - {:#x} remapped as {} pages, {} of them in use",
            vstart,
            vend,
            PMD_ENTRY_TOTAL,
            page_count(vend.get() - vstart.get())
        );
    }
}
