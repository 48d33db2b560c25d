//! Small page mappings through coarse second-level tables.

use crate::arch::consts::{PAGE_MASK, PAGE_SIZE, PGD_SIZE, SECTION_MASK};
use crate::arch::Arch;
use crate::common::{PhysicalAddress, VirtualAddress};
use crate::layout::KernelLayout;

use super::coherency;
use super::entry::{PgdEntry, PgdKind, PmdEntry, PmdKind, PTE_PROT_MASK};
use super::flags::MapFlags;
use super::table::{pgd_index, pmd_index, pool_index, PgdTable, PmdPool, PmdTable, TableArea};
use super::{page_count, Page};

/// Mask of the offset within a large page
const LARGE_PAGE_MASK: u32 = 0xFFFF;

/// The kernel's translation tables and the hardware they are loaded into.
///
/// Methods without a table argument act on the kernel's own first-level
/// table. The `_pgd` variants take any first-level table, for instance a
/// process table that borrows coarse tables from the kernel pool.
pub struct PageTables<A: Arch> {
    pub(super) arch: A,
    pub(super) area: &'static mut TableArea,
    pub(super) layout: KernelLayout,
    pub(super) pmds_used: usize,
    pub(super) relocated: bool,
}

impl<A: Arch> PageTables<A> {
    pub fn new(arch: A, area: &'static mut TableArea, layout: KernelLayout) -> Self {
        Self { arch, area, layout, pmds_used: 0, relocated: false }
    }

    pub fn arch(&self) -> &A {
        &self.arch
    }

    pub fn layout(&self) -> &KernelLayout {
        &self.layout
    }

    /// The kernel's first-level table
    pub fn kernel_pgd(&self) -> &PgdTable {
        &self.area.pgd
    }

    pub fn kernel_pgd_phys(&self) -> PhysicalAddress {
        self.layout.virt_to_phys(self.layout.pt_bounds().0)
    }

    /// Coarse tables handed out so far. They are never given back.
    pub fn pmds_used(&self) -> usize {
        self.pmds_used
    }

    pub fn is_relocated(&self) -> bool {
        self.relocated
    }

    pub(super) fn pmd_phys_base(&self) -> PhysicalAddress {
        self.kernel_pgd_phys().add(PGD_SIZE)
    }

    /// The kernel table, the pool and the hardware, borrowed apart.
    pub(super) fn split(&mut self) -> (&A, &mut PgdTable, PmdPool<'_>) {
        let phys_base = self.pmd_phys_base();
        let area = &mut *self.area;
        (&self.arch, &mut area.pgd, PmdPool::new(&mut area.pmds, &mut self.pmds_used, phys_base))
    }

    fn pool(&mut self) -> (&A, PmdPool<'_>) {
        let phys_base = self.pmd_phys_base();
        (&self.arch, PmdPool::new(&mut self.area.pmds, &mut self.pmds_used, phys_base))
    }

    fn pmd_table(&self, phys: PhysicalAddress) -> &PmdTable {
        match pool_index(self.pmd_phys_base(), self.pmds_used, phys) {
            Some(index) => &self.area.pmds[index],
            None => bug!("coarse entry {:#x} does not point at an allocated second-level table", phys),
        }
    }

    /// The coarse table covering `vaddr` in `pgd`, if there is one.
    pub fn pmd_exists(&self, pgd: &PgdTable, vaddr: VirtualAddress) -> Option<&PmdTable> {
        coarse_table(pgd, vaddr).map(|phys| self.pmd_table(phys))
    }

    /// Map `size` bytes at `vaddr` onto `paddr` in the kernel table.
    pub fn add_mapping(&mut self, paddr: PhysicalAddress, vaddr: VirtualAddress, size: u32, flags: MapFlags) {
        let (arch, pgd, mut pool) = self.split();
        map_pages(arch, pgd, &mut pool, paddr, vaddr, size, flags);
    }

    /// Map `size` bytes at `vaddr` onto `paddr` in `pgd`.
    ///
    /// The size is rounded up to whole pages. An entry that is already
    /// mapped is overwritten.
    pub fn add_mapping_pgd(
        &mut self,
        paddr: PhysicalAddress,
        vaddr: VirtualAddress,
        size: u32,
        flags: MapFlags,
        pgd: &mut PgdTable,
    ) {
        let (arch, mut pool) = self.pool();
        map_pages(arch, pgd, &mut pool, paddr, vaddr, size, flags);
    }

    /// Remove the page or section mapping `vaddr` from the kernel table.
    pub fn remove_mapping(&mut self, vaddr: VirtualAddress) {
        let (arch, pgd, mut pool) = self.split();
        unmap(arch, pgd, &mut pool, vaddr);
    }

    /// Remove the page or section mapping `vaddr` from `pgd`.
    pub fn remove_mapping_pgd(&mut self, vaddr: VirtualAddress, pgd: &mut PgdTable) {
        let (arch, mut pool) = self.pool();
        unmap(arch, pgd, &mut pool, vaddr);
    }

    /// Whether every page of `vaddr..vaddr + size` is mapped in the kernel
    /// table with at least the access `flags` ask for.
    pub fn check_mapping(&self, vaddr: VirtualAddress, size: u32, flags: MapFlags) -> bool {
        self.check_mapping_pgd(vaddr, size, flags, self.kernel_pgd())
    }

    pub fn check_mapping_pgd(&self, vaddr: VirtualAddress, size: u32, flags: MapFlags, pgd: &PgdTable) -> bool {
        let attrs = match flags.to_page_attributes() {
            Some(attrs) => attrs,
            None => bug!("map flags {:?} have no hardware encoding", flags),
        };
        let wanted = attrs.bits() & PTE_PROT_MASK;

        let npages = page_count(size);
        if npages == 0 {
            return true;
        }
        let start = Page::containing_address(vaddr);
        for page in Page::range_inclusive(start, start.next_by(npages - 1)) {
            let pte = self.virt_to_pte_from_pgd(page.start_address(), pgd);
            if !pte.is_page() || pte.prot() < wanted {
                return false;
            }
        }
        true
    }

    /// Second-level entry for `vaddr` in the kernel table.
    pub fn virt_to_pte(&self, vaddr: VirtualAddress) -> PmdEntry {
        self.virt_to_pte_from_pgd(vaddr, self.kernel_pgd())
    }

    /// Second-level entry for `vaddr` in `pgd`, the fault entry if no coarse
    /// table covers it.
    pub fn virt_to_pte_from_pgd(&self, vaddr: VirtualAddress, pgd: &PgdTable) -> PmdEntry {
        match self.pmd_exists(pgd, vaddr) {
            Some(pmd) => pmd.entry(pmd_index(vaddr)),
            None => PmdEntry::FAULT,
        }
    }

    /// Physical address `vaddr` translates to in the kernel table.
    pub fn translate(&self, vaddr: VirtualAddress) -> Option<PhysicalAddress> {
        self.translate_from_pgd(vaddr, self.kernel_pgd())
    }

    /// Physical address `vaddr` translates to in `pgd`, through a section, a
    /// small page or a large page.
    pub fn translate_from_pgd(&self, vaddr: VirtualAddress, pgd: &PgdTable) -> Option<PhysicalAddress> {
        match pgd.entry(pgd_index(vaddr)).kind() {
            PgdKind::Fault => None,
            PgdKind::Section(base) => Some(base.add(vaddr.get() & SECTION_MASK)),
            PgdKind::Coarse(pmd) => match self.pmd_table(pmd).entry(pmd_index(vaddr)).kind() {
                PmdKind::Small(frame) => Some(frame.add(vaddr.get() & PAGE_MASK)),
                PmdKind::Large(frame) => Some(frame.add(vaddr.get() & LARGE_PAGE_MASK)),
                PmdKind::Fault | PmdKind::Tiny => None,
            },
            PgdKind::Fine(table) => bug!("fine page table {:#x} maps {:#x}, fine tables are unsupported", table, vaddr),
        }
    }

    /// Log every valid first-level entry, and a summary of each coarse table.
    pub fn dump_tables(&self) {
        let pgd = self.kernel_pgd();
        for (i, entry) in pgd.entries().iter().enumerate() {
            match entry.kind() {
                PgdKind::Fault => (),
                PgdKind::Coarse(pmd) => {
                    let table = self.pmd_table(pmd);
                    log::debug!("{}: map {:#x} to coarse table {:#x}, {} pages", i, i << 20, pmd, table.entry_count());
                }
                kind => log::debug!("{}: map {:#x} to {:?} flags {:#x}", i, i << 20, kind, entry.raw() & 0xFFF),
            }
        }
    }
}

/// Physical address of the coarse table covering `vaddr`, `None` if the
/// first-level entry is a fault.
pub(super) fn coarse_table(pgd: &PgdTable, vaddr: VirtualAddress) -> Option<PhysicalAddress> {
    let pgd_i = pgd_index(vaddr);
    match pgd.entry(pgd_i).kind() {
        PgdKind::Coarse(pmd) => Some(pmd),
        PgdKind::Fault => None,
        PgdKind::Section(base) => bug!(
            "a section mapping to {:#x} covers {:#x}, where a coarse page mapping is attempted",
            base,
            vaddr
        ),
        PgdKind::Fine(table) => bug!("fine page table {:#x} found at pgd index {}, fine tables are unsupported", table, pgd_i),
    }
}

/// Point the first-level entry for `vaddr` at the coarse table `pmd`.
pub(super) fn attach_pmd(pgd: &mut PgdTable, pmd: PhysicalAddress, vaddr: VirtualAddress) {
    pgd.set_entry(pgd_index(vaddr), PgdEntry::coarse(pmd));
}

#[allow(clippy::too_many_arguments)]
fn map_pages<A: Arch>(
    arch: &A,
    pgd: &mut PgdTable,
    pool: &mut PmdPool<'_>,
    paddr: PhysicalAddress,
    vaddr: VirtualAddress,
    size: u32,
    flags: MapFlags,
) {
    if size < PAGE_SIZE {
        bug!("mapping size {:#x} at {:#x} is below one page, sizes are in bytes", size, vaddr);
    }
    let attrs = match flags.to_page_attributes() {
        Some(attrs) => attrs,
        None => bug!("map flags {:?} have no hardware encoding", flags),
    };

    let mut paddr = paddr.align_down(PAGE_SIZE);
    let mut vaddr = vaddr.align_down(PAGE_SIZE);
    for _ in 0..page_count(size) {
        let pmd_phys = match coarse_table(pgd, vaddr) {
            Some(pmd_phys) => pmd_phys,
            None => {
                let pmd_phys = pool.alloc();
                attach_pmd(pgd, pmd_phys, vaddr);
                pmd_phys
            }
        };

        let pmd = pool.table_mut(pmd_phys);
        let pmd_i = pmd_index(vaddr);
        let old = pmd.entry(pmd_i);
        if old.kind() != PmdKind::Fault {
            log::debug!("replacing {:?} at {:#x}", old, vaddr);
        }
        pmd.set_entry(pmd_i, PmdEntry::small(paddr, attrs));
        coherency::after_map(arch);

        paddr = paddr.add(PAGE_SIZE);
        vaddr = vaddr.add(PAGE_SIZE);
    }
}

fn unmap<A: Arch>(arch: &A, pgd: &mut PgdTable, pool: &mut PmdPool<'_>, vaddr: VirtualAddress) {
    coherency::before_unmap(arch);

    let pgd_i = pgd_index(vaddr);
    match pgd.entry(pgd_i).kind() {
        PgdKind::Coarse(pmd_phys) => {
            let pmd = pool.table_mut(pmd_phys);
            let pmd_i = pmd_index(vaddr);
            match pmd.entry(pmd_i).kind() {
                PmdKind::Small(_) | PmdKind::Large(_) => pmd.set_entry(pmd_i, PmdEntry::FAULT),
                kind => bug!("cannot remove {:?} page mapping at {:#x}", kind, vaddr),
            }
        }
        PgdKind::Section(_) => {
            log::info!("Removing section mapping for {:#x}", vaddr);
            pgd.set_entry(pgd_i, PgdEntry::FAULT);
        }
        PgdKind::Fault => bug!("attempting to remove fault mapping at {:#x}", vaddr),
        PgdKind::Fine(_) => bug!("mapping at {:#x} is in a fine page table, fine tables are unsupported", vaddr),
    }

    coherency::after_unmap(arch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::emulate::{leak_area, EmulateArch, Op};
    use crate::paging::entry::{AccessPermission, CacheFlags};

    fn virt(addr: u32) -> VirtualAddress {
        VirtualAddress::new(addr)
    }

    fn phys(addr: u32) -> PhysicalAddress {
        PhysicalAddress::new(addr)
    }

    fn tables() -> PageTables<EmulateArch> {
        let layout = KernelLayout::with_defaults(virt(0xF004_1234), virt(0xF800_0000)).unwrap();
        PageTables::new(EmulateArch::new(), leak_area(), layout)
    }

    #[test]
    fn maps_rounded_up_pages() {
        let mut tables = tables();
        tables.add_mapping(phys(0x0010_0000), virt(0xC010_0000), 0x1001, MapFlags::SVC_DEFAULT);

        assert_eq!(tables.pmds_used(), 1);
        assert_eq!(tables.translate(virt(0xC010_0123)), Some(phys(0x0010_0123)));
        assert_eq!(tables.translate(virt(0xC010_1FFF)), Some(phys(0x0010_1FFF)));
        assert_eq!(tables.translate(virt(0xC010_2000)), None);

        let pte = tables.virt_to_pte(virt(0xC010_1000));
        assert_eq!(pte.kind(), PmdKind::Small(phys(0x0010_1000)));
        let attrs = pte.attributes().unwrap();
        assert_eq!(attrs.ap, AccessPermission::SvcRwUsrNone);
        assert_eq!(attrs.cache, CacheFlags::WRITE_BACK);

        // The first-level entry points at the pool's first table
        assert_eq!(
            tables.kernel_pgd().entry(0xC01).kind(),
            PgdKind::Coarse(tables.pmd_phys_base())
        );
    }

    #[test]
    fn barriers_after_every_page() {
        let mut tables = tables();
        tables.add_mapping(phys(0x0010_0000), virt(0xC010_0000), 2 * PAGE_SIZE, MapFlags::SVC_DEFAULT);
        assert_eq!(
            tables.arch().take_journal(),
            [Op::CleanInvalidateCache, Op::InvalidateTlb, Op::CleanInvalidateCache, Op::InvalidateTlb]
        );

        tables.remove_mapping(virt(0xC010_0000));
        assert_eq!(
            tables.arch().take_journal(),
            [Op::CleanInvalidateCache, Op::InvalidateTlb, Op::InvalidateTlb]
        );
    }

    #[test]
    fn mapping_across_megabytes_allocates_tables() {
        let mut tables = tables();
        tables.add_mapping(phys(0x0020_0000), virt(0xC01F_F000), 2 * PAGE_SIZE, MapFlags::IO_DEFAULT);
        assert_eq!(tables.pmds_used(), 2);
        assert_eq!(tables.translate(virt(0xC020_0000)), Some(phys(0x0020_1000)));
        assert_eq!(tables.virt_to_pte(virt(0xC020_0000)).attributes().unwrap().cache, CacheFlags::UNCACHED);
    }

    #[test]
    fn remapping_overwrites() {
        let mut tables = tables();
        tables.add_mapping(phys(0x0010_0000), virt(0xC010_0000), PAGE_SIZE, MapFlags::SVC_DEFAULT);
        tables.add_mapping(phys(0x0030_0000), virt(0xC010_0000), PAGE_SIZE, MapFlags::USR_RO);
        assert_eq!(tables.pmds_used(), 1);
        assert_eq!(tables.translate(virt(0xC010_0000)), Some(phys(0x0030_0000)));
        assert!(tables.check_mapping(virt(0xC010_0000), PAGE_SIZE, MapFlags::USR_RO));
    }

    #[test]
    #[should_panic(expected = "is below one page")]
    fn sub_page_size_is_fatal() {
        tables().add_mapping(phys(0x0010_0000), virt(0xC010_0000), 0x800, MapFlags::SVC_DEFAULT);
    }

    #[test]
    #[should_panic(expected = "have no hardware encoding")]
    fn unencodable_flags_are_fatal() {
        tables().add_mapping(phys(0x0010_0000), virt(0xC010_0000), PAGE_SIZE, MapFlags::WRITE);
    }

    #[test]
    #[should_panic(expected = "where a coarse page mapping is attempted")]
    fn mapping_pages_over_a_section_is_fatal() {
        let mut tables = tables();
        tables.add_section_mapping_init(phys(0), virt(0xC000_0000), 1, CacheFlags::WRITE_BACK);
        tables.add_mapping(phys(0x0010_0000), virt(0xC000_0000), PAGE_SIZE, MapFlags::SVC_DEFAULT);
    }

    #[test]
    #[should_panic(expected = "fine tables are unsupported")]
    fn fine_tables_are_fatal() {
        let mut tables = tables();
        tables.area.pgd.set_entry(0xC01, PgdEntry::from_raw(0x0800_0003));
        tables.add_mapping(phys(0x0010_0000), virt(0xC010_0000), PAGE_SIZE, MapFlags::SVC_DEFAULT);
    }

    #[test]
    fn check_respects_permission_order() {
        let mut tables = tables();
        tables.add_mapping(phys(0x0010_0000), virt(0xC010_0000), 4 * PAGE_SIZE, MapFlags::USR_RW);
        assert!(tables.check_mapping(virt(0xC010_0000), 4 * PAGE_SIZE, MapFlags::USR_RW));
        assert!(tables.check_mapping(virt(0xC010_0000), 4 * PAGE_SIZE, MapFlags::USR_RO));
        assert!(tables.check_mapping(virt(0xC010_0000), 4 * PAGE_SIZE, MapFlags::SVC_DEFAULT));
        // One page too far
        assert!(!tables.check_mapping(virt(0xC010_0000), 4 * PAGE_SIZE + 1, MapFlags::USR_RO));
        assert!(tables.check_mapping(virt(0xC010_0000), 0, MapFlags::USR_RW));

        tables.add_mapping(phys(0x0040_0000), virt(0xC040_0000), PAGE_SIZE, MapFlags::USR_RO);
        assert!(!tables.check_mapping(virt(0xC040_0000), PAGE_SIZE, MapFlags::USR_RW));
        assert!(tables.check_mapping(virt(0xC040_0000), PAGE_SIZE, MapFlags::USR_RO));
    }

    #[test]
    fn check_wraps_past_the_top() {
        let mut tables = tables();
        tables.add_mapping(phys(0x0010_0000), virt(0xFFFF_F000), 2 * PAGE_SIZE, MapFlags::SVC_RW);
        assert_eq!(tables.translate(virt(0x0000_0004)), Some(phys(0x0010_1004)));

        assert!(tables.check_mapping(virt(0xFFFF_F000), 2 * PAGE_SIZE, MapFlags::SVC_RW));
        assert!(!tables.check_mapping(virt(0xFFFF_F000), 3 * PAGE_SIZE, MapFlags::SVC_RW));
    }

    #[test]
    #[should_panic(expected = "have no hardware encoding")]
    fn check_with_unencodable_flags_is_fatal() {
        let mut tables = tables();
        tables.add_mapping(phys(0x0010_0000), virt(0xC010_0000), PAGE_SIZE, MapFlags::SVC_RW);
        tables.check_mapping(virt(0xC010_0000), PAGE_SIZE, MapFlags::DEVICE | MapFlags::EXEC | MapFlags::READ);
    }

    #[test]
    fn remove_then_check_fails() {
        let mut tables = tables();
        tables.add_mapping(phys(0x0010_0000), virt(0xC010_0000), 2 * PAGE_SIZE, MapFlags::SVC_DEFAULT);
        tables.remove_mapping(virt(0xC010_1000));

        assert!(tables.check_mapping(virt(0xC010_0000), PAGE_SIZE, MapFlags::SVC_DEFAULT));
        assert!(!tables.check_mapping(virt(0xC010_0000), 2 * PAGE_SIZE, MapFlags::SVC_DEFAULT));
        assert_eq!(tables.virt_to_pte(virt(0xC010_1000)), PmdEntry::FAULT);
        assert_eq!(tables.translate(virt(0xC010_1000)), None);
    }

    #[test]
    fn remove_large_page_and_section() {
        let mut tables = tables();
        tables.add_mapping(phys(0x0010_0000), virt(0xC010_0000), PAGE_SIZE, MapFlags::SVC_DEFAULT);
        // Large pages are never written here but still removable
        let pmd = tables.pmd_phys_base();
        let (_, _, mut pool) = tables.split();
        pool.table_mut(pmd).set_entry(0x10, PmdEntry::from_raw(0x0050_0000 | 0xFF0 | 0b01));
        assert_eq!(tables.translate(virt(0xC011_0345)), Some(phys(0x0050_0345)));
        tables.remove_mapping(virt(0xC011_0000));
        assert_eq!(tables.translate(virt(0xC011_0345)), None);

        tables.add_section_mapping_init(phys(0x0200_0000), virt(0xD000_0000), 1, CacheFlags::WRITE_BACK);
        tables.remove_mapping(virt(0xD000_0000));
        assert_eq!(tables.kernel_pgd().entry(0xD00).kind(), PgdKind::Fault);
    }

    #[test]
    #[should_panic(expected = "attempting to remove fault mapping")]
    fn removing_unmapped_megabyte_is_fatal() {
        tables().remove_mapping(virt(0xC010_0000));
    }

    #[test]
    #[should_panic(expected = "cannot remove Fault page mapping")]
    fn removing_unmapped_page_is_fatal() {
        let mut tables = tables();
        tables.add_mapping(phys(0x0010_0000), virt(0xC010_0000), PAGE_SIZE, MapFlags::SVC_DEFAULT);
        tables.remove_mapping(virt(0xC010_1000));
    }

    #[test]
    fn process_tables_share_the_pool() {
        let mut tables = tables();
        let user = leak_area();
        tables.add_mapping_pgd(phys(0x0060_0000), virt(0x0000_8000), 3 * PAGE_SIZE, MapFlags::USR_RWX, &mut user.pgd);

        assert_eq!(tables.pmds_used(), 1);
        assert_eq!(tables.translate(virt(0x0000_8000)), None);
        assert_eq!(tables.translate_from_pgd(virt(0x0000_9004), &user.pgd), Some(phys(0x0060_1004)));
        assert!(tables.check_mapping_pgd(virt(0x0000_8000), 3 * PAGE_SIZE, MapFlags::USR_RW, &user.pgd));
        assert!(tables.pmd_exists(&user.pgd, virt(0x0000_8000)).is_some());
        assert!(tables.pmd_exists(tables.kernel_pgd(), virt(0x0000_8000)).is_none());

        tables.remove_mapping_pgd(virt(0x0000_a000), &mut user.pgd);
        assert!(!tables.check_mapping_pgd(virt(0x0000_8000), 3 * PAGE_SIZE, MapFlags::USR_RO, &user.pgd));
        assert_eq!(
            tables.virt_to_pte_from_pgd(virt(0x0000_9000), &user.pgd).kind(),
            PmdKind::Small(phys(0x0060_1000))
        );
    }
}
