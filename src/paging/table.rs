//! # Page table
//!
//! Fixed-size first- and second-level tables, and the table area that holds
//! the kernel's first-level table followed by its pool of coarse tables.

use core::mem::{offset_of, size_of};

use crate::arch::consts::{KSPACE_PMD_COUNT, PAGE_BITS, PGD_ENTRY_TOTAL, PGD_SIZE, PMD_ENTRY_TOTAL, PMD_SIZE, SECTION_BITS};
use crate::common::{PhysicalAddress, VirtualAddress};

use super::entry::{PgdEntry, PmdEntry, PmdKind};

/// First-level table index of `vaddr`
pub fn pgd_index(vaddr: VirtualAddress) -> usize {
    (vaddr.get() >> SECTION_BITS) as usize
}

/// Second-level table index of `vaddr`
pub fn pmd_index(vaddr: VirtualAddress) -> usize {
    (vaddr.get() >> PAGE_BITS) as usize & (PMD_ENTRY_TOTAL - 1)
}

/// Offset of the coarse table pool inside a [`TableArea`]
pub const PMD_POOL_OFFSET: u32 = PGD_SIZE;

/// A first-level table, one entry per megabyte of address space
#[repr(C, align(16384))]
pub struct PgdTable {
    entries: [PgdEntry; PGD_ENTRY_TOTAL],
}

impl PgdTable {
    pub const fn new() -> Self {
        Self { entries: [PgdEntry::FAULT; PGD_ENTRY_TOTAL] }
    }

    pub fn entry(&self, index: usize) -> PgdEntry {
        self.entries[index]
    }

    pub fn set_entry(&mut self, index: usize, entry: PgdEntry) {
        self.entries[index] = entry;
    }

    pub fn entries(&self) -> &[PgdEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [PgdEntry] {
        &mut self.entries
    }

    /// Copy entries `start..end` of `from` over the same entries of `self`.
    pub fn copy_range_from(&mut self, from: &PgdTable, start: usize, end: usize) {
        self.entries[start..end].copy_from_slice(&from.entries[start..end]);
    }
}

impl Default for PgdTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A coarse second-level table, one entry per 4 KiB page of its megabyte
#[repr(C, align(1024))]
pub struct PmdTable {
    entries: [PmdEntry; PMD_ENTRY_TOTAL],
}

impl PmdTable {
    pub const fn new() -> Self {
        Self { entries: [PmdEntry::FAULT; PMD_ENTRY_TOTAL] }
    }

    pub fn entry(&self, index: usize) -> PmdEntry {
        self.entries[index]
    }

    pub fn set_entry(&mut self, index: usize, entry: PmdEntry) {
        self.entries[index] = entry;
    }

    pub fn entries(&self) -> &[PmdEntry] {
        &self.entries
    }

    pub fn zero(&mut self) {
        self.entries.fill(PmdEntry::FAULT);
    }

    /// Number of entries that map a page
    pub fn entry_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.kind() != PmdKind::Fault).count()
    }
}

impl Default for PmdTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The kernel's first-level table and the coarse tables it points at.
///
/// Kept as one block so that it can be moved, and remapped, as a unit.
#[repr(C, align(16384))]
pub struct TableArea {
    pub pgd: PgdTable,
    pub pmds: [PmdTable; KSPACE_PMD_COUNT],
}

impl TableArea {
    pub const fn new() -> Self {
        const EMPTY: PmdTable = PmdTable::new();
        Self { pgd: PgdTable::new(), pmds: [EMPTY; KSPACE_PMD_COUNT] }
    }

    /// Overwrite this area with the contents of `other`.
    pub fn copy_from(&mut self, other: &TableArea) {
        self.pgd.entries.copy_from_slice(&other.pgd.entries);
        for (to, from) in self.pmds.iter_mut().zip(other.pmds.iter()) {
            to.entries.copy_from_slice(&from.entries);
        }
    }
}

const _: () = assert!(size_of::<PgdTable>() == PGD_SIZE as usize);
const _: () = assert!(size_of::<PmdTable>() == PMD_SIZE as usize);
const _: () = assert!(offset_of!(TableArea, pmds) == PMD_POOL_OFFSET as usize);
const _: () = assert!(size_of::<TableArea>() == (PGD_SIZE + KSPACE_PMD_COUNT as u32 * PMD_SIZE) as usize);

/// Index of the pool table at `phys`, given where the pool starts and how
/// many of its tables are handed out.
pub(crate) fn pool_index(phys_base: PhysicalAddress, used: usize, phys: PhysicalAddress) -> Option<usize> {
    let offset = phys.get().wrapping_sub(phys_base.get());
    if offset % PMD_SIZE != 0 {
        return None;
    }
    let index = (offset / PMD_SIZE) as usize;
    if index < used {
        Some(index)
    } else {
        None
    }
}

/// Coarse tables handed out from a table area.
///
/// First-level entries refer to coarse tables by physical address while the
/// pool owns them by index, so moving the area only moves `phys_base`.
pub struct PmdPool<'a> {
    tables: &'a mut [PmdTable],
    used: &'a mut usize,
    phys_base: PhysicalAddress,
}

impl<'a> PmdPool<'a> {
    pub(crate) fn new(tables: &'a mut [PmdTable], used: &'a mut usize, phys_base: PhysicalAddress) -> Self {
        Self { tables, used, phys_base }
    }

    /// A zeroed coarse table, by physical address. Tables are not given back.
    pub fn alloc(&mut self) -> PhysicalAddress {
        let index = *self.used;
        if index >= self.tables.len() {
            bug!("out of second-level tables, all {} in use", self.tables.len());
        }
        *self.used += 1;
        self.tables[index].zero();
        self.phys_of(index)
    }

    pub fn table_mut(&mut self, phys: PhysicalAddress) -> &mut PmdTable {
        match pool_index(self.phys_base, *self.used, phys) {
            Some(index) => &mut self.tables[index],
            None => bug!("coarse entry {:#x} does not point at an allocated second-level table", phys),
        }
    }

    fn phys_of(&self, index: usize) -> PhysicalAddress {
        self.phys_base.add(index as u32 * PMD_SIZE)
    }
}
