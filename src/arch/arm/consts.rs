// Because the translation geometry is so important to not be aliased, it is defined here, in one place
// ARMv5 short descriptors: a 16 KiB first-level table of 4096 entries, each covering 1 MiB,
// and 1 KiB coarse second-level tables of 256 entries, each covering 4 KiB.

/// Size of a small page
pub const PAGE_SIZE: u32 = 0x1000;
pub const PAGE_BITS: u32 = 12;
pub const PAGE_MASK: u32 = PAGE_SIZE - 1;

/// Size of a section, the unit of one first-level entry
pub const SECTION_SIZE: u32 = 0x0010_0000;
pub const SECTION_BITS: u32 = 20;
pub const SECTION_MASK: u32 = SECTION_SIZE - 1;

/// Entries in the first-level table
pub const PGD_ENTRY_TOTAL: usize = 4096;
/// Entries in a coarse second-level table
pub const PMD_ENTRY_TOTAL: usize = 256;

pub const PGD_SIZE: u32 = (PGD_ENTRY_TOTAL * 4) as u32;
pub const PMD_SIZE: u32 = (PMD_ENTRY_TOTAL * 4) as u32;

/// Second-level tables carried in the table area right behind the kernel's first-level table
pub const KSPACE_PMD_COUNT: usize = 32;

/// Default start of the kernel's virtual window
pub const KERNEL_AREA_START: u32 = 0xF000_0000;
/// Default physical base the kernel window maps to
pub const PHYS_ADDR_BASE: u32 = 0x0000_0000;
