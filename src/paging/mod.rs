//! # Paging
//!
//! ARMv5 two-level translation tables: 1 MiB sections and coarse tables of
//! 4 KiB small pages.

use crate::arch::consts::PAGE_SIZE;
use crate::common::VirtualAddress;

pub use self::entry::{AccessPermission, CacheFlags, PageAttributes, PgdEntry, PgdKind, PmdEntry, PmdKind};
pub use self::flags::MapFlags;
pub use self::mapper::PageTables;
pub use self::relocate::copy_pgds_by_vrange;
pub use self::table::{pgd_index, pmd_index, PgdTable, PmdTable, TableArea};

pub mod coherency;
pub mod entry;
pub mod flags;
pub mod mapper;
pub mod relocate;
pub mod section;
pub mod table;

/// Page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Page {
    number: u32,
}

impl Page {
    pub fn start_address(self) -> VirtualAddress {
        VirtualAddress::new(self.number.wrapping_mul(PAGE_SIZE))
    }

    pub fn containing_address(address: VirtualAddress) -> Page {
        Page { number: address.get() / PAGE_SIZE }
    }

    pub fn range_inclusive(start: Page, r#final: Page) -> PageIter {
        PageIter { start, end: r#final.next() }
    }

    pub fn next(self) -> Page {
        self.next_by(1)
    }

    pub fn next_by(self, n: u32) -> Page {
        Self { number: self.number + n }
    }
}

pub struct PageIter {
    start: Page,
    end: Page,
}

impl Iterator for PageIter {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        if self.start < self.end {
            let page = self.start;
            self.start = self.start.next();
            Some(page)
        } else {
            None
        }
    }
}

/// Pages needed to hold `size` bytes
pub fn page_count(size: u32) -> u32 {
    size.div_ceil(PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_iteration() {
        let start = Page::containing_address(VirtualAddress::new(0xC010_0FFF));
        let pages: std::vec::Vec<_> = Page::range_inclusive(start, start.next_by(2))
            .map(|page| page.start_address().get())
            .collect();
        assert_eq!(pages, [0xC010_0000, 0xC010_1000, 0xC010_2000]);

        // The last page of the address space still iterates
        let top = Page::containing_address(VirtualAddress::new(0xFFFF_F000));
        assert_eq!(Page::range_inclusive(top, top).count(), 1);

        // Past the top, addresses wrap around to the bottom
        let wrapped: std::vec::Vec<_> = Page::range_inclusive(top, top.next())
            .map(|page| page.start_address().get())
            .collect();
        assert_eq!(wrapped, [0xFFFF_F000, 0x0000_0000]);
    }

    #[test]
    fn counts() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(0x1000), 1);
        assert_eq!(page_count(0x1001), 2);
        assert_eq!(page_count(u32::MAX), 0x10_0000);
    }
}
