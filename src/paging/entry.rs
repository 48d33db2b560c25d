//! # Translation table descriptors
//!
//! ARMv5 short descriptors, bit for bit. The low two bits of every entry are
//! its type and decide what the rest of the word means, so addresses are
//! only ever read back through [`PgdEntry::kind`] and [`PmdEntry::kind`].

use core::fmt;

use crate::arch::consts::SECTION_BITS;
use crate::common::PhysicalAddress;

pub const PGD_TYPE_MASK: u32 = 0b11;
pub const PGD_TYPE_FAULT: u32 = 0b00;
pub const PGD_TYPE_COARSE: u32 = 0b01;
pub const PGD_TYPE_SECTION: u32 = 0b10;
pub const PGD_TYPE_FINE: u32 = 0b11;

pub const PGD_COARSE_ALIGN_MASK: u32 = 0xFFFF_FC00;
pub const PGD_SECTION_ALIGN_MASK: u32 = 0xFFF0_0000;
pub const PGD_FINE_ALIGN_MASK: u32 = 0xFFFF_F000;

pub const PMD_TYPE_MASK: u32 = 0b11;
pub const PMD_TYPE_FAULT: u32 = 0b00;
pub const PMD_TYPE_LARGE: u32 = 0b01;
pub const PMD_TYPE_SMALL: u32 = 0b10;
pub const PMD_TYPE_TINY: u32 = 0b11;

pub const PMD_LARGE_ALIGN_MASK: u32 = 0xFFFF_0000;
pub const PMD_SMALL_ALIGN_MASK: u32 = 0xFFFF_F000;

/// Access permission bits of the four subpages of a small page
pub const PTE_PROT_MASK: u32 = 0xFF << 4;
/// Position of AP in a section descriptor
pub const SECTION_AP0: u32 = 10;

/// AP encodings, ordered from least to most permissive.
///
/// AP = 0b00 depends on the S and R bits of the control register, which are
/// left clear, so it means no access at all and is never produced here.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessPermission {
    SvcRwUsrNone = 0b01,
    SvcRwUsrRo = 0b10,
    SvcRwUsrRw = 0b11,
}

impl AccessPermission {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b01 => Some(AccessPermission::SvcRwUsrNone),
            0b10 => Some(AccessPermission::SvcRwUsrRo),
            0b11 => Some(AccessPermission::SvcRwUsrRw),
            _ => None,
        }
    }

    /// The same permission on all four subpages of a small page.
    pub const fn replicated(self) -> u32 {
        let ap = self as u32;
        (ap << 4) | (ap << 6) | (ap << 8) | (ap << 10)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CacheFlags: u32 {
        const BUFFERABLE = 1 << 2;
        const CACHEABLE = 1 << 3;
    }
}

impl CacheFlags {
    pub const WRITE_BACK: Self = Self::BUFFERABLE.union(Self::CACHEABLE);
    pub const UNCACHED: Self = Self::empty();
}

/// Hardware permission and cacheability of a page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageAttributes {
    pub ap: AccessPermission,
    pub cache: CacheFlags,
}

impl PageAttributes {
    pub const fn bits(self) -> u32 {
        self.ap.replicated() | self.cache.bits()
    }

    pub const fn prot(self) -> u32 {
        self.bits() & PTE_PROT_MASK
    }
}

bitfield! {
    /// Field view of a section descriptor
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct SectionDescriptor(u32);
    impl Debug;
    pub u8, kind, set_kind: 1, 0;
    pub bufferable, set_bufferable: 2;
    pub cacheable, set_cacheable: 3;
    pub u8, domain, set_domain: 8, 5;
    pub u8, ap, set_ap: 11, 10;
    pub u32, base, set_base: 31, 20;
}

bitfield! {
    /// Field view of a small page descriptor
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct SmallPageDescriptor(u32);
    impl Debug;
    pub u8, kind, set_kind: 1, 0;
    pub bufferable, set_bufferable: 2;
    pub cacheable, set_cacheable: 3;
    pub u8, ap0, set_ap0: 5, 4;
    pub u8, ap1, set_ap1: 7, 6;
    pub u8, ap2, set_ap2: 9, 8;
    pub u8, ap3, set_ap3: 11, 10;
    pub u32, frame, set_frame: 31, 12;
}

/// What a first-level entry translates to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PgdKind {
    Fault,
    /// Physical address of a coarse second-level table
    Coarse(PhysicalAddress),
    /// Physical base of a 1 MiB section
    Section(PhysicalAddress),
    /// Physical address of a fine second-level table, never produced here
    Fine(PhysicalAddress),
}

/// A first-level table entry
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct PgdEntry(u32);

impl PgdEntry {
    pub const FAULT: Self = Self(PGD_TYPE_FAULT);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Points at a coarse table. Domain 0.
    pub fn coarse(pmd: PhysicalAddress) -> Self {
        bug_on!(pmd.get() & !PGD_COARSE_ALIGN_MASK != 0, "second-level table {:#x} is not 1K aligned", pmd);
        Self(pmd.get() | PGD_TYPE_COARSE)
    }

    /// Maps 1 MiB at `base`. Domain 0.
    pub fn section(base: PhysicalAddress, ap: AccessPermission, cache: CacheFlags) -> Self {
        let mut desc = SectionDescriptor(0);
        desc.set_kind(PGD_TYPE_SECTION as u8);
        desc.set_bufferable(cache.contains(CacheFlags::BUFFERABLE));
        desc.set_cacheable(cache.contains(CacheFlags::CACHEABLE));
        desc.set_ap(ap as u8);
        desc.set_base(base.get() >> SECTION_BITS);
        Self(desc.0)
    }

    pub fn kind(self) -> PgdKind {
        match self.0 & PGD_TYPE_MASK {
            PGD_TYPE_FAULT => PgdKind::Fault,
            PGD_TYPE_COARSE => PgdKind::Coarse(PhysicalAddress::new(self.0 & PGD_COARSE_ALIGN_MASK)),
            PGD_TYPE_SECTION => PgdKind::Section(PhysicalAddress::new(self.0 & PGD_SECTION_ALIGN_MASK)),
            _ => PgdKind::Fine(PhysicalAddress::new(self.0 & PGD_FINE_ALIGN_MASK)),
        }
    }

    /// Same coarse entry, pointing at the table's new home. Domain and other
    /// low bits are kept.
    pub fn repoint(self, pmd: PhysicalAddress) -> Self {
        match self.kind() {
            PgdKind::Coarse(_) => {
                let low = self.0 & !PGD_COARSE_ALIGN_MASK;
                Self((pmd.get() & PGD_COARSE_ALIGN_MASK) | low)
            }
            other => bug!("repointing a first-level entry that is not coarse: {:?}", other),
        }
    }

    /// Permission and cacheability of a section entry.
    pub fn section_attributes(self) -> Option<PageAttributes> {
        if self.0 & PGD_TYPE_MASK != PGD_TYPE_SECTION {
            return None;
        }
        let desc = SectionDescriptor(self.0);
        let mut cache = CacheFlags::empty();
        cache.set(CacheFlags::BUFFERABLE, desc.bufferable());
        cache.set(CacheFlags::CACHEABLE, desc.cacheable());
        Some(PageAttributes { ap: AccessPermission::from_bits(desc.ap())?, cache })
    }
}

impl fmt::Debug for PgdEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PgdEntry({:#010x}, {:?})", self.0, self.kind())
    }
}

/// What a second-level entry translates to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PmdKind {
    Fault,
    /// Physical base of a 64 KiB page
    Large(PhysicalAddress),
    /// Physical base of a 4 KiB page
    Small(PhysicalAddress),
    /// Only valid in fine tables
    Tiny,
}

/// A coarse second-level table entry, the raw pte
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct PmdEntry(u32);

impl PmdEntry {
    pub const FAULT: Self = Self(PMD_TYPE_FAULT);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn small(frame: PhysicalAddress, attrs: PageAttributes) -> Self {
        Self((frame.get() & PMD_SMALL_ALIGN_MASK) | PMD_TYPE_SMALL | attrs.bits())
    }

    pub fn kind(self) -> PmdKind {
        match self.0 & PMD_TYPE_MASK {
            PMD_TYPE_FAULT => PmdKind::Fault,
            PMD_TYPE_LARGE => PmdKind::Large(PhysicalAddress::new(self.0 & PMD_LARGE_ALIGN_MASK)),
            PMD_TYPE_SMALL => PmdKind::Small(PhysicalAddress::new(self.0 & PMD_SMALL_ALIGN_MASK)),
            _ => PmdKind::Tiny,
        }
    }

    pub fn is_page(self) -> bool {
        matches!(self.kind(), PmdKind::Small(_) | PmdKind::Large(_))
    }

    /// Access permission field, all four subpages.
    pub const fn prot(self) -> u32 {
        self.0 & PTE_PROT_MASK
    }

    /// Permission and cacheability of a small page, as long as all four
    /// subpages agree.
    pub fn attributes(self) -> Option<PageAttributes> {
        if self.0 & PMD_TYPE_MASK != PMD_TYPE_SMALL {
            return None;
        }
        let desc = SmallPageDescriptor(self.0);
        let ap = desc.ap0();
        if desc.ap1() != ap || desc.ap2() != ap || desc.ap3() != ap {
            return None;
        }
        let mut cache = CacheFlags::empty();
        cache.set(CacheFlags::BUFFERABLE, desc.bufferable());
        cache.set(CacheFlags::CACHEABLE, desc.cacheable());
        Some(PageAttributes { ap: AccessPermission::from_bits(ap)?, cache })
    }
}

impl fmt::Debug for PmdEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PmdEntry({:#010x}, {:?})", self.0, self.kind())
    }
}
