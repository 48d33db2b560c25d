//! Where the kernel and its translation tables sit in memory.

use core::mem::size_of;

use crate::arch::consts::{KERNEL_AREA_START, PAGE_SIZE, PGD_SIZE, PHYS_ADDR_BASE, SECTION_SIZE};
use crate::common::{PhysicalAddress, VirtualAddress};
use crate::error::{Error, Result};
use crate::paging::TableArea;

#[cfg(target_arch = "arm")]
extern "C" {
    /// The ending byte of the kernel image.
    static _end_kernel: u8;
    /// The starting byte of the table area.
    static _start_kspace: u8;
}

/// Linear kernel window plus the bounds of the table area.
///
/// The kernel window maps `virt_offset..` onto `phys_offset..` one to one,
/// which is what `virt_to_phys` assumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelLayout {
    virt_offset: VirtualAddress,
    phys_offset: PhysicalAddress,
    kernel_end: VirtualAddress,
    pt_start: VirtualAddress,
    pt_end: VirtualAddress,
}

impl KernelLayout {
    pub fn new(
        virt_offset: VirtualAddress,
        phys_offset: PhysicalAddress,
        kernel_end: VirtualAddress,
        pt_start: VirtualAddress,
    ) -> Result<Self> {
        if !virt_offset.is_aligned(SECTION_SIZE) {
            return Err(Error::Misaligned { what: "kernel window", addr: virt_offset.get(), align: SECTION_SIZE });
        }
        if !phys_offset.is_aligned(SECTION_SIZE) {
            return Err(Error::Misaligned { what: "physical base", addr: phys_offset.get(), align: SECTION_SIZE });
        }
        if !pt_start.is_aligned(PGD_SIZE) {
            return Err(Error::Misaligned { what: "table area", addr: pt_start.get(), align: PGD_SIZE });
        }
        if kernel_end < virt_offset {
            return Err(Error::OutOfRange { what: "kernel end", addr: kernel_end.get() });
        }
        if pt_start < virt_offset {
            return Err(Error::OutOfRange { what: "table area", addr: pt_start.get() });
        }

        Ok(Self {
            virt_offset,
            phys_offset,
            kernel_end,
            pt_start,
            pt_end: pt_start.add(Self::pt_area_size()),
        })
    }

    /// Layout with the default kernel window, for a kernel image ending at
    /// `kernel_end` and tables at `pt_start`.
    pub fn with_defaults(kernel_end: VirtualAddress, pt_start: VirtualAddress) -> Result<Self> {
        Self::new(
            VirtualAddress::new(KERNEL_AREA_START),
            PhysicalAddress::new(PHYS_ADDR_BASE),
            kernel_end,
            pt_start,
        )
    }

    /// Read the layout from the linker-provided symbols.
    ///
    /// # Safety
    /// The symbols must be defined by the linker script.
    #[cfg(target_arch = "arm")]
    pub unsafe fn from_linker() -> Result<Self> {
        Self::with_defaults(
            VirtualAddress::new(core::ptr::addr_of!(_end_kernel) as u32),
            VirtualAddress::new(core::ptr::addr_of!(_start_kspace) as u32),
        )
    }

    pub const fn pt_area_size() -> u32 {
        size_of::<TableArea>() as u32
    }

    pub fn virt_to_phys(&self, virt: VirtualAddress) -> PhysicalAddress {
        PhysicalAddress::new(virt.get().wrapping_sub(self.virt_offset.get()).wrapping_add(self.phys_offset.get()))
    }

    pub fn kernel_end(&self) -> VirtualAddress {
        self.kernel_end
    }

    /// Virtual bounds of the table area.
    pub fn pt_bounds(&self) -> (VirtualAddress, VirtualAddress) {
        (self.pt_start, self.pt_end)
    }

    /// Record that the table area now lives at `pt_start`.
    pub(crate) fn move_pt_area(&mut self, pt_start: VirtualAddress) {
        self.pt_start = pt_start;
        self.pt_end = pt_start.add(Self::pt_area_size());
    }

    /// First address after the kernel image that can hold the table area.
    pub fn pt_relocation_target(&self) -> VirtualAddress {
        self.kernel_end.align_up(PGD_SIZE)
    }
}

const _: () = assert!(KernelLayout::pt_area_size() % PAGE_SIZE == 0);
