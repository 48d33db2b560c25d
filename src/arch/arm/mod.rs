/// Constants like table geometry and memory locations
pub mod consts;

/// Devices
pub mod device;

#[cfg(target_arch = "arm")]
pub use self::hw::*;

#[cfg(target_arch = "arm")]
mod hw {
    use core::ptr::addr_of_mut;

    use super::device::cpu::{registers::{cache, control_regs, tlb}, CpuInfo};
    use crate::arch::Arch;
    use crate::common::{PhysicalAddress, VirtualAddress};
    use crate::layout::KernelLayout;
    use crate::paging::{PageTables, TableArea};

    /// The kernel's statically allocated table area: its first-level table
    /// followed by the initial pool of second-level tables.
    #[link_section = ".kspace"]
    static mut KSPACE: TableArea = TableArea::new();

    /// ARM926EJ-S and other ARMv5 cores with a unified TLB.
    pub struct Arm926;

    impl Arch for Arm926 {
        fn clean_invalidate_cache(&self) {
            unsafe { cache::clean_invalidate_all() }
        }

        fn invalidate_tlb(&self) {
            unsafe { tlb::flush_all() }
        }

        fn drain_write_buffer(&self) {
            unsafe { cache::drain_write_buffer() }
        }

        unsafe fn set_ttb(&self, pgd: PhysicalAddress) {
            control_regs::ttb_write(pgd.get());
        }

        unsafe fn table_area_at(&self, virt: VirtualAddress) -> &'static mut TableArea {
            &mut *(virt.get() as usize as *mut TableArea)
        }
    }

    /// Take ownership of the kernel's table area.
    ///
    /// # Safety
    /// Must be called once, from the boot path, before anything else
    /// touches `KSPACE`.
    #[cold]
    pub unsafe fn init() -> PageTables<Arm926> {
        let cpu = CpuInfo::current();
        log::info!("CPU: {}", cpu);
        if !cpu.has_v5_mmu() {
            log::warn!("{} is not an ARMv5 core, translation tables may be misread", cpu.part_number);
        }

        let area = &mut *addr_of_mut!(KSPACE);
        let layout = match KernelLayout::from_linker() {
            Ok(layout) => layout,
            Err(err) => crate::bug!("bad kernel layout: {}", err),
        };
        PageTables::new(Arm926, area, layout)
    }

    /// Stop this core for good.
    pub fn halt() -> ! {
        loop {
            unsafe { cache::wait_for_interrupt() }
        }
    }
}
