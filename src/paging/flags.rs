use super::entry::{AccessPermission, CacheFlags, PageAttributes};

bitflags! {
    /// Access requested for a mapping, independent of the hardware encoding.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MapFlags: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC = 1 << 2;
        const USER = 1 << 3;
        /// Device memory, neither cached nor buffered
        const DEVICE = 1 << 4;
    }
}

impl MapFlags {
    /// Kernel text and data
    pub const SVC_DEFAULT: Self = Self::READ.union(Self::WRITE).union(Self::EXEC);
    pub const SVC_RW: Self = Self::READ.union(Self::WRITE);
    /// Memory mapped registers and the table area
    pub const IO_DEFAULT: Self = Self::READ.union(Self::WRITE).union(Self::DEVICE);
    pub const USR_RW: Self = Self::READ.union(Self::WRITE).union(Self::USER);
    pub const USR_RO: Self = Self::READ.union(Self::USER);
    pub const USR_RWX: Self = Self::USR_RW.union(Self::EXEC);

    /// Hardware attributes for a small page, or `None` when the request
    /// cannot be expressed.
    ///
    /// There is no execute-never and no write-only on ARMv5, so every valid
    /// request is readable. Kernel-only pages are always writable by the
    /// kernel.
    pub fn to_page_attributes(self) -> Option<PageAttributes> {
        if !self.contains(Self::READ) {
            return None;
        }
        if self.contains(Self::DEVICE | Self::EXEC) {
            return None;
        }

        let ap = if !self.contains(Self::USER) {
            AccessPermission::SvcRwUsrNone
        } else if self.contains(Self::WRITE) {
            AccessPermission::SvcRwUsrRw
        } else {
            AccessPermission::SvcRwUsrRo
        };
        let cache = if self.contains(Self::DEVICE) {
            CacheFlags::UNCACHED
        } else {
            CacheFlags::WRITE_BACK
        };

        Some(PageAttributes { ap, cache })
    }
}
