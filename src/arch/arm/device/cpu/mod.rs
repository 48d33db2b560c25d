use core::fmt;

#[cfg(target_arch = "arm")]
pub mod registers;

bitfield! {
    /// Main ID register, CP15 c0
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct MachineId(u32);
    impl Debug;
    pub u8, implementer, _: 31, 24;
    pub u8, variant, _: 23, 20;
    pub u8, architecture, _: 19, 16;
    pub u16, part_number, _: 15, 4;
    pub u8, revision, _: 3, 0;
}

pub struct CpuInfo {
    pub implementer: &'static str,
    pub architecture: &'static str,
    pub part_number: &'static str,
    pub variant: u8,
    pub revision: u8,
}

impl CpuInfo {
    pub fn from_midr(midr: MachineId) -> CpuInfo {
        let implementer = match midr.implementer() {
            0x41 => "Arm",
            0x44 => "Digital",
            0x4d => "Motorola",
            0x56 => "Marvell",
            0x69 => "Intel",
            _ => "Unknown",
        };

        let architecture = match midr.architecture() {
            0b0001 => "v4",
            0b0010 => "v4T",
            0b0011 => "v5",
            0b0100 => "v5T",
            0b0101 => "v5TE",
            0b0110 => "v5TEJ",
            0b0111 => "v6",
            0b1111 => "CPUID scheme",
            _ => "Unknown",
        };

        let part_number = match midr.part_number() {
            0x920 => "ARM920T",
            0x922 => "ARM922T",
            0x926 => "ARM926EJ-S",
            0x940 => "ARM940T",
            0x946 => "ARM946E-S",
            0x966 => "ARM966E-S",
            0xa26 => "ARM1026EJ-S",
            _ => "Unknown",
        };

        CpuInfo {
            implementer,
            architecture,
            part_number,
            variant: midr.variant(),
            revision: midr.revision(),
        }
    }

    /// Whether the translation code in this crate drives this core correctly.
    pub fn has_v5_mmu(&self) -> bool {
        matches!(self.architecture, "v5" | "v5T" | "v5TE" | "v5TEJ")
    }

    #[cfg(target_arch = "arm")]
    pub fn current() -> CpuInfo {
        let midr = unsafe { registers::control_regs::midr() };
        log::debug!("MIDR: {:#x}", midr);
        CpuInfo::from_midr(MachineId(midr))
    }
}

impl fmt::Display for CpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (arch {}, r{}p{})",
            self.implementer, self.part_number, self.architecture, self.variant, self.revision
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_arm926ejs() {
        // QEMU versatilepb
        let info = CpuInfo::from_midr(MachineId(0x4106_9265));
        assert_eq!(info.implementer, "Arm");
        assert_eq!(info.architecture, "v5TEJ");
        assert_eq!(info.part_number, "ARM926EJ-S");
        assert_eq!(info.revision, 5);
        assert!(info.has_v5_mmu());
        assert_eq!(std::format!("{}", info), "Arm ARM926EJ-S (arch v5TEJ, r0p5)");
    }

    #[test]
    fn rejects_cpuid_scheme_cores() {
        // ARM1176JZF-S reports through the CPUID scheme
        let info = CpuInfo::from_midr(MachineId(0x410f_b767));
        assert_eq!(info.architecture, "CPUID scheme");
        assert!(!info.has_v5_mmu());
    }
}
