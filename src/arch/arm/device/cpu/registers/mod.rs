pub mod cache;
pub mod control_regs;
pub mod tlb;
