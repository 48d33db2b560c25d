//! Host stand-in for the hardware, used by the tests.
//!
//! Primitives are journaled in call order so tests can assert on barrier
//! sequences, and relocation gets a spare table area instead of raw memory.

use std::boxed::Box;
use std::cell::{Cell, RefCell};
use std::vec::Vec;

use super::Arch;
use crate::common::{PhysicalAddress, VirtualAddress};
use crate::paging::TableArea;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    CleanInvalidateCache,
    InvalidateTlb,
    DrainWriteBuffer,
    SetTtb(PhysicalAddress),
    TableAreaAt(VirtualAddress),
}

pub struct EmulateArch {
    journal: RefCell<Vec<Op>>,
    ttb: Cell<Option<PhysicalAddress>>,
    spare: RefCell<Option<&'static mut TableArea>>,
}

impl EmulateArch {
    pub fn new() -> Self {
        Self {
            journal: RefCell::new(Vec::new()),
            ttb: Cell::new(None),
            spare: RefCell::new(Some(leak_area())),
        }
    }

    /// Everything recorded since the last call.
    pub fn take_journal(&self) -> Vec<Op> {
        self.journal.take()
    }

    pub fn ttb(&self) -> Option<PhysicalAddress> {
        self.ttb.get()
    }

    fn record(&self, op: Op) {
        self.journal.borrow_mut().push(op);
    }
}

/// A zeroed table area that outlives the test.
pub fn leak_area() -> &'static mut TableArea {
    Box::leak(Box::new(TableArea::new()))
}

impl Arch for EmulateArch {
    fn clean_invalidate_cache(&self) {
        self.record(Op::CleanInvalidateCache);
    }

    fn invalidate_tlb(&self) {
        self.record(Op::InvalidateTlb);
    }

    fn drain_write_buffer(&self) {
        self.record(Op::DrainWriteBuffer);
    }

    unsafe fn set_ttb(&self, pgd: PhysicalAddress) {
        self.record(Op::SetTtb(pgd));
        self.ttb.set(Some(pgd));
    }

    unsafe fn table_area_at(&self, virt: VirtualAddress) -> &'static mut TableArea {
        self.record(Op::TableAreaAt(virt));
        match self.spare.borrow_mut().take() {
            Some(area) => area,
            None => panic!("emulated memory has no second table area for {:?}", virt),
        }
    }
}
