#[macro_use]
pub mod int_like;

int_like!(PhysicalAddress, u32);
int_like!(VirtualAddress, u32);
