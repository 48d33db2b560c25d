//! # ARMv5 translation tables
//!
//! Builds and maintains the two-level translation tables of an ARMv5 MMU for
//! a small kernel: boot-time section mappings, small page mappings through
//! coarse tables, promotion of sections to pages, and the one-time move of
//! the boot table area next to the kernel image.

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate bitflags;
#[macro_use]
extern crate bitfield;

/// Fatal error macros
#[macro_use]
pub mod macros;

/// Shared data structures
#[macro_use]
pub mod common;

/// Architecture-dependent stuff
pub mod arch;

/// Recoverable configuration errors
pub mod error;

/// Kernel and table area placement
pub mod layout;

/// Diagnostic sink
pub mod log;

/// Translation tables
pub mod paging;

/// Panic
pub mod panic;

/// The fatal path
pub mod stop;


pub use crate::common::{PhysicalAddress, VirtualAddress};
pub use crate::error::{Error, Result};
pub use crate::layout::KernelLayout;
pub use crate::paging::{copy_pgds_by_vrange, CacheFlags, MapFlags, PageTables, PgdTable, TableArea};
