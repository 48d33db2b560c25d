//! Configuration errors.
//!
//! These are the only recoverable failures in the crate. Everything that
//! indicates corrupted tables or a caller bug goes through [`bug!`] instead.

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// An address that has to sit on a boundary does not.
    Misaligned { what: &'static str, addr: u32, align: u32 },
    /// An address lies below the region it is supposed to belong to.
    OutOfRange { what: &'static str, addr: u32 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Misaligned { what, addr, align } => {
                write!(f, "{} {:#010x} is not aligned to {:#x}", what, addr, align)
            }
            Error::OutOfRange { what, addr } => {
                write!(f, "{} {:#010x} is outside the kernel area", what, addr)
            }
        }
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
