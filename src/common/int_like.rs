//! Helpers used to define address types that are backed by integers (typically `u32`),
//! without letting physical and virtual addresses be mixed up.
//!
//! # Example
//!
//! ```ignore
//! /// Define an opaque type `BusAddress` backed by a `u32`.
//! int_like!(BusAddress, u32);
//!
//! const ZERO: BusAddress = BusAddress::new(0);
//! assert!(BusAddress::new(0x1000).is_aligned(0x1000));
//! ```

#[macro_export]
macro_rules! int_like {
    ($new_type_name:ident, $backing_type: ident) => {
        #[derive(Default, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
        #[repr(transparent)]
        pub struct $new_type_name($backing_type);

        impl $new_type_name {
            #[allow(dead_code)]
            #[inline]
            pub const fn get(self) -> $backing_type {
                self.0
            }
            #[allow(dead_code)]
            #[inline]
            pub const fn new(x: $backing_type) -> Self {
                $new_type_name(x)
            }
            /// Offset by `bytes`, wrapping at the top of the address space.
            #[allow(dead_code)]
            #[inline]
            pub const fn add(self, bytes: $backing_type) -> Self {
                $new_type_name(self.0.wrapping_add(bytes))
            }
            #[allow(dead_code)]
            #[inline]
            pub const fn sub(self, bytes: $backing_type) -> Self {
                $new_type_name(self.0.wrapping_sub(bytes))
            }
            /// `align` must be a power of two.
            #[allow(dead_code)]
            #[inline]
            pub const fn align_down(self, align: $backing_type) -> Self {
                $new_type_name(self.0 & !(align - 1))
            }
            /// `align` must be a power of two.
            #[allow(dead_code)]
            #[inline]
            pub const fn align_up(self, align: $backing_type) -> Self {
                $new_type_name(self.0.wrapping_add(align - 1) & !(align - 1))
            }
            #[allow(dead_code)]
            #[inline]
            pub const fn is_aligned(self, align: $backing_type) -> bool {
                self.0 & (align - 1) == 0
            }
        }

        impl ::core::fmt::Debug for $new_type_name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}({:#010x})", stringify!($new_type_name), self.0)
            }
        }

        impl ::core::fmt::LowerHex for $new_type_name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::LowerHex::fmt(&self.0, f)
            }
        }

        impl ::core::convert::From<$backing_type> for $new_type_name {
            #[inline]
            fn from(inner: $backing_type) -> Self {
                Self::new(inner)
            }
        }
        impl ::core::convert::From<$new_type_name> for $backing_type {
            #[inline]
            fn from(wrapped: $new_type_name) -> Self {
                wrapped.get()
            }
        }
    };
}

#[test]
fn test() {
    use core::mem::size_of;

    int_like!(U32Like, u32);
    assert_eq!(size_of::<U32Like>(), size_of::<u32>());

    let addr = U32Like::new(0x0010_0234);
    assert_eq!(addr.align_down(0x1000).get(), 0x0010_0000);
    assert_eq!(addr.align_up(0x1000).get(), 0x0010_1000);
    assert!(!addr.is_aligned(0x1000));
    assert!(U32Like::new(0xFFF0_0000).is_aligned(0x10_0000));
    assert_eq!(U32Like::new(0xFFFF_F000).add(0x1000).get(), 0);
    assert_eq!(format!("{:?}", U32Like::new(0x1000)), "U32Like(0x00001000)");
}
