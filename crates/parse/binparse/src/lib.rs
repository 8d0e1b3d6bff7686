//! `hadron-binparse` --- bounds-checked binary reading and writing.
//!
//! Firmware tables are little-endian byte blobs of fixed-layout records and
//! variable-length streams. This crate provides the two halves every parser in
//! the workspace needs:
//!
//! - [`FromBytes`] / [`AsBytes`]: marker traits for plain-old-data types that
//!   can be copied out of, or viewed as, a byte slice. Derive them with
//!   `#[derive(FromBytes, AsBytes)]` on `#[repr(C, packed)]` structs.
//! - [`BinaryReader`] / [`BinaryWriter`]: cursors over a byte slice that never
//!   read or write out of bounds and report exhaustion with `None`.
//!
//! # Usage
//!
//! ```ignore
//! let mut reader = BinaryReader::new(data);
//! let header: SdtHeader = reader.read().ok_or(Error::Truncated)?;
//! let tag = reader.read_u8().ok_or(Error::Truncated)?;
//! ```

#![no_std]
#![warn(missing_docs)]

mod reader;
mod writer;

pub use hadron_binparse_macros::{AsBytes, FromBytes};
pub use reader::BinaryReader;
pub use writer::BinaryWriter;

/// Types that can be created by copying their bytes out of a byte slice.
///
/// # Safety
///
/// Implementors must accept every bit pattern of `size_of::<Self>()` bytes as
/// a valid value. `#[derive(FromBytes)]` checks this for `#[repr(C)]` structs
/// whose fields are all `FromBytes`.
pub unsafe trait FromBytes: Copy {
    /// Copies a value out of the start of `bytes`.
    ///
    /// Returns `None` if `bytes` is shorter than `size_of::<Self>()`. The read
    /// is unaligned, so `bytes` may start at any address.
    #[must_use]
    fn read_from(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < core::mem::size_of::<Self>() {
            return None;
        }
        // SAFETY: the length was checked above and `Self: FromBytes` accepts
        // any bit pattern. `read_unaligned` has no alignment requirement.
        Some(unsafe { core::ptr::read_unaligned(bytes.as_ptr().cast::<Self>()) })
    }
}

/// Types whose in-memory representation can be viewed as initialized bytes.
///
/// # Safety
///
/// Implementors must contain no padding bytes. `#[derive(AsBytes)]` only
/// accepts `#[repr(C, packed)]` structs whose fields are all `AsBytes`.
pub unsafe trait AsBytes {
    /// Returns the raw bytes of `self`.
    #[must_use]
    fn as_bytes(&self) -> &[u8] {
        // SAFETY: `Self: AsBytes` has no padding, so every byte in the value
        // is initialized. The slice borrows `self` and cannot outlive it.
        unsafe {
            core::slice::from_raw_parts(
                core::ptr::from_ref(self).cast::<u8>(),
                core::mem::size_of_val(self),
            )
        }
    }
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: primitive integers accept every bit pattern and have no padding.
            unsafe impl FromBytes for $ty {}
            // SAFETY: as above.
            unsafe impl AsBytes for $ty {}
        )*
    };
}

impl_primitive!(u8, u16, u32, u64, i8, i16, i32, i64);

// SAFETY: an array of `FromBytes` elements is itself valid for any bit pattern.
unsafe impl<T: FromBytes, const N: usize> FromBytes for [T; N] {}
// SAFETY: arrays have no padding between elements of a padding-free type.
unsafe impl<T: AsBytes, const N: usize> AsBytes for [T; N] {}
