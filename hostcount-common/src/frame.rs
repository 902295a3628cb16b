//! Bounds-checked frame reader
//!
//! Every read is preceded by the same predicate the kernel verifier expects:
//! `start + offset + width > end` rejects the access. A frame of exactly
//! `offset + width` bytes is accepted.

use core::marker::PhantomData;
use core::mem;

/// Ethernet header length
pub const ETH_HDR_LEN: usize = 14;

/// Offset of the IPv4 source address inside an Ethernet frame
pub const IPV4_SRC_OFFSET: usize = ETH_HDR_LEN + 12;

/// IPv4 source address, read as a raw native-order word
pub const SRC_ADDR: Field<u32, IPV4_SRC_OFFSET> = Field::new();

/// Minimum frame length for source counting (30 bytes)
pub const MIN_SOURCE_FRAME_LEN: usize = SRC_ADDR.end();

/// Returns true when `width` bytes at `offset` lie inside `[start, end)`.
///
/// Overflow of the address arithmetic counts as out of bounds.
#[inline(always)]
pub fn fits(start: usize, end: usize, offset: usize, width: usize) -> bool {
    match start.checked_add(offset).and_then(|p| p.checked_add(width)) {
        Some(access_end) if access_end > end => false,
        Some(_) => true,
        None => false,
    }
}

/// Kernel-side form of [`fits`] for packet pointers.
///
/// Emits the plain `data + offset + width > data_end` comparison the
/// verifier pattern-matches; packet addresses never approach `usize::MAX`.
#[inline(always)]
pub fn packet_fits(data: usize, data_end: usize, offset: usize, width: usize) -> bool {
    if data.wrapping_add(offset).wrapping_add(width) > data_end {
        return false;
    }
    true
}

/// A fixed-width scalar that can be loaded from frame bytes.
pub trait Scalar: Copy {
    const WIDTH: usize;

    /// Decode from exactly `WIDTH` bytes in native byte order.
    fn from_ne_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const WIDTH: usize = mem::size_of::<$ty>();

                #[inline(always)]
                fn from_ne_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(raw)
                }
            }
        )*
    };
}

impl_scalar!(u8, u16, u32, u64);

/// A field at a constant offset. Offsets are part of the type, so a
/// handler cannot read from a position chosen at runtime.
pub struct Field<T, const OFFSET: usize> {
    _ty: PhantomData<T>,
}

impl<T: Scalar, const OFFSET: usize> Field<T, OFFSET> {
    pub const fn new() -> Self {
        Self { _ty: PhantomData }
    }

    pub const fn offset(&self) -> usize {
        OFFSET
    }

    pub const fn width(&self) -> usize {
        T::WIDTH
    }

    /// Minimum frame length that contains this field.
    pub const fn end(&self) -> usize {
        OFFSET + T::WIDTH
    }
}

impl<T: Scalar, const OFFSET: usize> Clone for Field<T, OFFSET> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Scalar, const OFFSET: usize> Copy for Field<T, OFFSET> {}

/// The frame is too short for the requested field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsufficientData {
    pub needed: usize,
    pub available: usize,
}

/// Read-only view over one invocation's frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameReader<'a> {
    buf: &'a [u8],
}

impl<'a> FrameReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Read a typed field, or report that the frame is too short.
    #[inline(always)]
    pub fn read<T: Scalar, const OFFSET: usize>(
        &self,
        _field: Field<T, OFFSET>,
    ) -> Result<T, InsufficientData> {
        if !fits(0, self.buf.len(), OFFSET, T::WIDTH) {
            return Err(InsufficientData {
                needed: OFFSET.saturating_add(T::WIDTH),
                available: self.buf.len(),
            });
        }
        Ok(T::from_ne_slice(&self.buf[OFFSET..OFFSET + T::WIDTH]))
    }

    /// Check that the first `len` bytes are present without reading them.
    #[inline(always)]
    pub fn require(&self, len: usize) -> Result<(), InsufficientData> {
        if fits(0, self.buf.len(), 0, len) {
            Ok(())
        } else {
            Err(InsufficientData {
                needed: len,
                available: self.buf.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_is_exclusive_at_end() {
        assert!(fits(100, 130, 26, 4));
        assert!(!fits(100, 129, 26, 4));
        assert!(fits(0, 0, 0, 0));
        assert!(!fits(usize::MAX, usize::MAX, 1, 1));
    }

    #[test]
    fn test_packet_fits_matches_fits() {
        for len in 25..35 {
            assert_eq!(
                packet_fits(0x1000, 0x1000 + len, 26, 4),
                fits(0x1000, 0x1000 + len, 26, 4)
            );
        }
    }

    #[test]
    fn test_min_source_frame_len() {
        assert_eq!(MIN_SOURCE_FRAME_LEN, 30);
        assert_eq!(SRC_ADDR.offset(), 26);
        assert_eq!(SRC_ADDR.width(), 4);
    }

    #[test]
    fn test_read_exact_length_frame() {
        let mut frame = [0u8; 30];
        frame[26..30].copy_from_slice(&[10, 0, 0, 5]);

        let reader = FrameReader::new(&frame);
        let key = reader.read(SRC_ADDR).expect("exact-length frame must be accepted");
        assert_eq!(key, u32::from_ne_bytes([10, 0, 0, 5]));
    }

    #[test]
    fn test_read_one_byte_short() {
        let frame = [0u8; 29];
        let reader = FrameReader::new(&frame);

        let err = reader.read(SRC_ADDR).unwrap_err();
        assert_eq!(
            err,
            InsufficientData {
                needed: 30,
                available: 29
            }
        );
    }

    #[test]
    fn test_read_widths() {
        let frame = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let reader = FrameReader::new(&frame);

        assert_eq!(reader.read(Field::<u8, 7>::new()), Ok(8));
        assert_eq!(
            reader.read(Field::<u16, 0>::new()),
            Ok(u16::from_ne_bytes([1, 2]))
        );
        assert_eq!(
            reader.read(Field::<u64, 0>::new()),
            Ok(u64::from_ne_bytes(frame))
        );
        assert!(reader.read(Field::<u64, 1>::new()).is_err());
    }

    #[test]
    fn test_read_overflowing_offset_is_rejected() {
        let reader = FrameReader::new(&[0u8; 4]);
        let err = reader
            .read(Field::<u32, { usize::MAX - 1 }>::new())
            .unwrap_err();
        assert_eq!(
            err,
            InsufficientData {
                needed: usize::MAX,
                available: 4
            }
        );
        assert!(reader.require(usize::MAX).is_err());
    }

    #[test]
    fn test_require() {
        let reader = FrameReader::new(&[0u8; ETH_HDR_LEN]);
        assert!(reader.require(ETH_HDR_LEN).is_ok());
        assert!(reader.require(ETH_HDR_LEN + 1).is_err());
        assert!(FrameReader::new(&[]).require(1).is_err());
    }
}
