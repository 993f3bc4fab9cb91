//! Little-endian conversions for the binary workbook readers.
//! Missing trailing bytes read as zero; callers check lengths where it matters.

#[inline]
fn le_bytes<const N: usize>(s: &[u8]) -> [u8; N] {
    let mut bytes = [0u8; N];
    let size = s.len().min(N);
    bytes[..size].copy_from_slice(&s[..size]);
    bytes
}

/// Converts a byte slice into an iterator of usize values, 4 bytes each.
/// A trailing partial chunk is ignored.
pub(crate) fn to_usize_iter(bytes: &[u8]) -> impl ExactSizeIterator<Item = usize> + '_ {
    bytes.chunks_exact(4).map(|chunk| u32::from_le_bytes(le_bytes(chunk)) as usize)
}

/// Converts the first 8 bytes of a slice to a 64-bit floating point number.
#[inline]
pub(crate) fn to_f64(s: &[u8]) -> f64 {
    f64::from_le_bytes(le_bytes(s))
}

/// Converts the first 8 bytes of a slice to a 64-bit unsigned integer.
#[inline]
pub(crate) fn to_u64(s: &[u8]) -> u64 {
    u64::from_le_bytes(le_bytes(s))
}

/// Converts the first 4 bytes of a slice to a 32-bit unsigned integer.
#[inline]
pub(crate) fn to_u32(s: &[u8]) -> u32 {
    u32::from_le_bytes(le_bytes(s))
}

/// Converts the first 2 bytes of a slice to a 16-bit unsigned integer.
#[inline]
pub(crate) fn to_u16(s: &[u8]) -> u16 {
    u16::from_le_bytes(le_bytes(s))
}

/// Converts the first 4 bytes of a slice to a usize value.
#[inline]
pub(crate) fn to_usize(s: &[u8]) -> usize {
    to_u32(s) as usize
}
