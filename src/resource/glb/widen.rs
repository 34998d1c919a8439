//! Index widening from packed little-endian u8/u16 data to u32.
//!
//! The vector path handles 8 indices per 256-bit register. Both paths write exactly the same output.
//! Callers pass a destination sized for the source; on a mismatch only the common prefix is written.

/// Number of indices converted per vector batch.
pub(crate) const BATCH: usize = 8;

/// Widens `src` (one byte per index) into `dst`, picking the vector path when the CPU supports it.
pub(crate) fn widen_u8(src: &[u8], dst: &mut [u32]) {
    #[cfg(target_arch = "x86_64")]
    {
        if std::is_x86_feature_detected!("avx2") {
            // SAFETY: AVX2 support was just detected.
            unsafe { avx2::widen_u8(src, dst) };
            return;
        }
    }

    widen_u8_scalar(src, dst);
}

/// Widens `src` (two little-endian bytes per index) into `dst`, picking the vector path when the CPU
/// supports it.
pub(crate) fn widen_u16(src: &[u8], dst: &mut [u32]) {
    #[cfg(target_arch = "x86_64")]
    {
        if std::is_x86_feature_detected!("avx2") {
            // SAFETY: AVX2 support was just detected.
            unsafe { avx2::widen_u16(src, dst) };
            return;
        }
    }

    widen_u16_scalar(src, dst);
}

pub(crate) fn widen_u8_scalar(src: &[u8], dst: &mut [u32]) {
    debug_assert_eq!(src.len(), dst.len(), "u8 index source and destination differ in length");

    for (value, index) in dst.iter_mut().zip(src) {
        *value = u32::from(*index);
    }
}

pub(crate) fn widen_u16_scalar(src: &[u8], dst: &mut [u32]) {
    debug_assert_eq!(src.len(), dst.len() * 2, "u16 index source and destination differ in length");

    for (value, index) in dst.iter_mut().zip(src.chunks_exact(2)) {
        *value = u32::from(u16::from_le_bytes([index[0], index[1]]));
    }
}

/// Copies packed little-endian u32 indices.
pub(crate) fn copy_u32(src: &[u8], dst: &mut [u32]) {
    debug_assert_eq!(src.len(), dst.len() * 4, "u32 index source and destination differ in length");

    for (value, index) in dst.iter_mut().zip(src.chunks_exact(4)) {
        *value = u32::from_le_bytes([index[0], index[1], index[2], index[3]]);
    }
}

#[cfg(target_arch = "x86_64")]
mod avx2 {
    use std::arch::x86_64::{
        __m128i, __m256i, _mm256_cvtepu16_epi32, _mm256_cvtepu8_epi32, _mm256_storeu_si256,
        _mm_loadl_epi64, _mm_loadu_si128,
    };

    use super::{widen_u16_scalar, widen_u8_scalar, BATCH};

    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn widen_u8(src: &[u8], dst: &mut [u32]) {
        debug_assert_eq!(src.len(), dst.len(), "u8 index source and destination differ in length");

        let batches = dst.len().min(src.len()) / BATCH;
        for batch in 0..batches {
            let start = batch * BATCH;
            let input = &src[start..start + BATCH];
            let output = &mut dst[start..start + BATCH];

            // SAFETY: `input` holds 8 bytes and `output` holds 8 u32s; both accesses are unaligned.
            unsafe {
                let packed = _mm_loadl_epi64(input.as_ptr() as *const __m128i);
                let widened = _mm256_cvtepu8_epi32(packed);
                _mm256_storeu_si256(output.as_mut_ptr() as *mut __m256i, widened);
            }
        }

        let tail = batches * BATCH;
        widen_u8_scalar(&src[tail..], &mut dst[tail..]);
    }

    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn widen_u16(src: &[u8], dst: &mut [u32]) {
        debug_assert_eq!(src.len(), dst.len() * 2, "u16 index source and destination differ in length");

        let batches = dst.len().min(src.len() / 2) / BATCH;
        for batch in 0..batches {
            let start = batch * BATCH;
            let input = &src[start * 2..(start + BATCH) * 2];
            let output = &mut dst[start..start + BATCH];

            // SAFETY: `input` holds 16 bytes and `output` holds 8 u32s; x86_64 is little-endian so the
            // lanes match the on-disk byte order.
            unsafe {
                let packed = _mm_loadu_si128(input.as_ptr() as *const __m128i);
                let widened = _mm256_cvtepu16_epi32(packed);
                _mm256_storeu_si256(output.as_mut_ptr() as *mut __m256i, widened);
            }
        }

        let tail = batches * BATCH;
        widen_u16_scalar(&src[tail * 2..], &mut dst[tail..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_u8(length: usize) -> Vec<u8> {
        (0..length).map(|i| (i * 37 + 11) as u8).collect()
    }

    fn sample_u16(length: usize) -> Vec<u8> {
        (0..length)
            .flat_map(|i| ((i * 4099 + 65_000) as u16).to_le_bytes())
            .collect()
    }

    #[test]
    fn u8_paths_agree_for_every_length() {
        for length in 0..40 {
            let src = sample_u8(length);
            let mut dispatched = vec![u32::MAX; length];
            let mut scalar = vec![0; length];

            widen_u8(&src, &mut dispatched);
            widen_u8_scalar(&src, &mut scalar);

            assert_eq!(dispatched, scalar, "length {length}");
        }
    }

    #[test]
    fn u16_paths_agree_for_every_length() {
        for length in 0..40 {
            let src = sample_u16(length);
            let mut dispatched = vec![u32::MAX; length];
            let mut scalar = vec![0; length];

            widen_u16(&src, &mut dispatched);
            widen_u16_scalar(&src, &mut scalar);

            assert_eq!(dispatched, scalar, "length {length}");
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn avx2_paths_agree_with_scalar() {
        if !std::is_x86_feature_detected!("avx2") {
            return;
        }

        for length in 0..40 {
            let bytes = sample_u8(length);
            let mut vector = vec![u32::MAX; length];
            let mut scalar = vec![0; length];
            unsafe { avx2::widen_u8(&bytes, &mut vector) };
            widen_u8_scalar(&bytes, &mut scalar);
            assert_eq!(vector, scalar, "u8 length {length}");

            let shorts = sample_u16(length);
            let mut vector = vec![u32::MAX; length];
            let mut scalar = vec![0; length];
            unsafe { avx2::widen_u16(&shorts, &mut vector) };
            widen_u16_scalar(&shorts, &mut scalar);
            assert_eq!(vector, scalar, "u16 length {length}");
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "differ in length")]
    fn mismatched_lengths_are_caught_in_debug_builds() {
        let mut dst = [0u32; 4];
        widen_u16(&[1, 0, 2, 0], &mut dst);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn mismatched_lengths_write_the_common_prefix() {
        let src = sample_u8(20);
        let mut dst = vec![u32::MAX; 12];
        widen_u8(&src, &mut dst);
        assert_eq!(dst, src[..12].iter().map(|&b| u32::from(b)).collect::<Vec<_>>());

        let mut dst = vec![u32::MAX; 20];
        widen_u16(&sample_u16(9), &mut dst);
        assert_eq!(dst[..9], (0..9).map(|i| (i * 4099 + 65_000) as u16 as u32).collect::<Vec<_>>()[..]);
        assert!(dst[9..].iter().all(|&value| value == u32::MAX));
    }

    #[test]
    fn scalar_values_are_little_endian() {
        let mut dst = [0u32; 2];
        widen_u16_scalar(&[0x34, 0x12, 0xFF, 0xFF], &mut dst);
        assert_eq!(dst, [0x1234, 0xFFFF]);

        let mut dst = [0u32; 1];
        copy_u32(&[0x78, 0x56, 0x34, 0x12], &mut dst);
        assert_eq!(dst, [0x1234_5678]);
    }
}
