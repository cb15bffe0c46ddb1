use std::io::{self, IoSlice, Read};

use super::digest::RollingDigest;
use super::error::RollingError;

/// Rolling checksum used for weak block matching during delta transfers.
///
/// `s1` accumulates the byte sum, `s2` accumulates prefix sums, both
/// truncated to 16 bits after every update, matching the canonical
/// Adler-32-style algorithm used by block-matching delta sync tools.
#[doc(alias = "rsum")]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RollingChecksum {
    s1: u32,
    s2: u32,
    len: usize,
}

impl RollingChecksum {
    /// Default buffer length used by [`update_reader`](Self::update_reader).
    pub const DEFAULT_READER_BUFFER_LEN: usize = 32 * 1024;

    /// Creates a new rolling checksum with zeroed state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            s1: 0,
            s2: 0,
            len: 0,
        }
    }

    /// Reconstructs a rolling checksum from a previously captured digest.
    #[must_use]
    pub const fn from_digest(digest: RollingDigest) -> Self {
        Self {
            s1: digest.sum1() as u32,
            s2: digest.sum2() as u32,
            len: digest.len(),
        }
    }

    /// Resets the checksum back to its initial state.
    pub fn reset(&mut self) {
        self.s1 = 0;
        self.s2 = 0;
        self.len = 0;
    }

    /// Returns the number of bytes that contributed to the current state.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no bytes have been observed yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Updates the checksum with an additional slice of bytes.
    #[inline]
    pub fn update(&mut self, chunk: &[u8]) {
        let (s1, s2, len) = accumulate_chunk(self.s1, self.s2, self.len, chunk);
        self.s1 = s1;
        self.s2 = s2;
        self.len = len;
    }

    /// Updates the checksum using a vectored slice of byte buffers.
    #[doc(alias = "writev")]
    #[inline]
    pub fn update_vectored(&mut self, buffers: &[IoSlice<'_>]) {
        let mut s1 = self.s1;
        let mut s2 = self.s2;
        let mut len = self.len;

        for slice in buffers {
            (s1, s2, len) = accumulate_chunk(s1, s2, len, slice.as_ref());
        }

        self.s1 = s1;
        self.s2 = s2;
        self.len = len;
    }

    /// Updates the checksum by consuming data from an [`io::Read`] implementation.
    pub fn update_reader_with_buffer<R: Read>(
        &mut self,
        reader: &mut R,
        buffer: &mut [u8],
    ) -> io::Result<u64> {
        if buffer.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "rolling checksum reader buffer must not be empty",
            ));
        }

        let mut total = 0u64;
        loop {
            match reader.read(buffer) {
                Ok(0) => break,
                Ok(n) => {
                    self.update(&buffer[..n]);
                    total = total.saturating_add(u64::try_from(n).unwrap_or(u64::MAX));
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(total)
    }

    /// Convenience wrapper that allocates a stack buffer.
    pub fn update_reader<R: Read>(&mut self, reader: &mut R) -> io::Result<u64> {
        let mut buffer = [0u8; Self::DEFAULT_READER_BUFFER_LEN];
        self.update_reader_with_buffer(reader, &mut buffer)
    }

    /// Clears the state and updates with `block`.
    pub fn update_from_block(&mut self, block: &[u8]) {
        self.reset();
        self.update(block);
    }

    /// Returns the current window length as a 32-bit value while validating invariants.
    #[inline]
    fn window_len_u32(&self) -> Result<u32, RollingError> {
        if self.len == 0 {
            return Err(RollingError::EmptyWindow);
        }
        u32::try_from(self.len).map_err(|_| RollingError::WindowTooLarge { len: self.len })
    }

    /// Rolls the checksum by removing one byte and adding another.
    ///
    /// # Errors
    ///
    /// Returns [`RollingError::EmptyWindow`] if the checksum has not been
    /// seeded with a block, and [`RollingError::WindowTooLarge`] if the
    /// window length exceeds 32 bits.
    #[inline]
    pub fn roll(&mut self, outgoing: u8, incoming: u8) -> Result<(), RollingError> {
        let window_len = self.window_len_u32()?;

        let out = u32::from(outgoing);
        let inn = u32::from(incoming);

        let new_s1 = self.s1.wrapping_sub(out).wrapping_add(inn) & 0xffff;
        let new_s2 = self
            .s2
            .wrapping_sub(window_len.wrapping_mul(out))
            .wrapping_add(new_s1)
            & 0xffff;

        self.s1 = new_s1;
        self.s2 = new_s2;
        Ok(())
    }

    /// Rolls multiple bytes at once, equivalent to calling [`roll`](Self::roll)
    /// once per outgoing/incoming pair.
    ///
    /// # Errors
    ///
    /// Returns [`RollingError::MismatchedSliceLength`] when the slices
    /// differ in length, and the same errors as [`roll`](Self::roll)
    /// otherwise.
    #[inline]
    pub fn roll_many(&mut self, outgoing: &[u8], incoming: &[u8]) -> Result<(), RollingError> {
        if outgoing.len() != incoming.len() {
            return Err(RollingError::MismatchedSliceLength {
                outgoing: outgoing.len(),
                incoming: incoming.len(),
            });
        }

        if outgoing.is_empty() {
            return Ok(());
        }

        let window_len = self.window_len_u32()?;

        let mut s1 = self.s1;
        let mut s2 = self.s2;

        for (&out, &inn) in outgoing.iter().zip(incoming.iter()) {
            let out = u32::from(out);
            let inn = u32::from(inn);

            s1 = s1.wrapping_sub(out).wrapping_add(inn) & 0xffff;
            s2 = s2
                .wrapping_sub(window_len.wrapping_mul(out))
                .wrapping_add(s1)
                & 0xffff;
        }

        self.s1 = s1;
        self.s2 = s2;

        Ok(())
    }

    /// Returns the rolling checksum value in its packed 32-bit representation.
    #[must_use]
    pub const fn value(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }

    /// Returns the current state as a structured digest.
    #[must_use]
    pub fn digest(&self) -> RollingDigest {
        RollingDigest::new(self.s1 as u16, self.s2 as u16, self.len)
    }

    #[cfg(test)]
    pub(crate) fn force_state(&mut self, s1: u32, s2: u32, len: usize) {
        self.s1 = s1;
        self.s2 = s2;
        self.len = len;
    }
}

impl From<RollingDigest> for RollingChecksum {
    fn from(digest: RollingDigest) -> Self {
        Self::from_digest(digest)
    }
}

impl From<RollingChecksum> for RollingDigest {
    fn from(checksum: RollingChecksum) -> Self {
        checksum.digest()
    }
}

impl From<&RollingChecksum> for RollingDigest {
    fn from(checksum: &RollingChecksum) -> Self {
        checksum.digest()
    }
}

#[inline]
fn accumulate_chunk(mut s1: u32, mut s2: u32, len: usize, chunk: &[u8]) -> (u32, u32, usize) {
    if chunk.is_empty() {
        return (s1, s2, len);
    }

    let mut iter = chunk.chunks_exact(4);
    for block in &mut iter {
        s1 = s1.wrapping_add(u32::from(block[0]));
        s2 = s2.wrapping_add(s1);

        s1 = s1.wrapping_add(u32::from(block[1]));
        s2 = s2.wrapping_add(s1);

        s1 = s1.wrapping_add(u32::from(block[2]));
        s2 = s2.wrapping_add(s1);

        s1 = s1.wrapping_add(u32::from(block[3]));
        s2 = s2.wrapping_add(s1);
    }

    for &byte in iter.remainder() {
        s1 = s1.wrapping_add(u32::from(byte));
        s2 = s2.wrapping_add(s1);
    }

    (s1 & 0xffff, s2 & 0xffff, len.saturating_add(chunk.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_matches_recomputed_checksum() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let window = 12;

        let mut rolling = RollingChecksum::new();
        rolling.update(&data[..window]);

        for start in 1..=data.len() - window {
            let outgoing = data[start - 1];
            let incoming = data[start + window - 1];
            rolling.roll(outgoing, incoming).expect("rolling succeeds");

            let mut expected = RollingChecksum::new();
            expected.update(&data[start..start + window]);
            assert_eq!(rolling.digest(), expected.digest());
        }
    }

    #[test]
    fn roll_errors_for_empty_window() {
        let mut checksum = RollingChecksum::new();
        let err = checksum
            .roll(0, 0)
            .expect_err("rolling on empty window must fail");
        assert_eq!(err, RollingError::EmptyWindow);
    }

    #[test]
    fn roll_many_matches_multiple_single_rolls() {
        let data = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit.";
        let window = 12;
        let mut rolling = RollingChecksum::new();
        rolling.update(&data[..window]);

        let mut reference = rolling.clone();
        let mut position = window;

        while position < data.len() {
            let advance = (data.len() - position).min(3);
            let outgoing_start = position - window;
            let outgoing_end = outgoing_start + advance;
            let incoming_end = position + advance;

            rolling
                .roll_many(
                    &data[outgoing_start..outgoing_end],
                    &data[position..incoming_end],
                )
                .expect("multi-byte roll succeeds");

            for (&out, &inn) in data[outgoing_start..outgoing_end]
                .iter()
                .zip(data[position..incoming_end].iter())
            {
                reference.roll(out, inn).expect("single roll succeeds");
            }

            assert_eq!(rolling.digest(), reference.digest());
            position += advance;
        }
    }

    #[test]
    fn update_matches_update_from_block() {
        let data = b"0123456789abcdef";

        let mut checksum = RollingChecksum::new();
        checksum.update(&data[..8]);

        let mut recomputed = RollingChecksum::new();
        recomputed.update_from_block(&data[..8]);

        assert_eq!(checksum.digest(), recomputed.digest());
    }

    #[test]
    fn checksum_restores_from_digest() {
        let mut checksum = RollingChecksum::new();
        checksum.update(b"rolling checksum state");

        let digest = checksum.digest();
        let restored = RollingChecksum::from_digest(digest);

        assert_eq!(restored.digest(), digest);
        assert_eq!(restored.value(), checksum.value());
    }
}
