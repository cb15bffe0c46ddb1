use crate::error::WireError;

/// Sequential reader over a payload byte slice with bounds-checked primitives.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(len).ok_or(WireError::TruncatedPayload {
            expected: len,
            actual: self.buf.len() - self.pos,
        })?;
        let slice = self
            .buf
            .get(self.pos..end)
            .ok_or(WireError::TruncatedPayload {
                expected: len,
                actual: self.buf.len().saturating_sub(self.pos),
            })?;
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub(crate) fn array32(&mut self) -> Result<[u8; 32], WireError> {
        Ok(self.take(32)?.try_into().unwrap())
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<Vec<u8>, WireError> {
        Ok(self.take(len)?.to_vec())
    }

    pub(crate) fn u16_prefixed(&mut self) -> Result<Vec<u8>, WireError> {
        let len = self.u16()? as usize;
        self.bytes(len)
    }

    pub(crate) fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

pub(crate) fn write_u16_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
    out.extend_from_slice(bytes);
}
