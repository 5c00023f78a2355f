use super::error::CursorError;

/// Sequential little/big-endian reader over a borrowed byte slice.
///
/// Every read is bounds-checked up front: a read that does not fit returns
/// [`CursorError::Overrun`] and leaves the position untouched.
#[derive(Debug, Clone)]
pub(crate) struct ByteCursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn seek(&mut self, position: usize) -> Result<(), CursorError> {
        if position > self.bytes.len() {
            return Err(CursorError::Overrun {
                offset: self.position,
                needed: position - self.position,
                remaining: self.remaining(),
            });
        }
        self.position = position;
        Ok(())
    }

    pub(crate) fn skip(&mut self, count: usize) -> Result<(), CursorError> {
        self.take(count).map(|_| ())
    }

    pub(crate) fn take(&mut self, count: usize) -> Result<&'a [u8], CursorError> {
        let bytes = self.peek(count)?;
        self.position += count;
        Ok(bytes)
    }

    pub(crate) fn peek(&self, count: usize) -> Result<&'a [u8], CursorError> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(CursorError::Overrun {
                offset: self.position,
                needed: count,
                remaining: self.remaining(),
            })?;
        Ok(&self.bytes[self.position..end])
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u16_le(&mut self) -> Result<u16, CursorError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn peek_u16_le(&self) -> Result<u16, CursorError> {
        let bytes = self.peek(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }
}
