use crate::error::Error;

/// Bounds-checked reader over a borrowed event buffer.
///
/// Every read either consumes exactly the requested bytes or fails with
/// `Error::Truncated`, so a malformed event can never push the position past
/// the end of the buffer.
#[derive(Debug)]
pub(crate) struct Cursor<'a> {
  buf: &'a [u8],
  pos: usize,
}

impl<'a> Cursor<'a> {
  pub fn new(buf: &'a [u8]) -> Self {
    Self { buf, pos: 0 }
  }

  pub fn pos(&self) -> usize {
    self.pos
  }

  pub fn remaining(&self) -> usize {
    self.buf.len() - self.pos
  }

  pub fn is_empty(&self) -> bool {
    self.remaining() == 0
  }

  /// Consumes `len` bytes and returns them as a slice.
  pub fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], Error> {
    if self.remaining() < len {
      return Err(Error::Truncated(context));
    }
    let out = &self.buf[self.pos..self.pos + len];
    self.pos += len;
    Ok(out)
  }

  /// Returns everything left in the buffer without consuming it.
  pub fn peek_rest(&self) -> &'a [u8] {
    &self.buf[self.pos..]
  }

  /// Consumes and returns everything left in the buffer.
  pub fn take_rest(&mut self) -> &'a [u8] {
    let out = &self.buf[self.pos..];
    self.pos = self.buf.len();
    out
  }

  pub fn skip(&mut self, len: usize, context: &'static str) -> Result<(), Error> {
    self.take(len, context).map(|_| ())
  }

  pub fn get_u8(&mut self, context: &'static str) -> Result<u8, Error> {
    self.take(1, context).map(|b| b[0])
  }

  pub fn get_i8(&mut self, context: &'static str) -> Result<i8, Error> {
    self.get_u8(context).map(|v| v as i8)
  }

  pub fn get_u16_le(&mut self, context: &'static str) -> Result<u16, Error> {
    self.take(2, context).map(|b| u16::from_le_bytes([b[0], b[1]]))
  }

  pub fn get_i16_le(&mut self, context: &'static str) -> Result<i16, Error> {
    self.get_u16_le(context).map(|v| v as i16)
  }

  pub fn get_u24_le(&mut self, context: &'static str) -> Result<u32, Error> {
    self
      .take(3, context)
      .map(|b| u32::from_le_bytes([b[0], b[1], b[2], 0]))
  }

  /// Reads 3 bytes little-endian and sign-extends bit 23.
  pub fn get_i24_le(&mut self, context: &'static str) -> Result<i32, Error> {
    let v = self.get_u24_le(context)?;
    if v & 0x0080_0000 != 0 {
      Ok((v | 0xff00_0000) as i32)
    } else {
      Ok(v as i32)
    }
  }

  pub fn get_u32_le(&mut self, context: &'static str) -> Result<u32, Error> {
    self.take(4, context).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
  }

  pub fn get_i32_le(&mut self, context: &'static str) -> Result<i32, Error> {
    self.get_u32_le(context).map(|v| v as i32)
  }

  pub fn get_u64_le(&mut self, context: &'static str) -> Result<u64, Error> {
    self
      .take(8, context)
      .map(|b| u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
  }

  pub fn get_i64_le(&mut self, context: &'static str) -> Result<i64, Error> {
    self.get_u64_le(context).map(|v| v as i64)
  }

  pub fn get_f32_le(&mut self, context: &'static str) -> Result<f32, Error> {
    self.get_u32_le(context).map(f32::from_bits)
  }

  pub fn get_f64_le(&mut self, context: &'static str) -> Result<f64, Error> {
    self.get_u64_le(context).map(f64::from_bits)
  }

  /// Reads an unsigned little-endian integer of 1 to 8 bytes.
  pub fn get_uint_le(&mut self, len: usize, context: &'static str) -> Result<u64, Error> {
    let bytes = self.take(len, context)?;
    let mut out = 0u64;
    for (i, b) in bytes.iter().enumerate() {
      out |= (*b as u64) << (8 * i);
    }
    Ok(out)
  }

  pub fn get_u32_be(&mut self, context: &'static str) -> Result<u32, Error> {
    self.take(4, context).map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
  }

  /// Reads 5 bytes big-endian into the low 40 bits of a u64.
  pub fn get_u40_be(&mut self, context: &'static str) -> Result<u64, Error> {
    self
      .take(5, context)
      .map(|b| u64::from_be_bytes([0, 0, 0, b[0], b[1], b[2], b[3], b[4]]))
  }

  /// Reads a MySQL length-encoded integer.
  pub fn get_lenc_uint(&mut self, context: &'static str) -> Result<u64, Error> {
    match self.get_u8(context)? {
      0xfc => self.get_uint_le(2, context),
      0xfd => self.get_uint_le(3, context),
      0xfe => self.get_uint_le(8, context),
      0xff => Err(Error::Malformed(context)),
      x => Ok(x.into()),
    }
  }
}
