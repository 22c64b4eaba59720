use std::fmt::{self, Debug, Write};

/// Renders raw bytes as a byte-string literal so row values and traced
/// payloads stay readable in logs.
pub(crate) struct DebugBytesRef<'a>(pub &'a [u8]);

impl Debug for DebugBytesRef<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("b\"")?;
    for &b in self.0 {
      match b {
        b'\0' => f.write_str("\\0")?,
        b'\t' => f.write_str("\\t")?,
        b'\n' => f.write_str("\\n")?,
        b'\r' => f.write_str("\\r")?,
        b'"' => f.write_str("\\\"")?,
        b'\\' => f.write_str("\\\\")?,
        0x20..=0x7e => f.write_char(b as char)?,
        _ => write!(f, "\\x{:02x}", b)?,
      }
    }
    f.write_str("\"")
  }
}

#[cfg(test)]
mod test {
  use super::DebugBytesRef;

  #[test]
  fn escapes_non_printable_bytes() {
    let formatted = format!("{:?}", DebugBytesRef(b"hi\x00\xff\n"));
    assert_eq!(formatted, "b\"hi\\0\\xff\\n\"");
  }

  #[test]
  fn escapes_quotes_and_backslashes() {
    let formatted = format!("{:?}", DebugBytesRef(b"\"\\"));
    assert_eq!(formatted, "b\"\\\"\\\\\"");
  }
}
