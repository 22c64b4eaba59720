use std::collections::BTreeMap;

use crate::buf_ext::Cursor;
use crate::column::TableSchema;
use crate::error::Error;
use crate::value::{decode_value, RowValue};

/// One decoded row image, keyed by zero-based column index. Columns absent
/// from the event's presence bitmap simply have no entry.
pub type Row = BTreeMap<usize, RowValue>;

fn bitmap_bit(bitmap: &[u8], i: usize) -> bool {
  bitmap[i >> 3] >> (i & 7) & 1 == 1
}

/// Decodes a single row image: for each column marked present, a NULL bitmap
/// bit decides between `RowValue::Null` and a value decode.
fn decode_row(schema: &TableSchema, presence: &[u8], cursor: &mut Cursor<'_>) -> Result<Row, Error> {
  let bitmap_len = (schema.len() + 7) / 8;
  let null_bitmap = cursor.take(bitmap_len, "row null bitmap")?;

  let mut row = Row::new();
  for (i, descriptor) in schema.columns().iter().enumerate() {
    if !bitmap_bit(presence, i) {
      continue;
    }
    if bitmap_bit(null_bitmap, i) {
      row.insert(i, RowValue::Null);
      continue;
    }
    let (value, consumed) = decode_value(descriptor, cursor.peek_rest())?;
    cursor.skip(consumed, "row value")?;
    row.insert(i, value);
  }
  Ok(row)
}

/// Decodes the row section of a write/delete rows event: one presence bitmap,
/// then row images back to back until the buffer runs out.
pub(crate) fn decode_rows(schema: &TableSchema, cursor: &mut Cursor<'_>) -> Result<Vec<Row>, Error> {
  let bitmap_len = (schema.len() + 7) / 8;
  let presence = cursor.take(bitmap_len, "rows presence bitmap")?;

  let mut rows = Vec::new();
  while !cursor.is_empty() {
    rows.push(decode_row(schema, presence, cursor)?);
  }
  Ok(rows)
}

/// Decodes the row section of an update rows event: two presence bitmaps,
/// then alternating before/after images until the buffer runs out.
pub(crate) fn decode_update_rows(
  schema: &TableSchema,
  cursor: &mut Cursor<'_>,
) -> Result<Vec<(Row, Row)>, Error> {
  let bitmap_len = (schema.len() + 7) / 8;
  let before_presence = cursor.take(bitmap_len, "update rows presence bitmap")?;
  let after_presence = cursor.take(bitmap_len, "update rows presence bitmap")?;

  let mut rows = Vec::new();
  while !cursor.is_empty() {
    let before = decode_row(schema, before_presence, cursor)?;
    let after = decode_row(schema, after_presence, cursor)?;
    rows.push((before, after));
  }
  Ok(rows)
}

#[cfg(test)]
mod test {
  use super::{bitmap_bit, decode_rows, decode_update_rows, Row};
  use crate::buf_ext::Cursor;
  use crate::column::{ColumnDescriptor, TableSchema, TypeParams};
  use crate::constants::ColumnType;
  use crate::error::Error;
  use crate::value::RowValue;

  fn schema() -> TableSchema {
    TableSchema::new(
      "shop".to_string(),
      "orders".to_string(),
      vec![
        ColumnDescriptor {
          column_type: ColumnType::Long,
          params: TypeParams::None,
        },
        ColumnDescriptor {
          column_type: ColumnType::Varchar,
          params: TypeParams::MaxLength(10),
        },
      ],
    )
  }

  fn row(entries: Vec<(usize, RowValue)>) -> Row {
    entries.into_iter().collect()
  }

  #[test]
  fn bitmap_uses_lsb_first_order() {
    let bitmap = [0b0000_0101, 0b0000_0001];
    assert!(bitmap_bit(&bitmap, 0));
    assert!(!bitmap_bit(&bitmap, 1));
    assert!(bitmap_bit(&bitmap, 2));
    assert!(bitmap_bit(&bitmap, 8));
    assert!(!bitmap_bit(&bitmap, 9));
  }

  #[test]
  fn decodes_rows_until_buffer_exhausted() {
    let schema = schema();
    let mut input: Vec<u8> = vec![0b0000_0011]; // both columns present
    // row 1: 42, "hi"
    input.push(0b0000_0000);
    input.extend_from_slice(&42i32.to_le_bytes());
    input.extend_from_slice(b"\x02hi");
    // row 2: 7, NULL
    input.push(0b0000_0010);
    input.extend_from_slice(&7i32.to_le_bytes());

    let mut cursor = Cursor::new(&input);
    let rows = decode_rows(&schema, &mut cursor).unwrap();
    assert_eq!(
      rows,
      vec![
        row(vec![
          (0, RowValue::SignedInteger(42)),
          (1, RowValue::Bytes("hi".into())),
        ]),
        row(vec![(0, RowValue::SignedInteger(7)), (1, RowValue::Null)]),
      ]
    );
    assert!(cursor.is_empty());
  }

  #[test]
  fn skips_columns_absent_from_presence_bitmap() {
    let schema = schema();
    let mut input: Vec<u8> = vec![0b0000_0010]; // only column 1 present
    input.push(0b0000_0000);
    input.extend_from_slice(b"\x03abc");

    let mut cursor = Cursor::new(&input);
    let rows = decode_rows(&schema, &mut cursor).unwrap();
    assert_eq!(rows, vec![row(vec![(1, RowValue::Bytes("abc".into()))])]);
  }

  #[test]
  fn pairs_update_images() {
    let schema = schema();
    let mut input: Vec<u8> = vec![0b0000_0011, 0b0000_0011];
    // before: 1, "a"
    input.push(0b0000_0000);
    input.extend_from_slice(&1i32.to_le_bytes());
    input.extend_from_slice(b"\x01a");
    // after: 1, "b"
    input.push(0b0000_0000);
    input.extend_from_slice(&1i32.to_le_bytes());
    input.extend_from_slice(b"\x01b");

    let mut cursor = Cursor::new(&input);
    let rows = decode_update_rows(&schema, &mut cursor).unwrap();
    assert_eq!(rows.len(), 1);
    let (before, after) = &rows[0];
    assert_eq!(before[&1], RowValue::Bytes("a".into()));
    assert_eq!(after[&1], RowValue::Bytes("b".into()));
  }

  #[test]
  fn truncated_row_fails_without_panicking() {
    let schema = schema();
    let input: Vec<u8> = vec![0b0000_0011, 0b0000_0000, 0x01, 0x02]; // long cut short

    let mut cursor = Cursor::new(&input);
    assert!(matches!(decode_rows(&schema, &mut cursor), Err(Error::Truncated(_))));
  }

  #[test]
  fn empty_row_section_yields_no_rows() {
    let schema = schema();
    let input: Vec<u8> = vec![0b0000_0011];
    let mut cursor = Cursor::new(&input);
    assert_eq!(decode_rows(&schema, &mut cursor).unwrap(), vec![]);
  }
}
