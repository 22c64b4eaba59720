use crate::buf_ext::Cursor;
use crate::constants::ColumnType;
use crate::error::Error;

/// Type-specific parameters announced by a `TABLE_MAP` event.
///
/// The variant is fully determined by the column's symbolic type; the
/// metadata parser is the only constructor, so a descriptor never carries a
/// mismatched pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeParams {
  None,
  /// Storage size in bytes (float/double, enum/set value storage).
  Size(u8),
  /// Declared maximum length in bytes (varchar, char/binary).
  MaxLength(u32),
  /// Total bit width of a BIT column.
  Bits(u16),
  /// Fractional-second digit count, 0 through 6.
  Decimals(u8),
  /// Width of the length prefix framing a blob/json/geometry value, 1-4.
  LengthSize(u8),
  Precision { precision: u8, decimals: u8 },
}

/// One column of a replicated table: its resolved type plus whatever
/// parameters the wire metadata defined for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDescriptor {
  pub column_type: ColumnType,
  pub params: TypeParams,
}

impl ColumnDescriptor {
  /// Builds a descriptor from a raw type code, consuming exactly the number
  /// of metadata bytes the wire format defines for that type.
  ///
  /// https://dev.mysql.com/doc/dev/mysql-server/latest/classbinary__log_1_1Table__map__event.html
  pub(crate) fn parse(type_code: u8, meta: &mut Cursor<'_>) -> Result<Self, Error> {
    let column_type = ColumnType::from_code(type_code);
    let params = match column_type {
      ColumnType::Float | ColumnType::Double => TypeParams::Size(meta.get_u8("float/double metadata")?),
      ColumnType::Varchar => TypeParams::MaxLength(meta.get_u16_le("varchar metadata")?.into()),
      ColumnType::Bit => {
        let bits = meta.get_u8("bit metadata")?;
        let bytes = meta.get_u8("bit metadata")?;
        TypeParams::Bits(u16::from(bytes) * 8 + u16::from(bits))
      }
      ColumnType::Timestamp2 | ColumnType::DateTime2 | ColumnType::Time2 => {
        let decimals = meta.get_u8("temporal metadata")?;
        // fractional-second digit count is 0 through 6
        if decimals > 6 {
          return Err(Error::Malformed("temporal fractional digits"));
        }
        TypeParams::Decimals(decimals)
      }
      ColumnType::Json | ColumnType::Blob | ColumnType::Geometry => {
        TypeParams::LengthSize(meta.get_u8("blob metadata")?)
      }
      ColumnType::NewDecimal => {
        let precision = meta.get_u8("newdecimal metadata")?;
        let decimals = meta.get_u8("newdecimal metadata")?;
        TypeParams::Precision { precision, decimals }
      }
      ColumnType::Enum | ColumnType::Set => {
        meta.skip(1, "enum/set metadata")?;
        TypeParams::Size(meta.get_u8("enum/set metadata")?)
      }
      ColumnType::VarString | ColumnType::String => return Self::parse_string(meta),
      // fixed-width and legacy types carry no metadata
      _ => TypeParams::None,
    };

    Ok(Self { column_type, params })
  }

  /// STRING/VAR_STRING overload the first metadata byte with the real
  /// underlying type; the two spare high bits of that byte contribute the
  /// high bits of a max length that can exceed 255.
  ///
  /// See `Field_string::do_save_field_metadata()` in the server sources.
  fn parse_string(meta: &mut Cursor<'_>) -> Result<Self, Error> {
    let real_code = meta.get_u8("string metadata")?;
    let second = meta.get_u8("string metadata")?;

    let column_type = ColumnType::from_code(real_code);
    let params = match column_type {
      ColumnType::Enum | ColumnType::Set => TypeParams::Size(second),
      _ => {
        let high = (u32::from(real_code >> 4) & 0x03) ^ 0x03;
        TypeParams::MaxLength(high << 8 | u32::from(second))
      }
    };

    Ok(Self { column_type, params })
  }
}

/// Ordered column descriptors for one table, as announced at map time.
/// Immutable once built; rows events hold it through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
  pub database: String,
  pub table: String,
  columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
  pub(crate) fn new(database: String, table: String, columns: Vec<ColumnDescriptor>) -> Self {
    Self { database, table, columns }
  }

  pub fn columns(&self) -> &[ColumnDescriptor] {
    &self.columns
  }

  pub fn column(&self, i: usize) -> Option<&ColumnDescriptor> {
    self.columns.get(i)
  }

  pub fn len(&self) -> usize {
    self.columns.len()
  }

  pub fn is_empty(&self) -> bool {
    self.columns.is_empty()
  }
}

#[cfg(test)]
mod test {
  use super::{ColumnDescriptor, TypeParams};
  use crate::buf_ext::Cursor;
  use crate::constants::ColumnType;
  use crate::error::Error;

  fn parse(type_code: u8, meta: &[u8]) -> (ColumnDescriptor, usize) {
    let mut cursor = Cursor::new(meta);
    let descriptor = ColumnDescriptor::parse(type_code, &mut cursor).unwrap();
    (descriptor, cursor.pos())
  }

  #[test]
  fn fixed_width_types_consume_no_metadata() {
    for code in [0x01, 0x02, 0x03, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x06] {
      let (descriptor, consumed) = parse(code, &[0xaa, 0xbb]);
      assert_eq!(consumed, 0, "type code {:#x}", code);
      assert_eq!(descriptor.params, TypeParams::None);
    }
  }

  #[test]
  fn parses_varchar_max_length() {
    let (descriptor, consumed) = parse(0x0f, &[0x2c, 0x01]);
    assert_eq!(consumed, 2);
    assert_eq!(descriptor.column_type, ColumnType::Varchar);
    assert_eq!(descriptor.params, TypeParams::MaxLength(300));
  }

  #[test]
  fn parses_bit_width_from_two_bytes() {
    let (descriptor, consumed) = parse(0x10, &[0x03, 0x02]);
    assert_eq!(consumed, 2);
    assert_eq!(descriptor.params, TypeParams::Bits(19));
  }

  #[test]
  fn parses_temporal_decimals() {
    let (descriptor, consumed) = parse(0x12, &[0x06]);
    assert_eq!(consumed, 1);
    assert_eq!(descriptor.column_type, ColumnType::DateTime2);
    assert_eq!(descriptor.params, TypeParams::Decimals(6));
  }

  #[test]
  fn rejects_temporal_decimals_above_six() {
    let mut cursor = Cursor::new(&[0xff]);
    let err = ColumnDescriptor::parse(0x12, &mut cursor).unwrap_err();
    assert_eq!(err, Error::Malformed("temporal fractional digits"));
  }

  #[test]
  fn parses_blob_length_size() {
    let (descriptor, consumed) = parse(0xfc, &[0x02]);
    assert_eq!(consumed, 1);
    assert_eq!(descriptor.params, TypeParams::LengthSize(2));
  }

  #[test]
  fn parses_newdecimal_precision_and_decimals() {
    let (descriptor, consumed) = parse(0xf6, &[0x0a, 0x02]);
    assert_eq!(consumed, 2);
    assert_eq!(
      descriptor.params,
      TypeParams::Precision {
        precision: 10,
        decimals: 2
      }
    );
  }

  #[test]
  fn resolves_string_real_type_with_short_length() {
    // CHAR(3): byte[0] keeps the STRING code since the length fits in 8 bits
    let (descriptor, consumed) = parse(0xfe, &[0xfe, 0x03]);
    assert_eq!(consumed, 2);
    assert_eq!(descriptor.column_type, ColumnType::String);
    assert_eq!(descriptor.params, TypeParams::MaxLength(3));
  }

  #[test]
  fn reconstructs_string_length_above_255() {
    // length 300 = 0x12c: high bits 0x01 stored inverted in bits 4-5 of byte[0]
    let real = 0xfe & !(0x01 << 4);
    let (descriptor, _) = parse(0xfe, &[real, 0x2c]);
    assert_eq!(descriptor.params, TypeParams::MaxLength(300));
  }

  #[test]
  fn resolves_string_real_type_enum() {
    let (descriptor, consumed) = parse(0xfe, &[0xf7, 0x02]);
    assert_eq!(consumed, 2);
    assert_eq!(descriptor.column_type, ColumnType::Enum);
    assert_eq!(descriptor.params, TypeParams::Size(2));
  }

  #[test]
  fn unknown_type_code_yields_bare_descriptor() {
    let (descriptor, consumed) = parse(0x14, &[0x01, 0x02]);
    assert_eq!(consumed, 0);
    assert_eq!(descriptor.column_type, ColumnType::Unknown);
    assert_eq!(descriptor.params, TypeParams::None);
  }
}
