use bytes::Bytes;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

use crate::buf_ext::Cursor;
use crate::column::{ColumnDescriptor, TypeParams};
use crate::constants::ColumnType;
use crate::debug::DebugBytesRef;
use crate::error::Error;

/// One decoded column value.
///
/// Integer variants keep the exact wire width semantics: the decoder sign
/// extends into `i64` for signed reads and widens into `u64` for unsigned
/// ones, with no rounding anywhere. Strings and blobs stay raw bytes; no
/// charset decoding happens at this layer.
#[derive(Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowValue {
  Null,
  SignedInteger(i64),
  UnsignedInteger(u64),
  Float(f32),
  Double(f64),
  Bytes(Bytes),
  /// UTC instant with microsecond precision (timestamp, timestamp2,
  /// datetime, datetime2).
  DateTime(DateTime<Utc>),
  Date(NaiveDate),
  /// Wall-clock time of day rendered as zero-padded `HH:MM:SS`.
  Time(String),
}

impl fmt::Debug for RowValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RowValue::Null => write!(f, "Null"),
      RowValue::SignedInteger(v) => write!(f, "SignedInteger({})", v),
      RowValue::UnsignedInteger(v) => write!(f, "UnsignedInteger({})", v),
      RowValue::Float(v) => write!(f, "Float({})", v),
      RowValue::Double(v) => write!(f, "Double({})", v),
      RowValue::Bytes(v) => write!(f, "Bytes({:?})", DebugBytesRef(v)),
      RowValue::DateTime(v) => write!(f, "DateTime({})", v),
      RowValue::Date(v) => write!(f, "Date({})", v),
      RowValue::Time(v) => write!(f, "Time({})", v),
    }
  }
}

/// Decodes exactly one column value from the front of `input`, returning the
/// value and the number of bytes consumed.
///
/// https://mariadb.com/kb/en/rows_event_v1/
pub(crate) fn decode_value(descriptor: &ColumnDescriptor, input: &[u8]) -> Result<(RowValue, usize), Error> {
  let mut cursor = Cursor::new(input);

  let value = match descriptor.column_type {
    ColumnType::Null => RowValue::Null,
    ColumnType::Tiny => RowValue::SignedInteger(cursor.get_i8("tiny value")?.into()),
    ColumnType::Short => RowValue::SignedInteger(cursor.get_i16_le("short value")?.into()),
    ColumnType::Int24 => RowValue::SignedInteger(cursor.get_i24_le("int24 value")?.into()),
    ColumnType::Long => RowValue::SignedInteger(cursor.get_i32_le("long value")?.into()),
    ColumnType::LongLong => RowValue::SignedInteger(cursor.get_i64_le("longlong value")?),
    ColumnType::Float => RowValue::Float(cursor.get_f32_le("float value")?),
    ColumnType::Double => RowValue::Double(cursor.get_f64_le("double value")?),
    ColumnType::Year => RowValue::UnsignedInteger(u64::from(cursor.get_u8("year value")?) + 1900),
    ColumnType::Timestamp => {
      let seconds = cursor.get_u32_le("timestamp value")?;
      utc_from_epoch(seconds.into(), 0, "timestamp")?
    }
    ColumnType::Date => {
      let raw = cursor.get_u24_le("date value")?;
      let (year, month, day) = unpack_date(raw);
      let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or(Error::InvalidTemporal("date"))?;
      RowValue::Date(date)
    }
    ColumnType::Time => {
      let raw = cursor.get_u24_le("time value")?;
      let hours = raw / 10_000;
      let minutes = raw % 10_000 / 100;
      let seconds = raw % 100;
      RowValue::Time(format!("{:02}:{:02}:{:02}", hours, minutes, seconds))
    }
    ColumnType::DateTime => {
      let raw = cursor.get_u64_le("datetime value")?;
      let date = raw / 1_000_000;
      let time = raw % 1_000_000;
      utc_from_calendar(
        (date / 10_000) as i32,
        (date % 10_000 / 100) as u32,
        (date % 100) as u32,
        (time / 10_000) as u32,
        (time % 10_000 / 100) as u32,
        (time % 100) as u32,
        0,
        "datetime",
      )?
    }
    ColumnType::Timestamp2 => {
      let seconds = cursor.get_u32_be("timestamp2 value")?;
      let micros = fractional_micros(&mut cursor, descriptor.decimals())?;
      utc_from_epoch(seconds.into(), micros, "timestamp2")?
    }
    ColumnType::DateTime2 => {
      let intpart = cursor.get_u40_be("datetime2 value")?;
      let micros = fractional_micros(&mut cursor, descriptor.decimals())?;
      let (year, month, day, hour, minute, second) = unpack_datetime2(intpart);
      utc_from_calendar(year, month, day, hour, minute, second, micros, "datetime2")?
    }
    ColumnType::Varchar | ColumnType::VarString | ColumnType::String => {
      let max_length = match descriptor.params {
        TypeParams::MaxLength(v) => v,
        _ => return Err(Error::UnsupportedType(descriptor.column_type)),
      };
      let length = if max_length > 255 {
        cursor.get_u16_le("string length prefix")?.into()
      } else {
        usize::from(cursor.get_u8("string length prefix")?)
      };
      RowValue::Bytes(Bytes::copy_from_slice(cursor.take(length, "string value")?))
    }
    ColumnType::Blob | ColumnType::Json => {
      let length_size = match descriptor.params {
        TypeParams::LengthSize(v @ 1..=4) => usize::from(v),
        _ => return Err(Error::UnsupportedType(descriptor.column_type)),
      };
      let length = cursor.get_uint_le(length_size, "blob length prefix")? as usize;
      RowValue::Bytes(Bytes::copy_from_slice(cursor.take(length, "blob value")?))
    }
    ColumnType::Bit => {
      let bits = match descriptor.params {
        TypeParams::Bits(v) => v,
        _ => return Err(Error::UnsupportedType(descriptor.column_type)),
      };
      match (bits + 7) / 8 {
        width @ 1..=4 => RowValue::UnsignedInteger(cursor.get_uint_le(width.into(), "bit value")?),
        _ => return Err(Error::UnsupportedType(ColumnType::Bit)),
      }
    }
    // Everything else is rejected outright: silently guessing a width would
    // desynchronize the cursor for the rest of the row.
    ColumnType::Decimal
    | ColumnType::NewDecimal
    | ColumnType::Enum
    | ColumnType::Set
    | ColumnType::Time2
    | ColumnType::NewDate
    | ColumnType::TinyBlob
    | ColumnType::MediumBlob
    | ColumnType::LongBlob
    | ColumnType::Geometry
    | ColumnType::Unknown => return Err(Error::UnsupportedType(descriptor.column_type)),
  };

  Ok((value, cursor.pos()))
}

impl ColumnDescriptor {
  fn decimals(&self) -> u8 {
    match self.params {
      TypeParams::Decimals(v) => v,
      _ => 0,
    }
  }
}

/// Unpacks the 3-byte DATE layout `YYYYYYY.MMMM.DDDDD` (year in the high
/// bits, 4-bit month, 5-bit day).
pub(crate) fn unpack_date(raw: u32) -> (u32, u32, u32) {
  (raw >> 9, (raw >> 5) & 0x0f, raw & 0x1f)
}

/// Unpacks the 40-bit big-endian DATETIME2 integer part.
///
/// See `TIME_to_longlong_datetime_packed()`:
/// https://github.com/mysql/mysql-server/blob/mysql-8.0.27/mysys/my_time.cc#L1672-L1691
pub(crate) fn unpack_datetime2(intpart: u64) -> (i32, u32, u32, u32, u32, u32) {
  let symd = intpart >> 17;
  let sym = symd >> 5;
  let sign = sym >> 17;
  let ym = sym % (1 << 17);
  let mut year = (ym / 13) as i32;
  if sign == 0 {
    year = -year;
  }
  let month = (ym % 13) as u32;
  let day = (symd % (1 << 5)) as u32;
  let hms = intpart % (1 << 17);
  let hour = (hms >> 12) as u32;
  let minute = (hms >> 6) as u32 % (1 << 6);
  let second = hms as u32 % (1 << 6);
  (year, month, day, hour, minute, second)
}

/// Reads the packed fractional-seconds field that follows TIMESTAMP2 and
/// DATETIME2 values and scales it to microseconds. The field width is
/// `ceil(decimals / 2)` bytes; widths past 3 carry nothing.
pub(crate) fn fractional_micros(cursor: &mut Cursor<'_>, decimals: u8) -> Result<u32, Error> {
  let micros = match (u32::from(decimals) + 1) / 2 {
    1 => u32::from(cursor.get_u8("fractional seconds")?) * 10_000,
    2 => u32::from(cursor.get_u16_be_frac()?) * 100,
    3 => cursor.get_u24_be_frac()?,
    _ => 0,
  };
  // more than a second's worth of microseconds means the field is garbage
  if micros >= 1_000_000 {
    return Err(Error::InvalidTemporal("fractional seconds"));
  }
  Ok(micros)
}

impl Cursor<'_> {
  // The fractional field is big-endian on the wire, unlike the little-endian
  // reads everywhere else in a row image.
  fn get_u16_be_frac(&mut self) -> Result<u16, Error> {
    let b = self.take(2, "fractional seconds")?;
    Ok(u16::from_be_bytes([b[0], b[1]]))
  }

  fn get_u24_be_frac(&mut self) -> Result<u32, Error> {
    let b = self.take(3, "fractional seconds")?;
    Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
  }
}

fn utc_from_epoch(seconds: i64, micros: u32, context: &'static str) -> Result<RowValue, Error> {
  Utc
    .timestamp_opt(seconds, micros * 1_000)
    .single()
    .map(RowValue::DateTime)
    .ok_or(Error::InvalidTemporal(context))
}

#[allow(clippy::too_many_arguments)]
fn utc_from_calendar(
  year: i32,
  month: u32,
  day: u32,
  hour: u32,
  minute: u32,
  second: u32,
  micros: u32,
  context: &'static str,
) -> Result<RowValue, Error> {
  NaiveDate::from_ymd_opt(year, month, day)
    .and_then(|d| d.and_hms_micro_opt(hour, minute, second, micros))
    .map(|dt| RowValue::DateTime(dt.and_utc()))
    .ok_or(Error::InvalidTemporal(context))
}
