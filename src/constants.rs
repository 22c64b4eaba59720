use bitflags::bitflags;

/// Size of the common header that prefixes every replication event.
pub const EVENT_HEADER_LEN: usize = 19;

/// Size of the CRC32 trailer appended to events when checksums are enabled.
pub const EVENT_CHECKSUM_LEN: usize = 4;

// https://dev.mysql.com/doc/dev/mysql-server/latest/namespacemysql_1_1binlog_1_1event.html
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum BinlogEventType {
  Unknown = 0x00,
  StartV3 = 0x01,
  Query = 0x02,
  Stop = 0x03,
  Rotate = 0x04,
  Intvar = 0x05,
  Load = 0x06,
  Slave = 0x07,
  CreateFile = 0x08,
  AppendBlock = 0x09,
  ExecLoad = 0x0a,
  DeleteFile = 0x0b,
  NewLoad = 0x0c,
  Rand = 0x0d,
  UserVar = 0x0e,
  FormatDescription = 0x0f,
  Xid = 0x10,
  BeginLoadQuery = 0x11,
  ExecuteLoadQuery = 0x12,
  TableMap = 0x13,
  WriteRowsV0 = 0x14,
  UpdateRowsV0 = 0x15,
  DeleteRowsV0 = 0x16,
  WriteRowsV1 = 0x17,
  UpdateRowsV1 = 0x18,
  DeleteRowsV1 = 0x19,
  Incident = 0x1a,
  Heartbeat = 0x1b,
  Ignorable = 0x1c,
  RowsQuery = 0x1d,
  WriteRowsV2 = 0x1e,
  UpdateRowsV2 = 0x1f,
  DeleteRowsV2 = 0x20,
  Gtid = 0x21,
  AnonymousGtid = 0x22,
  PreviousGtids = 0x23,
}

impl TryFrom<u8> for BinlogEventType {
  type Error = u8;

  fn try_from(v: u8) -> Result<Self, Self::Error> {
    match v {
      0x00 => Ok(BinlogEventType::Unknown),
      0x01 => Ok(BinlogEventType::StartV3),
      0x02 => Ok(BinlogEventType::Query),
      0x03 => Ok(BinlogEventType::Stop),
      0x04 => Ok(BinlogEventType::Rotate),
      0x05 => Ok(BinlogEventType::Intvar),
      0x06 => Ok(BinlogEventType::Load),
      0x07 => Ok(BinlogEventType::Slave),
      0x08 => Ok(BinlogEventType::CreateFile),
      0x09 => Ok(BinlogEventType::AppendBlock),
      0x0a => Ok(BinlogEventType::ExecLoad),
      0x0b => Ok(BinlogEventType::DeleteFile),
      0x0c => Ok(BinlogEventType::NewLoad),
      0x0d => Ok(BinlogEventType::Rand),
      0x0e => Ok(BinlogEventType::UserVar),
      0x0f => Ok(BinlogEventType::FormatDescription),
      0x10 => Ok(BinlogEventType::Xid),
      0x11 => Ok(BinlogEventType::BeginLoadQuery),
      0x12 => Ok(BinlogEventType::ExecuteLoadQuery),
      0x13 => Ok(BinlogEventType::TableMap),
      0x14 => Ok(BinlogEventType::WriteRowsV0),
      0x15 => Ok(BinlogEventType::UpdateRowsV0),
      0x16 => Ok(BinlogEventType::DeleteRowsV0),
      0x17 => Ok(BinlogEventType::WriteRowsV1),
      0x18 => Ok(BinlogEventType::UpdateRowsV1),
      0x19 => Ok(BinlogEventType::DeleteRowsV1),
      0x1a => Ok(BinlogEventType::Incident),
      0x1b => Ok(BinlogEventType::Heartbeat),
      0x1c => Ok(BinlogEventType::Ignorable),
      0x1d => Ok(BinlogEventType::RowsQuery),
      0x1e => Ok(BinlogEventType::WriteRowsV2),
      0x1f => Ok(BinlogEventType::UpdateRowsV2),
      0x20 => Ok(BinlogEventType::DeleteRowsV2),
      0x21 => Ok(BinlogEventType::Gtid),
      0x22 => Ok(BinlogEventType::AnonymousGtid),
      0x23 => Ok(BinlogEventType::PreviousGtids),
      unsupported => Err(unsupported),
    }
  }
}

/// Symbolic tag for a MySQL wire column type code.
///
/// `VarString` and `String` only ever appear in the raw type list of a
/// `TABLE_MAP` event; metadata parsing resolves them to the real underlying
/// type before a descriptor is built. Codes this library does not recognize
/// map to `Unknown` and are rejected when a value decode is attempted.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ColumnType {
  Decimal,
  Tiny,
  Short,
  Long,
  Float,
  Double,
  Null,
  Timestamp,
  LongLong,
  Int24,
  Date,
  Time,
  DateTime,
  Year,
  NewDate,
  Varchar,
  Bit,
  Timestamp2,
  DateTime2,
  Time2,
  Json,
  NewDecimal,
  Enum,
  Set,
  TinyBlob,
  MediumBlob,
  LongBlob,
  Blob,
  VarString,
  String,
  Geometry,
  Unknown,
}

impl ColumnType {
  pub fn from_code(code: u8) -> Self {
    match code {
      0x00 => ColumnType::Decimal,
      0x01 => ColumnType::Tiny,
      0x02 => ColumnType::Short,
      0x03 => ColumnType::Long,
      0x04 => ColumnType::Float,
      0x05 => ColumnType::Double,
      0x06 => ColumnType::Null,
      0x07 => ColumnType::Timestamp,
      0x08 => ColumnType::LongLong,
      0x09 => ColumnType::Int24,
      0x0a => ColumnType::Date,
      0x0b => ColumnType::Time,
      0x0c => ColumnType::DateTime,
      0x0d => ColumnType::Year,
      0x0e => ColumnType::NewDate,
      0x0f => ColumnType::Varchar,
      0x10 => ColumnType::Bit,
      0x11 => ColumnType::Timestamp2,
      0x12 => ColumnType::DateTime2,
      0x13 => ColumnType::Time2,
      0xf5 => ColumnType::Json,
      0xf6 => ColumnType::NewDecimal,
      0xf7 => ColumnType::Enum,
      0xf8 => ColumnType::Set,
      0xf9 => ColumnType::TinyBlob,
      0xfa => ColumnType::MediumBlob,
      0xfb => ColumnType::LongBlob,
      0xfc => ColumnType::Blob,
      0xfd => ColumnType::VarString,
      0xfe => ColumnType::String,
      0xff => ColumnType::Geometry,
      _ => ColumnType::Unknown,
    }
  }
}

bitflags! {
  /// Per-event flags carried by write/update/delete rows events.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct RowsEventFlags: u16 {
    /// Last rows event of the statement; invalidates all table maps.
    const STATEMENT_END = 0x0001;
    const NO_FOREIGN_KEY_CHECKS = 0x0002;
    const RELAXED_UNIQUE_CHECKS = 0x0004;
    const COMPLETE_ROWS = 0x0008;
  }
}

bitflags! {
  /// Options a transport presents to the server when requesting the dump.
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
  pub struct BinlogDumpFlags: u32 {
    /// Do not block when the end of the log is reached.
    const NON_BLOCKING = 0x0001;
    /// Ask the server to send row annotation events.
    const ANNOTATE_ROWS = 0x0002;
    /// Drop heartbeat events instead of delivering them.
    const IGNORE_HEARTBEAT = 0x0004;
  }
}
