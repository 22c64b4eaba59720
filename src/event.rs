use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::buf_ext::Cursor;
use crate::column::{ColumnDescriptor, TableSchema};
use crate::constants::{BinlogEventType, RowsEventFlags, EVENT_CHECKSUM_LEN, EVENT_HEADER_LEN};
use crate::error::Error;
use crate::rows::{decode_rows, decode_update_rows, Row};

/// Common envelope prefixed to every replication event.
///
/// `event_type` stays the raw wire code so events the dispatcher does not
/// recognize still carry a faithful envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHeader {
  pub timestamp: u32,
  pub event_type: u8,
  pub server_id: u32,
  pub event_length: u32,
  pub next_position: u32,
  pub flags: u16,
}

impl EventHeader {
  pub(crate) fn parse(cursor: &mut Cursor<'_>) -> Result<Self, Error> {
    let timestamp = cursor.get_u32_le("event timestamp")?;
    let event_type = cursor.get_u8("event type")?;
    let server_id = cursor.get_u32_le("event server id")?;
    let event_length = cursor.get_u32_le("event length")?;
    let next_position = cursor.get_u32_le("event next position")?;
    let flags = cursor.get_u16_le("event flags")?;

    Ok(Self {
      timestamp,
      event_type,
      server_id,
      event_length,
      next_position,
      flags,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotateEvent {
  pub header: EventHeader,
  /// Byte offset at which the next event stream starts in `log_file`.
  pub position: u64,
  pub log_file: String,
}

impl RotateEvent {
  fn parse(header: EventHeader, cursor: &mut Cursor<'_>) -> Result<Self, Error> {
    let position = cursor.get_u64_le("rotate position")?;

    // A fake rotate (zero timestamp) is synthesized by the server when the
    // dump starts mid-log. Its declared length still counts the checksum
    // trailer, so the filename length comes from arithmetic on the header.
    let name = if header.timestamp == 0 {
      let len = (header.event_length as usize)
        .checked_sub(EVENT_HEADER_LEN + 8 + EVENT_CHECKSUM_LEN)
        .ok_or(Error::Truncated("fake rotate log file name"))?;
      cursor.take(len, "rotate log file name")?
    } else {
      cursor.take_rest()
    };

    Ok(Self {
      header,
      position,
      log_file: String::from_utf8_lossy(name).into_owned(),
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptionEvent {
  pub header: EventHeader,
  pub format: u16,
  pub server_version: String,
  pub create_timestamp: u32,
  pub header_length: u8,
  /// Post-header length per event type, indexed by type code minus one.
  pub event_type_header_lengths: Vec<u8>,
}

impl FormatDescriptionEvent {
  fn parse(header: EventHeader, cursor: &mut Cursor<'_>) -> Result<Self, Error> {
    let format = cursor.get_u16_le("format version")?;
    let version = cursor.take(50, "server version")?;
    let create_timestamp = cursor.get_u32_le("format create timestamp")?;
    let header_length = cursor.get_u8("format header length")?;
    let event_type_header_lengths = cursor.take_rest().to_vec();

    // fixed 50-byte field, NUL padded
    let end = version.iter().position(|&b| b == 0).unwrap_or(version.len());

    Ok(Self {
      header,
      format,
      server_version: String::from_utf8_lossy(&version[..end]).into_owned(),
      create_timestamp,
      header_length,
      event_type_header_lengths,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapEvent {
  pub header: EventHeader,
  pub table_id: u64,
  pub flags: u16,
  pub schema: Arc<TableSchema>,
}

impl TableMapEvent {
  fn parse(header: EventHeader, cursor: &mut Cursor<'_>) -> Result<Self, Error> {
    let table_id = cursor.get_uint_le(6, "table map table id")?;
    let flags = cursor.get_u16_le("table map flags")?;

    let database_len = cursor.get_u8("database name length")?;
    let database = cursor.take(database_len.into(), "database name")?;
    cursor.skip(1, "database name terminator")?;

    let table_len = cursor.get_u8("table name length")?;
    let table = cursor.take(table_len.into(), "table name")?;
    cursor.skip(1, "table name terminator")?;

    let column_count = cursor.get_lenc_uint("column count")? as usize;
    let type_codes = cursor.take(column_count, "column type list")?.to_vec();

    let metadata_len = cursor.get_lenc_uint("column metadata length")? as usize;
    let mut metadata = Cursor::new(cursor.take(metadata_len, "column metadata")?);

    let mut columns = Vec::with_capacity(column_count);
    for type_code in type_codes {
      columns.push(ColumnDescriptor::parse(type_code, &mut metadata)?);
    }
    // trailing nullability bitmap is not needed for row decoding

    let schema = TableSchema::new(
      String::from_utf8_lossy(database).into_owned(),
      String::from_utf8_lossy(table).into_owned(),
      columns,
    );

    Ok(Self {
      header,
      table_id,
      flags,
      schema: Arc::new(schema),
    })
  }
}

/// A decoded write or delete rows event. Which one it is comes from the
/// enclosing `ReplicationEvent` variant; the payload shape is identical.
#[derive(Debug, Clone, PartialEq)]
pub struct RowsEvent {
  pub header: EventHeader,
  pub table_id: u64,
  pub rows_flags: RowsEventFlags,
  pub schema: Arc<TableSchema>,
  pub rows: Vec<Row>,
}

impl RowsEvent {
  pub fn statement_end(&self) -> bool {
    self.rows_flags.contains(RowsEventFlags::STATEMENT_END)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRowsEvent {
  pub header: EventHeader,
  pub table_id: u64,
  pub rows_flags: RowsEventFlags,
  pub schema: Arc<TableSchema>,
  /// Before/after image pairs, in server order.
  pub rows: Vec<(Row, Row)>,
}

impl UpdateRowsEvent {
  pub fn statement_end(&self) -> bool {
    self.rows_flags.contains(RowsEventFlags::STATEMENT_END)
  }
}

/// Any event type the dispatcher has no structural parser for; only the
/// envelope is populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericEvent {
  pub header: EventHeader,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplicationEvent {
  Rotate(RotateEvent),
  FormatDescription(FormatDescriptionEvent),
  TableMap(TableMapEvent),
  WriteRows(RowsEvent),
  UpdateRows(UpdateRowsEvent),
  DeleteRows(RowsEvent),
  Generic(GenericEvent),
}

impl ReplicationEvent {
  pub fn header(&self) -> &EventHeader {
    match self {
      ReplicationEvent::Rotate(e) => &e.header,
      ReplicationEvent::FormatDescription(e) => &e.header,
      ReplicationEvent::TableMap(e) => &e.header,
      ReplicationEvent::WriteRows(e) => &e.header,
      ReplicationEvent::UpdateRows(e) => &e.header,
      ReplicationEvent::DeleteRows(e) => &e.header,
      ReplicationEvent::Generic(e) => &e.header,
    }
  }

  /// Decodes one whole event buffer, updating `registry` as table maps and
  /// statement boundaries go by.
  pub fn parse(buffer: &[u8], registry: &mut TableMapRegistry) -> Result<ReplicationEvent, Error> {
    let mut cursor = Cursor::new(buffer);
    let header = EventHeader::parse(&mut cursor)?;

    let event_type = BinlogEventType::try_from(header.event_type).unwrap_or(BinlogEventType::Unknown);
    trace!(?event_type, next_position = header.next_position, "dispatching event");

    match event_type {
      BinlogEventType::Rotate => RotateEvent::parse(header, &mut cursor).map(ReplicationEvent::Rotate),
      BinlogEventType::FormatDescription => {
        FormatDescriptionEvent::parse(header, &mut cursor).map(ReplicationEvent::FormatDescription)
      }
      BinlogEventType::TableMap => {
        let event = TableMapEvent::parse(header, &mut cursor)?;
        registry.insert(event.table_id, Arc::clone(&event.schema));
        Ok(ReplicationEvent::TableMap(event))
      }
      BinlogEventType::WriteRowsV1 => parse_rows(header, &mut cursor, false, registry).map(ReplicationEvent::WriteRows),
      BinlogEventType::WriteRowsV2 => parse_rows(header, &mut cursor, true, registry).map(ReplicationEvent::WriteRows),
      BinlogEventType::DeleteRowsV1 => {
        parse_rows(header, &mut cursor, false, registry).map(ReplicationEvent::DeleteRows)
      }
      BinlogEventType::DeleteRowsV2 => parse_rows(header, &mut cursor, true, registry).map(ReplicationEvent::DeleteRows),
      BinlogEventType::UpdateRowsV1 => {
        parse_update_rows(header, &mut cursor, false, registry).map(ReplicationEvent::UpdateRows)
      }
      BinlogEventType::UpdateRowsV2 => {
        parse_update_rows(header, &mut cursor, true, registry).map(ReplicationEvent::UpdateRows)
      }
      _ => Ok(ReplicationEvent::Generic(GenericEvent { header })),
    }
  }
}

struct RowsPreamble {
  table_id: u64,
  rows_flags: RowsEventFlags,
}

/// Reads the fields shared by every rows event variant: table id, flags and,
/// for the V2 layout, a variable-length extras block.
fn parse_rows_preamble(cursor: &mut Cursor<'_>, v2: bool) -> Result<RowsPreamble, Error> {
  let table_id = cursor.get_uint_le(6, "rows event table id")?;
  let rows_flags = RowsEventFlags::from_bits_retain(cursor.get_u16_le("rows event flags")?);

  if v2 {
    // length is self-inclusive
    let extras_len = cursor.get_u16_le("rows event extras length")?;
    let extras_len = usize::from(extras_len)
      .checked_sub(2)
      .ok_or(Error::Truncated("rows event extras length"))?;
    cursor.skip(extras_len, "rows event extras")?;
  }

  Ok(RowsPreamble { table_id, rows_flags })
}

fn resolve_schema(
  registry: &mut TableMapRegistry,
  preamble: &RowsPreamble,
) -> Result<Arc<TableSchema>, Error> {
  match registry.get(preamble.table_id) {
    Some(schema) => Ok(schema),
    None => {
      // The statement boundary is real even when this event cannot decode.
      if preamble.rows_flags.contains(RowsEventFlags::STATEMENT_END) {
        registry.clear();
      }
      Err(Error::UnresolvedSchema {
        table_id: preamble.table_id,
      })
    }
  }
}

fn parse_rows(
  header: EventHeader,
  cursor: &mut Cursor<'_>,
  v2: bool,
  registry: &mut TableMapRegistry,
) -> Result<RowsEvent, Error> {
  let preamble = parse_rows_preamble(cursor, v2)?;
  let schema = resolve_schema(registry, &preamble)?;

  let column_count = cursor.get_lenc_uint("rows event column count")? as usize;
  if column_count != schema.len() {
    return Err(Error::Malformed("rows event column count"));
  }

  let rows = decode_rows(&schema, cursor)?;
  if preamble.rows_flags.contains(RowsEventFlags::STATEMENT_END) {
    registry.clear();
  }

  Ok(RowsEvent {
    header,
    table_id: preamble.table_id,
    rows_flags: preamble.rows_flags,
    schema,
    rows,
  })
}

fn parse_update_rows(
  header: EventHeader,
  cursor: &mut Cursor<'_>,
  v2: bool,
  registry: &mut TableMapRegistry,
) -> Result<UpdateRowsEvent, Error> {
  let preamble = parse_rows_preamble(cursor, v2)?;
  let schema = resolve_schema(registry, &preamble)?;

  let column_count = cursor.get_lenc_uint("rows event column count")? as usize;
  if column_count != schema.len() {
    return Err(Error::Malformed("rows event column count"));
  }

  let rows = decode_update_rows(&schema, cursor)?;
  if preamble.rows_flags.contains(RowsEventFlags::STATEMENT_END) {
    registry.clear();
  }

  Ok(UpdateRowsEvent {
    header,
    table_id: preamble.table_id,
    rows_flags: preamble.rows_flags,
    schema,
    rows,
  })
}

/// Table id to schema mapping scoped to one decode session.
///
/// Maps are valid until the first rows event flagged as the last of its
/// statement; that boundary drops every entry at once, so each statement's
/// tables must be re-announced.
#[derive(Debug, Default)]
pub struct TableMapRegistry {
  tables: HashMap<u64, Arc<TableSchema>>,
}

impl TableMapRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, table_id: u64) -> Option<Arc<TableSchema>> {
    self.tables.get(&table_id).map(Arc::clone)
  }

  pub fn len(&self) -> usize {
    self.tables.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tables.is_empty()
  }

  fn insert(&mut self, table_id: u64, schema: Arc<TableSchema>) {
    debug!(table_id, database = %schema.database, table = %schema.table, "installing table map");
    self.tables.insert(table_id, schema);
  }

  fn clear(&mut self) {
    if !self.tables.is_empty() {
      debug!(entries = self.tables.len(), "statement end, clearing table maps");
    }
    self.tables.clear();
  }
}
