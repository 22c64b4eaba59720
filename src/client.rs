use bytes::Bytes;
use std::fmt;
use tracing::trace;

use crate::buf_ext::Cursor;
use crate::constants::{BinlogDumpFlags, EVENT_HEADER_LEN};
use crate::debug::DebugBytesRef;
use crate::error::{ConnectionError, Error};
use crate::event::{EventHeader, ReplicationEvent, TableMapRegistry};

/// Options the transport consumes when it requests the dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationOptions {
  /// Log file to start from; empty lets the server pick its current log.
  pub log_file: String,
  /// Byte offset into `log_file`. Events start at offset 4.
  pub start_position: u32,
  /// Server id this client presents to the primary.
  pub server_id: u32,
  pub flags: BinlogDumpFlags,
}

impl Default for ReplicationOptions {
  fn default() -> Self {
    Self {
      log_file: String::new(),
      start_position: 4,
      server_id: 1,
      flags: BinlogDumpFlags::empty(),
    }
  }
}

/// One undecoded event as delivered by the transport.
///
/// The buffer holds the 19-byte common header followed by the type-specific
/// payload, with any checksum trailer already stripped. An empty buffer marks
/// a transient read the client retries.
#[derive(Clone, PartialEq, Eq)]
pub struct RawEvent(Bytes);

impl RawEvent {
  pub fn new(bytes: Bytes) -> Self {
    Self(bytes)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }

  pub fn header(&self) -> Result<EventHeader, Error> {
    EventHeader::parse(&mut Cursor::new(&self.0))
  }

  /// The type-specific bytes after the common header.
  pub fn payload(&self) -> &[u8] {
    self.0.get(EVENT_HEADER_LEN..).unwrap_or_default()
  }
}

impl fmt::Debug for RawEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("RawEvent").field(&DebugBytesRef(&self.0)).finish()
  }
}

/// Connection-level collaborator feeding raw events to the client.
///
/// `fetch` returns `Ok(None)` only when the stream has cleanly ended; an
/// empty `RawEvent` signals a transient read the caller should retry. Both
/// `open` and `close` are idempotent, and closing while a fetch is in flight
/// must make that fetch return promptly with `Ok(None)`.
pub trait Transport {
  async fn open(&mut self, options: &ReplicationOptions) -> Result<(), ConnectionError>;
  async fn fetch(&mut self) -> Result<Option<RawEvent>, ConnectionError>;
  async fn close(&mut self);
}

/// Pull-based decoder session over a transport.
///
/// Owns the table map registry, so one client equals one ordered stream of
/// events; running two streams through a shared registry would break the
/// statement-boundary bookkeeping.
pub struct ReplicationClient<T> {
  transport: T,
  options: ReplicationOptions,
  registry: TableMapRegistry,
}

impl<T: Transport> ReplicationClient<T> {
  pub fn new(transport: T, options: ReplicationOptions) -> Self {
    Self {
      transport,
      options,
      registry: TableMapRegistry::new(),
    }
  }

  pub async fn open(&mut self) -> Result<(), Error> {
    self.transport.open(&self.options).await?;
    Ok(())
  }

  /// Fetches and decodes the next event. `Ok(None)` means the stream ended
  /// cleanly. A decode error abandons that one event; the registry and the
  /// stream stay usable and the caller may keep pulling.
  pub async fn next_event(&mut self) -> Result<Option<ReplicationEvent>, Error> {
    loop {
      match self.transport.fetch().await? {
        None => return Ok(None),
        Some(raw) if raw.is_empty() => {
          trace!("empty read, retrying fetch");
          continue;
        }
        Some(raw) => return ReplicationEvent::parse(raw.as_bytes(), &mut self.registry).map(Some),
      }
    }
  }

  /// Drives the stream to completion, handing each decoded event to `f`.
  /// Stops on clean end of stream or the first error.
  pub async fn for_each<F>(&mut self, mut f: F) -> Result<(), Error>
  where
    F: FnMut(ReplicationEvent),
  {
    while let Some(event) = self.next_event().await? {
      f(event);
    }
    Ok(())
  }

  pub async fn close(&mut self) {
    self.transport.close().await;
  }
}
